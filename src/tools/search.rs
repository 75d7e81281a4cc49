use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::error::Error;

use super::crm::PlanRecord;

/// Text returned when a backend has nothing to offer.
pub const NONE_FOUND: &str = "none found";

const SEARCH_API_VERSION: &str = "2023-11-01";
const SEARCH_TOP: usize = 5;

#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

#[async_trait]
pub trait BenefitsSearch: Send + Sync {
    async fn search(&self, query: &str, plan: &PlanRecord) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Stand-in for a backend whose endpoint is not configured.
pub struct UnconfiguredSearch;

#[async_trait]
impl KnowledgeSearch for UnconfiguredSearch {
    async fn search(&self, _query: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(NONE_FOUND.to_string())
    }
}

#[async_trait]
impl BenefitsSearch for UnconfiguredSearch {
    async fn search(&self, _query: &str, _plan: &PlanRecord) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(NONE_FOUND.to_string())
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<JsonValue>,
}

/// Azure AI Search index queried with full-text search, top documents returned
/// as a JSON array.
pub struct AiSearchClient {
    http: HttpClient,
    url: String,
    api_key: String,
}

impl AiSearchClient {
    pub fn new(endpoint: &str, index: &str, api_key: &str) -> Self {
        Self {
            http: HttpClient::new(),
            url: format!(
                "{}/indexes/{}/docs/search?api-version={}",
                endpoint.trim_end_matches('/'),
                index,
                SEARCH_API_VERSION
            ),
            api_key: api_key.to_string(),
        }
    }
}

fn format_documents(documents: Vec<JsonValue>) -> Result<String, serde_json::Error> {
    if documents.is_empty() {
        return Ok(NONE_FOUND.to_string());
    }
    serde_json::to_string(&documents)
}

#[async_trait]
impl KnowledgeSearch for AiSearchClient {
    async fn search(&self, query: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        debug!("Knowledge search: '{}'", query);
        let resp = self.http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&(SearchRequest { search: query, top: SEARCH_TOP }))
            .send().await?
            .error_for_status()?
            .json::<SearchResponse>().await?;

        Ok(format_documents(resp.value)?)
    }
}

#[derive(Serialize)]
struct BenefitsRequest<'a> {
    user_query: &'a str,
    plan_type: &'a str,
    plan_system_type_id: &'a str,
    benefit_plan_id: &'a str,
    date_of_service: &'a str,
}

/// Plan-specific benefits API.
pub struct BenefitsSearchClient {
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
}

impl BenefitsSearchClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: HttpClient::new(),
            endpoint: endpoint.to_string(),
            api_key: Some(api_key.to_string()).filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl BenefitsSearch for BenefitsSearchClient {
    async fn search(&self, query: &str, plan: &PlanRecord) -> Result<String, Box<dyn Error + Send + Sync>> {
        debug!("Benefits search: '{}' for plan {}", query, plan.benefit_plan_id);
        let body = BenefitsRequest {
            user_query: query,
            plan_type: &plan.plan_type,
            plan_system_type_id: &plan.plan_system_type_id,
            benefit_plan_id: &plan.benefit_plan_id,
            date_of_service: &plan.date_of_service,
        };
        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let text = req.send().await?.error_for_status()?.text().await?;
        if text.trim().is_empty() {
            warn!("Benefits search returned an empty body");
            return Ok(NONE_FOUND.to_string());
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_url_targets_index_docs() {
        let client = AiSearchClient::new("https://kb.search.windows.net/", "faq", "k");
        assert_eq!(client.url, "https://kb.search.windows.net/indexes/faq/docs/search?api-version=2023-11-01");
    }

    #[test]
    fn empty_result_reads_none_found() {
        assert_eq!(format_documents(Vec::new()).unwrap(), NONE_FOUND);
        assert_eq!(format_documents(vec![json!({"title": "CGM"})]).unwrap(), r#"[{"title":"CGM"}]"#);
    }

    #[tokio::test]
    async fn unconfigured_backend_answers_none_found() {
        let answer = KnowledgeSearch::search(&UnconfiguredSearch, "anything").await.unwrap();
        assert_eq!(answer, NONE_FOUND);
    }
}
