use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::{ json, Value as JsonValue };
use std::error::Error;
use std::sync::Arc;

use super::crm::CrmService;
use super::intent::IntentDetector;
use super::search::{ BenefitsSearch, KnowledgeSearch };
use super::{ Tool, ToolRegistry };
use crate::llm::chat::ToolDefinition;

pub const RETRIEVE_KC_RESPONSE: &str = "retrieve_kc_response";
pub const RETRIEVE_BENEFITS_RESPONSE: &str = "retrieve_benefits_response";

/// Backends shared by the knowledge tools.
pub struct KnowledgeServices {
    pub intent: IntentDetector,
    pub knowledge: Arc<dyn KnowledgeSearch>,
    pub benefits: Arc<dyn BenefitsSearch>,
    pub crm: CrmService,
}

#[derive(Deserialize)]
struct QueryArguments {
    user_query: String,
}

fn parse_query(arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let args: QueryArguments = serde_json
        ::from_str(arguments)
        .map_err(|e| format!("Invalid tool arguments '{}': {}", arguments, e))?;
    Ok(args.user_query)
}

fn query_parameters() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "user_query": {
                "type": "string",
                "description": "A searchable need or question related to health care posed by the USER in the conversation"
            }
        },
        "required": ["user_query"]
    })
}

/// General process and service information for one customer question.
pub struct RetrieveKcResponse {
    services: Arc<KnowledgeServices>,
}

#[async_trait]
impl Tool for RetrieveKcResponse {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            RETRIEVE_KC_RESPONSE,
            "To search general process and service information including eligibility criteria, regarding a single user_query identified in a customer conversation",
            query_parameters()
        )
    }

    async fn invoke(&self, arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let query = parse_query(arguments)?;
        info!("{}: '{}'", RETRIEVE_KC_RESPONSE, query);

        let intent = self.services.intent.determine_intent(&query).await?;
        let aisearch_data = self.services.knowledge.search(&query).await?;

        Ok(json!({ "intent": intent, "aisearch_data": aisearch_data }).to_string())
    }
}

/// General information plus plan-specific benefits for the current customer.
pub struct RetrieveBenefitsResponse {
    services: Arc<KnowledgeServices>,
}

#[async_trait]
impl Tool for RetrieveBenefitsResponse {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            RETRIEVE_BENEFITS_RESPONSE,
            "To search both general process and service information as well as specific plan benefit information (examples: copay, deductible, payment, rewards, balances) regarding a single user_query identified in a customer conversation for the given customer plan parameters",
            query_parameters()
        )
    }

    async fn invoke(&self, arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let query = parse_query(arguments)?;
        info!("{}: '{}'", RETRIEVE_BENEFITS_RESPONSE, query);

        let intent = self.services.intent.determine_intent(&query).await?;
        let customer = self.services.crm.customer_record();
        let aisearch_data = self.services.knowledge.search(&query).await?;
        let benefitsearch_data = self.services.benefits.search(&query, &customer.crm.plan).await?;

        Ok(
            json!({
            "intent": intent,
            "aisearch_data": aisearch_data,
            "benefitsearch_data": benefitsearch_data
        }).to_string()
        )
    }
}

pub fn register_knowledge_tools(registry: &mut ToolRegistry, services: Arc<KnowledgeServices>) {
    registry.register(Arc::new(RetrieveKcResponse { services: Arc::clone(&services) }));
    registry.register(Arc::new(RetrieveBenefitsResponse { services }));
}
