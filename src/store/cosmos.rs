use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use chrono::Utc;
use hmac::{ Hmac, Mac };
use log::{ info, warn };
use reqwest::{ Client as HttpClient, Method, Response, StatusCode };
use serde_json::{ json, Value as JsonValue };
use sha2::Sha256;
use url::{ form_urlencoded, Url };

use super::{ CollectionHandle, NamespaceHandle, RecordStore, StoreError, MIN_THROUGHPUT, PARTITION_KEY_PATH };
use crate::models::wire::WireRecord;

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2018-12-31";

/// Azure Cosmos DB (SQL API) over its REST interface, authorized with the
/// account master key. A database is a namespace, a container a collection.
pub struct CosmosRecordStore {
    http: HttpClient,
    endpoint: Url,
    key: Vec<u8>,
}

impl CosmosRecordStore {
    pub fn new(endpoint: &str, master_key: &str) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e|
            StoreError::Config(format!("Invalid Cosmos endpoint '{}': {}", endpoint, e))
        )?;
        let key = BASE64.decode(master_key.trim()).map_err(|e|
            StoreError::Config(format!("Cosmos key is not valid base64: {}", e))
        )?;
        let http = HttpClient::builder()
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self { http, endpoint, key })
    }

    fn authorization(
        &self,
        verb: &Method,
        resource_type: &str,
        resource_link: &str,
        date: &str
    ) -> Result<String, StoreError> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.as_str().to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| StoreError::Config(e.to_string()))?;
        mac.update(payload.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        let token = format!("type=master&ver=1.0&sig={}", signature);
        Ok(form_urlencoded::byte_serialize(token.as_bytes()).collect())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config(format!("Cosmos endpoint '{}' cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        resource_type: &str,
        resource_link: &str,
        segments: &[&str],
        headers: &[(&str, String)],
        body: Option<&JsonValue>
    ) -> Result<Response, StoreError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let auth = self.authorization(&method, resource_type, resource_link, &date)?;

        let mut req = self.http
            .request(method, self.url(segments)?)
            .header("authorization", auth)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        req.send().await.map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Metadata read. `Ok(false)` when the resource does not exist.
    async fn exists(&self, resource_type: &str, resource_link: &str, segments: &[&str]) -> Result<bool, StoreError> {
        let resp = self.send(Method::GET, resource_type, resource_link, segments, &[], None).await?;
        match resp.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(failure(resp).await),
        }
    }

    /// Creates a resource. A conflict means another caller created it first, which
    /// is confirmed with one more metadata read.
    async fn create(
        &self,
        resource_type: &str,
        parent_link: &str,
        parent_segments: &[&str],
        own_link: &str,
        own_segments: &[&str],
        headers: &[(&str, String)],
        body: &JsonValue
    ) -> Result<(), StoreError> {
        let resp = self.send(Method::POST, resource_type, parent_link, parent_segments, headers, Some(body)).await?;
        match resp.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => {
                warn!("'{}' was created concurrently, re-reading", own_link);
                if self.exists(resource_type, own_link, own_segments).await? {
                    Ok(())
                } else {
                    Err(StoreError::Unavailable(format!("'{}' reported as existing but cannot be read", own_link)))
                }
            }
            _ => Err(failure(resp).await),
        }
    }
}

async fn failure(resp: Response) -> StoreError {
    let status = resp.status();
    let message = resp.text().await.unwrap_or_default();
    classify(status, message)
}

fn classify(status: StatusCode, message: String) -> StoreError {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StoreError::Unavailable(format!("{}: {}", status, message))
    } else {
        StoreError::Rejected { status: status.as_u16(), message }
    }
}

fn partition_key_header(partition_key: &str) -> Result<(&'static str, String), StoreError> {
    Ok(("x-ms-documentdb-partitionkey", serde_json::to_string(&[partition_key])?))
}

#[async_trait]
impl RecordStore for CosmosRecordStore {
    async fn ensure_namespace(&self, name: &str) -> Result<NamespaceHandle, StoreError> {
        let link = format!("dbs/{}", name);
        let segments = ["dbs", name];
        if !self.exists("dbs", &link, &segments).await? {
            info!("Creating database '{}'", name);
            self.create("dbs", "", &["dbs"], &link, &segments, &[], &json!({ "id": name })).await?;
        }
        Ok(NamespaceHandle { name: name.to_string() })
    }

    async fn ensure_collection(
        &self,
        namespace: &NamespaceHandle,
        name: &str
    ) -> Result<CollectionHandle, StoreError> {
        let db = namespace.name.as_str();
        let db_link = format!("dbs/{}", db);
        let link = format!("dbs/{}/colls/{}", db, name);
        let segments = ["dbs", db, "colls", name];

        if !self.exists("colls", &link, &segments).await? {
            info!("Creating container '{}' with {} as partition key", name, PARTITION_KEY_PATH);
            let body =
                json!({
                "id": name,
                "partitionKey": { "paths": [PARTITION_KEY_PATH], "kind": "Hash" }
            });
            let headers = [("x-ms-offer-throughput", MIN_THROUGHPUT.to_string())];
            self.create("colls", &db_link, &["dbs", db, "colls"], &link, &segments, &headers, &body).await?;
        }
        Ok(CollectionHandle::new(namespace, name))
    }

    async fn read(
        &self,
        collection: &CollectionHandle,
        partition_key: &str,
        record_key: &str
    ) -> Result<Option<WireRecord>, StoreError> {
        let (db, coll) = (collection.namespace.as_str(), collection.name.as_str());
        let link = format!("dbs/{}/colls/{}/docs/{}", db, coll, record_key);
        let headers = [partition_key_header(partition_key)?];
        let resp = self.send(
            Method::GET,
            "docs",
            &link,
            &["dbs", db, "colls", coll, "docs", record_key],
            &headers,
            None
        ).await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let text = resp.text().await.map_err(|e| StoreError::Unavailable(e.to_string()))?;
                Ok(Some(serde_json::from_str(&text)?))
            }
            _ => Err(failure(resp).await),
        }
    }

    async fn upsert(&self, collection: &CollectionHandle, record: &WireRecord) -> Result<(), StoreError> {
        let (db, coll) = (collection.namespace.as_str(), collection.name.as_str());
        let link = format!("dbs/{}/colls/{}", db, coll);
        let headers = [
            ("x-ms-documentdb-is-upsert", "True".to_string()),
            partition_key_header(&record.partition_key)?,
        ];
        let body = serde_json::to_value(record)?;
        let resp = self.send(Method::POST, "docs", &link, &["dbs", db, "colls", coll, "docs"], &headers, Some(&body)).await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(failure(resp).await)
        }
    }
}
