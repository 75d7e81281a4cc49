use async_trait::async_trait;
use axum::body::{ to_bytes, Body };
use axum::http::{ Request, StatusCode };
use std::error::Error;
use std::sync::{ Arc, Mutex };
use tower::ServiceExt;

use call_assist::agent::CallAgent;
use call_assist::config::prompt::PromptConfig;
use call_assist::history::ChatHistoryService;
use call_assist::kernel::Kernel;
use call_assist::llm::chat::{ ChatClient, ToolDefinition };
use call_assist::models::chat::{ ConversationKey, Turn };
use call_assist::models::wire::WireMessage;
use call_assist::server::api::router;
use call_assist::store::MemoryRecordStore;
use call_assist::tools::ToolRegistry;

struct EchoChat {
    calls: Mutex<usize>,
}

#[async_trait]
impl ChatClient for EchoChat {
    async fn chat(
        &self,
        messages: &[WireMessage],
        _tools: &[ToolDefinition]
    ) -> Result<Turn, Box<dyn Error + Send + Sync>> {
        *self.calls.lock().unwrap() += 1;
        let last = messages.last().and_then(|m| m.content.clone()).unwrap_or_default();
        Ok(Turn::assistant(format!("User question: {}", last)))
    }

    fn get_model(&self) -> String {
        "echo".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

fn app() -> (Arc<MemoryRecordStore>, Arc<EchoChat>, axum::Router) {
    let store = Arc::new(MemoryRecordStore::new());
    let chat = Arc::new(EchoChat { calls: Mutex::new(0) });
    let history = ChatHistoryService::new(store.clone(), "calls", "history");
    let kernel = Kernel::new(chat.clone(), ToolRegistry::new(), 3);
    let agent = CallAgent::new(history, kernel, Arc::new(PromptConfig::default()));
    (store, chat, router(Arc::new(agent)))
}

fn utterance(speaker: &str, text: &str) -> Request<Body> {
    let body = serde_json::json!({
        "callAgent": "A1",
        "callId": "C1",
        "utterance": text,
        "speaker": speaker,
    });
    Request::builder()
        .method("POST")
        .uri("/utterance")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_check_answers_ok() {
    let (_, _, app) = app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn customer_utterance_returns_model_text_and_persists() {
    let (store, _, app) = app();

    let response = app.oneshot(utterance("customer", "How much would a CGM cost?")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "User question: How much would a CGM cost?");
    assert_eq!(store.record_count().await, 1);

    let history = ChatHistoryService::new(store, "calls", "history");
    let stored = history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn advocate_utterance_is_bypassed() {
    let (store, chat, app) = app();

    let response = app.oneshot(utterance("advocate", "One moment please")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "No questions found");
    assert_eq!(*chat.calls.lock().unwrap(), 0);
    assert_eq!(store.record_count().await, 0);
}

#[tokio::test]
async fn unknown_speaker_is_a_bad_request() {
    let (store, chat, app) = app();

    let response = app.oneshot(utterance("robot", "hello")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("Invalid speaker role"));
    assert_eq!(*chat.calls.lock().unwrap(), 0);
    assert_eq!(store.record_count().await, 0);
}
