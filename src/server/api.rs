use axum::{
    extract::State,
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, info, warn };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

use crate::agent::{ AgentError, CallAgent };
use crate::models::api::UtteranceRequest;
use crate::store::StoreError;

#[derive(Clone)]
struct AppState {
    agent: Arc<CallAgent>,
}

pub fn router(agent: Arc<CallAgent>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(health_handler))
        .route("/utterance", post(utterance_handler))
        .layer(cors)
        .with_state(AppState { agent })
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn utterance_handler(State(state): State<AppState>, Json(req): Json<UtteranceRequest>) -> Response {
    info!("Utterance from {} on {}/{}", req.speaker, req.call_agent, req.call_id);

    match state.agent.handle_utterance(&req).await {
        Ok(reply) => plain_text(StatusCode::OK, reply),
        Err(e) => error_response(e),
    }
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

fn error_response(err: AgentError) -> Response {
    let status = match &err {
        AgentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AgentError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AgentError::Store(_) | AgentError::Orchestration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Utterance failed: {}", err);
    } else {
        warn!("Utterance rejected: {}", err);
    }
    plain_text(status, err.to_string())
}
