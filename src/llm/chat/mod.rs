pub mod openai;
#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::sync::Arc;

use super::{ LlmConfig, LlmType };
use self::openai::OpenAIChatClient;
use crate::models::chat::Turn;
use crate::models::wire::{ WireMessage, WireRole };

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// A function the model may call, in chat-completions `tools` format.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: JsonValue) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the transcript with the available tools. The answer is either an
    /// [`Turn::AssistantText`] or an [`Turn::AssistantToolCalls`].
    async fn chat(
        &self,
        messages: &[WireMessage],
        tools: &[ToolDefinition]
    ) -> Result<Turn, Box<dyn StdError + Send + Sync>>;

    /// Single-prompt completion without tools.
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let messages = [WireMessage::text(WireRole::User, prompt)];
        match self.chat(&messages, &[]).await? {
            Turn::AssistantText { text } => Ok(CompletionResponse { response: text }),
            other => Err(format!("Expected a text completion, got a {} turn", other.role_name()).into()),
        }
    }

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => Arc::new(OpenAIChatClient::from_config(config)?),
        LlmType::Azure => Arc::new(OpenAIChatClient::azure_from_config(config)?),
    };
    Ok(client)
}
