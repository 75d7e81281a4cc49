use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::{ ChatClient, ToolDefinition };
use crate::llm::LlmConfig;
use crate::models::chat::{ ToolCall, Turn };
use crate::models::wire::{ WireMessage, WireToolCall };

/// OpenAI-compatible chat completions client, used both for api.openai.com and
/// for Azure OpenAI deployments.
pub struct OpenAIChatClient {
    http: HttpClient,
    model: Option<String>,
    url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl OpenAIChatClient {
    fn with_header(
        header: HeaderName,
        value: String,
        model: Option<String>,
        url: String
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            header,
            HeaderValue::from_str(&value).map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self { http, model, url })
    }

    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| "gpt-4o".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        Self::with_header(AUTHORIZATION, format!("Bearer {}", api_key), Some(chat_model), url)
    }

    pub fn azure(
        api_key: String,
        endpoint: &str,
        deployment: &str,
        api_version: &str
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let url = azure_url(endpoint, deployment, api_version);
        Self::with_header(HeaderName::from_static("api-key"), api_key, None, url)
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "OpenAI API key is required".to_string())?;
        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    pub fn azure_from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Azure OpenAI API key is required".to_string())?;
        let endpoint = config.base_url
            .as_deref()
            .ok_or_else(|| "Azure OpenAI endpoint is required".to_string())?;
        let deployment = config.deployment
            .as_deref()
            .ok_or_else(|| "Azure OpenAI deployment is required".to_string())?;
        let api_version = config.api_version.as_deref().unwrap_or("2024-06-01");
        Self::azure(api_key, endpoint, deployment, api_version)
    }
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

fn azure_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

fn into_turn(resp: OpenAIResponse) -> Result<Turn, Box<dyn StdError + Send + Sync>> {
    let message = resp.choices
        .into_iter()
        .next()
        .ok_or_else(|| "No response from chat completion API".to_string())?.message;

    match (message.tool_calls, message.content) {
        (Some(calls), _) if !calls.is_empty() =>
            Ok(Turn::AssistantToolCalls {
                calls: calls
                    .into_iter()
                    .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
                    .collect(),
            }),
        (_, Some(text)) => Ok(Turn::assistant(text)),
        _ => Err("Chat completion returned neither content nor tool calls".into()),
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn chat(
        &self,
        messages: &[WireMessage],
        tools: &[ToolDefinition]
    ) -> Result<Turn, Box<dyn StdError + Send + Sync>> {
        let req = OpenAIChatRequest {
            model: self.model.as_deref(),
            messages,
            tools,
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
            temperature: 0.0,
        };
        debug!("Chat completion with {} messages and {} tools", messages.len(), tools.len());

        let resp = self.http
            .post(&self.url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<OpenAIResponse>().await?;

        into_turn(resp)
    }

    fn get_model(&self) -> String {
        self.model.clone().unwrap_or_else(|| "deployment default".to_string())
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}
