use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value as JsonValue;
use std::fmt;

use super::chat::ConversationKey;

/// Role string of a persisted message. Unknown roles are kept verbatim so they
/// can be reported when the transcript is rebuilt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
}

impl WireRole {
    pub fn as_str(&self) -> &str {
        match self {
            WireRole::System => "system",
            WireRole::User => "user",
            WireRole::Assistant => "assistant",
            WireRole::Tool => "tool",
            WireRole::Other(role) => role.as_str(),
        }
    }
}

impl From<String> for WireRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => WireRole::System,
            "user" => WireRole::User,
            "assistant" => WireRole::Assistant,
            "tool" => WireRole::Tool,
            _ => WireRole::Other(role),
        }
    }
}

impl From<WireRole> for String {
    fn from(role: WireRole) -> Self {
        match role {
            WireRole::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WireRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default = "empty_arguments", deserialize_with = "arguments_as_text")]
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

impl WireToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: WireFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Flat, store-friendly shape of one turn. Also the message shape accepted by
/// OpenAI-compatible chat completion endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn text(role: WireRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// The persisted document for one conversation.
///
/// `chat` holds the raw JSON of each message so a single unreadable entry does
/// not make the rest of the transcript unreadable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub partition_key: String,
    pub id: String,
    #[serde(default)]
    pub chat: Vec<JsonValue>,
}

impl WireRecord {
    pub fn new(key: &ConversationKey, messages: &[WireMessage]) -> Result<Self, serde_json::Error> {
        let chat = messages
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            partition_key: key.call_agent.clone(),
            id: key.call_id.clone(),
            chat,
        })
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(self.partition_key.clone(), self.id.clone())
    }
}

fn function_kind() -> String {
    "function".to_string()
}

fn empty_arguments() -> String {
    "{}".to_string()
}

// Some writers persisted the arguments as an object rather than JSON text.
fn arguments_as_text<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(text) => text,
        JsonValue::Null => empty_arguments(),
        other => other.to_string(),
    })
}
