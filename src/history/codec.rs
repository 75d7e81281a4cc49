//! Mapping between an in-memory [`Conversation`] and the flat message list
//! persisted in a [`WireRecord`](crate::models::wire::WireRecord).
//!
//! Encoding is total. Decoding never fails: entries that cannot be projected to
//! a [`Turn`] are skipped and reported as [`MalformedEntry`] values (and logged),
//! so one bad historical entry cannot block the rest of the transcript.

use std::collections::HashMap;

use log::warn;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::models::chat::{ Conversation, ToolCall, Turn };
use crate::models::wire::{ WireMessage, WireRole, WireToolCall };

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedEntry {
    #[error("entry {index} is not a readable message: {reason}")]
    Unreadable {
        index: usize,
        reason: String,
    },
    #[error("entry {index} skipped, unhandled role '{role}'")]
    UnrecognizedRole {
        index: usize,
        role: String,
    },
    #[error("entry {index} skipped, role '{role}' without {field}")]
    MissingField {
        index: usize,
        role: String,
        field: &'static str,
    },
    #[error("entry {index} answers unknown tool call '{call_id}'")]
    UnmatchedToolResult {
        index: usize,
        call_id: String,
    },
    #[error("entry {index} has both content and tool calls, tool calls dropped")]
    DiscardedToolCalls {
        index: usize,
    },
}

/// Result of rebuilding a transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub turns: Vec<Turn>,
    pub issues: Vec<MalformedEntry>,
}

impl Decoded {
    pub fn into_conversation(self) -> Conversation {
        Conversation::from_turns(self.turns)
    }
}

pub fn encode(conversation: &Conversation) -> Vec<WireMessage> {
    conversation.turns().iter().map(encode_turn).collect()
}

pub fn encode_turn(turn: &Turn) -> WireMessage {
    match turn {
        Turn::System { text } => WireMessage::text(WireRole::System, text.clone()),
        Turn::User { text } => WireMessage::text(WireRole::User, text.clone()),
        Turn::AssistantText { text } => WireMessage::text(WireRole::Assistant, text.clone()),
        Turn::AssistantToolCalls { calls } =>
            WireMessage {
                role: WireRole::Assistant,
                content: None,
                tool_calls: Some(
                    calls
                        .iter()
                        .map(|call| WireToolCall::function(&call.id, &call.function_name, &call.arguments))
                        .collect()
                ),
                tool_call_id: None,
            },
        Turn::ToolResult { call_id, result_text, .. } =>
            WireMessage {
                role: WireRole::Tool,
                content: Some(result_text.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            },
        Turn::Tool { text } => WireMessage::text(WireRole::Tool, text.clone()),
    }
}

/// Maps every tool call id found anywhere in `messages` to its function name.
/// When an id repeats, the first occurrence wins.
pub fn correlation_table<'a, I>(messages: I) -> HashMap<&'a str, &'a str>
    where I: IntoIterator<Item = &'a WireMessage>
{
    let mut table = HashMap::new();
    for call in messages
        .into_iter()
        .filter_map(|msg| msg.tool_calls.as_ref())
        .flatten() {
        table.entry(call.id.as_str()).or_insert(call.function.name.as_str());
    }
    table
}

pub fn decode(messages: &[WireMessage]) -> Decoded {
    let indexed: Vec<(usize, &WireMessage)> = messages.iter().enumerate().collect();
    decode_indexed(&indexed, Vec::new())
}

/// Decodes raw persisted entries. Entries that are not message objects are
/// reported with their position in `entries`.
pub fn decode_entries(entries: &[JsonValue]) -> Decoded {
    let mut issues = Vec::new();
    let mut parsed = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<WireMessage>(entry.clone()) {
            Ok(msg) => parsed.push((index, msg)),
            Err(e) => {
                let issue = MalformedEntry::Unreadable { index, reason: e.to_string() };
                warn!("Transcript decode: {}", issue);
                issues.push(issue);
            }
        }
    }

    let indexed: Vec<(usize, &WireMessage)> = parsed
        .iter()
        .map(|(index, msg)| (*index, msg))
        .collect();
    decode_indexed(&indexed, issues)
}

fn decode_indexed(messages: &[(usize, &WireMessage)], mut issues: Vec<MalformedEntry>) -> Decoded {
    // The whole table is built first: a result may sit before or after its call.
    let table = correlation_table(messages.iter().map(|(_, msg)| *msg));
    let mut turns = Vec::with_capacity(messages.len());

    for &(index, msg) in messages {
        match project(index, msg, &table, &mut issues) {
            Some(turn) => turns.push(turn),
            None => {
                if let Some(issue) = issues.last() {
                    warn!("Transcript decode: {}", issue);
                }
            }
        }
    }

    Decoded { turns, issues }
}

fn project(
    index: usize,
    msg: &WireMessage,
    table: &HashMap<&str, &str>,
    issues: &mut Vec<MalformedEntry>
) -> Option<Turn> {
    let missing = |field: &'static str| MalformedEntry::MissingField {
        index,
        role: msg.role.to_string(),
        field,
    };

    match &msg.role {
        WireRole::System => {
            match &msg.content {
                Some(text) => Some(Turn::system(text.clone())),
                None => {
                    issues.push(missing("content"));
                    None
                }
            }
        }
        WireRole::User => {
            match &msg.content {
                Some(text) => Some(Turn::user(text.clone())),
                None => {
                    issues.push(missing("content"));
                    None
                }
            }
        }
        WireRole::Assistant => {
            match (&msg.content, &msg.tool_calls) {
                (Some(text), calls) => {
                    if calls.as_ref().is_some_and(|c| !c.is_empty()) {
                        let issue = MalformedEntry::DiscardedToolCalls { index };
                        warn!("Transcript decode: {}", issue);
                        issues.push(issue);
                    }
                    Some(Turn::assistant(text.clone()))
                }
                (None, Some(calls)) =>
                    Some(Turn::AssistantToolCalls {
                        calls: calls
                            .iter()
                            .map(|call| ToolCall::new(&call.id, &call.function.name, &call.function.arguments))
                            .collect(),
                    }),
                (None, None) => {
                    issues.push(missing("content or tool_calls"));
                    None
                }
            }
        }
        WireRole::Tool => {
            match (&msg.tool_call_id, &msg.content) {
                (Some(call_id), content) => {
                    let function_name = table.get(call_id.as_str()).map(|name| name.to_string());
                    if function_name.is_none() {
                        let issue = MalformedEntry::UnmatchedToolResult {
                            index,
                            call_id: call_id.clone(),
                        };
                        warn!("Transcript decode: {}", issue);
                        issues.push(issue);
                    }
                    if content.is_none() {
                        let issue = missing("content");
                        warn!("Transcript decode: {}", issue);
                        issues.push(issue);
                    }
                    Some(Turn::ToolResult {
                        call_id: call_id.clone(),
                        function_name,
                        result_text: content.clone().unwrap_or_default(),
                    })
                }
                (None, Some(text)) => Some(Turn::Tool { text: text.clone() }),
                (None, None) => {
                    issues.push(missing("tool_call_id or content"));
                    None
                }
            }
        }
        WireRole::Other(role) => {
            issues.push(MalformedEntry::UnrecognizedRole { index, role: role.clone() });
            None
        }
    }
}
