use async_trait::async_trait;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::sync::Mutex;

use super::{ ChatClient, ToolDefinition };
use crate::models::chat::Turn;
use crate::models::wire::WireMessage;

/// Replays canned answers in order and records what it was sent.
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<Turn>>,
    pub requests: Mutex<Vec<(Vec<WireMessage>, usize)>>,
}

impl ScriptedChatClient {
    pub fn new(replies: Vec<Turn>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(
        &self,
        messages: &[WireMessage],
        tools: &[ToolDefinition]
    ) -> Result<Turn, Box<dyn StdError + Send + Sync>> {
        self.requests.lock().unwrap().push((messages.to_vec(), tools.len()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "script exhausted".into())
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}
