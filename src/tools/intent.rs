use log::{ debug, warn };
use std::error::Error;
use std::sync::Arc;

use crate::config::prompt::PromptConfig;
use crate::llm::chat::ChatClient;

/// Classifies a customer question into one of the configured intent categories.
pub struct IntentDetector {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
}

impl IntentDetector {
    pub fn new(chat_client: Arc<dyn ChatClient>, prompt_config: Arc<PromptConfig>) -> Self {
        Self { chat_client, prompt_config }
    }

    pub async fn determine_intent(&self, query: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let prompt = self.prompt_config.intent_prompt(query);
        let answer = self.chat_client.complete(&prompt).await?.response;
        let answer = answer.trim();

        // Models sometimes wrap the category in extra words.
        let matched = self.prompt_config.intent_categories
            .iter()
            .find(|c| answer.eq_ignore_ascii_case(&c.name))
            .or_else(|| {
                self.prompt_config.intent_categories
                    .iter()
                    .find(|c| answer.to_lowercase().contains(&c.name.to_lowercase()))
            });

        match matched {
            Some(category) => {
                debug!("Intent for '{}': {}", query, category.name);
                Ok(category.name.clone())
            }
            None => {
                warn!("Intent answer '{}' matches no configured category", answer);
                Ok(answer.to_string())
            }
        }
    }
}
