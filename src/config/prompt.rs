use log::info;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_SYSTEM_INSTRUCTION: &str =
    r#"You are a silent observer in a phone conversation between a human health plan benefits assistant and a customer.
In the conversation history provided to you, the USER is the customer, and the ASSISTANT is the human assistant.
You are not allowed to interact with the customer USER directly, and you are not completing the conversation.
Your purpose is to extract all searchable questions uttered by the customer USER, and the intent category for each, returning helpful information to be used by the human ASSISTANT as they continue to talk with the customer USER.
If no well formed customer user question or need is found in the conversation, return only "no questions found".
For each USER question or need identified, use the tools available to you to search for helpful information and determine intent for each identified question and then combine the results into a single response.
In the "Information" returned, only include information retrieved from your tools; not from your general knowledge or from utterances in the conversation.
If no supporting information is found for a user question with your tools, provide "none found" for the information related to that item.
Always format your response like the examples below.
###Example 1###
No questions found
###Example 2###
User question: How does the Monthly Challenge work?
Information: [Details about monthly challenge from retrieve_kc_response function]
Intent: General
###Example 3###
User question: How much would a CGM cost?
Information: [Details about CGM cost from retrieve_benefits_response function]
Intent: Plan
###Example 4###
User question: What is the best CGM for me?
Information: none found
Intent: General"#;

const DEFAULT_INTENT_CLASSIFICATION: &str =
    r#"Classify the customer question below into exactly one of these categories:
{categories}
Answer with the category name only.
Question: {query}"#;

const DEFAULT_BYPASS_RESPONSE: &str = "No questions found";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Prompt template '{0}' is missing placeholder {1}")]
    MissingPlaceholder(&'static str, &'static str),
}

#[derive(Deserialize, Debug, Clone)]
pub struct IntentCategory {
    pub name: String,
    pub description: String,
}

/// Prompts used by the assistant. Fields absent from a prompts file keep
/// their built-in values.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    /// First turn of every new conversation.
    pub system_instruction: String,
    /// Template with `{categories}` and `{query}` placeholders.
    pub intent_classification: String,
    pub intent_categories: Vec<IntentCategory>,
    /// Reply returned for advocate utterances.
    pub bypass_response: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            intent_classification: DEFAULT_INTENT_CLASSIFICATION.to_string(),
            intent_categories: vec![
                IntentCategory {
                    name: "General".to_string(),
                    description: "general process, program and service questions, including eligibility".to_string(),
                },
                IntentCategory {
                    name: "Plan".to_string(),
                    description: "questions about the customer's own plan benefits such as copay, deductible, payments, rewards or balances".to_string(),
                }
            ],
            bypass_response: DEFAULT_BYPASS_RESPONSE.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        for placeholder in ["{categories}", "{query}"] {
            if !self.intent_classification.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder("intent_classification", placeholder));
            }
        }
        Ok(())
    }

    pub fn intent_prompt(&self, query: &str) -> String {
        let categories = self.intent_categories
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        self.intent_classification.replace("{categories}", &categories).replace("{query}", query)
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<Arc<PromptConfig>, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(Arc::new(config))
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    match path {
        Some(path) => {
            let file_content = fs::read_to_string(path)?;
            let config = load_prompts_from_str(&file_content)?;
            info!("Loaded prompts from: {}", path);
            Ok(config)
        }
        None => {
            info!("Using built-in prompts");
            Ok(Arc::new(PromptConfig::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_no_questions_bypass_text() {
        let config = load_prompts(None).unwrap();
        assert_eq!(config.bypass_response, "No questions found");
        assert!(config.system_instruction.starts_with("You are a silent observer"));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = load_prompts_from_str(r#"{"bypass_response": "skip"}"#).unwrap();
        assert_eq!(config.bypass_response, "skip");
        assert_eq!(config.intent_categories.len(), 2);
    }

    #[test]
    fn template_without_query_is_rejected() {
        let err = load_prompts_from_str(r#"{"intent_classification": "{categories}"}"#).unwrap_err();
        assert!(matches!(err, PromptError::MissingPlaceholder(_, "{query}")));
    }

    #[test]
    fn intent_prompt_lists_categories() {
        let prompt = PromptConfig::default().intent_prompt("What is my copay?");
        assert!(prompt.contains("- General:"));
        assert!(prompt.contains("- Plan:"));
        assert!(prompt.ends_with("Question: What is my copay?"));
    }
}
