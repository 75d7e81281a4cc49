use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

use crate::history::codec;
use crate::llm::chat::{ ChatClient, ToolDefinition };
use crate::models::chat::{ Conversation, ToolCall, Turn };
use crate::tools::ToolRegistry;

/// Drives the chat model with automatic function invocation.
///
/// Tool call turns and their results are appended to the conversation as they
/// happen. The final text answer is returned, not appended.
pub struct Kernel {
    chat_client: Arc<dyn ChatClient>,
    tools: ToolRegistry,
    max_tool_rounds: usize,
}

impl Kernel {
    pub fn new(chat_client: Arc<dyn ChatClient>, tools: ToolRegistry, max_tool_rounds: usize) -> Self {
        Self {
            chat_client,
            tools,
            max_tool_rounds,
        }
    }

    pub async fn respond(&self, conversation: &mut Conversation) -> Result<String, Box<dyn Error + Send + Sync>> {
        let definitions = self.tools.definitions();

        // The last round withdraws the tools so the model has to answer in text.
        for round in 0..=self.max_tool_rounds {
            let tools: &[ToolDefinition] = if round < self.max_tool_rounds { &definitions } else { &[] };
            let messages = codec::encode(conversation);

            match self.chat_client.chat(&messages, tools).await? {
                Turn::AssistantText { text } => {
                    return Ok(text);
                }
                Turn::AssistantToolCalls { calls } => {
                    if tools.is_empty() {
                        return Err("Model requested tool calls but no tools were offered".into());
                    }
                    info!("Round {}: model requested {} tool call(s)", round + 1, calls.len());
                    conversation.push(Turn::AssistantToolCalls { calls: calls.clone() });
                    for call in &calls {
                        let result = self.invoke(call).await;
                        conversation.push(
                            Turn::tool_result(call.id.clone(), Some(call.function_name.clone()), result)
                        );
                    }
                }
                other => {
                    return Err(format!("Unexpected {} turn from chat model", other.role_name()).into());
                }
            }
        }

        Err(format!("No text answer after {} tool rounds", self.max_tool_rounds).into())
    }

    // Failures become the tool's result text so the model can react to them.
    async fn invoke(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.get(&call.function_name) else {
            warn!("Model requested unknown function '{}'", call.function_name);
            return format!("Error: function '{}' is not available", call.function_name);
        };

        match tool.invoke(&call.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Function '{}' failed: {}", call.function_name, e);
                format!("Error: {}", e)
            }
        }
    }
}
