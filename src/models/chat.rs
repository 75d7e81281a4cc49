use serde::{ Serialize, Deserialize };

/// Identifies one conversation: the owning agent is the partition, the call id
/// is the record key. Both are compared verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub call_agent: String,
    pub call_id: String,
}

impl ConversationKey {
    pub fn new(call_agent: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            call_agent: call_agent.into(),
            call_id: call_id.into(),
        }
    }
}

/// A single function invocation requested by the assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub function_name: String,
    /// Raw JSON argument text, passed through untouched.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: impl Into<String>
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    System {
        text: String,
    },
    User {
        text: String,
    },
    AssistantText {
        text: String,
    },
    AssistantToolCalls {
        calls: Vec<ToolCall>,
    },
    /// Outcome of one earlier [`ToolCall`]. `function_name` is `None` when no
    /// call with `call_id` exists in the conversation.
    ToolResult {
        call_id: String,
        function_name: Option<String>,
        result_text: String,
    },
    /// Tool output that carries no call id.
    Tool {
        text: String,
    },
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Turn::System { text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Turn::AssistantText { text: text.into() }
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        function_name: Option<String>,
        result_text: impl Into<String>
    ) -> Self {
        Turn::ToolResult {
            call_id: call_id.into(),
            function_name,
            result_text: result_text.into(),
        }
    }

    pub fn role_name(&self) -> &'static str {
        match self {
            Turn::System { .. } => "system",
            Turn::User { .. } => "user",
            Turn::AssistantText { .. } | Turn::AssistantToolCalls { .. } => "assistant",
            Turn::ToolResult { .. } | Turn::Tool { .. } => "tool",
        }
    }
}

/// Ordered transcript of one call. Turns are only ever appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh conversation whose first turn is the system instruction.
    pub fn seeded(system_instruction: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_instruction)],
        }
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
