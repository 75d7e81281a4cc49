pub mod crm;
pub mod intent;
pub mod knowledge;
pub mod search;

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use crate::llm::chat::ToolDefinition;

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool with the raw JSON argument text produced by the model.
    async fn invoke(&self, arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Tools offered to the model, looked up by function name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().function.name;
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::function(self.0, "echo", json!({"type": "object"}))
        }

        async fn invoke(&self, arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok(arguments.to_string())
        }
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("b")));
        registry.register(Arc::new(Echo("a")));
        registry.register(Arc::new(Echo("b")));

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn lookup_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo("echo")));

        let tool = registry.get("echo").unwrap();
        assert_eq!(tool.invoke("{}").await.unwrap(), "{}");
        assert!(registry.get("missing").is_none());
    }
}
