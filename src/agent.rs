use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::history::ChatHistoryService;
use crate::kernel::Kernel;
use crate::llm::{ LlmConfig, LlmType };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::api::{ Speaker, UtteranceRequest };
use crate::models::chat::{ Conversation, Turn };
use crate::store::{ initialize_record_store, StoreError };
use crate::tools::ToolRegistry;
use crate::tools::crm::CrmService;
use crate::tools::intent::IntentDetector;
use crate::tools::knowledge::{ register_knowledge_tools, KnowledgeServices };
use crate::tools::search::{
    AiSearchClient,
    BenefitsSearch,
    BenefitsSearchClient,
    KnowledgeSearch,
    UnconfiguredSearch,
};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("orchestration failed: {0}")]
    Orchestration(String),
}

/// Handles one utterance at a time. Holds no per-call state; every call's
/// transcript is loaded from and written back to the record store.
pub struct CallAgent {
    history: ChatHistoryService,
    kernel: Kernel,
    prompt_config: Arc<PromptConfig>,
}

impl CallAgent {
    pub fn new(history: ChatHistoryService, kernel: Kernel, prompt_config: Arc<PromptConfig>) -> Self {
        Self {
            history,
            kernel,
            prompt_config,
        }
    }

    fn initialize_chat_client(args: &Args) -> Result<Arc<dyn ChatClient>, Box<dyn Error + Send + Sync>> {
        let chat_llm_type: LlmType = args.chat_llm_type.parse()?;
        let chat_config = LlmConfig {
            llm_type: chat_llm_type,
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone(),
            deployment: args.chat_deployment.clone(),
            api_version: Some(args.chat_api_version.clone()),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, URL={}",
            args.chat_llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().unwrap_or_else(|| "adapter default".to_string())
        );
        Ok(chat_client)
    }

    fn initialize_tools(
        args: &Args,
        chat_client: &Arc<dyn ChatClient>,
        prompt_config: &Arc<PromptConfig>
    ) -> ToolRegistry {
        let knowledge: Arc<dyn KnowledgeSearch> = match &args.search_endpoint {
            Some(endpoint) => Arc::new(AiSearchClient::new(endpoint, &args.search_index, &args.search_api_key)),
            None => {
                warn!("SEARCH_ENDPOINT not set, knowledge search answers 'none found'");
                Arc::new(UnconfiguredSearch)
            }
        };
        let benefits: Arc<dyn BenefitsSearch> = match &args.benefits_endpoint {
            Some(endpoint) => Arc::new(BenefitsSearchClient::new(endpoint, &args.benefits_api_key)),
            None => {
                warn!("BENEFITS_ENDPOINT not set, benefits search answers 'none found'");
                Arc::new(UnconfiguredSearch)
            }
        };

        let services = Arc::new(KnowledgeServices {
            intent: IntentDetector::new(Arc::clone(chat_client), Arc::clone(prompt_config)),
            knowledge,
            benefits,
            crm: CrmService::new(),
        });
        let mut registry = ToolRegistry::new();
        register_knowledge_tools(&mut registry, services);
        info!("Registered {} tools", registry.len());
        registry
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;
        let chat_client = Self::initialize_chat_client(args)?;
        let store = initialize_record_store(args)?;
        let history = ChatHistoryService::new(store, args.db_name.clone(), args.db_container.clone());
        let tools = Self::initialize_tools(args, &chat_client, &prompt_config);
        let kernel = Kernel::new(chat_client, tools, args.max_tool_rounds);

        Ok(Self::new(history, kernel, prompt_config))
    }

    /// Records the utterance in the call's transcript and returns the text for
    /// the advocate.
    pub async fn handle_utterance(&self, req: &UtteranceRequest) -> Result<String, AgentError> {
        // Validated before any store access.
        let speaker: Speaker = req.speaker.parse().map_err(AgentError::InvalidInput)?;
        let key = req.key();

        let mut conversation = match self.history.get_chat_history(&key).await? {
            Some(conversation) => conversation,
            None => {
                info!("Starting new conversation for {}/{}", key.call_agent, key.call_id);
                Conversation::seeded(self.prompt_config.system_instruction.clone())
            }
        };

        match speaker {
            Speaker::Customer => conversation.push(Turn::user(req.utterance.clone())),
            Speaker::Advocate => {
                conversation.push(Turn::assistant(req.utterance.clone()));
                info!("Bypassing AI processing for advocate utterance on {}/{}", key.call_agent, key.call_id);
                return Ok(self.prompt_config.bypass_response.clone());
            }
        }

        let reply = self.kernel.respond(&mut conversation).await.map_err(|e| {
            warn!("Orchestration failed for {}/{}: {}", key.call_agent, key.call_id, e);
            AgentError::Orchestration(e.to_string())
        })?;
        conversation.push(Turn::assistant(reply.clone()));

        self.history.save_chat_history(&key, &conversation).await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::scripted::ScriptedChatClient;
    use crate::models::chat::{ ConversationKey, ToolCall };
    use crate::models::wire::WireRecord;
    use crate::store::{ CollectionHandle, MemoryRecordStore, NamespaceHandle, RecordStore };
    use async_trait::async_trait;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    #[derive(Default)]
    struct CountingStore {
        inner: MemoryRecordStore,
        calls: AtomicUsize,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn ensure_namespace(&self, name: &str) -> Result<NamespaceHandle, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.ensure_namespace(name).await
        }

        async fn ensure_collection(
            &self,
            namespace: &NamespaceHandle,
            name: &str
        ) -> Result<CollectionHandle, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.ensure_collection(namespace, name).await
        }

        async fn read(
            &self,
            collection: &CollectionHandle,
            partition_key: &str,
            record_key: &str
        ) -> Result<Option<WireRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.read(collection, partition_key, record_key).await
        }

        async fn upsert(&self, collection: &CollectionHandle, record: &WireRecord) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.upserts.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert(collection, record).await
        }
    }

    struct StubSearch;

    #[async_trait]
    impl crate::tools::Tool for StubSearch {
        fn definition(&self) -> crate::llm::chat::ToolDefinition {
            crate::llm::chat::ToolDefinition::function(
                "retrieve_kc_response",
                "stub",
                serde_json::json!({"type": "object"})
            )
        }

        async fn invoke(&self, _arguments: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok("kb".to_string())
        }
    }

    struct Fixture {
        store: Arc<CountingStore>,
        chat: Arc<ScriptedChatClient>,
        history: ChatHistoryService,
        agent: CallAgent,
    }

    fn fixture(replies: Vec<Turn>) -> Fixture {
        let store = Arc::new(CountingStore::default());
        let chat = Arc::new(ScriptedChatClient::new(replies));
        let history = ChatHistoryService::new(store.clone(), "calls", "history");
        let prompt_config = Arc::new(PromptConfig::default());
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubSearch));
        let kernel = Kernel::new(chat.clone(), tools, 2);
        let agent = CallAgent::new(history.clone(), kernel, prompt_config);
        Fixture { store, chat, history, agent }
    }

    fn utterance(speaker: &str, text: &str) -> UtteranceRequest {
        UtteranceRequest {
            call_agent: "A1".into(),
            call_id: "C1".into(),
            utterance: text.into(),
            speaker: speaker.into(),
        }
    }

    #[tokio::test]
    async fn first_customer_utterance_seeds_and_persists_three_turns() {
        let f = fixture(vec![Turn::assistant("User question: How much would a CGM cost?")]);

        let reply = f.agent.handle_utterance(&utterance("customer", "How much would a CGM cost?")).await.unwrap();

        assert_eq!(reply, "User question: How much would a CGM cost?");
        let sent = &f.chat.requests.lock().unwrap()[0].0;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].content.as_deref(), Some(PromptConfig::default().system_instruction.as_str()));

        let stored = f.history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();
        assert_eq!(
            stored.turns(),
            &[
                Turn::system(PromptConfig::default().system_instruction),
                Turn::user("How much would a CGM cost?"),
                Turn::assistant("User question: How much would a CGM cost?"),
            ]
        );
        assert_eq!(f.store.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn later_utterances_extend_the_stored_transcript() {
        let f = fixture(vec![Turn::assistant("first"), Turn::assistant("second")]);

        f.agent.handle_utterance(&utterance("customer", "q1")).await.unwrap();
        f.agent.handle_utterance(&utterance(" Customer ", "q2")).await.unwrap();

        let stored = f.history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(stored.last(), Some(&Turn::assistant("second")));
        assert_eq!(stored.turns().iter().filter(|t| matches!(t, Turn::System { .. })).count(), 1);
    }

    #[tokio::test]
    async fn tool_exchange_is_persisted_with_reply() {
        let f = fixture(
            vec![
                Turn::AssistantToolCalls { calls: vec![ToolCall::new("t1", "retrieve_kc_response", "{}")] },
                Turn::assistant("answer")
            ]
        );

        f.agent.handle_utterance(&utterance("customer", "q")).await.unwrap();

        let stored = f.history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();
        assert_eq!(
            stored.turns()[3],
            Turn::tool_result("t1", Some("retrieve_kc_response".into()), "kb")
        );
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn advocate_utterance_bypasses_orchestration_and_persistence() {
        let f = fixture(Vec::new());

        let reply = f.agent.handle_utterance(&utterance("Advocate", "Let me check that")).await.unwrap();

        assert_eq!(reply, "No questions found");
        assert_eq!(f.chat.request_count(), 0);
        assert_eq!(f.store.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_speaker_touches_nothing() {
        let f = fixture(Vec::new());

        let err = f.agent.handle_utterance(&utterance("supervisor", "hello")).await.unwrap_err();

        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert_eq!(f.store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.chat.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_orchestration_leaves_record_unchanged() {
        let f = fixture(vec![Turn::assistant("first")]);
        f.agent.handle_utterance(&utterance("customer", "q1")).await.unwrap();

        let err = f.agent.handle_utterance(&utterance("customer", "q2")).await.unwrap_err();

        assert!(matches!(err, AgentError::Orchestration(_)));
        let stored = f.history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();
        assert_eq!(stored.len(), 3);
    }
}
