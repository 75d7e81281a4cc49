pub mod codec;

use log::{ debug, info };
use std::sync::Arc;

use crate::models::chat::{ Conversation, ConversationKey };
use crate::models::wire::WireRecord;
use crate::store::{ CollectionHandle, RecordStore, StoreError };

/// Loads and saves call transcripts through a [`RecordStore`].
///
/// The database and collection are provisioned on every operation; no handle is
/// cached between requests.
#[derive(Clone)]
pub struct ChatHistoryService {
    store: Arc<dyn RecordStore>,
    db_name: String,
    container_name: String,
}

impl ChatHistoryService {
    pub fn new(store: Arc<dyn RecordStore>, db_name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            store,
            db_name: db_name.into(),
            container_name: container_name.into(),
        }
    }

    async fn collection(&self) -> Result<CollectionHandle, StoreError> {
        let db = self.store.ensure_namespace(&self.db_name).await?;
        self.store.ensure_collection(&db, &self.container_name).await
    }

    /// Rebuilds the stored transcript, or `None` for the first utterance of a call.
    pub async fn get_chat_history(&self, key: &ConversationKey) -> Result<Option<Conversation>, StoreError> {
        let collection = self.collection().await?;
        let Some(record) = self.store.read(&collection, &key.call_agent, &key.call_id).await? else {
            debug!("No stored conversation for {}/{}", key.call_agent, key.call_id);
            return Ok(None);
        };

        let decoded = codec::decode_entries(&record.chat);
        if !decoded.issues.is_empty() {
            info!(
                "Conversation {}/{} rebuilt with {} skipped or degraded entries",
                key.call_agent,
                key.call_id,
                decoded.issues.len()
            );
        }
        Ok(Some(decoded.into_conversation()))
    }

    pub async fn save_chat_history(&self, key: &ConversationKey, conversation: &Conversation) -> Result<(), StoreError> {
        let collection = self.collection().await?;
        let record = WireRecord::new(key, &codec::encode(conversation))?;
        self.store.upsert(&collection, &record).await?;
        debug!("Saved {} turns for {}/{}", conversation.len(), key.call_agent, key.call_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{ ToolCall, Turn };
    use crate::store::MemoryRecordStore;
    use serde_json::json;

    fn service() -> (Arc<MemoryRecordStore>, ChatHistoryService) {
        let store = Arc::new(MemoryRecordStore::new());
        let history = ChatHistoryService::new(store.clone(), "calls", "history");
        (store, history)
    }

    #[tokio::test]
    async fn missing_conversation_is_none() {
        let (_, history) = service();
        let loaded = history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn saved_conversation_is_rebuilt() {
        let (_, history) = service();
        let key = ConversationKey::new("A1", "C1");
        let mut conversation = Conversation::seeded("observe");
        conversation.push(Turn::user("q"));
        conversation.push(Turn::AssistantToolCalls { calls: vec![ToolCall::new("t1", "retrieve_kc_response", "{}")] });
        conversation.push(Turn::tool_result("t1", Some("retrieve_kc_response".into()), "r"));
        conversation.push(Turn::assistant("a"));

        history.save_chat_history(&key, &conversation).await.unwrap();
        let loaded = history.get_chat_history(&key).await.unwrap();

        assert_eq!(loaded, Some(conversation));
    }

    #[tokio::test]
    async fn persisted_document_wraps_chat_with_keys() {
        let (store, history) = service();
        let key = ConversationKey::new("A1", "C1");
        let mut conversation = Conversation::seeded("observe");
        conversation.push(Turn::user("q"));

        history.save_chat_history(&key, &conversation).await.unwrap();

        let ns = store.ensure_namespace("calls").await.unwrap();
        let coll = store.ensure_collection(&ns, "history").await.unwrap();
        let record = store.read(&coll, "A1", "C1").await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "partition_key": "A1",
                "id": "C1",
                "chat": [
                    {"role": "system", "content": "observe"},
                    {"role": "user", "content": "q"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn corrupt_entries_are_skipped_on_load() {
        let (store, history) = service();
        let ns = store.ensure_namespace("calls").await.unwrap();
        let coll = store.ensure_collection(&ns, "history").await.unwrap();
        store
            .upsert(
                &coll,
                &(WireRecord {
                    partition_key: "A1".into(),
                    id: "C1".into(),
                    chat: vec![
                        json!({"role": "system", "content": "s"}),
                        json!({"role": "narrator", "content": "?"}),
                        json!({"role": "user", "content": "u"})
                    ],
                })
            ).await
            .unwrap();

        let loaded = history.get_chat_history(&ConversationKey::new("A1", "C1")).await.unwrap().unwrap();

        assert_eq!(loaded.turns(), &[Turn::system("s"), Turn::user("u")]);
    }
}
