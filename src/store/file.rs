//! File-backed store - JSON snapshot rewritten after every write

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::memory::{InMemoryStore, StoreState};
use super::records::*;
use super::Store;
use crate::agent::Role;
use crate::Result;

/// Store persisted as a single JSON document.
///
/// Reads are served from memory. Writes are serialized: each one is applied
/// to a copy of the state, written to disk, and only then made visible. A
/// failed write leaves both memory and the file as they were.
pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };

        Ok(Self {
            path,
            inner: InMemoryStore::with_state(state),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace all contents and persist.
    pub async fn reset(&self, state: StoreState) -> Result<()> {
        self.commit(|next| {
            *next = state;
            Ok(())
        })
        .await
    }

    /// Apply `change` to a copy of the state, persist it, then publish it.
    async fn commit<T>(&self, change: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().await;

        let mut next = self.inner.snapshot().await;
        let value = change(&mut next)?;
        self.persist(&next).await?;
        self.inner.replace(next).await;
        Ok(value)
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(state)?;

        // Write-then-rename keeps the previous snapshot intact on a failed write.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Persisted store snapshot to {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn upsert_user(&self, user: UserUpsert) -> Result<User> {
        self.commit(|state| Ok(state.upsert_user(user))).await
    }

    async fn create_conversation(&self, user_id: &str, title: Option<String>) -> Result<Conversation> {
        self.commit(|state| Ok(state.create_conversation(user_id, title))).await
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        self.inner.list_conversations(user_id).await
    }

    async fn conversation_with_messages(&self, id: &str) -> Result<Option<ConversationWithMessages>> {
        self.inner.conversation_with_messages(id).await
    }

    async fn touch_conversation(&self, id: &str) -> Result<()> {
        self.commit(|state| state.touch_conversation(id)).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool> {
        if self.inner.conversation_with_messages(id).await?.is_none() {
            return Ok(false);
        }
        self.commit(|state| Ok(state.delete_conversation(id))).await
    }

    async fn append_message(&self, conversation_id: &str, role: Role, content: &str) -> Result<StoredMessage> {
        self.commit(|state| state.append_message(conversation_id, role, content))
            .await
    }

    async fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        self.inner.recent_messages(conversation_id, limit).await
    }

    async fn recent_messages_for_user(
        &self,
        user_id: &str,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        self.inner
            .recent_messages_for_user(user_id, conversation_id, limit)
            .await
    }

    async fn find_order_for_user(&self, user_id: &str, order_number: &str) -> Result<Option<OrderWithDelivery>> {
        self.inner.find_order_for_user(user_id, order_number).await
    }

    async fn find_invoice_for_user(&self, user_id: &str, invoice_number: &str) -> Result<Option<InvoiceWithPayment>> {
        self.inner.find_invoice_for_user(user_id, invoice_number).await
    }

    async fn refunds_for_payment(&self, payment_id: &str) -> Result<Vec<Refund>> {
        self.inner.refunds_for_payment(payment_id).await
    }

    async fn record_agent_run(&self, run: NewAgentRun) -> Result<AgentRun> {
        self.commit(|state| state.record_agent_run(run)).await
    }

    async fn agent_runs(&self, conversation_id: &str) -> Result<Vec<AgentRun>> {
        self.inner.agent_runs(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let conversation_id = {
            let store = FileStore::open(&path).await.unwrap();
            let conv = store.create_conversation("u1", Some("Saved".into())).await.unwrap();
            store.append_message(&conv.id, Role::User, "persist me").await.unwrap();
            conv.id
        };

        let reopened = FileStore::open(&path).await.unwrap();
        let conv = reopened
            .conversation_with_messages(&conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.conversation.title.as_deref(), Some("Saved"));
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].content, "persist me");
    }

    #[tokio::test]
    async fn test_file_store_starts_empty_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).await.unwrap();
        assert!(store.list_conversations("u1").await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = std::sync::Arc::new(FileStore::open(&path).await.unwrap());
        let conv = store.create_conversation("u1", None).await.unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                let conversation_id = conv.id.clone();
                tokio::spawn(async move {
                    store
                        .append_message(&conversation_id, Role::User, &format!("m{i}"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let in_memory = store.conversation_with_messages(&conv.id).await.unwrap().unwrap();
        assert_eq!(in_memory.messages.len(), 64);

        let reopened = FileStore::open(&path).await.unwrap();
        let on_disk = reopened.conversation_with_messages(&conv.id).await.unwrap().unwrap();
        assert_eq!(on_disk.messages.len(), 64);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = FileStore::open(blocker.join("store.json")).await.unwrap();
        assert!(store.create_conversation("u1", None).await.is_err());
        assert!(store.list_conversations("u1").await.unwrap().is_empty());
    }
}
