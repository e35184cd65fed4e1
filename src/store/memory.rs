//! In-memory store

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::records::*;
use super::Store;
use crate::agent::Role;
use crate::error::Error;
use crate::Result;

/// Every table of the store. Vectors keep insertion order, which is also
/// chronological order for messages and audit rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreState {
    pub users: Vec<User>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<StoredMessage>,
    pub orders: Vec<Order>,
    pub deliveries: Vec<Delivery>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub refunds: Vec<Refund>,
    pub agent_runs: Vec<AgentRun>,
}

impl StoreState {
    fn conversation_mut(&mut self, id: &str) -> Result<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("conversation {id}")))
    }

    fn has_conversation(&self, id: &str) -> bool {
        self.conversations.iter().any(|c| c.id == id)
    }

    pub(super) fn upsert_user(&mut self, upsert: UserUpsert) -> User {
        if let Some(existing) = self.users.iter_mut().find(|u| u.id == upsert.id) {
            if upsert.email.is_some() {
                existing.email = upsert.email;
            }
            if upsert.name.is_some() {
                existing.name = upsert.name;
            }
            return existing.clone();
        }

        let user = User {
            id: upsert.id,
            email: upsert.email,
            name: upsert.name,
        };
        self.users.push(user.clone());
        user
    }

    pub(super) fn create_conversation(&mut self, user_id: &str, title: Option<String>) -> Conversation {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
        };
        self.conversations.push(conversation.clone());
        conversation
    }

    pub(super) fn append_message(&mut self, conversation_id: &str, role: Role, content: &str) -> Result<StoredMessage> {
        if !self.has_conversation(conversation_id) {
            return Err(Error::NotFound(format!("conversation {conversation_id}")));
        }

        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    pub(super) fn touch_conversation(&mut self, id: &str) -> Result<()> {
        self.conversation_mut(id)?.updated_at = Utc::now();
        Ok(())
    }

    pub(super) fn delete_conversation(&mut self, id: &str) -> bool {
        if !self.has_conversation(id) {
            return false;
        }

        self.conversations.retain(|c| c.id != id);
        self.messages.retain(|m| m.conversation_id != id);
        self.agent_runs.retain(|r| r.conversation_id != id);
        true
    }

    pub(super) fn record_agent_run(&mut self, run: NewAgentRun) -> Result<AgentRun> {
        if !self.has_conversation(&run.conversation_id) {
            return Err(Error::NotFound(format!("conversation {}", run.conversation_id)));
        }

        let row = AgentRun {
            id: Uuid::new_v4().to_string(),
            conversation_id: run.conversation_id,
            message_id: run.message_id,
            agent_type: run.agent_type,
            intent: run.intent,
            confidence: run.confidence,
            tool_calls: run.tool_calls,
            tool_results: run.tool_results,
            timings_ms: run.timings_ms,
            created_at: Utc::now(),
        };
        self.agent_runs.push(row.clone());
        Ok(row)
    }

    fn recent_messages(&self, conversation_id: &str, limit: usize) -> Vec<StoredMessage> {
        let mut recent: Vec<StoredMessage> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.conversation_id == conversation_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// Add an order, and its delivery when given. Used by seeding and tests.
    pub fn insert_order(&mut self, order: Order, delivery: Option<Delivery>) {
        self.orders.push(order);
        if let Some(delivery) = delivery {
            self.deliveries.push(delivery);
        }
    }

    pub fn insert_invoice(&mut self, invoice: Invoice) {
        self.invoices.push(invoice);
    }

    pub fn insert_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    pub fn insert_refund(&mut self, refund: Refund) {
        self.refunds.push(refund);
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Clone of the full state, for snapshotting.
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Replace the full state.
    pub async fn replace(&self, state: StoreState) {
        *self.state.write().await = state;
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn upsert_user(&self, user: UserUpsert) -> Result<User> {
        let mut state = self.state.write().await;
        Ok(state.upsert_user(user))
    }

    async fn create_conversation(&self, user_id: &str, title: Option<String>) -> Result<Conversation> {
        let mut state = self.state.write().await;
        Ok(state.create_conversation(user_id, title))
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let state = self.state.read().await;

        // Newest-inserted first so that equal timestamps still list recent work on top.
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
                last_message_preview: state
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.conversation_id == c.id)
                    .map(|m| m.content.clone()),
            })
            .collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn conversation_with_messages(&self, id: &str) -> Result<Option<ConversationWithMessages>> {
        let state = self.state.read().await;
        let Some(conversation) = state.conversations.iter().find(|c| c.id == id) else {
            return Ok(None);
        };

        let messages = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == id)
            .cloned()
            .collect();

        Ok(Some(ConversationWithMessages {
            conversation: conversation.clone(),
            messages,
        }))
    }

    async fn touch_conversation(&self, id: &str) -> Result<()> {
        self.state.write().await.touch_conversation(id)
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool> {
        Ok(self.state.write().await.delete_conversation(id))
    }

    async fn append_message(&self, conversation_id: &str, role: Role, content: &str) -> Result<StoredMessage> {
        let mut state = self.state.write().await;
        state.append_message(conversation_id, role, content)
    }

    async fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        Ok(self.state.read().await.recent_messages(conversation_id, limit))
    }

    async fn recent_messages_for_user(
        &self,
        user_id: &str,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        let state = self.state.read().await;
        let owned = state
            .conversations
            .iter()
            .any(|c| c.id == conversation_id && c.user_id == user_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(state.recent_messages(conversation_id, limit))
    }

    async fn find_order_for_user(&self, user_id: &str, order_number: &str) -> Result<Option<OrderWithDelivery>> {
        let state = self.state.read().await;
        let Some(order) = state
            .orders
            .iter()
            .find(|o| o.user_id == user_id && o.order_number == order_number)
        else {
            return Ok(None);
        };

        let delivery = state.deliveries.iter().find(|d| d.order_id == order.id).cloned();
        Ok(Some(OrderWithDelivery {
            order: order.clone(),
            delivery,
        }))
    }

    async fn find_invoice_for_user(&self, user_id: &str, invoice_number: &str) -> Result<Option<InvoiceWithPayment>> {
        let state = self.state.read().await;
        let owned = |invoice: &Invoice| {
            state
                .orders
                .iter()
                .any(|o| o.id == invoice.order_id && o.user_id == user_id)
        };

        let Some(invoice) = state
            .invoices
            .iter()
            .find(|i| i.number == invoice_number && owned(i))
        else {
            return Ok(None);
        };

        let payment = state
            .payments
            .iter()
            .find(|p| p.invoice_id.as_deref() == Some(invoice.id.as_str()))
            .cloned();

        Ok(Some(InvoiceWithPayment {
            invoice: invoice.clone(),
            payment,
        }))
    }

    async fn refunds_for_payment(&self, payment_id: &str) -> Result<Vec<Refund>> {
        let state = self.state.read().await;
        let mut refunds: Vec<Refund> = state
            .refunds
            .iter()
            .rev()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect();
        refunds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(refunds)
    }

    async fn record_agent_run(&self, run: NewAgentRun) -> Result<AgentRun> {
        self.state.write().await.record_agent_run(run)
    }

    async fn agent_runs(&self, conversation_id: &str) -> Result<Vec<AgentRun>> {
        let state = self.state.read().await;
        Ok(state
            .agent_runs
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_recent_messages_are_chronological_and_limited() {
        let store = InMemoryStore::new();
        let conv = store.create_conversation("u1", None).await.unwrap();
        for i in 0..5 {
            store.append_message(&conv.id, Role::User, &format!("m{i}")).await.unwrap();
        }

        let recent = store.recent_messages(&conv.id, 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_recent_messages_for_user_requires_ownership() {
        let store = InMemoryStore::new();
        let conv = store.create_conversation("alice", None).await.unwrap();
        store.append_message(&conv.id, Role::User, "card ends 4242").await.unwrap();

        assert_eq!(store.recent_messages_for_user("alice", &conv.id, 10).await.unwrap().len(), 1);
        assert!(store.recent_messages_for_user("mallory", &conv.id, 10).await.unwrap().is_empty());
        assert!(store.recent_messages_for_user("alice", "missing", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_to_unknown_conversation_fails() {
        let store = InMemoryStore::new();
        let result = store.append_message("missing", Role::User, "hi").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_conversations_scoped_with_preview() {
        let store = InMemoryStore::new();
        let mine = store.create_conversation("u1", Some("Mine".into())).await.unwrap();
        store.create_conversation("u2", None).await.unwrap();
        let empty = store.create_conversation("u1", None).await.unwrap();
        store.append_message(&mine.id, Role::User, "first").await.unwrap();
        store.append_message(&mine.id, Role::Assistant, "latest").await.unwrap();

        let listed = store.list_conversations("u1").await.unwrap();
        assert_eq!(listed.len(), 2);

        let mine_summary = listed.iter().find(|c| c.id == mine.id).unwrap();
        assert_eq!(mine_summary.last_message_preview.as_deref(), Some("latest"));
        let empty_summary = listed.iter().find(|c| c.id == empty.id).unwrap();
        assert!(empty_summary.last_message_preview.is_none());
    }

    #[tokio::test]
    async fn test_list_conversations_most_recently_updated_first() {
        let mut state = StoreState::default();
        let old = state.create_conversation("u1", None);
        let new = state.create_conversation("u1", None);
        state.conversations[0].updated_at = Utc::now() + Duration::hours(1);
        let store = InMemoryStore::with_state(state);

        let listed = store.list_conversations("u1").await.unwrap();
        assert_eq!(listed[0].id, old.id);
        assert_eq!(listed[1].id, new.id);
    }

    #[tokio::test]
    async fn test_delete_cascades_messages_and_runs() {
        let store = InMemoryStore::new();
        let conv = store.create_conversation("u1", None).await.unwrap();
        store.append_message(&conv.id, Role::User, "hello").await.unwrap();
        store
            .record_agent_run(NewAgentRun {
                conversation_id: conv.id.clone(),
                message_id: None,
                agent_type: crate::agent::AgentType::Router,
                intent: None,
                confidence: None,
                tool_calls: None,
                tool_results: None,
                timings_ms: None,
            })
            .await
            .unwrap();

        assert!(store.delete_conversation(&conv.id).await.unwrap());
        assert!(!store.delete_conversation(&conv.id).await.unwrap());

        let snapshot = store.snapshot().await;
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.agent_runs.is_empty());
        assert!(store.conversation_with_messages(&conv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_user_keeps_unset_fields() {
        let store = InMemoryStore::new();
        store
            .upsert_user(UserUpsert {
                id: "u1".into(),
                email: Some("a@b.c".into()),
                name: None,
            })
            .await
            .unwrap();

        let user = store
            .upsert_user(UserUpsert {
                id: "u1".into(),
                email: None,
                name: Some("Ann".into()),
            })
            .await
            .unwrap();

        assert_eq!(user.email.as_deref(), Some("a@b.c"));
        assert_eq!(user.name.as_deref(), Some("Ann"));
        assert_eq!(store.find_user_by_email("a@b.c").await.unwrap().unwrap().id, "u1");
    }
}
