//! Store module - persistence collaborator for the chat pipeline
//!
//! The pipeline only depends on the [`Store`] trait. Two implementations ship
//! with the crate:
//! - [`InMemoryStore`]: a `RwLock`-guarded state, used in tests and as the
//!   backing state of the file store
//! - [`FileStore`]: a JSON snapshot on disk, rewritten after every write

mod file;
mod memory;
mod records;
pub mod seed;

pub use file::FileStore;
pub use memory::{InMemoryStore, StoreState};
pub use records::*;

use async_trait::async_trait;

use crate::agent::Role;
use crate::Result;

/// Store trait - interface for everything the pipeline persists or reads
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create the user, or update the provided fields of an existing one.
    async fn upsert_user(&self, user: UserUpsert) -> Result<User>;

    async fn create_conversation(&self, user_id: &str, title: Option<String>)
        -> Result<Conversation>;

    /// Conversations of a user, most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>>;

    async fn conversation_with_messages(&self, id: &str)
        -> Result<Option<ConversationWithMessages>>;

    /// Bump `updated_at` to now.
    async fn touch_conversation(&self, id: &str) -> Result<()>;

    /// Delete a conversation with its messages and audit rows.
    /// Returns `false` if the conversation did not exist.
    async fn delete_conversation(&self, id: &str) -> Result<bool>;

    /// Append a message. Fails with `NotFound` for an unknown conversation.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage>;

    /// The `limit` most recent messages, returned in chronological order.
    async fn recent_messages(&self, conversation_id: &str, limit: usize)
        -> Result<Vec<StoredMessage>>;

    /// Same as [`Store::recent_messages`], but empty unless the conversation
    /// belongs to `user_id`.
    async fn recent_messages_for_user(
        &self,
        user_id: &str,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>>;

    async fn find_order_for_user(
        &self,
        user_id: &str,
        order_number: &str,
    ) -> Result<Option<OrderWithDelivery>>;

    /// Invoices are owned through their order.
    async fn find_invoice_for_user(
        &self,
        user_id: &str,
        invoice_number: &str,
    ) -> Result<Option<InvoiceWithPayment>>;

    /// Refunds of a payment, most recent first.
    async fn refunds_for_payment(&self, payment_id: &str) -> Result<Vec<Refund>>;

    async fn record_agent_run(&self, run: NewAgentRun) -> Result<AgentRun>;

    /// Audit rows of a conversation in insertion order.
    async fn agent_runs(&self, conversation_id: &str) -> Result<Vec<AgentRun>>;
}
