//! Persisted record shapes.
//!
//! These mirror the fields the pipeline reads and writes; nothing more.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentType, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Minimal user upsert. Fields left as `None` are not touched on update.
#[derive(Debug, Clone, Default)]
pub struct UserUpsert {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Conversation listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Chronological.
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub order_number: String,
    pub status: String,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub order_id: String,
    pub carrier: String,
    pub tracking_code: String,
    pub status: String,
    pub estimated_date: Option<DateTime<Utc>>,
}

/// An order joined with its delivery record.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithDelivery {
    pub order: Order,
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub order_id: String,
    pub number: String,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub invoice_id: Option<String>,
    pub provider: String,
    pub status: String,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: String,
    pub payment_id: String,
    pub status: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// An invoice joined with its payment, if one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceWithPayment {
    pub invoice: Invoice,
    pub payment: Option<Payment>,
}

/// Audit row for one pipeline stage. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub id: String,
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub agent_type: AgentType,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub timings_ms: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Audit row before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgentRun {
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub agent_type: AgentType,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub timings_ms: Option<Value>,
}
