//! Support tools - conversation history

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_input, Tool, ToolName};
use crate::agent::{AgentContext, Role};
use crate::error::Error;
use crate::store::Store;
use crate::Result;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct RawHistoryInput {
    // Models sometimes send `10.0` for an integer.
    limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryInput {
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Recent messages of the current conversation
pub struct ConversationHistoryTool {
    store: Arc<dyn Store>,
}

impl ConversationHistoryTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ConversationHistoryTool {
    type Input = HistoryInput;
    type Output = Vec<HistoryItem>;

    fn name(&self) -> ToolName {
        ToolName::QueryConversationHistory
    }

    fn description(&self) -> &str {
        "Retrieves recent conversation history for context and troubleshooting."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_LIMIT,
                    "default": DEFAULT_LIMIT,
                    "description": "Number of most recent messages to return"
                }
            }
        })
    }

    fn validate(&self, raw: &Value) -> Result<HistoryInput> {
        let input: RawHistoryInput = parse_input(self.name(), raw)?;
        let Some(limit) = input.limit else {
            return Ok(HistoryInput { limit: DEFAULT_LIMIT });
        };

        if limit.fract() != 0.0 || !(1.0..=MAX_LIMIT as f64).contains(&limit) {
            return Err(Error::Validation(format!(
                "{}: 'limit' must be an integer between 1 and {MAX_LIMIT}, got {limit}",
                self.name()
            )));
        }
        Ok(HistoryInput { limit: limit as usize })
    }

    async fn execute(&self, input: HistoryInput, ctx: &AgentContext) -> Result<Vec<HistoryItem>> {
        let messages = self
            .store
            .recent_messages_for_user(&ctx.user_id, &ctx.conversation_id, input.limit)
            .await?;

        Ok(messages
            .into_iter()
            .map(|m| HistoryItem {
                role: m.role,
                content: m.content,
                created_at: m.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_limit_defaults_and_bounds() {
        let tool = ConversationHistoryTool::new(Arc::new(InMemoryStore::new()));

        assert_eq!(tool.validate(&json!({})).unwrap().limit, 10);
        assert_eq!(tool.validate(&json!({"limit": 50})).unwrap().limit, 50);
        assert!(tool.validate(&json!({"limit": 0})).is_err());
        assert!(tool.validate(&json!({"limit": 51})).is_err());
        assert!(tool.validate(&json!({"limit": "ten"})).is_err());
    }

    #[test]
    fn test_integral_float_limit_is_accepted() {
        let tool = ConversationHistoryTool::new(Arc::new(InMemoryStore::new()));

        assert_eq!(tool.validate(&json!({"limit": 10.0})).unwrap().limit, 10);
        assert!(tool.validate(&json!({"limit": 2.5})).is_err());
        assert!(tool.validate(&json!({"limit": 50.5})).is_err());
    }

    #[tokio::test]
    async fn test_returns_recent_messages_of_current_conversation() {
        let store = Arc::new(InMemoryStore::new());
        let conv = store.create_conversation("demo-user", None).await.unwrap();
        let other = store.create_conversation("demo-user", None).await.unwrap();
        store.append_message(&conv.id, Role::User, "one").await.unwrap();
        store.append_message(&other.id, Role::User, "elsewhere").await.unwrap();
        store.append_message(&conv.id, Role::Assistant, "two").await.unwrap();
        store.append_message(&conv.id, Role::User, "three").await.unwrap();

        let tool = ConversationHistoryTool::new(store);
        let ctx = AgentContext::new("demo-user", conv.id.clone(), "help", Vec::new());
        let items = tool.execute(HistoryInput { limit: 2 }, &ctx).await.unwrap();

        let contents: Vec<&str> = items.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
        assert_eq!(items[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_other_users_conversation_yields_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let conv = store.create_conversation("alice", None).await.unwrap();
        store
            .append_message(&conv.id, Role::User, "card ends 4242")
            .await
            .unwrap();

        let tool = ConversationHistoryTool::new(store);
        let ctx = AgentContext::new("mallory", conv.id.clone(), "help", Vec::new());
        let items = tool.execute(HistoryInput { limit: 10 }, &ctx).await.unwrap();

        assert!(items.is_empty());
    }
}
