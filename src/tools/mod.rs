//! Tools module - read-only capabilities the specialized agents can invoke
//!
//! The tool set is closed: every tool is a [`ToolName`] variant, owned by
//! exactly one agent partition. Lookups are always scoped to the requesting
//! user, and "not found" is a typed empty result rather than an error.

mod billing;
mod order;
mod runner;
mod support;

pub use billing::{InvoiceDetailsTool, RefundStatusTool};
pub use order::{DeliveryStatusTool, OrderDetailsTool};
pub use runner::{ToolDefinition, ToolRunner};
pub use support::ConversationHistoryTool;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentContext, AgentKind};
use crate::error::Error;
use crate::Result;

/// Names of every tool known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    QueryConversationHistory,
    FetchOrderDetails,
    CheckDeliveryStatus,
    GetInvoiceDetails,
    CheckRefundStatus,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::QueryConversationHistory,
        ToolName::FetchOrderDetails,
        ToolName::CheckDeliveryStatus,
        ToolName::GetInvoiceDetails,
        ToolName::CheckRefundStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::QueryConversationHistory => "queryConversationHistory",
            ToolName::FetchOrderDetails => "fetchOrderDetails",
            ToolName::CheckDeliveryStatus => "checkDeliveryStatus",
            ToolName::GetInvoiceDetails => "getInvoiceDetails",
            ToolName::CheckRefundStatus => "checkRefundStatus",
        }
    }

    /// The agent whose partition contains this tool.
    pub fn agent(&self) -> AgentKind {
        match self {
            ToolName::QueryConversationHistory => AgentKind::Support,
            ToolName::FetchOrderDetails | ToolName::CheckDeliveryStatus => AgentKind::Order,
            ToolName::GetInvoiceDetails | ToolName::CheckRefundStatus => AgentKind::Billing,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {s}")))
    }
}

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Validated input.
    type Input: Send;

    /// Structured output, serialized into the audit record.
    type Output: Serialize + Send;

    fn name(&self) -> ToolName;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Check raw input against the tool's schema.
    fn validate(&self, raw: &Value) -> Result<Self::Input>;

    /// Execute with validated input, on behalf of `ctx.user_id`.
    async fn execute(&self, input: Self::Input, ctx: &AgentContext) -> Result<Self::Output>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Deserialize raw tool input, reporting failures as validation errors.
fn parse_input<T: DeserializeOwned>(tool: ToolName, raw: &Value) -> Result<T> {
    T::deserialize(raw).map_err(|e| Error::Validation(format!("{tool}: {e}")))
}

/// Reject empty or whitespace-only identifiers.
fn require_non_empty(tool: ToolName, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{tool}: '{field}' must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_names_parse_and_serialize_alike() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
            assert_eq!(serde_json::to_value(tool).unwrap(), json!(tool.as_str()));
        }
        assert!("deleteEverything".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_every_tool_belongs_to_its_agent_partition() {
        for tool in ToolName::ALL {
            assert!(tool.agent().tools().contains(&tool));
        }
    }
}
