//! Message and decision types shared across the pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::tools::ToolName;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specialized agents a message can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Support,
    Order,
    Billing,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Support, AgentKind::Order, AgentKind::Billing];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Support => "support",
            AgentKind::Order => "order",
            AgentKind::Billing => "billing",
        }
    }

    /// The tool partition owned by this agent.
    pub fn tools(&self) -> &'static [ToolName] {
        match self {
            AgentKind::Support => &[ToolName::QueryConversationHistory],
            AgentKind::Order => &[ToolName::FetchOrderDetails, ToolName::CheckDeliveryStatus],
            AgentKind::Billing => &[ToolName::GetInvoiceDetails, ToolName::CheckRefundStatus],
        }
    }

    pub fn owns(&self, tool: ToolName) -> bool {
        tool.agent() == *self
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support" => Ok(AgentKind::Support),
            "order" => Ok(AgentKind::Order),
            "billing" => Ok(AgentKind::Billing),
            other => Err(Error::InvalidInput(format!("Unknown agent: {other}"))),
        }
    }
}

/// Every pipeline stage that writes an audit row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Router,
    Support,
    Order,
    Billing,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Router,
        AgentType::Support,
        AgentType::Order,
        AgentType::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Router => "router",
            AgentType::Support => "support",
            AgentType::Order => "order",
            AgentType::Billing => "billing",
        }
    }

    /// The specialist behind this stage; `None` for the router.
    pub fn kind(&self) -> Option<AgentKind> {
        match self {
            AgentType::Router => None,
            AgentType::Support => Some(AgentKind::Support),
            AgentType::Order => Some(AgentKind::Order),
            AgentType::Billing => Some(AgentKind::Billing),
        }
    }
}

impl From<AgentKind> for AgentType {
    fn from(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Support => AgentType::Support,
            AgentKind::Order => AgentType::Order,
            AgentKind::Billing => AgentType::Billing,
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "router" => Ok(AgentType::Router),
            other => other.parse::<AgentKind>().map(AgentType::from),
        }
    }
}

/// One step of the router's advisory tool plan.
///
/// The tool name is kept as the model returned it; agents decide what it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPlanStep {
    pub tool_name: String,
    pub reasoning: String,
}

/// Classification produced by the router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterDecision {
    pub intent: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub selected_agent: AgentKind,
    pub tool_plan: Vec<ToolPlanStep>,
}

/// Outcome of a tool call: exactly one of result or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Result(Value),
    Error(String),
}

/// Audit record of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool_name: ToolName,
    /// Raw input as handed to the executor, recorded even on failure.
    pub input: Value,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolCall {
    pub fn succeeded(tool_name: ToolName, input: Value, result: Value) -> Self {
        Self {
            tool_name,
            input,
            outcome: ToolOutcome::Result(result),
        }
    }

    pub fn failed(tool_name: ToolName, input: Value, error: impl Into<String>) -> Self {
        Self {
            tool_name,
            input,
            outcome: ToolOutcome::Error(error.into()),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ToolOutcome::Result(value) => Some(value),
            ToolOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Result(_) => None,
            ToolOutcome::Error(message) => Some(message),
        }
    }

    /// One-line rendering used as generation context.
    pub fn summary_line(&self) -> String {
        let detail = match &self.outcome {
            ToolOutcome::Result(value) => value.to_string(),
            ToolOutcome::Error(message) => message.clone(),
        };
        format!("{}: {}", self.tool_name, detail)
    }
}

/// Terminal output of a specialized agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_kind_round_trips_through_str() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), kind);
        }
        assert!("sales".parse::<AgentKind>().is_err());
        assert_eq!("router".parse::<AgentType>().unwrap(), AgentType::Router);
    }

    #[test]
    fn test_tool_call_serializes_exactly_one_outcome() {
        let ok = ToolCall::succeeded(ToolName::FetchOrderDetails, json!({"orderNumber": "A10001"}), Value::Null);
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["toolName"], "fetchOrderDetails");
        assert!(value.get("result").is_some());
        assert!(value.get("error").is_none());

        let failed = ToolCall::failed(ToolName::CheckRefundStatus, json!({}), "boom");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["error"], "boom");
        assert!(value.get("result").is_none());
        assert_eq!(failed.result(), None);
        assert_eq!(failed.error(), Some("boom"));
    }

    #[test]
    fn test_summary_line() {
        let call = ToolCall::succeeded(
            ToolName::CheckDeliveryStatus,
            json!({"orderNumber": "A10001"}),
            json!({"status": "IN_TRANSIT"}),
        );
        assert_eq!(call.summary_line(), r#"checkDeliveryStatus: {"status":"IN_TRANSIT"}"#);

        let failed = ToolCall::failed(ToolName::GetInvoiceDetails, json!({}), "missing invoiceNumber");
        assert_eq!(failed.summary_line(), "getInvoiceDetails: missing invoiceNumber");
    }

    #[test]
    fn test_partitions_are_owned_by_their_agent() {
        for kind in AgentKind::ALL {
            for tool in kind.tools() {
                assert!(kind.owns(*tool));
            }
        }
        assert!(!AgentKind::Support.owns(ToolName::FetchOrderDetails));
    }
}
