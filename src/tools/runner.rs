//! Tool runner - validates and executes tools, capturing every outcome

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::billing::{InvoiceDetailsTool, RefundStatusTool};
use super::order::{DeliveryStatusTool, OrderDetailsTool};
use super::support::ConversationHistoryTool;
use super::{Tool, ToolName};
use crate::agent::{AgentContext, AgentKind, ToolCall};
use crate::store::Store;

/// Tool definition for prompts and the agent catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner holds one instance of every tool and executes them by name
pub struct ToolRunner {
    history: ConversationHistoryTool,
    order_details: OrderDetailsTool,
    delivery_status: DeliveryStatusTool,
    invoice_details: InvoiceDetailsTool,
    refund_status: RefundStatusTool,
}

impl ToolRunner {
    /// Create a runner whose tools read from `store`
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            history: ConversationHistoryTool::new(store.clone()),
            order_details: OrderDetailsTool::new(store.clone()),
            delivery_status: DeliveryStatusTool::new(store.clone()),
            invoice_details: InvoiceDetailsTool::new(store.clone()),
            refund_status: RefundStatusTool::new(store),
        }
    }

    /// Run one tool invocation.
    ///
    /// Never fails: validation errors, execution errors and unserializable
    /// output all end up in the returned call's `error`.
    pub async fn run<T: Tool>(tool: &T, raw_input: Value, ctx: &AgentContext) -> ToolCall {
        let name = tool.name();
        debug!("Executing tool: {} with args: {}", name, raw_input);

        let input = match tool.validate(&raw_input) {
            Ok(input) => input,
            Err(e) => {
                debug!("Tool {} rejected input: {}", name, e);
                return ToolCall::failed(name, raw_input, e.to_string());
            }
        };

        let output = match tool.execute(input, ctx).await {
            Ok(output) => output,
            Err(e) => {
                debug!("Tool {} failed: {}", name, e);
                return ToolCall::failed(name, raw_input, e.to_string());
            }
        };

        match serde_json::to_value(output) {
            Ok(result) => {
                debug!("Tool {} succeeded", name);
                ToolCall::succeeded(name, raw_input, result)
            }
            Err(e) => ToolCall::failed(name, raw_input, e.to_string()),
        }
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: ToolName, raw_input: Value, ctx: &AgentContext) -> ToolCall {
        match name {
            ToolName::QueryConversationHistory => Self::run(&self.history, raw_input, ctx).await,
            ToolName::FetchOrderDetails => Self::run(&self.order_details, raw_input, ctx).await,
            ToolName::CheckDeliveryStatus => Self::run(&self.delivery_status, raw_input, ctx).await,
            ToolName::GetInvoiceDetails => Self::run(&self.invoice_details, raw_input, ctx).await,
            ToolName::CheckRefundStatus => Self::run(&self.refund_status, raw_input, ctx).await,
        }
    }

    pub fn definition(&self, name: ToolName) -> ToolDefinition {
        match name {
            ToolName::QueryConversationHistory => self.history.to_definition(),
            ToolName::FetchOrderDetails => self.order_details.to_definition(),
            ToolName::CheckDeliveryStatus => self.delivery_status.to_definition(),
            ToolName::GetInvoiceDetails => self.invoice_details.to_definition(),
            ToolName::CheckRefundStatus => self.refund_status.to_definition(),
        }
    }

    /// Definitions of one agent's partition
    pub fn definitions(&self, agent: AgentKind) -> Vec<ToolDefinition> {
        agent.tools().iter().map(|name| self.definition(*name)).collect()
    }
}
