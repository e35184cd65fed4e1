//! Specialized agents - support, order and billing
//!
//! Every agent follows the same shape: pull its entity out of the raw
//! message, run the planned tools of its own partition, then ask the
//! gateway to phrase a reply from the tool outputs. The router's plan is
//! advisory; steps naming foreign or unknown tools are skipped.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::context::AgentContext;
use super::llm::{GenerateRequest, LlmGateway};
use super::message::{AgentKind, AgentResponse, ToolCall, ToolPlanStep};
use crate::tools::{ToolName, ToolRunner};

static ORDER_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]\d{5})\b").expect("order number pattern is valid"));

static INVOICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(INV-\d{5})\b").expect("invoice number pattern is valid"));

/// Identifier an agent needs before its tools can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    OrderNumber(String),
    InvoiceNumber(String),
}

impl Entity {
    fn tool_input(&self) -> Value {
        match self {
            Entity::OrderNumber(number) => json!({ "orderNumber": number }),
            Entity::InvoiceNumber(number) => json!({ "invoiceNumber": number }),
        }
    }
}

/// Extract the entity `kind` works with. Support needs none.
pub fn extract_entity(kind: AgentKind, message: &str) -> Option<Entity> {
    match kind {
        AgentKind::Support => None,
        AgentKind::Order => first_capture(&ORDER_NUMBER, message).map(Entity::OrderNumber),
        AgentKind::Billing => first_capture(&INVOICE_NUMBER, message).map(Entity::InvoiceNumber),
    }
}

fn first_capture(pattern: &Regex, message: &str) -> Option<String> {
    pattern
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fixed per-agent prompting parameters
struct Persona {
    system: &'static str,
    closing: &'static str,
    temperature: f32,
    apology: &'static str,
}

fn persona(kind: AgentKind) -> Persona {
    match kind {
        AgentKind::Support => Persona {
            system: "You are a customer support agent. Use the tool results to answer the user's question.\n\
                     Be helpful, concise, and professional. If the tools didn't return useful data, provide general guidance.",
            closing: "Provide a helpful response.",
            temperature: 0.7,
            apology: "I encountered an error processing your request. Please try again.",
        },
        AgentKind::Order => Persona {
            system: "You are an order management agent. Use the tool results to provide order status and tracking information.\n\
                     Be specific about order details. If no order was found, ask the user to confirm the order number.",
            closing: "Provide a helpful response about the order.",
            temperature: 0.5,
            apology: "I encountered an error fetching order information. Please try again.",
        },
        AgentKind::Billing => Persona {
            system: "You are a billing support agent. Use the tool results to provide invoice and payment information.\n\
                     Be clear about amounts, statuses, and payment details. If no invoice was found, ask the user to confirm the invoice number.",
            closing: "Provide a helpful response about billing.",
            temperature: 0.5,
            apology: "I encountered an error fetching billing information. Please try again.",
        },
    }
}

/// The three specialized agents, sharing one tool runner and one gateway
pub struct Specialists {
    gateway: Arc<dyn LlmGateway>,
    tools: ToolRunner,
}

impl Specialists {
    pub fn new(gateway: Arc<dyn LlmGateway>, tools: ToolRunner) -> Self {
        Self { gateway, tools }
    }

    pub fn tools(&self) -> &ToolRunner {
        &self.tools
    }

    /// Model used to phrase replies.
    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    /// Run agent `kind` for this turn. Never fails; a generation failure
    /// yields the agent's apology with the tool calls made so far.
    pub async fn run(&self, kind: AgentKind, ctx: &AgentContext, plan: &[ToolPlanStep]) -> AgentResponse {
        let tool_calls = self.run_tools(kind, ctx, plan).await;
        let persona = persona(kind);

        let request = GenerateRequest {
            system: persona.system.to_string(),
            prompt: Self::build_prompt(ctx, &tool_calls, persona.closing),
            temperature: persona.temperature,
        };

        let content = match self.gateway.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(agent = %kind, conversation_id = %ctx.conversation_id, "Reply generation failed: {}", e);
                persona.apology.to_string()
            }
        };

        info!(
            agent = %kind,
            conversation_id = %ctx.conversation_id,
            tool_calls = tool_calls.len(),
            "Agent finished"
        );

        AgentResponse { content, tool_calls }
    }

    async fn run_tools(&self, kind: AgentKind, ctx: &AgentContext, plan: &[ToolPlanStep]) -> Vec<ToolCall> {
        let input = match kind {
            AgentKind::Support => Some(json!({})),
            AgentKind::Order | AgentKind::Billing => {
                extract_entity(kind, &ctx.message).map(|entity| entity.tool_input())
            }
        };

        let mut calls = Vec::new();
        for step in plan {
            let Ok(tool) = step.tool_name.parse::<ToolName>() else {
                debug!(agent = %kind, "Skipping unknown tool {}", step.tool_name);
                continue;
            };
            if !kind.owns(tool) {
                debug!(agent = %kind, "Skipping {} outside this partition", tool);
                continue;
            }
            let Some(input) = &input else {
                debug!(agent = %kind, "Skipping {}: no entity in message", tool);
                continue;
            };

            calls.push(self.tools.execute(tool, input.clone(), ctx).await);
        }
        calls
    }

    fn build_prompt(ctx: &AgentContext, tool_calls: &[ToolCall], closing: &str) -> String {
        let summary = tool_calls
            .iter()
            .map(ToolCall::summary_line)
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "User message: {}\n\nTool results:\n{}\n\n{}",
            ctx.message, summary, closing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeGateway, GatewayError};
    use crate::store::{seed, InMemoryStore};

    fn step(tool: &str) -> ToolPlanStep {
        ToolPlanStep {
            tool_name: tool.to_string(),
            reasoning: "test".to_string(),
        }
    }

    fn specialists(gateway: Arc<FakeGateway>) -> Specialists {
        let store = Arc::new(InMemoryStore::with_state(seed::demo_state()));
        Specialists::new(gateway, ToolRunner::new(store))
    }

    #[test]
    fn test_extract_order_number() {
        assert_eq!(
            extract_entity(AgentKind::Order, "My order A12345 hasn't arrived"),
            Some(Entity::OrderNumber("A12345".into()))
        );
        assert_eq!(extract_entity(AgentKind::Order, "order a12345 please"), None);
        assert_eq!(extract_entity(AgentKind::Order, "order XA123456"), None);
    }

    #[test]
    fn test_extract_invoice_number() {
        assert_eq!(
            extract_entity(AgentKind::Billing, "Where's my invoice INV-00042"),
            Some(Entity::InvoiceNumber("INV-00042".into()))
        );
        assert_eq!(extract_entity(AgentKind::Billing, "Where's my invoice?"), None);
    }

    #[test]
    fn test_support_needs_no_entity() {
        assert_eq!(extract_entity(AgentKind::Support, "A12345 INV-00042"), None);
    }

    #[tokio::test]
    async fn test_order_agent_runs_planned_tools_in_order() {
        let gateway = Arc::new(FakeGateway::new().with_generation("Your order is on its way."));
        let agents = specialists(gateway.clone());
        let ctx = AgentContext::test("Where is my order A10001?");

        let response = agents
            .run(
                AgentKind::Order,
                &ctx,
                &[step("checkDeliveryStatus"), step("fetchOrderDetails")],
            )
            .await;

        assert_eq!(response.content, "Your order is on its way.");
        let names: Vec<ToolName> = response.tool_calls.iter().map(|c| c.tool_name).collect();
        assert_eq!(names, vec![ToolName::CheckDeliveryStatus, ToolName::FetchOrderDetails]);
        assert_eq!(response.tool_calls[0].input, json!({"orderNumber": "A10001"}));

        let request = &gateway.generate_requests()[0];
        assert_eq!(request.temperature, 0.5);
        assert!(request.prompt.starts_with("User message: Where is my order A10001?"));
        assert!(request.prompt.contains("checkDeliveryStatus: {"));
        assert!(request.prompt.ends_with("Provide a helpful response about the order."));
    }

    #[tokio::test]
    async fn test_missing_entity_skips_tools() {
        let gateway = Arc::new(FakeGateway::new().with_generation("Which order?"));
        let agents = specialists(gateway);
        let ctx = AgentContext::test("Where is my order?");

        let response = agents
            .run(AgentKind::Order, &ctx, &[step("fetchOrderDetails")])
            .await;

        assert!(response.tool_calls.is_empty());
        assert_eq!(response.content, "Which order?");
    }

    #[tokio::test]
    async fn test_foreign_and_unknown_tools_are_ignored() {
        let gateway = Arc::new(FakeGateway::new().with_generation("Here is your invoice."));
        let agents = specialists(gateway);
        let ctx = AgentContext::test("Invoice INV-10001 and order A10001");

        let response = agents
            .run(
                AgentKind::Billing,
                &ctx,
                &[
                    step("fetchOrderDetails"),
                    step("launchRockets"),
                    step("getInvoiceDetails"),
                ],
            )
            .await;

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].tool_name, ToolName::GetInvoiceDetails);
        assert_eq!(response.tool_calls[0].result().unwrap()["status"], "PAID");
    }

    #[tokio::test]
    async fn test_support_agent_uses_default_limit() {
        let gateway = Arc::new(FakeGateway::new().with_generation("Happy to help."));
        let agents = specialists(gateway.clone());
        let ctx = AgentContext::test("I need help");

        let response = agents
            .run(AgentKind::Support, &ctx, &[step("queryConversationHistory")])
            .await;

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].input, json!({}));
        assert!(response.tool_calls[0].error().is_none());
        assert_eq!(gateway.generate_requests()[0].temperature, 0.7);
    }

    #[tokio::test]
    async fn test_generation_failure_returns_apology_with_tool_calls() {
        let gateway = Arc::new(FakeGateway::new().with_generation_error(GatewayError::EmptyResponse));
        let agents = specialists(gateway);
        let ctx = AgentContext::test("Refund for INV-10001?");

        let response = agents
            .run(AgentKind::Billing, &ctx, &[step("checkRefundStatus")])
            .await;

        assert_eq!(
            response.content,
            "I encountered an error fetching billing information. Please try again."
        );
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].tool_name, ToolName::CheckRefundStatus);
    }
}
