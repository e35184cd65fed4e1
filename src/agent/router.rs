//! Router - classifies a message and picks the agent that handles it

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::context::AgentContext;
use super::llm::{ClassifyRequest, GatewayError, LlmGateway};
use super::message::{AgentKind, RouterDecision, ToolPlanStep};
use crate::tools::ToolName;

const ROUTER_TEMPERATURE: f32 = 0.3;

const ROUTER_SYSTEM_PROMPT: &str = r#"You are a router agent. Analyze the user's message and recent conversation history to determine:
1. The user's intent (e.g., "track_order", "billing_inquiry", "general_support")
2. Your confidence in this classification (0-1)
3. Which specialized agent should handle this: support, order, or billing
4. Which tools that agent should use

Agent capabilities:
- support: queryConversationHistory (for FAQs, troubleshooting, general questions)
- order: fetchOrderDetails, checkDeliveryStatus (for order tracking, modifications)
- billing: getInvoiceDetails, checkRefundStatus (for payments, refunds, invoices)

Extract any entities like order numbers, invoice numbers from the message."#;

/// Router turns a message plus history into a [`RouterDecision`]
pub struct Router {
    gateway: Arc<dyn LlmGateway>,
}

impl Router {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Model used for classification.
    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    /// Decision used whenever classification fails.
    pub fn fallback_decision() -> RouterDecision {
        RouterDecision {
            intent: "unknown".to_string(),
            confidence: 0.1,
            selected_agent: AgentKind::Support,
            tool_plan: vec![ToolPlanStep {
                tool_name: ToolName::QueryConversationHistory.to_string(),
                reasoning: "fallback due to error".to_string(),
            }],
        }
    }

    /// Classify the turn. Never fails; gateway problems yield
    /// [`Router::fallback_decision`].
    pub async fn classify(&self, ctx: &AgentContext) -> RouterDecision {
        let request = ClassifyRequest {
            system: ROUTER_SYSTEM_PROMPT.to_string(),
            prompt: Self::build_prompt(ctx),
            schema: Self::decision_schema(),
            temperature: ROUTER_TEMPERATURE,
        };

        match self.request_decision(&request).await {
            Ok(decision) => {
                let plan: Vec<&str> = decision.tool_plan.iter().map(|s| s.tool_name.as_str()).collect();
                info!(
                    conversation_id = %ctx.conversation_id,
                    user_id = %ctx.user_id,
                    intent = %decision.intent,
                    confidence = decision.confidence,
                    selected_agent = %decision.selected_agent,
                    tool_plan = ?plan,
                    "Router decision"
                );
                decision
            }
            Err(e) => {
                warn!(conversation_id = %ctx.conversation_id, "Router classification failed: {}", e);
                Self::fallback_decision()
            }
        }
    }

    async fn request_decision(&self, request: &ClassifyRequest) -> Result<RouterDecision, GatewayError> {
        let value = self.gateway.classify(request).await?;
        Self::parse_decision(value)
    }

    /// Decode the model output. A shape mismatch, including an agent outside
    /// the enum, counts as a gateway failure.
    fn parse_decision(value: Value) -> Result<RouterDecision, GatewayError> {
        let mut decision: RouterDecision =
            serde_json::from_value(value).map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if !decision.confidence.is_finite() {
            return Err(GatewayError::Malformed("confidence is not a number".to_string()));
        }
        decision.confidence = decision.confidence.clamp(0.0, 1.0);
        Ok(decision)
    }

    fn build_prompt(ctx: &AgentContext) -> String {
        format!(
            "Recent conversation:\n{}\n\nCurrent message: {}\n\nClassify this request and suggest a tool plan.",
            ctx.transcript(),
            ctx.message
        )
    }

    fn decision_schema() -> Value {
        let agents: Vec<&str> = AgentKind::ALL.iter().map(|a| a.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "description": "The user intent classification"
                },
                "confidence": {
                    "type": "number",
                    "description": "Confidence score between 0 and 1 for the classification"
                },
                "selectedAgent": {
                    "type": "string",
                    "enum": agents,
                    "description": "The specialized agent to handle this request"
                },
                "toolPlan": {
                    "type": "array",
                    "description": "List of tools the selected agent should use",
                    "items": {
                        "type": "object",
                        "properties": {
                            "toolName": {"type": "string"},
                            "reasoning": {"type": "string"}
                        },
                        "required": ["toolName", "reasoning"]
                    }
                }
            },
            "required": ["intent", "confidence", "selectedAgent", "toolPlan"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::context::HistoryEntry;
    use crate::agent::llm::FakeGateway;
    use crate::agent::message::Role;

    fn decision_json(agent: &str, confidence: f64) -> Value {
        json!({
            "intent": "track_order",
            "confidence": confidence,
            "selectedAgent": agent,
            "toolPlan": [
                {"toolName": "fetchOrderDetails", "reasoning": "order number given"},
                {"toolName": "checkDeliveryStatus", "reasoning": "user asks where it is"}
            ]
        })
    }

    async fn classify_with(gateway: FakeGateway) -> RouterDecision {
        let router = Router::new(Arc::new(gateway));
        router.classify(&AgentContext::test("Where is A10001?")).await
    }

    #[tokio::test]
    async fn test_classify_returns_model_decision() {
        let decision = classify_with(FakeGateway::new().with_classification(decision_json("order", 0.92))).await;

        assert_eq!(decision.intent, "track_order");
        assert_eq!(decision.selected_agent, AgentKind::Order);
        assert_eq!(decision.tool_plan.len(), 2);
        assert_eq!(decision.tool_plan[0].tool_name, "fetchOrderDetails");
        assert!((decision.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_confidence_is_clamped() {
        let high = classify_with(FakeGateway::new().with_classification(decision_json("order", 5.0))).await;
        assert_eq!(high.confidence, 1.0);
        assert_eq!(high.selected_agent, AgentKind::Order);

        let low = classify_with(FakeGateway::new().with_classification(decision_json("billing", -5.0))).await;
        assert_eq!(low.confidence, 0.0);
        assert_eq!(low.selected_agent, AgentKind::Billing);
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back() {
        let decision = classify_with(
            FakeGateway::new().with_classification_error(GatewayError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
        )
        .await;
        assert_eq!(decision, Router::fallback_decision());
        assert_eq!(decision.intent, "unknown");
        assert_eq!(decision.confidence, 0.1);
        assert_eq!(decision.tool_plan[0].tool_name, "queryConversationHistory");
        assert_eq!(decision.tool_plan[0].reasoning, "fallback due to error");
    }

    #[tokio::test]
    async fn test_unknown_agent_falls_back() {
        let decision = classify_with(FakeGateway::new().with_classification(decision_json("sales", 0.9))).await;
        assert_eq!(decision, Router::fallback_decision());
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back() {
        let decision = classify_with(FakeGateway::new().with_classification(json!({"intent": "x"}))).await;
        assert_eq!(decision, Router::fallback_decision());
    }

    #[tokio::test]
    async fn test_prompt_carries_history_and_message() {
        let gateway = Arc::new(FakeGateway::new().with_classification(decision_json("support", 0.5)));
        let router = Router::new(gateway.clone());
        let ctx = AgentContext::new(
            "u1",
            "c1",
            "and the refund?",
            vec![
                HistoryEntry { role: Role::User, content: "I was charged twice".into() },
                HistoryEntry { role: Role::Assistant, content: "Let me check".into() },
            ],
        );

        router.classify(&ctx).await;

        let request = &gateway.classify_requests()[0];
        assert!(request
            .prompt
            .contains("Recent conversation:\nuser: I was charged twice\nassistant: Let me check\n"));
        assert!(request.prompt.contains("Current message: and the refund?"));
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.schema["properties"]["selectedAgent"]["enum"], json!(["support", "order", "billing"]));
        assert!(request.system.contains("billing: getInvoiceDetails, checkRefundStatus"));
    }

    #[test]
    fn test_prompt_with_empty_history() {
        let prompt = Router::build_prompt(&AgentContext::test("hello"));
        assert!(prompt.starts_with("Recent conversation:\n\n\nCurrent message: hello"));
    }
}
