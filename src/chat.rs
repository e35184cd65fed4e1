//! Chat service - runs one inbound message through the whole pipeline
//!
//! A turn is strictly sequential: identify the user, resolve the
//! conversation, persist the user message, load history, classify, record
//! the router audit row, dispatch to the selected agent, persist the reply,
//! record the agent audit row and touch the conversation. Gateway problems
//! never fail a turn; persistence problems do.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::agent::{
    AgentContext, AgentKind, AgentResponse, AgentType, HistoryEntry, LlmGateway, ProviderRegistry, Role,
    Router, RouterDecision, Specialists,
};
use crate::config::Config;
use crate::error::Error;
use crate::store::{AgentRun, ConversationSummary, ConversationWithMessages, NewAgentRun, Store, UserUpsert};
use crate::tools::{ToolDefinition, ToolRunner};
use crate::Result;

/// User id assumed when a turn names none.
pub const DEFAULT_USER_ID: &str = "demo-user";

/// Email of the seeded demo user.
pub const DEMO_EMAIL: &str = "demo@acme.com";

const DEMO_USER_NAME: &str = "Demo User";

/// Number of persisted messages handed to the router as history.
const HISTORY_WINDOW: usize = 10;

/// One inbound chat message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    pub message: String,
}

impl IncomingMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn from_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Reject malformed turns before anything is persisted.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }
        if let Some(user_id) = &self.user_id {
            if user_id.trim().is_empty() {
                return Err(Error::InvalidInput("userId must not be empty".to_string()));
            }
        }
        if let Some(conversation_id) = &self.conversation_id {
            Uuid::parse_str(conversation_id)
                .map_err(|_| Error::InvalidInput(format!("invalid conversationId: {conversation_id}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub intent: String,
    pub confidence: f64,
    pub selected_agent: AgentKind,
}

/// Stage durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timings {
    pub router: u64,
    pub agent: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMeta {
    pub router_decision: DecisionSummary,
    /// Number of tool calls the agent made.
    pub tool_calls: usize,
    pub timings: Timings,
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessageReply {
    pub conversation_id: String,
    pub user_id: String,
    pub assistant_message: AssistantMessage,
    pub meta: ReplyMeta,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// The orchestrator: owns the store handle, the router and the agents
pub struct ChatService {
    store: Arc<dyn Store>,
    router: Router,
    specialists: Specialists,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn Store>,
        router_gateway: Arc<dyn LlmGateway>,
        responder_gateway: Arc<dyn LlmGateway>,
    ) -> Self {
        let tools = ToolRunner::new(store.clone());
        Self {
            store,
            router: Router::new(router_gateway),
            specialists: Specialists::new(responder_gateway, tools),
        }
    }

    /// Build gateways for both config sections and wire them to `store`
    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Result<Self> {
        let router_gateway = ProviderRegistry::create(&config.router)?;
        let responder_gateway = ProviderRegistry::create(&config.responder)?;
        Ok(Self::new(store, router_gateway, responder_gateway))
    }

    pub fn router_model(&self) -> &str {
        self.router.model()
    }

    pub fn responder_model(&self) -> &str {
        self.specialists.model()
    }

    /// Tool definitions an agent may call; empty for the router.
    pub fn tool_definitions(&self, agent_type: AgentType) -> Vec<ToolDefinition> {
        agent_type
            .kind()
            .map(|kind| self.specialists.tools().definitions(kind))
            .unwrap_or_default()
    }

    /// Map an absent or `demo-user` id onto the seeded demo user, if any.
    async fn resolve_user_id(&self, requested: Option<&str>) -> Result<String> {
        let requested = requested.map(str::trim).filter(|id| !id.is_empty());
        match requested {
            Some(id) if id != DEFAULT_USER_ID => Ok(id.to_string()),
            _ => {
                let seeded = self.store.find_user_by_email(DEMO_EMAIL).await?;
                Ok(seeded
                    .map(|u| u.id)
                    .unwrap_or_else(|| DEFAULT_USER_ID.to_string()))
            }
        }
    }

    /// Run one turn through the pipeline.
    pub async fn handle_incoming_message(&self, input: IncomingMessage) -> Result<IncomingMessageReply> {
        input.validate()?;
        let start = Instant::now();

        // identify-user
        let user_id = self.resolve_user_id(input.user_id.as_deref()).await?;
        self.store
            .upsert_user(UserUpsert {
                id: user_id.clone(),
                email: (user_id == DEFAULT_USER_ID).then(|| DEMO_EMAIL.to_string()),
                name: Some(DEMO_USER_NAME.to_string()),
            })
            .await?;

        // resolve-conversation
        let conversation_id = match input.conversation_id {
            Some(id) => id,
            None => self.store.create_conversation(&user_id, None).await?.id,
        };

        let user_message = self
            .store
            .append_message(&conversation_id, Role::User, &input.message)
            .await?;

        let history: Vec<HistoryEntry> = self
            .store
            .recent_messages(&conversation_id, HISTORY_WINDOW)
            .await?
            .iter()
            .map(HistoryEntry::from)
            .collect();

        let ctx = AgentContext::new(user_id.clone(), conversation_id.clone(), input.message, history);

        // classify
        let router_start = Instant::now();
        let decision = self.router.classify(&ctx).await;
        let router_ms = elapsed_ms(router_start);

        self.store
            .record_agent_run(Self::router_run(&ctx, &user_message.id, &decision, router_ms))
            .await?;

        // dispatch
        info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            agent = %decision.selected_agent,
            "Running agent"
        );
        let agent_start = Instant::now();
        let response = self
            .specialists
            .run(decision.selected_agent, &ctx, &decision.tool_plan)
            .await;
        let agent_ms = elapsed_ms(agent_start);

        info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            agent = %decision.selected_agent,
            tool_calls = response.tool_calls.len(),
            duration_ms = agent_ms,
            "Agent complete"
        );

        let assistant_message = self
            .store
            .append_message(&conversation_id, Role::Assistant, &response.content)
            .await?;

        self.store
            .record_agent_run(Self::agent_run(&ctx, &assistant_message.id, &decision, &response, agent_ms))
            .await?;

        self.store.touch_conversation(&conversation_id).await?;

        Ok(IncomingMessageReply {
            conversation_id,
            user_id,
            assistant_message: AssistantMessage {
                id: assistant_message.id,
                role: assistant_message.role,
                content: assistant_message.content,
            },
            meta: ReplyMeta {
                router_decision: DecisionSummary {
                    intent: decision.intent,
                    confidence: decision.confidence,
                    selected_agent: decision.selected_agent,
                },
                tool_calls: response.tool_calls.len(),
                timings: Timings {
                    router: router_ms,
                    agent: agent_ms,
                    total: elapsed_ms(start),
                },
            },
        })
    }

    fn router_run(ctx: &AgentContext, message_id: &str, decision: &RouterDecision, router_ms: u64) -> NewAgentRun {
        NewAgentRun {
            conversation_id: ctx.conversation_id.clone(),
            message_id: Some(message_id.to_string()),
            agent_type: AgentType::Router,
            intent: Some(decision.intent.clone()),
            confidence: Some(decision.confidence),
            tool_calls: serde_json::to_value(&decision.tool_plan).ok(),
            tool_results: None,
            timings_ms: Some(json!({ "router": router_ms })),
        }
    }

    fn agent_run(
        ctx: &AgentContext,
        message_id: &str,
        decision: &RouterDecision,
        response: &AgentResponse,
        agent_ms: u64,
    ) -> NewAgentRun {
        let calls: Vec<Value> = response
            .tool_calls
            .iter()
            .map(|c| json!({ "toolName": c.tool_name, "input": c.input }))
            .collect();
        let results: Vec<Value> = response
            .tool_calls
            .iter()
            .map(|c| json!({ "toolName": c.tool_name, "result": c.result(), "error": c.error() }))
            .collect();

        NewAgentRun {
            conversation_id: ctx.conversation_id.clone(),
            message_id: Some(message_id.to_string()),
            agent_type: decision.selected_agent.into(),
            intent: Some(decision.intent.clone()),
            confidence: Some(decision.confidence),
            tool_calls: Some(Value::Array(calls)),
            tool_results: Some(Value::Array(results)),
            timings_ms: Some(json!({ "agent": agent_ms })),
        }
    }

    /// Conversations of a user, most recently updated first
    pub async fn list_conversations(&self, user_id: Option<&str>) -> Result<Vec<ConversationSummary>> {
        let user_id = self.resolve_user_id(user_id).await?;
        self.store.list_conversations(&user_id).await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<ConversationWithMessages> {
        self.store
            .conversation_with_messages(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation {id}")))
    }

    /// Delete a conversation with its messages and audit rows
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        if self.store.delete_conversation(id).await? {
            info!(conversation_id = %id, "Conversation deleted");
            Ok(())
        } else {
            Err(Error::NotFound(format!("conversation {id}")))
        }
    }

    /// Audit trail of a conversation
    pub async fn agent_runs(&self, conversation_id: &str) -> Result<Vec<AgentRun>> {
        self.store.agent_runs(conversation_id).await
    }
}
