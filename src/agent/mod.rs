//! Agent module - the routing and answering half of the pipeline.
//!
//! This module contains:
//! - Message, decision and audit types
//! - LLM gateway trait and implementations
//! - The router that classifies each turn
//! - The specialized agents that run tools and phrase replies
//! - A static catalog describing every agent
//!
//! # Adding a New LLM Provider
//!
//! See [`llm::ProviderRegistry`] for instructions.

mod context;
mod message;
mod router;
mod specialist;

pub mod catalog;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use context::{AgentContext, HistoryEntry};
pub use llm::{GatewayError, LlmGateway, ProviderRegistry};
pub use message::{
    AgentKind, AgentResponse, AgentType, Role, RouterDecision, ToolCall, ToolOutcome, ToolPlanStep,
};
pub use router::Router;
pub use specialist::{extract_entity, Entity, Specialists};
