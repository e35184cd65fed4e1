//! Switchboard - multi-agent customer support pipeline
//!
//! This library routes each inbound chat message through an LLM router to
//! one of three specialized agents (support, order, billing), runs that
//! agent's user-scoped tools, and keeps an append-only audit trail of every
//! decision.

pub mod agent;
pub mod chat;
pub mod tools;
pub mod store;
pub mod adapters;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
