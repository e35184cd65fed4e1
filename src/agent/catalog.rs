//! Static catalog of the pipeline's agents

use serde::Serialize;

use super::message::{AgentKind, AgentType};
use crate::tools::ToolName;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInfo {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub name: &'static str,
}

/// What an agent does: specialists list their tools, the router its outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCapabilities {
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<&'static str>,
}

fn display_name(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Router => "Router Agent",
        AgentType::Support => "Support Agent",
        AgentType::Order => "Order Agent",
        AgentType::Billing => "Billing Agent",
    }
}

pub fn list_agents() -> Vec<AgentInfo> {
    AgentType::ALL
        .iter()
        .map(|t| AgentInfo {
            agent_type: *t,
            name: display_name(*t),
        })
        .collect()
}

pub fn capabilities(agent_type: AgentType) -> AgentCapabilities {
    let specialist = |kind: AgentKind, description: &'static str| AgentCapabilities {
        description,
        tools: kind.tools().to_vec(),
        outputs: Vec::new(),
    };

    match agent_type {
        AgentType::Router => AgentCapabilities {
            description: "Classifies intent and delegates to specialized agents.",
            tools: Vec::new(),
            outputs: vec!["intent", "confidence", "selectedAgent", "toolPlan"],
        },
        AgentType::Support => specialist(
            AgentKind::Support,
            "General support, FAQs, troubleshooting using conversation history.",
        ),
        AgentType::Order => specialist(
            AgentKind::Order,
            "Order status, tracking, modifications, cancellations.",
        ),
        AgentType::Billing => specialist(AgentKind::Billing, "Payments, refunds, invoices, subscriptions."),
    }
}
