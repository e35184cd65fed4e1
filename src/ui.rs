use colored::*;
use terminal_size::{Width, Height, terminal_size};

use crate::agent::{AgentType, Role};
use crate::chat::IncomingMessageReply;
use crate::store::{AgentRun, ConversationSummary, StoredMessage};
use crate::tools::ToolDefinition;

fn rule() -> String {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    "─".repeat(width.0 as usize)
}

pub fn print_header(subtitle: &str) {
    let line = rule();
    println!("{}", line.black().bold());

    let name = "Switchboard".cyan().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);
    println!("  {}", subtitle.cyan());

    println!("{}", line.black().bold());
}

/// Banner for chat sessions: which models route and which answer
pub fn print_chat_header(router_model: &str, responder_model: &str) {
    print_header(&format!("router: {}  •  responder: {}", router_model, responder_model));
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

fn agent_label(agent: AgentType) -> ColoredString {
    match agent {
        AgentType::Router => agent.as_str().magenta(),
        AgentType::Support => agent.as_str().green(),
        AgentType::Order => agent.as_str().blue(),
        AgentType::Billing => agent.as_str().yellow(),
    }
}

/// Assistant reply followed by a dim routing line
pub fn print_reply(reply: &IncomingMessageReply) {
    let decision = &reply.meta.router_decision;
    let timings = &reply.meta.timings;

    println!("\n{}: {}", "Agent".green().bold(), reply.assistant_message.content);
    println!(
        "  {} {} {} ({:.2}) • {} tool call(s) • router {}ms • agent {}ms • total {}ms",
        "∴".magenta(),
        agent_label(decision.selected_agent.into()),
        decision.intent.black().bold(),
        decision.confidence,
        reply.meta.tool_calls,
        timings.router,
        timings.agent,
        timings.total
    );
}

pub fn print_conversations(conversations: &[ConversationSummary]) {
    if conversations.is_empty() {
        print_step("No conversations yet.");
        return;
    }

    for c in conversations {
        let title = c.title.as_deref().unwrap_or("(untitled)");
        let preview = c.last_message_preview.as_deref().unwrap_or("");
        println!(
            "  {}  {}  {}",
            c.id.black().bold(),
            title.cyan(),
            c.updated_at.format("%Y-%m-%d %H:%M")
        );
        if !preview.is_empty() {
            println!("      {}", preview);
        }
    }
}

pub fn print_messages(messages: &[StoredMessage]) {
    for m in messages {
        let who = match m.role {
            Role::User => "You".blue().bold(),
            Role::Assistant => "Agent".green().bold(),
        };
        println!("  {} {}: {}", m.created_at.format("%H:%M:%S").to_string().black().bold(), who, m.content);
    }
}

pub fn print_agent_runs(runs: &[AgentRun]) {
    println!("\n{}", "Audit trail".bold());
    for run in runs {
        let confidence = run
            .confidence
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());
        let intent = run.intent.as_deref().unwrap_or("-");
        let timings = run
            .timings_ms
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default();
        println!(
            "  {} {} intent={} confidence={} {}",
            run.created_at.format("%H:%M:%S").to_string().black().bold(),
            agent_label(run.agent_type),
            intent,
            confidence,
            timings.black().bold()
        );
        if let Some(results) = run.tool_results.as_ref().and_then(|r| r.as_array()) {
            for result in results {
                let name = result["toolName"].as_str().unwrap_or("?");
                match result["error"].as_str() {
                    Some(error) => println!("      {} {}: {}", "✗".red(), name, error.red()),
                    None => println!("      {} {}: {}", "✓".green(), name, result["result"]),
                }
            }
        }
    }
}

pub fn print_tool_definitions(tools: &[ToolDefinition]) {
    println!("\n{}", "Tools".bold());
    for tool in tools {
        println!("  {} {}", tool.name.as_str().cyan().bold(), tool.description);
        if let Some(properties) = tool.parameters["properties"].as_object() {
            for (name, schema) in properties {
                let kind = schema["type"].as_str().unwrap_or("any");
                let about = schema["description"].as_str().unwrap_or("");
                println!("      {} ({}) {}", name, kind.black().bold(), about);
            }
        }
    }
}
