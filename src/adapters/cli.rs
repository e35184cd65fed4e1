//! CLI adapter - interactive and single-message command line interface.
//!
//! Keeps track of the current conversation so consecutive messages share
//! history; `/new` starts a fresh one.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::Mutex;

use super::Channel;
use crate::chat::{ChatService, IncomingMessage, IncomingMessageReply};
use crate::ui;
use crate::Result;

/// What the REPL should do with one line of input
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Exit,
    NewConversation,
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let input = line.trim();
    if input.is_empty() {
        return Input::Skip;
    }
    match input.to_lowercase().as_str() {
        "exit" | "quit" | "q" => Input::Exit,
        "/new" => Input::NewConversation,
        _ => Input::Message(input),
    }
}

/// CLI channel for interactive chat sessions.
pub struct CliChannel {
    chat: Arc<ChatService>,
    user_id: Option<String>,
    conversation_id: Mutex<Option<String>>,
}

impl CliChannel {
    /// Create a new CLI channel.
    pub fn new(chat: Arc<ChatService>, user_id: Option<String>, conversation_id: Option<String>) -> Self {
        Self {
            chat,
            user_id,
            conversation_id: Mutex::new(conversation_id),
        }
    }

    /// Send a single message within the current conversation.
    pub async fn run_once(&self, message: &str) -> Result<IncomingMessageReply> {
        let mut current = self.conversation_id.lock().await;

        let mut incoming = IncomingMessage::new(message);
        incoming.conversation_id = current.clone();
        incoming.user_id = self.user_id.clone();

        let reply = self.chat.handle_incoming_message(incoming).await?;
        *current = Some(reply.conversation_id.clone());
        Ok(reply)
    }

    /// Conversation the next message goes to, if any.
    pub async fn conversation_id(&self) -> Option<String> {
        self.conversation_id.lock().await.clone()
    }

    /// Forget the current conversation.
    pub async fn new_conversation(&self) {
        *self.conversation_id.lock().await = None;
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            // Print prompt
            print!("\n{} ", "You:".blue().bold());
            stdout.flush()?;

            // Read input
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            match parse_input(&line) {
                Input::Skip => continue,
                Input::Exit => {
                    println!("👋 Bye!");
                    break;
                }
                Input::NewConversation => {
                    self.new_conversation().await;
                    ui::print_step("Started a new conversation.");
                }
                Input::Message(text) => match self.run_once(text).await {
                    Ok(reply) => ui::print_reply(&reply),
                    Err(e) => ui::print_error(&e.to_string()),
                },
            }
        }

        Ok(())
    }
}

impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<()> {
        self.run_interactive().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeGateway;
    use crate::store::{seed, InMemoryStore};

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   \n"), Input::Skip);
        assert_eq!(parse_input("QUIT\n"), Input::Exit);
        assert_eq!(parse_input("/new"), Input::NewConversation);
        assert_eq!(parse_input("  where is A10001?\n"), Input::Message("where is A10001?"));
    }

    #[tokio::test]
    async fn test_consecutive_messages_share_a_conversation() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with_generation("Hello!")
                .with_generation("Still here."),
        );
        let store = Arc::new(InMemoryStore::with_state(seed::demo_state()));
        let chat = Arc::new(ChatService::new(store, gateway.clone(), gateway));
        let channel = CliChannel::new(chat.clone(), None, None);

        let first = channel.run_once("hi").await.unwrap();
        let second = channel.run_once("anyone?").await.unwrap();
        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(channel.conversation_id().await, Some(first.conversation_id.clone()));

        let conversation = chat.get_conversation(&first.conversation_id).await.unwrap();
        assert_eq!(conversation.messages.len(), 4);

        channel.new_conversation().await;
        assert_eq!(channel.conversation_id().await, None);
    }
}
