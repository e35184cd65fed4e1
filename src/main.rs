//! Switchboard CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use switchboard::adapters::{Channel, CliChannel};
use switchboard::agent::{catalog, AgentType};
use switchboard::chat::ChatService;
use switchboard::config::{self, Config};
use switchboard::store::{seed, FileStore, Store};
use switchboard::ui;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Switchboard - multi-agent customer support pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the router and responder models
    Onboard,

    /// Chat with the support pipeline
    Chat {
        /// Message to send (omit for interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing conversation
        #[arg(short, long)]
        conversation: Option<String>,

        /// User id (defaults to the demo user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// List conversations, most recently updated first
    Conversations {
        /// User id (defaults to the demo user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show a conversation with its audit trail
    Show {
        /// Conversation id
        id: String,
    },

    /// Delete a conversation with its messages and audit rows
    Delete {
        /// Conversation id
        id: String,
    },

    /// List agents, or show what one agent can do
    Agents {
        /// router, support, order or billing
        agent: Option<String>,
    },

    /// Replace the store contents with demo data
    Seed {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show configuration and store status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Setup Global Ctrl+C handler
    let exit_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(0);
        } else {
            println!("\n⚠️  Press Ctrl+C again to exit");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    })
    .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let config = config::onboard()?;
            let store = open_store(&config).await?;
            ui::print_step(&format!("Store ready at {:?}", store.path()));
            ui::print_step("Chat: switchboard chat -m \"Where is my order A10001?\"");
        }

        Commands::Chat {
            message,
            conversation,
            user,
        } => {
            let config = config::load()?;
            warn_missing_credentials(&config);
            let store = Arc::new(open_store(&config).await?);
            let chat = Arc::new(ChatService::from_config(&config, store)?);
            let channel = CliChannel::new(chat.clone(), user, conversation);

            if let Some(msg) = message {
                // Single message mode
                let reply = channel.run_once(&msg).await?;
                ui::print_reply(&reply);
                ui::print_step(&format!("conversation: {}", reply.conversation_id));
            } else {
                // Interactive mode
                ui::print_chat_header(chat.router_model(), chat.responder_model());
                ui::print_step("Type a message, /new for a new conversation, exit to quit.");
                channel.start().await?;
            }
        }

        Commands::Conversations { user } => {
            let chat = open_chat().await?;
            let conversations = chat.list_conversations(user.as_deref()).await?;
            ui::print_conversations(&conversations);
        }

        Commands::Show { id } => {
            let chat = open_chat().await?;
            let conversation = chat.get_conversation(&id).await?;
            let title = conversation.conversation.title.as_deref().unwrap_or("(untitled)");
            ui::print_header(&format!("{}  •  {}", title, conversation.conversation.id));
            ui::print_messages(&conversation.messages);

            let runs = chat.agent_runs(&id).await?;
            if !runs.is_empty() {
                ui::print_agent_runs(&runs);
            }
        }

        Commands::Delete { id } => {
            let chat = open_chat().await?;
            chat.delete_conversation(&id).await?;
            ui::print_success(&format!("Deleted conversation {}", id));
        }

        Commands::Agents { agent } => match agent {
            Some(name) => {
                let agent_type: AgentType = name.parse()?;
                let caps = catalog::capabilities(agent_type);
                println!("{}", serde_json::to_string_pretty(&caps)?);

                let tools = open_chat().await?.tool_definitions(agent_type);
                if !tools.is_empty() {
                    ui::print_tool_definitions(&tools);
                }
            }
            None => {
                for info in catalog::list_agents() {
                    println!("  {:<8} {}", info.agent_type.as_str(), info.name);
                }
            }
        },

        Commands::Seed { yes } => {
            let config = config::load()?;
            if !yes && config.store_path.exists() {
                let confirmed = inquire::Confirm::new("Replace all conversations and orders with demo data?")
                    .with_default(false)
                    .prompt()?;
                if !confirmed {
                    ui::print_step("Seed cancelled.");
                    return Ok(());
                }
            }
            let store = FileStore::open(&config.store_path).await?;
            store.reset(seed::demo_state()).await?;
            ui::print_success(&format!("Seeded demo data into {:?}", store.path()));
        }

        Commands::Status => {
            let config = config::load()?;
            ui::print_header("Status");

            for (role, section) in [("Router", &config.router), ("Responder", &config.responder)] {
                println!(
                    "{}: {} / {} (API key: {})",
                    role,
                    section.provider,
                    section.model,
                    if section.has_credentials() { "✓" } else { "not set" }
                );
            }

            println!("Config: {:?}", config::config_path());
            println!("Store: {:?}", config.store_path);
            if config.store_path.exists() {
                let store = Arc::new(FileStore::open(&config.store_path).await?);
                let chat = ChatService::from_config(&config, store)?;
                let count = chat.list_conversations(None).await?.len();
                println!("Demo user conversations: {}", count);
            } else {
                println!("Store not created yet (it is seeded on first use)");
            }
        }
    }

    Ok(())
}

/// Open the configured store, seeding demo data on first use.
async fn open_store(config: &Config) -> Result<FileStore> {
    let fresh = !config.store_path.exists();
    let store = FileStore::open(&config.store_path).await?;
    if fresh {
        tracing::info!("Seeding new store at {:?}", config.store_path);
        store.reset(seed::demo_state()).await?;
    }
    Ok(store)
}

async fn open_chat() -> Result<ChatService> {
    let config = config::load()?;
    let store: Arc<dyn Store> = Arc::new(open_store(&config).await?);
    Ok(ChatService::from_config(&config, store)?)
}

fn warn_missing_credentials(config: &Config) {
    if !config.router.has_credentials() {
        ui::print_warning("Router API key not set; every message will use the fallback route.");
    }
    if !config.responder.has_credentials() {
        ui::print_warning("Responder API key not set; replies will be apologies.");
    }
}
