//! Adapters module - chat front ends.
//!
//! Each adapter feeds user input into [`crate::chat::ChatService`] and
//! renders its replies. Adapters implement the [`Channel`] trait for
//! uniform handling.
//!
//! # Supported Channels
//!
//! - **CLI** - Interactive command line interface
//!
//! # Adding a New Channel
//!
//! 1. Create a new file (e.g., `http.rs`)
//! 2. Implement the [`Channel`] trait
//! 3. Wire it up in `main.rs`

pub mod cli;

pub use cli::CliChannel;

/// Channel trait for chat adapters.
///
/// All channel implementations must be [`Send`] + [`Sync`] for async compatibility.
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "cli").
    fn name(&self) -> &str;

    /// Start listening for messages; returns when the user leaves.
    fn start(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;
}
