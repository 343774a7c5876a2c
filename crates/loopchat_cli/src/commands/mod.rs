//! CLI command definitions.
//!
//! This module defines the command structure for the loopchat CLI and the
//! shared helpers for opening a controller and rendering turns.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use loopchat_core::{ChatController, FileStore, Turn, WidgetConfig};

pub mod chat;
pub mod conversations;
pub mod history;
pub mod send;

/// loopchat - chat bubble for a remote FAQ bot
#[derive(Parser)]
#[command(name = "loopchat")]
#[command(version, about = "loopchat - chat bubble for a remote FAQ bot")]
#[command(long_about = r#"
loopchat keeps a local conversation history and forwards your messages to a
remote bot endpoint, showing its replies and quick-reply buttons.

COMMANDS:
  chat           → Interactive chat window (toggle with /open and /close)
  send           → Send one message and print the reply
  history        → Print the stored transcript
  conversations  → Start, select, delete or list conversations

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub widget: WidgetOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct WidgetOptions {
    /// Directory holding the conversation slots
    #[arg(long, global = true, default_value = ".loopchat")]
    pub store: PathBuf,

    /// Bot endpoint (defaults to the URL configured at build time)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

impl WidgetOptions {
    pub fn config(&self) -> WidgetConfig {
        match &self.endpoint {
            Some(endpoint) => WidgetConfig::new(endpoint.clone()),
            None => WidgetConfig::from_build_env(),
        }
    }

    /// Open a controller over the on-disk store
    pub fn open(&self) -> anyhow::Result<Arc<ChatController>> {
        let config = self.config();
        config.validate()?;
        let store = Arc::new(FileStore::new(&self.store));
        Ok(Arc::new(ChatController::with_http(config, store)))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive chat window
    Chat(chat::ChatArgs),

    /// Send a single message and print the reply
    Send(send::SendArgs),

    /// Print the stored conversation history
    History(history::HistoryArgs),

    /// Manage conversations
    Conversations(conversations::ConversationsArgs),
}

/// Render one turn, with numbered quick replies under bot turns
pub fn render_turn(turn: &Turn) -> String {
    match turn {
        Turn::User { text } => format!("you: {}", text),
        Turn::Bot { text, buttons } => {
            let mut out = format!("bot: {}", text);
            for (i, button) in buttons.iter().enumerate() {
                out.push_str(&format!("\n     [{}] {}", i + 1, button.title));
            }
            out
        }
    }
}

pub fn render_transcript(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "What can I help with?".to_string();
    }
    turns.iter().map(render_turn).collect::<Vec<_>>().join("\n")
}
