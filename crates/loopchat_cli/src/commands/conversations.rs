//! Conversations command - Start, select, delete or list conversations.

use anyhow::Result;
use clap::{Args, Subcommand};
use loopchat_core::{ChatController, ChatError};

use super::WidgetOptions;

#[derive(Args)]
pub struct ConversationsArgs {
    #[command(subcommand)]
    action: ConversationAction,
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations
    List,
    /// Start a new, empty conversation and select it
    New,
    /// Select conversation <n> (1-based)
    Select { n: usize },
    /// Delete conversation <n> (1-based)
    Delete { n: usize },
}

pub async fn execute(args: ConversationsArgs, widget: &WidgetOptions) -> Result<()> {
    let controller = widget.open()?;

    match args.action {
        ConversationAction::List => {}
        ConversationAction::New => {
            let index = controller.new_conversation();
            println!("✅ Started conversation {}", index + 1);
        }
        ConversationAction::Select { n } => {
            controller.select_conversation(to_index(n)?)?;
            println!("✅ Selected conversation {}", n);
        }
        ConversationAction::Delete { n } => {
            controller.delete_conversation(to_index(n)?)?;
            println!("🗑️  Deleted conversation {}", n);
        }
    }

    println!("{}", render_list(&controller));
    Ok(())
}

/// Conversations are numbered from 1 on the command line
fn to_index(n: usize) -> Result<usize, ChatError> {
    n.checked_sub(1)
        .ok_or_else(|| ChatError::Validation("conversations are numbered from 1".to_string()))
}

/// One line per conversation, selected one marked
pub fn render_list(controller: &ChatController) -> String {
    let selected = controller.active_index();
    let metadata = controller.metadata();

    controller
        .conversations()
        .iter()
        .enumerate()
        .map(|(i, conversation)| {
            let marker = if i == selected { "*" } else { " " };
            let id = metadata
                .get(i)
                .map(|m| format!(" (id {})", m.conversation_id))
                .unwrap_or_default();
            let preview = conversation
                .turns()
                .last()
                .map(|t| t.text().chars().take(40).collect::<String>())
                .unwrap_or_else(|| "(empty)".to_string());
            format!("{} {}{}: {} turns, last: {}", marker, i + 1, id, conversation.len(), preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use loopchat_core::{FileStore, MockResponder, WidgetConfig};
    use tempfile::tempdir;

    #[test]
    fn test_render_list_marks_selection() {
        let temp = tempdir().unwrap();
        let controller = ChatController::new(
            WidgetConfig::new("http://bot.test/chat"),
            Arc::new(FileStore::new(temp.path())),
            Arc::new(MockResponder::new()),
        );
        controller.new_conversation();

        let list = render_list(&controller);
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1 (id 1): 1 turns"));
        assert!(lines[1].starts_with("* 2 (id 2): 0 turns, last: (empty)"));
    }
}
