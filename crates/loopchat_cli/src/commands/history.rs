//! History command - Print the stored transcript.

use anyhow::Result;
use clap::Args;

use super::{render_transcript, WidgetOptions};

#[derive(Args)]
pub struct HistoryArgs {
    /// Print every conversation, not just the selected one
    #[arg(short, long)]
    all: bool,

    /// Print raw JSON turns instead of rendered text
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: HistoryArgs, widget: &WidgetOptions) -> Result<()> {
    let controller = widget.open()?;

    let selected = controller.active_index();
    let indices: Vec<usize> = if args.all {
        (0..controller.conversation_count()).collect()
    } else {
        vec![selected]
    };

    for index in indices {
        let Some(conversation) = controller.conversation(index) else {
            continue;
        };

        if args.json {
            println!("{}", serde_json::to_string_pretty(&conversation)?);
            continue;
        }

        let marker = if index == selected { "*" } else { " " };
        println!("{} conversation {}", marker, index + 1);
        println!("{}", render_transcript(conversation.turns()));
        println!();
    }

    Ok(())
}
