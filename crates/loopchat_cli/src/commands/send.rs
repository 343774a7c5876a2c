//! Send command - Send one message and print the reply.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{render_turn, WidgetOptions};

#[derive(Args)]
pub struct SendArgs {
    /// Message to send
    message: String,

    /// Send as a quick-reply payload (not recorded as a user turn)
    #[arg(long)]
    payload: bool,
}

pub async fn execute(args: SendArgs, widget: &WidgetOptions) -> Result<()> {
    let controller = widget.open()?;
    info!(endpoint = %controller.config().endpoint, "Sending message");

    let before = controller.active_transcript().len();
    if args.payload {
        controller.submit_button_payload(&args.message).await;
    } else {
        controller.submit_user_message(&args.message).await;
    }

    let transcript = controller.active_transcript();
    let new_turns = &transcript[before.min(transcript.len())..];
    if !new_turns.iter().any(|t| t.is_bot()) {
        println!("(no reply)");
    }
    for turn in new_turns {
        println!("{}", render_turn(turn));
    }

    Ok(())
}
