//! Chat command - Interactive chat window.
//!
//! Input is read line by line. Messages are sent in the background so the
//! prompt stays usable while a reply is pending; replies are printed as
//! they arrive. Pending sends are awaited before the session ends.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use loopchat_core::{ChatController, ChatEvent, Turn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{render_transcript, render_turn, WidgetOptions};

#[derive(Args)]
pub struct ChatArgs {
    /// Start with the chat window open
    #[arg(long)]
    open: bool,

    /// Print swallowed faults (network, storage) as they happen
    #[arg(long)]
    diagnostics: bool,
}

const HELP: &str = "\
commands:
  /open /close /toggle   show or hide the chat window
  /button <n>            click quick reply <n> of the last bot message
  /new                   start a new conversation
  /select <n>            switch to conversation <n>
  /delete <n>            delete conversation <n>
  /list                  list conversations
  /help                  show this help
  /quit                  exit";

pub async fn execute(args: ChatArgs, widget: &WidgetOptions) -> Result<()> {
    let controller = widget.open()?;

    let (stop, stopped) = oneshot::channel();
    let printer = tokio::spawn(print_replies(
        controller.clone(),
        controller.subscribe(),
        stopped,
        args.diagnostics,
    ));

    if args.open {
        controller.toggle();
    }
    print_window(&controller);

    let session = run_session(&controller, BufReader::new(tokio::io::stdin())).await;

    let _ = stop.send(());
    let _ = printer.await;
    session
}

/// Drive the window from `input` until `/quit` or end of input, then wait
/// for every reply still in flight.
async fn run_session<R>(controller: &Arc<ChatController>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut sends = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        if let Some(command) = line.strip_prefix('/') {
            let mut parts = command.split_whitespace();
            let name = parts.next().unwrap_or_default();
            let arg = parts.next();

            match name {
                "quit" | "exit" => break,
                "help" => println!("{}", HELP),
                "open" if !controller.is_open() => {
                    controller.toggle();
                    print_window(controller);
                }
                "close" if controller.is_open() => {
                    controller.toggle();
                    print_window(controller);
                }
                "open" | "close" => {}
                "toggle" => {
                    controller.toggle();
                    print_window(controller);
                }
                "button" => match parse_index(arg).and_then(|n| quick_reply_payload(controller, n)) {
                    Some(payload) => {
                        let ctl = controller.clone();
                        sends.spawn(async move { ctl.submit_button_payload(&payload).await });
                    }
                    None => println!("No such quick reply"),
                },
                "new" => {
                    let index = controller.new_conversation();
                    println!("Started conversation {}", index + 1);
                }
                "select" | "delete" => match parse_index(arg) {
                    Some(n) => {
                        let result = if name == "select" {
                            controller.select_conversation(n - 1)
                        } else {
                            controller.delete_conversation(n - 1)
                        };
                        match result {
                            Ok(()) => print_window(controller),
                            Err(e) => println!("{}", e),
                        }
                    }
                    None => println!("Usage: /{} <n>", name),
                },
                "list" => println!("{}", super::conversations::render_list(controller)),
                _ => println!("Unknown command, try /help"),
            }
            continue;
        }

        if !controller.is_open() {
            println!("💬 The chat is closed, type /open to start chatting");
            continue;
        }

        let ctl = controller.clone();
        let text = line.to_string();
        sends.spawn(async move { ctl.submit_user_message(&text).await });
    }

    if !sends.is_empty() {
        debug!(pending = sends.len(), "Waiting for pending replies");
    }
    while let Some(joined) = sends.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Send task failed");
        }
    }

    Ok(())
}

/// 1-based index argument
fn parse_index(arg: Option<&str>) -> Option<usize> {
    arg?.parse::<usize>().ok().filter(|n| *n >= 1)
}

fn quick_reply_payload(controller: &ChatController, n: usize) -> Option<String> {
    let conversation = controller.conversation(controller.active_index())?;
    let button = conversation.last_bot_turn()?.buttons().get(n - 1)?;
    Some(button.payload.clone())
}

fn print_window(controller: &ChatController) {
    if controller.is_open() {
        println!(
            "── conversation {} ──\n{}",
            controller.active_index() + 1,
            render_transcript(&controller.active_transcript())
        );
    } else {
        println!("💬 (closed)");
    }
}

fn print_event(controller: &ChatController, event: ChatEvent, diagnostics: bool) {
    match event {
        ChatEvent::TurnAppended { conversation, turn: turn @ Turn::Bot { .. } } => {
            if conversation == controller.active_index() && controller.is_open() {
                println!("{}", render_turn(&turn));
            }
        }
        ChatEvent::Fault(fault) if diagnostics => {
            eprintln!("⚠️  {:?}: {}", fault.kind, fault.message);
        }
        _ => {}
    }
}

/// Print events until told to stop, then flush whatever is still queued
async fn print_replies(
    controller: Arc<ChatController>,
    mut events: broadcast::Receiver<ChatEvent>,
    mut stop: oneshot::Receiver<()>,
    diagnostics: bool,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => print_event(&controller, event, diagnostics),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            },
            _ = &mut stop => break,
        }
    }

    loop {
        match events.try_recv() {
            Ok(event) => print_event(&controller, event, diagnostics),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}
