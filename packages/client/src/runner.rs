//! Client execution logic.
//!
//! Wires the token file, the reconnecting transport, the orchestrator and a
//! character-grid surface together, then turns readline input into
//! orchestrator events until the user quits.

use std::{path::PathBuf, sync::Arc};

use hiroba_shared::{
    protocol::ServerMessage,
    time::{SystemClock, local_time_of_day},
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    command::Command,
    error::ClientError,
    formatter::MessageFormatter,
    orchestrator::{InputEvent, PresenceOrchestrator},
    renderer::{TextSurface, Viewport},
    token,
    transport::{MessageCallback, ReconnectingTransport, TransportConfig},
    ui::{PROMPT, print_notice},
};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub token_file: PathBuf,
    pub cols: usize,
    pub rows: usize,
}

type Orchestrator = PresenceOrchestrator<ReconnectingTransport>;

/// Wraps the orchestrator's handler so every notable event is also echoed as
/// a one-line notice. Names are looked up before the event is applied, since
/// a `leave` removes them.
fn echoing_handler(orchestrator: Arc<Orchestrator>) -> MessageCallback {
    let apply = orchestrator.message_handler();
    Arc::new(move |message: ServerMessage| {
        let at = local_time_of_day();
        let notice = match &message {
            ServerMessage::Welcome { name, users, .. } => {
                Some(MessageFormatter::format_welcome(name, users))
            }
            ServerMessage::Join { name, .. } => Some(MessageFormatter::format_joined(name, &at)),
            ServerMessage::Leave { id } => orchestrator
                .name_of(id)
                .map(|name| MessageFormatter::format_left(&name, &at)),
            ServerMessage::Chatted { id, text } => {
                let name = orchestrator.name_of(id).unwrap_or_else(|| id.clone());
                Some(MessageFormatter::format_chat(&name, text, &at))
            }
            ServerMessage::Moved { .. } => None,
        };
        apply(message);
        if let Some(notice) = notice {
            print_notice(&notice);
        }
    })
}

/// Reads lines on a plain thread (rustyline blocks) and forwards them.
fn spawn_readline(lines: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str()).ok();
                    if lines.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }
    });
}

/// Run the presence client until `/quit`, Ctrl+C or Ctrl+D.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let token = token::load_or_create(&options.token_file)?;

    let transport = Arc::new(ReconnectingTransport::new(TransportConfig::new(
        options.url.clone(),
        Some(token),
    )));
    let viewport = Viewport::new(options.cols as f64, options.rows as f64, 1.0);
    let orchestrator = Arc::new(PresenceOrchestrator::new(
        transport.clone(),
        viewport,
        Arc::new(SystemClock::new()),
    ));

    let surface = TextSurface::new(options.cols, options.rows);
    let frame = surface.frame_handle();
    let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();

    transport.start(echoing_handler(orchestrator.clone()));
    orchestrator.start(Box::new(surface), inputs_rx);

    println!(
        "\nConnecting to {}. Type to chat, /move x y or /click col row to walk, /who, /look, /quit.\n",
        options.url
    );

    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel::<String>();
    spawn_readline(lines_tx);

    while let Some(line) = lines_rx.recv().await {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let event = match command {
            Command::Quit => break,
            Command::Look => {
                print!("{}", MessageFormatter::format_frame(&frame.latest(), options.cols));
                continue;
            }
            Command::Who => {
                print!(
                    "{}",
                    MessageFormatter::format_participants(&orchestrator.participants())
                );
                continue;
            }
            Command::Move { x, y } => InputEvent::Click {
                x: x * options.cols as f64,
                y: y * options.rows as f64,
            },
            Command::Click { col, row } => InputEvent::Click {
                x: col as f64 + 0.5,
                y: row as f64 + 0.5,
            },
            Command::Chat(text) => {
                let _ = inputs_tx.send(InputEvent::OpenChat);
                InputEvent::SendChat(text)
            }
        };
        if inputs_tx.send(event).is_err() {
            break;
        }
    }

    orchestrator.stop().await;
    Ok(())
}
