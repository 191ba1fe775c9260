//! SimChat binary: composition root and terminal front-end.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Install the tracing subscriber (stderr)
//! 3. Build the simulation gateway (HTTP or offline)
//! 4. Read lines from stdin and turn them into chat intents
//!
//! Sends run on spawned tasks so the prompt stays usable while a simulation
//! is pending.

mod cli;
mod command;
mod render;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use simchat_chat::breakdown::EnergyBreakdown;
use simchat_chat::orchestrator::{ChatOrchestrator, SendOutcome};
use simchat_chat::session::{RejectReason, Transition};
use simchat_core::config::SimChatConfig;
use simchat_core::error::SimChatError;
use simchat_core::types::{HistoryEntry, Role};

use cli::CliArgs;
use command::{Command, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing so the configured level can apply; the
    // outcome is logged once the subscriber is up.
    let config_file = args.resolve_config_path();
    let loaded = SimChatConfig::load(&config_file);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();

    let directive = args.resolve_log_level(
        std::env::var("RUST_LOG").ok(),
        &config.general.log_level,
    );
    init_tracing(&directive);
    tracing::info!("Starting SimChat v{}", env!("CARGO_PKG_VERSION"));

    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(SimChatError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults")
        }
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load configuration, using defaults"
        ),
    }

    args.apply_overrides(&mut config);
    config.validate()?;

    let gateway = simchat_gateway::from_config(&config.gateway)?;
    let chat = Arc::new(ChatOrchestrator::new(gateway, config.chat.clone()));

    println!("SimChat: describe a building to simulate. /help lists commands.");
    spawn_history_refresh(Arc::clone(&chat));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };

        match Command::parse(&line) {
            Command::Send(text) => spawn_send(Arc::clone(&chat), text),
            Command::Upload(path) => match tokio::fs::read_to_string(&path).await {
                Ok(content) => match chat.upload_override(&content) {
                    Transition::Rejected(_) => {
                        println!("{} is empty; nothing attached.", path.display())
                    }
                    _ => {
                        if let Some(entry) = chat.render().entries.last() {
                            println!("{}", render::entry(entry));
                        }
                        println!("Attached {} to your next message.", path.display());
                    }
                },
                Err(e) => println!("Could not read {}: {}", path.display(), e),
            },
            Command::History => {
                chat.refresh_history().await;
                println!("{}", render::history(&chat.history_view()));
            }
            Command::Rerun(id) => match chat.history_entry(&id) {
                Some(entry) => spawn_rerun(Arc::clone(&chat), entry),
                None => println!("No simulation '{}' in history. Try /history.", id),
            },
            Command::Compare(id) => match chat.compare_with(&id) {
                Some(cmp) => println!("{}", render::comparison(&cmp)),
                None if chat.render().current_result.is_none() => {
                    println!("No current result to compare.")
                }
                None => println!("No simulation '{}' in history. Try /history.", id),
            },
            Command::Result => match chat.render().breakdown {
                Some(breakdown) => println!("{}", render::breakdown(&breakdown)),
                None => println!("No result to show."),
            },
            Command::Clear => {
                chat.clear_current_result();
                println!("Result dismissed.");
            }
            Command::Reset => {
                chat.reset();
                println!("Started a new conversation.");
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Empty => {}
            Command::Unknown(input) => println!("Unknown command: {} (try /help)", input),
        }
    }

    tracing::info!("SimChat stopped");
    Ok(())
}

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spawn_send(chat: Arc<ChatOrchestrator>, text: String) {
    tokio::spawn(async move {
        let outcome = chat.send_message(&text).await;
        report(&chat, outcome).await;
    });
}

fn spawn_rerun(chat: Arc<ChatOrchestrator>, entry: HistoryEntry) {
    tokio::spawn(async move {
        let outcome = chat.rerun(&entry).await;
        report(&chat, outcome).await;
    });
}

fn spawn_history_refresh(chat: Arc<ChatOrchestrator>) {
    tokio::spawn(async move {
        chat.refresh_history().await;
    });
}

async fn report(chat: &ChatOrchestrator, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Completed(result) => {
            print_last_reply(chat);
            println!("{}", render::breakdown(&EnergyBreakdown::from_result(&result)));
            chat.refresh_history().await;
        }
        SendOutcome::Failed(_) => print_last_reply(chat),
        SendOutcome::Rejected(RejectReason::Busy) => {
            println!("A simulation is already running. Wait for it to finish.")
        }
        SendOutcome::Rejected(RejectReason::Invalid(reason)) => println!("Not sent: {}", reason),
        SendOutcome::Discarded => tracing::debug!("Reply discarded after reset"),
    }
}

fn print_last_reply(chat: &ChatOrchestrator) {
    let view = chat.render();
    if let Some(entry) = view
        .entries
        .iter()
        .rev()
        .find(|e| e.role == Role::Assistant)
    {
        println!("{}", render::entry(entry));
    }
}
