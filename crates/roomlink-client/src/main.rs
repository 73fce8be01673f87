//! roomlink terminal client
//!
//! Usage: `roomlink <room> <username> [config.yaml]`
//! - each stdin line is posted to the room
//! - `/quit` disconnects and exits
//! - log level via `RUST_LOG` (default `info`)

use std::collections::HashSet;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use roomlink_client::config::{self, ClientConfig};
use roomlink_client::{ClientStore, Session};
use roomlink_core::error::{Result, RoomlinkError};
use roomlink_core::model::MessageId;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let (Some(room), Some(username)) = (args.next(), args.next()) else {
        return Err(RoomlinkError::BadConfig(
            "usage: roomlink <room> <username> [config.yaml]".into(),
        ));
    };
    let cfg = match args.next() {
        Some(path) => config::load_from_file(&path)?,
        None => ClientConfig::default(),
    };

    let session = Session::builder(cfg).spawn()?;
    tracing::info!(%room, %username, "roomlink starting");
    session.connect(room, username)?;

    tokio::spawn(print_status(session.clone()));
    tokio::spawn(print_messages(session.store()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if !session.send_message(line) {
            println!("* not connected, message not sent");
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn print_status(session: Session) {
    let mut status = session.watch_status();
    let mut was_ready = false;
    let mut last_error = None;
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        if current.error != last_error {
            last_error = current.error;
            if let Some(error) = current.error {
                println!("* {}", error.user_message());
            }
        }
        if current.is_ready() != was_ready {
            was_ready = current.is_ready();
            println!("* {}", if was_ready { "connected" } else { "disconnected" });
        }
    }
}

async fn print_messages(store: std::sync::Arc<ClientStore>) {
    let mut revision = store.subscribe();
    let mut printed: HashSet<MessageId> = HashSet::new();
    while revision.changed().await.is_ok() {
        for message in store.messages() {
            if printed.contains(&message.id) {
                continue;
            }
            let author = store
                .user(&message.author_id)
                .map(|u| u.username)
                .unwrap_or_else(|| message.author_id.clone());
            println!("<{author}> {}", message.content);
            printed.insert(message.id);
        }
    }
}
