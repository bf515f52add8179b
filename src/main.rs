//! CLI for postfeed
//!
//! Subcommands:
//! - `server`: run the WebSocket server
//! - `watch`: subscribe to a post and print its new comments as they arrive

use std::sync::Arc;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tracing::{error, info};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use postfeed::broker::Registry;
use postfeed::config::{Settings, load_config};
use postfeed::persistence::Persistence;
use postfeed::transport::message::{ClientMessage, ServerMessage};
use postfeed::transport::{AppState, start_websocket_server};
use postfeed::utils::logging;

#[derive(Parser)]
#[command(name = "postfeed")]
enum Command {
    /// Start the WebSocket server
    Server,
    /// Watch a post for new comments
    Watch {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long)]
        post_id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&config.logging.level);

    let result = match cmd {
        Command::Server => run_server(config).await,
        Command::Watch { url, post_id } => run_watch(&url, post_id).await,
    };
    if let Err(e) = result {
        error!("postfeed failed: {e}");
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let persistence = Persistence::open(&config.storage.path)?;
    let registry = Arc::new(Registry::with_timeout(config.feed.publish_timeout()));
    let state = AppState::new(persistence.clone(), registry);

    tokio::select! {
        res = start_websocket_server(addr, state) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    persistence.flush()?;
    Ok(())
}

async fn run_watch(url: &str, post_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;

    let subscribe = serde_json::to_string(&ClientMessage::Subscribe { post_id })?;
    ws_stream.send(WsMessage::text(subscribe)).await?;

    while let Some(msg) = ws_stream.next().await {
        let msg = msg?;
        if !msg.is_text() {
            continue;
        }
        match serde_json::from_str::<ServerMessage>(msg.to_text()?)? {
            ServerMessage::Subscribed { subscriber_id, .. } => {
                info!("watching post {post_id} as subscriber {subscriber_id}");
            }
            ServerMessage::NewComment { comment } => {
                println!("[{}] {}: {}", comment.created_at, comment.author, comment.content);
            }
            ServerMessage::Error { message } => {
                error!("server error: {message}");
                break;
            }
            other => info!("ignoring {other:?}"),
        }
    }

    Ok(())
}
