//! WebSocket transport
//!
//! This file implements the WebSocket server that translates protocol JSON
//! messages into service calls. Responsibilities:
//! - Accept TCP/WebSocket connections and create a `Client` for each
//! - Dispatch post and comment requests to the services
//! - Open a registry subscription per `subscribe` request and forward every
//!   comment it yields to the connection as `new_comment`
//! - Unsubscribe everything the connection opened when it ends, however it ends

use std::io;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Registry;
use crate::client::pubsub_client::send_json;
use crate::client::{Client, Subscription};
use crate::models::PostId;
use crate::persistence::Persistence;
use crate::service::{CommentService, PostService};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::ServiceError;

/// Everything a connection handler needs, cheap to clone per connection.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub posts: PostService,
    pub comments: CommentService,
}

impl AppState {
    pub fn new(persistence: Persistence, registry: Arc<Registry>) -> Self {
        Self {
            posts: PostService::new(persistence.clone()),
            comments: CommentService::new(persistence, registry.clone()),
            registry,
        }
    }
}

pub async fn start_websocket_server(addr: String, state: AppState) -> io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket server listening on ws://{addr}");
    serve(listener, state).await
}

/// Accepts connections on an already bound listener until accepting fails.
pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("accepted connection from {peer}");
        spawn(handle_connection(stream, state.clone()));
    }
}

async fn handle_connection(stream: TcpStream, state: AppState) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut client = Client::new(tx);
    info!("{} connected", client.id);

    {
        let client_id = client.id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {client_id}: {e}");
                    break;
                }
            }
            debug!("Send loop closed for {client_id}");
        });
    }

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("{} read error: {e}", client.id);
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let response = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => handle_request(&state, &mut client, request).await,
            Err(err) => {
                warn!(
                    "Invalid client message from {}: {err} | {}",
                    client.id,
                    text.chars().take(100).collect::<String>()
                );
                ServerMessage::error(format!("invalid message: {err}"))
            }
        };
        if !client.send(&response) {
            break;
        }
    }

    client.close(&state.registry);
    info!("{} disconnected", client.id);
}

/// Runs one request on behalf of `client` and builds the reply.
pub async fn handle_request(
    state: &AppState,
    client: &mut Client,
    request: ClientMessage,
) -> ServerMessage {
    let result = match request {
        ClientMessage::CreatePost(req) => state
            .posts
            .create_post(req)
            .map(|post| ServerMessage::Post { post }),
        ClientMessage::GetPost { post_id } => state
            .posts
            .get_post(post_id)
            .map(|post| ServerMessage::Post { post }),
        ClientMessage::ListPosts { page } => state
            .posts
            .list_posts(page)
            .map(|posts| ServerMessage::Posts { posts }),
        ClientMessage::CreateComment(req) => state
            .comments
            .create_comment(req)
            .await
            .map(|comment| ServerMessage::Comment { comment }),
        ClientMessage::Comments { post_id, page } => state
            .comments
            .comments_for_post(post_id, page)
            .map(|comments| ServerMessage::Comments { comments }),
        ClientMessage::Replies { comment_id } => state
            .comments
            .replies(comment_id)
            .map(|comments| ServerMessage::Comments { comments }),
        ClientMessage::Subscribe { post_id } => return subscribe(state, client, post_id),
        ClientMessage::Unsubscribe { post_id } => return unsubscribe(state, client, post_id),
    };

    result.unwrap_or_else(|e| match e {
        ServiceError::Internal(e) => {
            error!("request from {} failed: {e}", client.id);
            ServerMessage::error("internal server error")
        }
        other => ServerMessage::error(other.to_string()),
    })
}

fn subscribe(state: &AppState, client: &mut Client, post_id: PostId) -> ServerMessage {
    if client.is_subscribed(&post_id) {
        return ServerMessage::error(format!("already subscribed to post {post_id}"));
    }

    let (subscriber_id, mut stream) = state.registry.subscribe(post_id);
    let sender = client.sender.clone();
    let client_id = client.id.clone();
    let forwarder = spawn(async move {
        while let Some(comment) = stream.recv().await {
            let msg = ServerMessage::NewComment {
                comment: (*comment).clone(),
            };
            if !send_json(&sender, &msg) {
                break;
            }
        }
        debug!("forwarding for {client_id} on post {post_id} finished");
    });

    client.add_subscription(
        post_id,
        Subscription {
            subscriber_id,
            forwarder,
        },
    );
    ServerMessage::Subscribed {
        post_id,
        subscriber_id,
    }
}

fn unsubscribe(state: &AppState, client: &mut Client, post_id: PostId) -> ServerMessage {
    let Some(subscription) = client.take_subscription(&post_id) else {
        return ServerMessage::error(format!("not subscribed to post {post_id}"));
    };

    match state
        .registry
        .unsubscribe(post_id, subscription.subscriber_id)
    {
        Ok(()) => ServerMessage::Unsubscribed { post_id },
        Err(e) => {
            subscription.forwarder.abort();
            ServerMessage::error(e.to_string())
        }
    }
}
