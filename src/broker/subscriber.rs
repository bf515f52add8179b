//! Subscriber handles
//!
//! A subscription is split in two halves. The registry keeps a `Subscriber`
//! (id + offer queue + closed signal) and the caller receives a
//! `CommentStream`.
//!
//! Delivery is a handoff: the publisher queues an offer and waits until the
//! consumer accepts it. An offer the publisher stopped waiting for can no
//! longer be accepted, so the consumer silently discards it. A comment only
//! counts as delivered when the consumer actually took it.
//!
//! `unsubscribe` fires the closed signal shared by every copy of the
//! `Subscriber`, including those held by in-flight publishes. From then on
//! the stream yields `None` and no publish can hand it anything.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::models::Comment;

/// Offers a subscriber may have queued before publishers wait for room.
const PENDING_OFFERS: usize = 16;

/// Registry-local subscriber id. Issued from a counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One comment waiting for the consumer to take it.
#[derive(Debug)]
pub(crate) struct Offer {
    event: Arc<Comment>,
    accepted: oneshot::Sender<()>,
}

impl Offer {
    pub(crate) fn new(event: Arc<Comment>) -> (Self, oneshot::Receiver<()>) {
        let (accepted, rx) = oneshot::channel();
        (Self { event, accepted }, rx)
    }

    /// `None` if the publisher already gave up on this offer.
    fn accept(self) -> Option<Arc<Comment>> {
        self.accepted.send(()).ok().map(|()| self.event)
    }
}

/// Registry-side half of a subscription.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    offers: mpsc::Sender<Offer>,
    closed: CancellationToken,
}

impl Subscriber {
    /// Creates a subscriber and the stream its consumer drains.
    pub(crate) fn channel(id: SubscriberId) -> (Self, CommentStream) {
        let (offers, receiver) = mpsc::channel(PENDING_OFFERS);
        let closed = CancellationToken::new();
        let stream = CommentStream {
            id,
            offers: receiver,
            on_close: Box::pin(closed.clone().cancelled_owned()),
            closed: closed.clone(),
        };
        (Self { id, offers, closed }, stream)
    }

    /// Queues an offer. Fails only if the consumer dropped its stream.
    pub(crate) async fn offer(&self, offer: Offer) -> Result<(), Offer> {
        self.offers.send(offer).await.map_err(|e| e.0)
    }

    /// Ends the stream. Every copy of this subscriber observes it.
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }

    pub(crate) fn closed(&self) -> &CancellationToken {
        &self.closed
    }
}

/// Consumer-side half of a subscription.
pub struct CommentStream {
    id: SubscriberId,
    offers: mpsc::Receiver<Offer>,
    closed: CancellationToken,
    on_close: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl fmt::Debug for CommentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentStream")
            .field("id", &self.id)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

impl CommentStream {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next comment. `None` means the subscription was removed.
    pub async fn recv(&mut self) -> Option<Arc<Comment>> {
        self.next().await
    }

    /// Takes a comment a publisher is currently offering, if any.
    pub fn try_recv(&mut self) -> Result<Arc<Comment>, TryRecvError> {
        if self.closed.is_cancelled() {
            return Err(TryRecvError::Disconnected);
        }
        loop {
            if let Some(event) = self.offers.try_recv()?.accept() {
                return Ok(event);
            }
        }
    }
}

impl Stream for CommentStream {
    type Item = Arc<Comment>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        // checked first so the close future is never polled after completing
        if this.closed.is_cancelled() || this.on_close.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        loop {
            match this.offers.poll_recv(cx) {
                Poll::Ready(Some(offer)) => {
                    if let Some(event) = offer.accept() {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
