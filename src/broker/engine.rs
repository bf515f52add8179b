//! Registry engine
//!
//! This module contains the in-memory subscription registry responsible for:
//! - mapping posts to the subscribers watching them for new comments
//! - issuing subscriber ids from a counter that never repeats
//! - fanning a published comment out to every subscriber of its post
//!
//! Concurrency and usage notes:
//! - The registry is shared as `Arc<Registry>`. All structural changes go
//!   through one internal mutex which is held only for bookkeeping.
//! - `publish` copies the subscriber list under the lock, releases it, and
//!   then delivers to the copy. Subscribing or unsubscribing while a publish
//!   is in flight never waits for that publish.
//! - Delivery is best-effort: every subscriber in the snapshot gets one shared
//!   deadline (`publish_timeout`). A comment is delivered only once the
//!   consumer takes it. Slow subscribers are skipped for that event and stay
//!   registered.
//! - `unsubscribe` closes the subscriber for every publish already holding
//!   it, so those publishes skip it at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::subscriber::{CommentStream, Offer, Subscriber, SubscriberId};
use super::topic::Topic;
use crate::models::{Comment, PostId};
use crate::utils::error::FeedError;

/// How long a publish waits for slow subscribers before skipping them.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome counts of a single `publish` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub timed_out: usize,
    /// Subscribers that were unsubscribed mid-publish or whose consumer
    /// dropped the stream.
    pub closed: usize,
    pub cancelled: usize,
}

impl PublishReport {
    /// Number of subscribers in the snapshot the publish worked from.
    pub fn attempted(&self) -> usize {
        self.delivered + self.timed_out + self.closed + self.cancelled
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Delivered,
    TimedOut,
    Closed,
    Cancelled,
}

// One topic per post ever subscribed to. Emptied topics are kept, so this
// grows with the number of distinct posts, not with subscriptions.
#[derive(Debug, Default)]
struct State {
    topics: HashMap<PostId, Topic>,
    next_id: u64,
}

#[derive(Debug)]
pub struct Registry {
    state: Mutex<State>,
    publish_timeout: Duration,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_PUBLISH_TIMEOUT)
    }

    pub fn with_timeout(publish_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            publish_timeout,
        }
    }

    pub fn publish_timeout(&self) -> Duration {
        self.publish_timeout
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still guards consistent state.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new subscriber for `post_id`, creating the topic if needed.
    pub fn subscribe(&self, post_id: PostId) -> (SubscriberId, CommentStream) {
        let (id, stream) = {
            let mut state = self.state();
            let id = SubscriberId(state.next_id);
            state.next_id += 1;

            let (subscriber, stream) = Subscriber::channel(id);
            state.topics.entry(post_id).or_default().subscribe(subscriber);
            (id, stream)
        };

        info!("subscriber {id} watching post {post_id}");
        (id, stream)
    }

    /// Removes a subscriber and closes its stream.
    ///
    /// Fails with `NotFound` only if the post never had a subscriber list.
    /// Removing an id that is already gone is a no-op.
    pub fn unsubscribe(&self, post_id: PostId, id: SubscriberId) -> Result<(), FeedError> {
        let removed = {
            let mut state = self.state();
            let Some(topic) = state.topics.get_mut(&post_id) else {
                warn!("unsubscribe for unknown post {post_id}");
                return Err(FeedError::NotFound(post_id));
            };
            topic.unsubscribe(id)
        };

        match removed {
            Some(subscriber) => {
                subscriber.close();
                info!("subscriber {id} stopped watching post {post_id}");
            }
            None => debug!("subscriber {id} already removed from post {post_id}"),
        }
        Ok(())
    }

    /// Delivers `comment` to every current subscriber of `post_id`.
    ///
    /// Returns once each subscriber in the snapshot has received the comment
    /// or was skipped. A post with no subscribers is a successful no-op.
    pub async fn publish(&self, post_id: PostId, comment: Comment) -> PublishReport {
        self.publish_until(post_id, comment, &CancellationToken::new())
            .await
    }

    /// Same as [`Registry::publish`], abandoning outstanding deliveries once
    /// `cancel` fires. Cancellation is not a failure.
    pub async fn publish_until(
        &self,
        post_id: PostId,
        comment: Comment,
        cancel: &CancellationToken,
    ) -> PublishReport {
        let snapshot = {
            let state = self.state();
            state
                .topics
                .get(&post_id)
                .map(Topic::snapshot)
                .unwrap_or_default()
        };
        if snapshot.is_empty() {
            debug!("no subscribers for post {post_id}, nothing to publish");
            return PublishReport::default();
        }

        let event = Arc::new(comment);
        let deadline = Instant::now() + self.publish_timeout;
        let outcomes = join_all(
            snapshot
                .iter()
                .map(|subscriber| deliver(subscriber, event.clone(), deadline, cancel)),
        )
        .await;

        let mut report = PublishReport::default();
        for (subscriber, outcome) in snapshot.iter().zip(outcomes) {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::TimedOut => {
                    warn!(
                        "subscriber {} on post {} not ready within {:?}, skipped",
                        subscriber.id, post_id, self.publish_timeout
                    );
                    report.timed_out += 1;
                }
                Delivery::Closed => {
                    if subscriber.closed().is_cancelled() {
                        debug!(
                            "subscriber {} left post {} before delivery",
                            subscriber.id, post_id
                        );
                    } else {
                        warn!(
                            "subscriber {} on post {} dropped its stream",
                            subscriber.id, post_id
                        );
                    }
                    report.closed += 1;
                }
                Delivery::Cancelled => report.cancelled += 1,
            }
        }

        if report.cancelled > 0 {
            info!(
                "publish to post {post_id} cancelled, {} deliveries abandoned",
                report.cancelled
            );
        }
        info!(
            "notified {}/{} subscribers of post {}",
            report.delivered,
            report.attempted(),
            post_id
        );
        report
    }

    /// Number of subscribers currently registered for `post_id`.
    pub fn subscriber_count(&self, post_id: PostId) -> usize {
        self.state().topics.get(&post_id).map_or(0, Topic::len)
    }

    /// Ids registered for `post_id`, in subscription order.
    pub fn subscriber_ids(&self, post_id: PostId) -> Vec<SubscriberId> {
        self.state()
            .topics
            .get(&post_id)
            .map(Topic::ids)
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, post_id: PostId, id: SubscriberId) -> bool {
        self.state()
            .topics
            .get(&post_id)
            .is_some_and(|topic| topic.contains(id))
    }
}

async fn deliver(
    subscriber: &Subscriber,
    event: Arc<Comment>,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Delivery {
    let (offer, mut accepted) = Offer::new(event);
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Delivery::Cancelled,
        _ = subscriber.closed().cancelled() => Delivery::Closed,
        handoff = tokio::time::timeout_at(deadline, async {
            subscriber.offer(offer).await.map_err(|_| Delivery::Closed)?;
            (&mut accepted).await.map_err(|_| Delivery::Closed)
        }) => match handoff {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(closed)) => closed,
            Err(_) => Delivery::TimedOut,
        },
    };
    if outcome == Delivery::Delivered {
        return outcome;
    }

    // No consumer can accept the offer after this; one that already did wins.
    accepted.close();
    match accepted.try_recv() {
        Ok(()) => Delivery::Delivered,
        Err(_) => outcome,
    }
}
