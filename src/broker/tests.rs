use super::topic::Topic;
use super::{Registry, Subscriber, SubscriberId};
use crate::models::Comment;
use crate::utils::error::FeedError;

use chrono::Utc;
use futures::StreamExt;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn comment(post_id: Uuid, author: &str, content: &str) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        author: author.to_string(),
        content: content.to_string(),
        post_id,
        parent_comment_id: None,
        created_at: Utc::now(),
    }
}

#[test]
fn test_topic_subscribe_and_unsubscribe() {
    let mut topic = Topic::new();
    let (first, _rx1) = Subscriber::channel(SubscriberId(0));
    let (second, _rx2) = Subscriber::channel(SubscriberId(1));
    topic.subscribe(first);
    topic.subscribe(second);
    assert_eq!(topic.ids(), vec![SubscriberId(0), SubscriberId(1)]);

    let removed = topic.unsubscribe(SubscriberId(0)).unwrap();
    assert_eq!(removed.id, SubscriberId(0));
    assert!(!topic.contains(SubscriberId(0)));
    assert!(topic.unsubscribe(SubscriberId(0)).is_none());
    assert_eq!(topic.len(), 1);
}

#[test]
fn test_topic_snapshot_is_independent_of_later_changes() {
    let mut topic = Topic::new();
    let (sub, _rx) = Subscriber::channel(SubscriberId(7));
    topic.subscribe(sub);

    let snapshot = topic.snapshot();
    topic.unsubscribe(SubscriberId(7));

    assert!(topic.is_empty());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, SubscriberId(7));
}

#[test]
fn test_registry_new() {
    let registry = Registry::default();
    assert_eq!(registry.subscriber_count(Uuid::new_v4()), 0);
    assert_eq!(registry.publish_timeout(), Duration::from_millis(500));
}

#[test]
fn test_subscriber_ids_strictly_increase() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let other = Uuid::new_v4();

    let mut issued = Vec::new();
    for round in 0..5 {
        let (id, _stream) = registry.subscribe(post);
        issued.push(id);
        if round % 2 == 0 {
            registry.unsubscribe(post, id).unwrap();
        }
        let (id, _stream) = registry.subscribe(other);
        issued.push(id);
    }

    assert!(issued.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(issued[0], SubscriberId(0));
}

#[test]
fn test_subscribe_returns_empty_open_stream() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (id, mut stream) = registry.subscribe(post);

    assert_eq!(stream.id(), id);
    assert!(registry.is_subscribed(post, id));
    assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_publish_to_post_without_subscribers() {
    let registry = Registry::new();
    let post = Uuid::new_v4();

    let report = registry.publish(post, comment(post, "a", "hi")).await;
    assert_eq!(report.attempted(), 0);

    // a topic whose subscribers all left behaves the same
    let (id, _stream) = registry.subscribe(post);
    registry.unsubscribe(post, id).unwrap();
    let report = registry.publish(post, comment(post, "a", "again")).await;
    assert_eq!(report.attempted(), 0);
}

#[tokio::test]
async fn test_publish_reaches_every_subscriber() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let mut streams: Vec<_> = (0..4).map(|_| registry.subscribe(post).1).collect();

    let sent = comment(post, "a", "hi");
    let (report, received) = tokio::join!(
        registry.publish(post, sent.clone()),
        join_all(streams.iter_mut().map(|stream| stream.recv())),
    );

    assert_eq!(report.delivered, 4);
    for received in received {
        assert_eq!(*received.unwrap(), sent);
    }
}

#[tokio::test]
async fn test_publish_only_reaches_its_post() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let other = Uuid::new_v4();
    let (_, mut watching) = registry.subscribe(post);
    let (_, mut elsewhere) = registry.subscribe(other);

    let (report, received) = tokio::join!(
        registry.publish(post, comment(post, "a", "hi")),
        watching.recv(),
    );

    assert_eq!(report.attempted(), 1);
    assert_eq!(received.unwrap().content, "hi");
    assert!(matches!(elsewhere.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery_and_closes_stream() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (first_id, mut first) = registry.subscribe(post);
    let (second_id, mut second) = registry.subscribe(post);
    assert_eq!((first_id, second_id), (SubscriberId(0), SubscriberId(1)));

    let hello = comment(post, "a", "hi");
    let (report, a, b) = tokio::join!(
        registry.publish(post, hello.clone()),
        first.recv(),
        second.recv(),
    );
    assert_eq!(report.delivered, 2);
    assert_eq!(*a.unwrap(), hello);
    assert_eq!(*b.unwrap(), hello);

    registry.unsubscribe(post, first_id).unwrap();
    assert!(first.recv().await.is_none());

    let follow_up = comment(post, "b", "second");
    let (report, b) = tokio::join!(registry.publish(post, follow_up.clone()), second.recv());
    assert_eq!(report.delivered, 1);
    assert_eq!(report.attempted(), 1);
    assert_eq!(*b.unwrap(), follow_up);
    assert_eq!(registry.subscriber_ids(post), vec![second_id]);
}

#[test]
fn test_unsubscribe_unknown_post() {
    let registry = Registry::new();
    let post = Uuid::new_v4();

    let err = registry.unsubscribe(post, SubscriberId(0)).unwrap_err();
    assert_eq!(err, FeedError::NotFound(post));
}

#[test]
fn test_unsubscribe_unknown_id_is_noop() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (id, _stream) = registry.subscribe(post);

    assert!(registry.unsubscribe(post, SubscriberId(42)).is_ok());
    assert!(registry.unsubscribe(post, id).is_ok());
    assert!(registry.unsubscribe(post, id).is_ok());
    assert_eq!(registry.subscriber_count(post), 0);
}

#[tokio::test]
async fn test_undrained_subscriber_times_out_and_stays_registered() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (id, mut stream) = registry.subscribe(post);

    // nothing is buffered: the very first comment waits for a reader
    let started = Instant::now();
    let report = registry.publish(post, comment(post, "a", "first")).await;
    let elapsed = started.elapsed();

    assert_eq!(report.timed_out, 1);
    assert_eq!(report.delivered, 0);
    assert!(elapsed >= Duration::from_millis(450), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "returned after {elapsed:?}");
    assert!(registry.is_subscribed(post, id));

    // the skipped comment never shows up later
    assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));

    let (report, received) = tokio::join!(
        registry.publish(post, comment(post, "a", "second")),
        stream.recv(),
    );
    assert_eq!(report.delivered, 1);
    assert_eq!(received.unwrap().content, "second");
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_others() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (_, _stalled) = registry.subscribe(post);
    let (_, mut responsive) = registry.subscribe(post);

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(c) = responsive.recv().await {
            seen.push(c.content.clone());
            if seen.len() == 3 {
                break;
            }
        }
        seen
    });

    let mut reports = Vec::new();
    let started = Instant::now();
    for text in ["one", "two", "three"] {
        reports.push(registry.publish(post, comment(post, "a", text)).await);
    }

    // one timeout window per publish, not one per subscriber
    assert!(started.elapsed() < Duration::from_millis(2500));
    for report in &reports {
        assert_eq!(report.delivered, 1);
        assert_eq!(report.timed_out, 1);
    }
    assert_eq!(reader.await.unwrap(), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_unsubscribe_during_publish_skips_and_ends_stream() {
    let registry = Arc::new(Registry::with_timeout(Duration::from_secs(5)));
    let post = Uuid::new_v4();
    let (id, mut stream) = registry.subscribe(post);

    let publisher = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let report = registry.publish(post, comment(post, "a", "in flight")).await;
            (report, started.elapsed())
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.unsubscribe(post, id).unwrap();

    let ended = tokio::time::timeout(Duration::from_millis(100), stream.recv()).await;
    assert!(matches!(ended, Ok(None)), "stream still open: {ended:?}");

    let (report, elapsed) = publisher.await.unwrap();
    assert_eq!(report.delivered, 0);
    assert_eq!(report.closed, 1);
    assert!(elapsed < Duration::from_secs(1), "returned after {elapsed:?}");
    assert!(!registry.is_subscribed(post, id));
}

#[tokio::test]
async fn test_dropped_stream_is_reported_as_closed() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (id, stream) = registry.subscribe(post);
    drop(stream);

    let started = Instant::now();
    let report = registry.publish(post, comment(post, "a", "hi")).await;

    assert_eq!(report.closed, 1);
    assert!(started.elapsed() < Duration::from_millis(250));
    assert!(registry.is_subscribed(post, id));
}

#[tokio::test]
async fn test_publish_cancelled_before_start() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (_, mut stream) = registry.subscribe(post);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = registry
        .publish_until(post, comment(post, "a", "hi"), &cancel)
        .await;

    assert_eq!(report.cancelled, 1);
    assert_eq!(report.delivered, 0);
    assert!(matches!(stream.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_publish_cancelled_while_waiting() {
    let registry = Registry::with_timeout(Duration::from_secs(10));
    let post = Uuid::new_v4();
    let (_, _stalled) = registry.subscribe(post);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = registry
        .publish_until(post, comment(post, "a", "abandoned"), &cancel)
        .await;

    assert_eq!(report.cancelled, 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_subscribe_during_publish_is_not_blocked_and_misses_event() {
    let registry = Arc::new(Registry::with_timeout(Duration::from_millis(400)));
    let post = Uuid::new_v4();
    let (_, _stalled) = registry.subscribe(post);

    let publisher = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.publish(post, comment(post, "a", "slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let (late_id, mut late) = registry.subscribe(post);
    assert!(started.elapsed() < Duration::from_millis(50));

    let report = publisher.await.unwrap();
    assert_eq!(report.attempted(), 1);
    assert!(registry.is_subscribed(post, late_id));
    assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_comment_stream_implements_stream() {
    let registry = Registry::new();
    let post = Uuid::new_v4();
    let (id, stream) = registry.subscribe(post);
    let collector = tokio::spawn(stream.map(|c| c.content.clone()).collect::<Vec<String>>());

    for text in ["a", "b", "c"] {
        let report = registry.publish(post, comment(post, "x", text)).await;
        assert_eq!(report.delivered, 1);
    }
    registry.unsubscribe(post, id).unwrap();

    assert_eq!(collector.await.unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribers_get_distinct_ids() {
    let registry = Arc::new(Registry::new());
    let post = Uuid::new_v4();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let (id, stream) = registry.subscribe(post);
                drop(stream);
                id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(registry.subscriber_count(post), 32);
}
