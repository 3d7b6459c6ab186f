//! End-to-end acceptance tests
//!
//! Drives the public API against the simulated fleet from `common`.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use apiary::broker::Broker;
use apiary::{BrowserSession, BrowserType, Config, Error, SessionOptions};
use common::Fleet;

fn test_config() -> Config {
    Config {
        call_timeout: 2,
        ..Config::default()
    }
}

fn session_over(fleet: &Fleet) -> BrowserSession {
    BrowserSession::with_broker(fleet.broker.clone() as Arc<dyn Broker>, &test_config()).unwrap()
}

#[tokio::test]
async fn test_full_session_loop() {
    let fleet = Fleet::start(&[("worker-a", &["b1", "b2"])]);
    let mut session = session_over(&fleet);

    session
        .acquire(BrowserType::Chrome, SessionOptions::default())
        .await
        .unwrap();

    let reply = session.navigate("https://example.com").await.unwrap();
    assert!(reply.is_ok());
    assert_eq!(reply.get_str("url"), Some("https://example.com"));

    assert_eq!(session.title().await.unwrap().as_deref(), Some("Simulated Page"));

    let png = session.screenshot().await.unwrap();
    assert_eq!(&png[1..4], b"PNG");

    let metadata = session.release().await.unwrap().unwrap();
    assert!(metadata.is_ok());
    assert!(!session.is_acquired());
}

#[tokio::test]
async fn test_released_browser_is_reclaimable() {
    let fleet = Fleet::start(&[("worker-a", &["only-browser"])]);

    let mut first = session_over(&fleet);
    first
        .acquire(BrowserType::Chrome, SessionOptions::default())
        .await
        .unwrap();
    let leased = first.lease().unwrap().browser_id.clone();

    // Pool of one: a second client finds nothing while the lease is held
    let mut second = session_over(&fleet);
    let result = second
        .acquire(BrowserType::Chrome, SessionOptions::default())
        .await;
    assert!(matches!(result, Err(Error::NoBrowsersAvailable(_))));

    first.release().await.unwrap();

    // After release the same browser comes around again
    second
        .acquire(BrowserType::Chrome, SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(second.lease().unwrap().browser_id, leased);
    second.release().await.unwrap();
}

#[tokio::test]
async fn test_racing_sessions_lease_disjoint_browsers() {
    let fleet = Fleet::start(&[
        ("worker-a", &["b1", "b2"]),
        ("worker-b", &["b3"]),
        ("worker-c", &["b4", "b5"]),
    ]);
    let pool_size = 5;
    let racers = 9;

    let handles: Vec<_> = (0..racers)
        .map(|_| {
            let mut session = session_over(&fleet);
            tokio::spawn(async move {
                match session
                    .acquire(BrowserType::Chrome, SessionOptions::default())
                    .await
                {
                    Ok(()) => Ok(session.lease().unwrap().clone()),
                    Err(e) => Err(e),
                }
            })
        })
        .collect();

    let mut leases = Vec::new();
    let mut misses = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(lease) => leases.push(lease),
            Err(Error::NoBrowsersAvailable(_)) => misses += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(leases.len(), pool_size);
    assert_eq!(misses, racers - pool_size);

    let distinct: HashSet<_> = leases
        .iter()
        .map(|l| (l.worker.clone(), l.browser_id.clone()))
        .collect();
    assert_eq!(distinct.len(), pool_size, "two sessions leased the same browser");
}

#[tokio::test]
async fn test_assertion_flow_end_to_end() {
    let fleet = Fleet::start(&[("worker-a", &["b1"])]);
    let failure_dir = tempfile::tempdir().unwrap();

    let config = Config {
        call_timeout: 2,
        failure_dir: failure_dir.path().to_string_lossy().into_owned(),
        ..Config::default()
    };
    let mut session =
        BrowserSession::with_broker(fleet.broker.clone() as Arc<dyn Broker>, &config).unwrap();

    session
        .acquire(BrowserType::Chrome, SessionOptions::default())
        .await
        .unwrap();

    // Passing assertion: no artifact
    session.assert_visible("#hero").await.unwrap();
    assert_eq!(std::fs::read_dir(failure_dir.path()).unwrap().count(), 0);

    // Failing assertion: one artifact, remote message surfaced
    let err = session.assert_visible("#missing-panel").await.unwrap_err();
    assert!(err.to_string().contains("no element matches #missing-panel"));
    assert_eq!(std::fs::read_dir(failure_dir.path()).unwrap().count(), 1);

    session.release().await.unwrap();
}

#[tokio::test]
async fn test_sessions_with_capture_flags() {
    let fleet = Fleet::start(&[("worker-a", &["b1"])]);
    let mut session = session_over(&fleet);

    let options = SessionOptions {
        video: true,
        record: true,
        ..SessionOptions::default()
    };
    session.acquire(BrowserType::Chrome, options).await.unwrap();
    session.navigate("https://example.com").await.unwrap();

    let metadata = session.release().await.unwrap().unwrap();
    assert!(metadata.is_ok());
    assert_eq!(metadata.get_str("released"), Some("b1"));
}
