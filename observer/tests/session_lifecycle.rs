//! End-to-end session tests driven through a scripted watch facility.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use ubiwatch_observer::{
    ChangeLog, ChangeRecord, RawSignal, Result, SignalSender, WatchFacility, WatchGuard,
    WatchSession, WatchedLocation,
};

/// Watch facility whose signals are injected by the test.
#[derive(Default)]
struct ScriptedFacility {
    senders: Mutex<HashMap<WatchedLocation, SignalSender>>,
}

struct ScriptedGuard;

impl WatchGuard for ScriptedGuard {
    fn unsubscribe(self: Box<Self>) {}
}

impl WatchFacility for ScriptedFacility {
    fn subscribe(
        &self,
        location: &WatchedLocation,
        signals: SignalSender,
    ) -> Result<Box<dyn WatchGuard>> {
        self.senders
            .lock()
            .unwrap()
            .insert(location.clone(), signals);
        Ok(Box::new(ScriptedGuard))
    }
}

impl ScriptedFacility {
    fn sender(&self, location: &WatchedLocation) -> SignalSender {
        self.senders
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .expect("no subscription for location")
    }
}

fn loc(path: &str) -> WatchedLocation {
    WatchedLocation::new(path)
}

/// Wait until the log holds `expected` records or time out.
async fn wait_for_len(log: &ChangeLog, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while log.len().await < expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {expected} records, have {}",
            log.len().await
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_add_then_delete_scenario() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());
    let log = session.log();

    session.update_selection(vec![loc("/container/F")]).await;
    session.activate().await;

    let tx = facility.sender(&loc("/container/F"));
    tx.send(RawSignal::Appeared(loc("/container/F/x")).into())
        .await
        .unwrap();
    tx.send(RawSignal::Disappeared(loc("/container/F/x")).into())
        .await
        .unwrap();

    wait_for_len(&log, 2).await;
    assert_eq!(
        log.records().await,
        vec![
            ChangeRecord::Added {
                location: loc("/container/F/x")
            },
            ChangeRecord::Deleted {
                location: loc("/container/F/x")
            },
        ]
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_rename_produces_exactly_one_record() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());
    let log = session.log();

    session.update_selection(vec![loc("/container/R")]).await;
    session.activate().await;

    facility
        .sender(&loc("/container/R"))
        .send(
            RawSignal::Relocated {
                from: loc("/container/R/old.txt"),
                to: loc("/container/R/new.txt"),
            }
            .into(),
        )
        .await
        .unwrap();

    wait_for_len(&log, 1).await;
    assert_eq!(
        log.records().await,
        vec![ChangeRecord::Moved {
            from: loc("/container/R/old.txt"),
            to: loc("/container/R/new.txt"),
        }]
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_selection_change_discards_old_observer() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());
    let log = session.log();

    session.update_selection(vec![loc("/container/A")]).await;
    session.activate().await;
    let stale = facility.sender(&loc("/container/A"));

    session.update_selection(vec![loc("/container/B")]).await;
    assert_eq!(session.observed_locations(), vec![loc("/container/B")]);

    // The discarded observer's channel is closed; a late raw signal on
    // the old subscription cannot reach the log.
    let late = stale
        .send(RawSignal::Appeared(loc("/container/A/x")).into())
        .await;
    assert!(late.is_err());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(log.is_empty().await);

    session.shutdown().await;
}

#[tokio::test]
async fn test_in_order_events_are_logged_in_order() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());
    let log = session.log();

    session.update_selection(vec![loc("/container/F")]).await;
    session.activate().await;

    let tx = facility.sender(&loc("/container/F"));
    let mut expected = Vec::new();
    for i in 0..100 {
        let subject = loc(&format!("/container/F/item-{i}"));
        tx.send(RawSignal::Modified(subject.clone()).into())
            .await
            .unwrap();
        expected.push(ChangeRecord::Changed { location: subject });
    }

    wait_for_len(&log, expected.len()).await;
    assert_eq!(log.records().await, expected);

    session.shutdown().await;
}

#[tokio::test]
async fn test_deactivate_then_reactivate_resumes_last_selection() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());
    let log = session.log();

    session
        .update_selection(vec![loc("/container/A"), loc("/container/B")])
        .await;
    session.activate().await;
    assert_eq!(session.observed_locations().len(), 2);

    // Moving to the background tears everything down.
    session.deactivate().await;
    assert!(session.observed_locations().is_empty());
    assert!(!session.is_active());

    // Reactivation rebuilds from the last-known selection; the log
    // carries over.
    session.activate().await;
    let mut observed = session.observed_locations();
    observed.sort();
    assert_eq!(observed, vec![loc("/container/A"), loc("/container/B")]);

    facility
        .sender(&loc("/container/B"))
        .send(RawSignal::Appeared(loc("/container/B/new")).into())
        .await
        .unwrap();
    wait_for_len(&log, 1).await;

    session.shutdown().await;
}

#[tokio::test]
async fn test_selection_update_while_inactive_defers_subscription() {
    let facility = Arc::new(ScriptedFacility::default());
    let mut session = WatchSession::new(facility.clone());

    session.update_selection(vec![loc("/container/A")]).await;
    assert!(session.observed_locations().is_empty());

    session.activate().await;
    assert_eq!(session.observed_locations(), vec![loc("/container/A")]);

    session.shutdown().await;
}
