//! Polling loop behaviour with paused time.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cartography_lib::api::ProgressResponse;
use cartography_lib::progress::{
    JobStatus, PollOutcome, PollerConfig, ProgressPoller, ProgressState,
};
use tokio::sync::oneshot;

use common::{pending, sample_result, succeeded, Call, MockCartographyApi, ProgressStep};

fn status(name: &str) -> ProgressResponse {
    ProgressResponse {
        status: name.to_string(),
        ..pending()
    }
}

fn poller(api: &Arc<MockCartographyApi>, max_failures: Option<u32>) -> ProgressPoller {
    ProgressPoller::new(
        api.clone(),
        PollerConfig {
            interval: Duration::from_secs(2),
            max_consecutive_failures: max_failures,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn unknown_statuses_keep_polling_until_success() {
    let api = Arc::new(MockCartographyApi::new().with_progress(vec![
        ProgressStep::Respond(status("CREATED")),
        ProgressStep::Respond(status("IMPORTED")),
        ProgressStep::Respond(status("ANALYZING")),
        ProgressStep::Respond(succeeded(sample_result())),
    ]));

    let updates: Arc<Mutex<Vec<ProgressState>>> = Arc::default();
    let sink = updates.clone();
    let (tx, rx) = oneshot::channel();

    let _handle = poller(&api, None).start_monitoring(
        "proj-1".to_string(),
        move |progress| sink.lock().unwrap().push(progress),
        move |outcome| {
            let _ = tx.send(outcome);
        },
    );

    let outcome = rx.await.unwrap();
    assert!(matches!(outcome, PollOutcome::Succeeded(ref result) if result.total_pages == 5));
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 4);
    assert_eq!(
        updates.last().map(|progress| progress.status.clone()),
        Some(JobStatus::Success)
    );
    assert_eq!(api.count(|call| matches!(call, Call::FetchProgress)), 4);
}

#[tokio::test(start_paused = true)]
async fn first_poll_waits_one_interval() {
    let api = Arc::new(MockCartographyApi::new());
    let mut handle = poller(&api, None).start_monitoring("proj-1".to_string(), |_| {}, |_| {});

    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert_eq!(api.count(|call| matches!(call, Call::FetchProgress)), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(api.count(|call| matches!(call, Call::FetchProgress)), 1);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failure_cap_ends_monitoring() {
    let api = Arc::new(MockCartographyApi::new().with_progress(vec![ProgressStep::Unreachable]));
    let (tx, rx) = oneshot::channel();

    let _handle = poller(&api, Some(3)).start_monitoring(
        "proj-1".to_string(),
        |_| panic!("no progress expected"),
        move |outcome| {
            let _ = tx.send(outcome);
        },
    );

    match rx.await.unwrap() {
        PollOutcome::Failed(message) => assert!(message.contains("3 attempts")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(api.count(|call| matches!(call, Call::FetchProgress)), 3);
}

#[tokio::test(start_paused = true)]
async fn stopped_poller_never_reports() {
    let api = Arc::new(
        MockCartographyApi::new()
            .with_progress(vec![ProgressStep::Respond(succeeded(sample_result()))]),
    );
    let terminal_calls = Arc::new(Mutex::new(0));
    let counter = terminal_calls.clone();

    let mut handle = poller(&api, None).start_monitoring(
        "proj-1".to_string(),
        |_| {},
        move |_| *counter.lock().unwrap() += 1,
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop().await.unwrap();
    // Stopping again is a no-op.
    handle.stop().await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(*terminal_calls.lock().unwrap(), 0);
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels_the_loop() {
    let api = Arc::new(MockCartographyApi::new());

    let handle = poller(&api, None).start_monitoring("proj-1".to_string(), |_| {}, |_| {});
    tokio::time::sleep(Duration::from_millis(2500)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.count(|call| matches!(call, Call::FetchProgress)), 1);
}
