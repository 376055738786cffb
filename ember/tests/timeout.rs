use ember::task;
use ember::time::{Elapsed, sleep, timeout};
use std::future::pending;
use std::time::{Duration, Instant};

#[ember::test]
async fn test_timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(200), handle).await;

    assert!(
        matches!(result, Ok(v) if v == 123),
        "Timeout should return Ok(123)"
    );
}

#[ember::test]
async fn test_timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(100)).await;
        456
    });
    let result = timeout(Duration::from_millis(20), handle).await;

    assert!(
        result.is_err(),
        "Timeout should return an error when deadline is exceeded"
    );
}

#[ember::test]
async fn test_timeout_ready_future_beats_zero_deadline() {
    let result = timeout(Duration::ZERO, async { 7 }).await;

    assert_eq!(result, Ok(7));
}

#[ember::test]
async fn test_timeout_on_pending_future() {
    let start = Instant::now();
    let result: Result<(), Elapsed> = timeout(Duration::from_millis(30), pending()).await;

    let err = result.expect_err("a pending future should time out");
    assert_eq!(err.to_string(), "deadline has elapsed");
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[ember::test]
async fn test_timed_out_task_still_completes() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(40)).await;
        "done"
    });

    assert!(timeout(Duration::from_millis(5), sleep(Duration::from_millis(40)))
        .await
        .is_err());

    assert_eq!(handle.await, "done");
}
