use ember::io::{Interest, Timer, wait};
use ember::time::{sleep, timeout};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

#[ember::test]
async fn test_sleep_basic() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "Sleep should wait at least the specified duration"
    );
}

#[ember::test]
async fn test_sleep_zero_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(0)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(10),
        "Zero duration sleep should be fast"
    );
}

#[ember::test]
async fn test_sleep_in_function() {
    let start = Instant::now();
    sleep_and_record(start).await;
}

async fn sleep_and_record(start: Instant) {
    let elapsed_before = start.elapsed();
    sleep(Duration::from_millis(30)).await;
    let elapsed_after = start.elapsed();

    assert!(elapsed_after - elapsed_before >= Duration::from_millis(30));
}

#[ember::test]
async fn test_concurrent_sleeps_overlap() {
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| ember::spawn(sleep(Duration::from_millis(50))))
        .collect();

    for handle in handles {
        handle.await;
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(
        elapsed < Duration::from_millis(400),
        "Sleeps in different tasks should run concurrently, took {elapsed:?}"
    );
}

#[ember::test]
async fn test_timer_descriptor_becomes_readable() {
    let start = Instant::now();
    let timer = Timer::after(Duration::from_millis(20)).unwrap();

    let ready = wait(timer.as_raw_fd(), Interest::READABLE).await.unwrap();

    assert!(ready.is_readable());
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[ember::test]
async fn test_sleep_after_zero_timeout_waits_full_duration() {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
    assert_eq!(rc, 0);
    let (r, w) = (fds[0], fds[1]);

    let n = unsafe { libc::write(w, b"x".as_ptr().cast(), 1) };
    assert_eq!(n, 1);

    // The pipe and the zero deadline become ready in the same poll. Either
    // may win; the other wake-up must not leak into the sleep below.
    let _ = timeout(Duration::ZERO, wait(r, Interest::READABLE)).await;

    let start = Instant::now();
    sleep(Duration::from_millis(100)).await;
    let elapsed = start.elapsed();

    unsafe {
        libc::close(r);
        libc::close(w);
    }

    assert!(
        elapsed >= Duration::from_millis(100),
        "Sleep completed early after {elapsed:?}"
    );
}
