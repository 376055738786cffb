use ember::time::sleep;
use ember::{Error, Handle, RuntimeBuilder, spawn};
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Sets a flag when dropped.
struct DropFlag(Rc<Cell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

#[test]
fn test_shutdown_from_another_thread() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let shutdown = rt.shutdown_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        shutdown.shutdown();
    });

    let start = Instant::now();
    let result = rt.block_on(sleep(Duration::from_secs(30)));
    stopper.join().unwrap();

    assert!(matches!(result, Err(Error::Shutdown)));
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "Shutdown should interrupt a blocked dispatch loop"
    );
}

#[test]
fn test_shutdown_from_inside_a_task() {
    let rt = RuntimeBuilder::new().build().unwrap();

    let result = rt.block_on(async {
        let shutdown = Handle::current().shutdown_handle();

        spawn(async move {
            sleep(Duration::from_millis(10)).await;
            shutdown.shutdown();
        });

        sleep(Duration::from_secs(30)).await;
    });

    assert!(matches!(result, Err(Error::Shutdown)));
}

#[test]
fn test_shutdown_drops_root_future() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let dropped = Rc::new(Cell::new(false));
    let guard = DropFlag(dropped.clone());

    rt.shutdown_handle().shutdown();

    let result = rt.block_on(async move {
        let _guard = guard;
        sleep(Duration::from_secs(30)).await;
    });

    assert!(matches!(result, Err(Error::Shutdown)));
    assert!(dropped.get(), "The root future should be dropped on shutdown");
}

#[test]
fn test_shutdown_is_permanent() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let shutdown = rt.shutdown_handle();

    shutdown.shutdown();
    assert!(shutdown.is_shutdown());

    assert!(matches!(rt.block_on(async { 1 }), Err(Error::Shutdown)));
    assert!(matches!(rt.block_on(async { 2 }), Err(Error::Shutdown)));
}

#[test]
fn test_signal_requests_shutdown() {
    let _ = env_logger::builder().is_test(true).try_init();

    let rt = RuntimeBuilder::new()
        .shutdown_on(&[libc::SIGUSR1])
        .build()
        .unwrap();

    let result = rt.block_on(async {
        sleep(Duration::from_millis(10)).await;

        // Directed at this thread, where the signal is blocked and queued
        // for the runtime's signalfd.
        let rc = unsafe { libc::raise(libc::SIGUSR1) };
        assert_eq!(rc, 0);

        sleep(Duration::from_secs(30)).await;
    });

    assert!(matches!(result, Err(Error::Shutdown)));
    assert!(rt.shutdown_handle().is_shutdown());
}

#[test]
fn test_shutdown_handle_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}

    assert_send_sync::<ember::ShutdownHandle>();
}
