use ember::io::{Interest, wait};
use ember::net::{Family, Socket};
use ember::{RuntimeBuilder, spawn};
use std::net::{SocketAddr, TcpListener};

fn pipe() -> (i32, i32) {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
    assert_eq!(rc, 0);
    (fds[0], fds[1])
}

#[test]
fn test_default_builder() {
    let rt = RuntimeBuilder::default().build().unwrap();

    assert_eq!(rt.block_on(async { 42 }).unwrap(), 42);
}

#[test]
fn test_small_event_capacity_still_delivers_every_event() {
    let rt = RuntimeBuilder::new().event_capacity(1).build().unwrap();

    let total = rt
        .block_on(async {
            let pipes: Vec<_> = (0..4).map(|_| pipe()).collect();

            let waiters: Vec<_> = pipes
                .iter()
                .map(|&(r, _)| spawn(async move { wait(r, Interest::READABLE).await.is_ok() }))
                .collect();

            ember::yield_now().await;

            for &(_, w) in &pipes {
                let n = unsafe { libc::write(w, b"x".as_ptr().cast(), 1) };
                assert_eq!(n, 1);
            }

            let mut total = 0;
            for waiter in waiters {
                total += waiter.await as usize;
            }

            for (r, w) in pipes {
                unsafe {
                    libc::close(r);
                    libc::close(w);
                }
            }

            total
        })
        .unwrap();

    assert_eq!(total, 4);
}

#[test]
fn test_waiter_table_grows_past_max_fds() {
    let rt = RuntimeBuilder::new().max_fds(1).build().unwrap();

    let ready = rt
        .block_on(async {
            let (r, w) = pipe();
            assert!(r > 1);

            unsafe { libc::write(w, b"x".as_ptr().cast(), 1) };
            let ready = wait(r, Interest::READABLE).await.unwrap();

            unsafe {
                libc::close(r);
                libc::close(w);
            }

            ready
        })
        .unwrap();

    assert!(ready.is_readable());
}

#[test]
#[should_panic(expected = "event_capacity must be > 0")]
fn test_zero_event_capacity_panics() {
    let _ = RuntimeBuilder::new().event_capacity(0);
}

#[test]
fn test_dropping_runtime_closes_task_sockets() {
    let addr: SocketAddr = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap()
    };

    {
        let rt = RuntimeBuilder::new().build().unwrap();
        let listener = Socket::new_in(Family::V4, rt.handle()).unwrap();
        listener.bind(addr).unwrap();
        listener.listen(16).unwrap();

        rt.spawn(async move {
            let _ = listener.accept().await;
        });

        // The accept task is now parked on the listener.
        rt.block_on(async {}).unwrap();
    }

    TcpListener::bind(addr).expect("listener should be closed with the runtime");
}

#[ember::test(event_capacity = 4)]
async fn test_macro_accepts_event_capacity() {
    let handle = spawn(async { "ok" });

    assert_eq!(handle.await, "ok");
}
