use ember::net::{Family, Socket};
use ember::spawn;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, OwnedFd};
use std::thread;
use std::time::Duration;

const RESPONSE: &[u8] =
    b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 14\r\n\r\nHello, World 1";

fn listener() -> Socket {
    let socket = Socket::new(Family::V4).unwrap();
    socket.set_reuse_address(true).unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    socket.listen(128).unwrap();
    socket
}

async fn recv_until(socket: &Socket, terminator: &[u8]) -> io::Result<Vec<u8>> {
    let mut received = Vec::new();

    while !received
        .windows(terminator.len())
        .any(|window| window == terminator)
    {
        let chunk = socket.recv(16384).await?;
        if chunk.is_empty() {
            break;
        }
        received.extend_from_slice(&chunk);
    }

    Ok(received)
}

#[ember::test]
async fn test_request_split_across_reads() {
    let server = listener();
    let addr = server.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET / HTTP/1.0\r\n").unwrap();
        thread::sleep(Duration::from_millis(20));
        stream.write_all(b"Host: localhost\r\n\r\n").unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).unwrap();
        response
    });

    let (conn, peer) = server.accept().await.unwrap();
    assert_eq!(conn.peer_addr().unwrap(), peer);

    let request = recv_until(&conn, b"\r\n\r\n").await.unwrap();
    assert!(request.ends_with(b"\r\n\r\n"));

    conn.sendall(RESPONSE).await.unwrap();
    conn.shutdown(Shutdown::Both).unwrap();
    conn.close().unwrap();

    let response = client.join().unwrap();
    assert_eq!(response, RESPONSE);
    assert!(response.ends_with(b"\r\n\r\nHello, World 1"));
}

#[ember::test]
async fn test_sendall_to_slow_reader() {
    const TOTAL: usize = 8 * 1024 * 1024;

    let server = listener();
    let addr = server.local_addr().unwrap();

    let reader = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        let mut buf = vec![0; 64 * 1024];
        let mut total = 0;

        loop {
            thread::sleep(Duration::from_micros(200));
            match stream.read(&mut buf).unwrap() {
                0 => break total,
                n => total += n,
            }
        }
    });

    let (conn, _) = server.accept().await.unwrap();
    let payload = vec![0xab; TOTAL];

    conn.sendall(&payload).await.unwrap();
    conn.close().unwrap();

    assert_eq!(reader.join().unwrap(), TOTAL);
}

#[ember::test]
async fn test_recv_returns_empty_on_peer_close() {
    let server = listener();
    let addr = server.local_addr().unwrap();

    let client = thread::spawn(move || {
        let stream = TcpStream::connect(addr).unwrap();
        drop(stream);
    });

    let (conn, _) = server.accept().await.unwrap();
    client.join().unwrap();

    assert!(conn.recv(1024).await.unwrap().is_empty());

    let mut buf = [0u8; 16];
    assert_eq!(conn.recv_into(&mut buf).await.unwrap(), 0);
}

#[ember::test]
async fn test_connect_to_blocking_peer() {
    let peer = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = peer.local_addr().unwrap();

    let echo = thread::spawn(move || {
        let (mut stream, _) = peer.accept().unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        stream.write_all(b"pong").unwrap();
    });

    let client = Socket::new(Family::V4).unwrap();
    client.connect(addr).await.unwrap();
    assert_eq!(client.peer_addr().unwrap(), addr);

    client.sendall(b"ping").await.unwrap();
    assert_eq!(client.recv(4).await.unwrap(), b"pong");

    echo.join().unwrap();
}

#[ember::test]
async fn test_connect_refused() {
    let addr: SocketAddr = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap()
    };

    let client = Socket::new(Family::V4).unwrap();
    let err = client.connect(addr).await.unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
}

#[ember::test]
async fn test_client_and_server_in_one_runtime() {
    let server = listener();
    let addr = server.local_addr().unwrap();

    let served = spawn(async move {
        let mut handlers = Vec::new();

        for _ in 0..3 {
            let (conn, _) = server.accept().await.unwrap();
            handlers.push(spawn(async move {
                let request = recv_until(&conn, b"\r\n\r\n").await.unwrap();
                conn.sendall(RESPONSE).await.unwrap();
                conn.close().unwrap();
                request.len()
            }));
        }

        let mut total = 0;
        for handler in handlers {
            total += handler.await;
        }
        total
    });

    let clients: Vec<_> = (0..3)
        .map(|_| {
            spawn(async move {
                let socket = Socket::new(Family::V4).unwrap();
                socket.connect(addr).await.unwrap();
                socket.sendall(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

                let mut response = Vec::new();
                loop {
                    let chunk = socket.recv(1024).await.unwrap();
                    if chunk.is_empty() {
                        break response;
                    }
                    response.extend_from_slice(&chunk);
                }
            })
        })
        .collect();

    for client in clients {
        assert_eq!(client.await, RESPONSE);
    }

    assert_eq!(served.await, 3 * b"GET / HTTP/1.0\r\n\r\n".len());
}

#[ember::test]
async fn test_ipv6_loopback() {
    let server = match Socket::new(Family::V6) {
        Ok(socket) => socket,
        // IPv6 disabled on this host.
        Err(_) => return,
    };
    if server.bind("[::1]:0".parse().unwrap()).is_err() {
        return;
    }
    server.listen(16).unwrap();

    let addr = server.local_addr().unwrap();
    assert!(addr.is_ipv6());

    let client = thread::spawn(move || TcpStream::connect(addr).unwrap());

    let (_conn, peer) = server.accept().await.unwrap();
    assert!(peer.is_ipv6());

    drop(client.join().unwrap());
}

#[ember::test]
async fn test_adopted_std_listener_is_non_blocking() {
    let std_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();

    let server = Socket::from_fd(OwnedFd::from(std_listener)).unwrap();
    let flags = unsafe { libc::fcntl(server.as_raw_fd(), libc::F_GETFL) };
    assert_ne!(flags & libc::O_NONBLOCK, 0);
    assert_eq!(server.local_addr().unwrap(), addr);

    let client = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"hi").unwrap();
    });

    let (conn, _) = server.accept().await.unwrap();
    assert_eq!(conn.recv(2).await.unwrap(), b"hi");

    client.join().unwrap();
}
