use crate::reactor::poller::platform::{
    sys_accept, sys_bind, sys_close, sys_connect, sys_listen, sys_peername, sys_recv, sys_send,
    sys_set_nonblocking, sys_set_reuseaddr, sys_shutdown, sys_sockname, sys_socket,
    sys_take_socket_error,
};
use crate::reactor::{Interest, Readiness, Ready};
use crate::runtime::Handle;

use libc::{AF_INET, AF_INET6, EINPROGRESS, c_int};
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

/// Address family of a [`Socket`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// IPv4 (`AF_INET`).
    V4,

    /// IPv6 (`AF_INET6`).
    V6,
}

impl Family {
    /// Returns the family matching `addr`.
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Family::V4,
            SocketAddr::V6(_) => Family::V6,
        }
    }

    fn domain(self) -> c_int {
        match self {
            Family::V4 => AF_INET,
            Family::V6 => AF_INET6,
        }
    }
}

/// A non-blocking TCP socket with a blocking-looking API.
///
/// Every operation first tries the syscall. When it would block, the
/// calling task waits for the socket to become ready and tries again, so
/// from the caller's point of view an awaited operation simply takes time.
/// Interrupted syscalls are retried; every other error is returned.
///
/// The socket is bound to the runtime it was created on and must be used
/// from that runtime's tasks. It is closed when dropped; use
/// [`close`](Self::close) to observe the close error.
///
/// # Examples
///
/// ```rust,ignore
/// use ember::net::{Family, Socket};
///
/// let listener = Socket::new(Family::V4)?;
/// listener.set_reuse_address(true)?;
/// listener.bind("127.0.0.1:8000".parse()?)?;
/// listener.listen(128)?;
///
/// loop {
///     let (client, _) = listener.accept().await?;
///     ember::spawn(async move {
///         let request = client.recv(1024).await;
///         // ...
///     });
/// }
/// ```
pub struct Socket {
    fd: OwnedFd,
    handle: Handle,
}

impl Socket {
    /// Creates a stream socket on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside [`Runtime::block_on`](crate::Runtime::block_on).
    pub fn new(family: Family) -> io::Result<Self> {
        Self::new_in(family, &Handle::current())
    }

    /// Creates a stream socket bound to `handle`'s runtime.
    pub fn new_in(family: Family, handle: &Handle) -> io::Result<Self> {
        let fd = sys_socket(family.domain())?;

        Ok(Self::from_raw(fd, handle.clone()))
    }

    /// Adopts an existing stream socket on the current runtime.
    ///
    /// The descriptor is switched to non-blocking mode, so sockets created
    /// elsewhere (for example a `std::net::TcpListener` converted with
    /// `OwnedFd::from`) can be driven by the runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside [`Runtime::block_on`](crate::Runtime::block_on).
    pub fn from_fd(fd: OwnedFd) -> io::Result<Self> {
        Self::from_fd_in(fd, &Handle::current())
    }

    /// Adopts an existing stream socket on `handle`'s runtime.
    pub fn from_fd_in(fd: OwnedFd, handle: &Handle) -> io::Result<Self> {
        sys_set_nonblocking(fd.as_raw_fd())?;

        Ok(Self {
            fd,
            handle: handle.clone(),
        })
    }

    fn from_raw(fd: RawFd, handle: Handle) -> Self {
        Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
            handle,
        }
    }

    /// Enables or disables `SO_REUSEADDR`.
    pub fn set_reuse_address(&self, enabled: bool) -> io::Result<()> {
        sys_set_reuseaddr(self.as_raw_fd(), enabled)
    }

    /// Binds the socket to a local address.
    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        sys_bind(self.as_raw_fd(), &addr)
    }

    /// Starts listening for incoming connections.
    pub fn listen(&self, backlog: i32) -> io::Result<()> {
        sys_listen(self.as_raw_fd(), backlog)
    }

    /// Accepts an incoming connection.
    ///
    /// The returned socket is non-blocking and bound to the same runtime.
    pub async fn accept(&self) -> io::Result<(Socket, SocketAddr)> {
        let fd = self.as_raw_fd();
        let (client, addr) = self.retry(Interest::READABLE, || sys_accept(fd)).await?;

        Ok((Self::from_raw(client, self.handle.clone()), addr))
    }

    /// Connects to a remote address.
    ///
    /// An in-progress connection waits for the socket to become writable and
    /// then reports the outcome stored in `SO_ERROR`.
    pub async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        match sys_connect(self.as_raw_fd(), &addr) {
            Ok(()) => return Ok(()),
            Err(err) if err.raw_os_error() == Some(EINPROGRESS) => {}
            // The connection keeps going in the background after EINTR.
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }

        self.wait(Interest::WRITABLE).await?;

        match sys_take_socket_error(self.as_raw_fd())? {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Receives up to `max_len` bytes.
    ///
    /// An empty vector means the peer closed the connection.
    pub async fn recv(&self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0; max_len];
        let n = self.recv_into(&mut buffer).await?;

        buffer.truncate(n);
        Ok(buffer)
    }

    /// Receives into `buffer` and returns the number of bytes read.
    ///
    /// `Ok(0)` with a non-empty buffer means the peer closed the connection.
    pub async fn recv_into(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let fd = self.as_raw_fd();

        self.retry(Interest::READABLE, || sys_recv(fd, buffer)).await
    }

    /// Sends part of `buffer` and returns the number of bytes written.
    ///
    /// Writing to a connection closed by the peer fails with
    /// `BrokenPipe` rather than raising `SIGPIPE`.
    pub async fn send(&self, buffer: &[u8]) -> io::Result<usize> {
        let fd = self.as_raw_fd();

        self.retry(Interest::WRITABLE, || sys_send(fd, buffer)).await
    }

    /// Sends the whole buffer, waiting for the socket to drain as needed.
    pub async fn sendall(&self, buffer: &[u8]) -> io::Result<()> {
        let mut sent = 0;

        while sent < buffer.len() {
            match self.send(&buffer[sent..]).await? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => sent += n,
            }
        }

        Ok(())
    }

    /// Shuts down the read half, the write half or both.
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        sys_shutdown(self.as_raw_fd(), how)
    }

    /// Closes the socket and reports the result of `close(2)`.
    pub fn close(self) -> io::Result<()> {
        let Self { fd, handle } = self;

        handle.forget(fd.as_raw_fd());
        sys_close(fd.into_raw_fd())
    }

    /// Returns the local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.as_raw_fd())
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        sys_peername(self.as_raw_fd())
    }

    /// Waits until the socket is ready for `interest`.
    async fn wait(&self, interest: Interest) -> io::Result<Ready> {
        Readiness::new(Some(self.handle.clone()), self.as_raw_fd(), interest).await
    }

    /// Runs `op` until it stops returning `WouldBlock` or `Interrupted`.
    async fn retry<T>(
        &self,
        interest: Interest,
        mut op: impl FnMut() -> io::Result<T>,
    ) -> io::Result<T> {
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    self.wait(interest).await?;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
