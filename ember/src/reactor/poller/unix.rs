use libc::{
    AF_INET, AF_INET6, CLOCK_MONOTONIC, EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, F_GETFL,
    F_SETFL, MSG_NOSIGNAL, O_NONBLOCK, RLIMIT_NOFILE, SFD_CLOEXEC, SFD_NONBLOCK, SHUT_RD,
    SHUT_RDWR, SHUT_WR, SIG_BLOCK, SO_ERROR, SO_REUSEADDR, SOCK_CLOEXEC, SOCK_STREAM,
    SOL_SOCKET, TFD_CLOEXEC, TFD_NONBLOCK, accept, bind, c_int, c_void, close, connect,
    epoll_create1, eventfd, fcntl, getpeername, getrlimit, getsockname, getsockopt, itimerspec,
    listen, pthread_sigmask, read, recv, rlimit, send, setsockopt, shutdown, sigaddset,
    sigemptyset, signalfd, signalfd_siginfo, sigset_t, sockaddr, sockaddr_in, sockaddr_in6,
    sockaddr_storage, socket, socklen_t, timerfd_create, timerfd_settime, timespec, write,
};
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::time::Duration;
use std::{io, mem, ptr};

/// Converts a `-1`-on-error return value into an `io::Result`.
fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Same as [`cvt`] for syscalls returning `ssize_t`.
fn cvt_size(rc: isize) -> io::Result<usize> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// Reads from a file descriptor into the given buffer.
///
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    cvt_size(unsafe { read(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len()) })
}

/// Writes the buffer to a file descriptor.
///
/// The file descriptor **must** be non-blocking.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    cvt_size(unsafe { write(fd, buffer.as_ptr() as *const c_void, buffer.len()) })
}

/// Receives from a connected socket.
pub(crate) fn sys_recv(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    cvt_size(unsafe { recv(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len(), 0) })
}

/// Sends on a connected socket.
///
/// `MSG_NOSIGNAL` turns a write to a closed peer into `EPIPE` instead of
/// killing the process with `SIGPIPE`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    cvt_size(unsafe {
        send(
            fd,
            buffer.as_ptr() as *const c_void,
            buffer.len(),
            MSG_NOSIGNAL,
        )
    })
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) -> io::Result<()> {
    cvt(unsafe { close(fd) }).map(drop)
}

/// Sets a file descriptor to non-blocking mode.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { fcntl(fd, F_GETFL) })?;

    if flags & O_NONBLOCK == 0 {
        cvt(unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) })?;
    }

    Ok(())
}

/// Creates a non-blocking stream socket.
pub(crate) fn sys_socket(domain: c_int) -> io::Result<RawFd> {
    let fd = cvt(unsafe { socket(domain, SOCK_STREAM | SOCK_CLOEXEC, 0) })?;

    if let Err(e) = sys_set_nonblocking(fd) {
        let _ = sys_close(fd);
        return Err(e);
    }

    Ok(fd)
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    cvt(unsafe { bind(fd, &storage as *const _ as *const sockaddr, len) }).map(drop)
}

/// Marks a socket as a listening socket.
pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    cvt(unsafe { listen(fd, backlog) }).map(drop)
}

/// Accepts a new incoming connection.
///
/// The returned client socket is automatically set to non-blocking mode.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = cvt(unsafe { accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;

    if let Err(e) = sys_set_nonblocking(client_fd) {
        let _ = sys_close(client_fd);
        return Err(e);
    }

    match sockaddr_storage_to_socketaddr(&storage) {
        Ok(addr) => Ok((client_fd, addr)),
        Err(e) => {
            let _ = sys_close(client_fd);
            Err(e)
        }
    }
}

/// Initiates a non-blocking connection.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);

    cvt(unsafe { connect(fd, &storage as *const _ as *const sockaddr, len) }).map(drop)
}

/// Reads and clears the pending socket error (`SO_ERROR`).
pub(crate) fn sys_take_socket_error(fd: RawFd) -> io::Result<Option<io::Error>> {
    let mut value: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    cvt(unsafe {
        getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut value as *mut _ as *mut c_void,
            &mut len,
        )
    })?;

    if value == 0 {
        Ok(None)
    } else {
        Ok(Some(io::Error::from_raw_os_error(value)))
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    cvt(unsafe { getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;

    sockaddr_storage_to_socketaddr(&storage)
}

/// Returns the remote address of a connected socket.
pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    cvt(unsafe { getpeername(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;

    sockaddr_storage_to_socketaddr(&storage)
}

/// Shuts down a socket.
pub(crate) fn sys_shutdown(fd: RawFd, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => SHUT_RD,
        Shutdown::Write => SHUT_WR,
        Shutdown::Both => SHUT_RDWR,
    };

    cvt(unsafe { shutdown(fd, how) }).map(drop)
}

/// Sets or clears `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd, enabled: bool) -> io::Result<()> {
    let value: c_int = enabled as c_int;

    cvt(unsafe {
        setsockopt(
            fd,
            SOL_SOCKET,
            SO_REUSEADDR,
            &value as *const _ as *const c_void,
            mem::size_of::<c_int>() as socklen_t,
        )
    })
    .map(drop)
}

/// Creates a close-on-exec `epoll` instance.
pub(crate) fn sys_epoll_create() -> io::Result<OwnedFd> {
    let fd = cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) })?;

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Creates a non-blocking `eventfd` with a zero counter.
pub(crate) fn sys_eventfd() -> io::Result<RawFd> {
    cvt(unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) })
}

/// Creates a one-shot monotonic `timerfd` that expires after `duration`.
///
/// An all-zero `it_value` would disarm the timer, so a zero duration is
/// armed with one nanosecond instead and fires on the next poll.
pub(crate) fn sys_timerfd(duration: Duration) -> io::Result<RawFd> {
    let fd = cvt(unsafe { timerfd_create(CLOCK_MONOTONIC, TFD_NONBLOCK | TFD_CLOEXEC) })?;

    let mut value = timespec {
        tv_sec: duration.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    if value.tv_sec == 0 && value.tv_nsec == 0 {
        value.tv_nsec = 1;
    }

    let spec = itimerspec {
        it_interval: timespec {
            tv_sec: 0,
            tv_nsec: 0,
        },
        it_value: value,
    };

    if let Err(e) = cvt(unsafe { timerfd_settime(fd, 0, &spec, ptr::null_mut()) }) {
        let _ = sys_close(fd);
        return Err(e);
    }

    Ok(fd)
}

/// Blocks `signals` on the calling thread and returns a `signalfd` for them.
pub(crate) fn sys_signalfd(signals: &[c_int]) -> io::Result<RawFd> {
    let mut set: sigset_t = unsafe { mem::zeroed() };

    unsafe {
        sigemptyset(&mut set);
        for &signal in signals {
            cvt(sigaddset(&mut set, signal))?;
        }
    }

    let rc = unsafe { pthread_sigmask(SIG_BLOCK, &set, ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }

    cvt(unsafe { signalfd(-1, &set, SFD_NONBLOCK | SFD_CLOEXEC) })
}

/// Reads one pending signal number from a `signalfd`.
///
/// Returns `Ok(None)` once no signal is pending.
pub(crate) fn sys_read_signal(fd: RawFd) -> io::Result<Option<c_int>> {
    let mut info: signalfd_siginfo = unsafe { mem::zeroed() };
    let size = mem::size_of::<signalfd_siginfo>();

    let rc = unsafe { read(fd, &mut info as *mut _ as *mut c_void, size) };

    match cvt_size(rc) {
        Ok(n) if n == size => Ok(Some(info.ssi_signo as c_int)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

/// Returns the soft limit on open file descriptors for this process.
pub(crate) fn sys_nofile_limit() -> io::Result<u64> {
    let mut limit = rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    cvt(unsafe { getrlimit(RLIMIT_NOFILE, &mut limit) })?;

    Ok(limit.rlim_cur as u64)
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockaddr_conversion_preserves_v4_and_v6() {
        for text in ["127.0.0.1:8000", "[::1]:9000"] {
            let addr: SocketAddr = text.parse().unwrap();
            let (storage, _) = socketaddr_to_storage(&addr);

            assert_eq!(sockaddr_storage_to_socketaddr(&storage).unwrap(), addr);
        }
    }

    #[test]
    fn zero_duration_timer_still_fires() {
        let fd = sys_timerfd(Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let mut buf = [0u8; 8];
        assert_eq!(sys_read(fd, &mut buf).unwrap(), 8);
        assert_eq!(u64::from_ne_bytes(buf), 1);

        sys_close(fd).unwrap();
    }

    #[test]
    fn timer_is_not_ready_before_expiry() {
        let fd = sys_timerfd(Duration::from_secs(60)).unwrap();

        let mut buf = [0u8; 8];
        let err = sys_read(fd, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        sys_close(fd).unwrap();
    }

    #[test]
    fn nofile_limit_is_positive() {
        assert!(sys_nofile_limit().unwrap() > 0);
    }
}
