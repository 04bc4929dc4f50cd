//! Readiness wait on the client socket.
//!
//! The event loop registers interest in both directions, like a selector with
//! read and write interest. Write readiness is almost always reported, so the
//! loop's cadence is set by its idle wait rather than by this call.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

/// Directions the socket can make progress in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Readiness {
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}

impl Readiness {
    const IDLE: Self = Self {
        readable: false,
        writable: false,
    };
}

/// Waits up to `timeout` for the socket to become readable or writable.
///
/// Hang-ups and socket errors are reported as readable so the following read
/// observes them. A signal interrupting the wait counts as a timeout.
#[cfg(unix)]
pub(crate) fn wait(stream: &TcpStream, timeout: Duration) -> io::Result<Readiness> {
    use std::os::fd::AsRawFd;

    let mut descriptor = libc::pollfd {
        fd: stream.as_raw_fd(),
        events: libc::POLLIN | libc::POLLOUT,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    // SAFETY: `descriptor` is a single initialised pollfd borrowed mutably for
    // the duration of the call, and the count passed is 1.
    let result = unsafe { libc::poll(&raw mut descriptor, 1, millis) };
    if result < 0 {
        let error = io::Error::last_os_error();
        if error.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::IDLE);
        }
        return Err(error);
    }
    if result == 0 {
        return Ok(Readiness::IDLE);
    }
    let revents = descriptor.revents;
    if revents & libc::POLLNVAL != 0 {
        return Err(io::Error::from(io::ErrorKind::NotConnected));
    }
    Ok(Readiness {
        readable: revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0,
        writable: revents & libc::POLLOUT != 0,
    })
}

/// Fallback without `poll(2)`: report both directions and let the
/// non-blocking socket calls return `WouldBlock`.
#[cfg(not(unix))]
pub(crate) fn wait(_stream: &TcpStream, _timeout: Duration) -> io::Result<Readiness> {
    Ok(Readiness {
        readable: true,
        writable: true,
    })
}
