//! Outbound staging buffer shared between caller threads and the event loop.
//!
//! Callers append complete wire lines with [`SendQueue::enqueue`]; the event
//! loop moves them onto the socket with [`SendQueue::drain`]. Both sides take
//! the same lock, bounded by the configured timeout so that a stuck holder is
//! reported as a deadlock instead of hanging the process.

use std::io::{self, Write};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::error::ClientError;

const QUEUE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::send_queue");

#[derive(Debug, Default)]
struct Buffer {
    bytes: Vec<u8>,
    open: bool,
}

/// Mutex-guarded byte queue with a size cap and a "data pending" signal.
///
/// The pending flag is only changed while the buffer lock is held, so it
/// always agrees with the buffer contents.
#[derive(Debug)]
pub(crate) struct SendQueue {
    buffer: Mutex<Buffer>,
    pending: Mutex<bool>,
    wake: Condvar,
    limit: usize,
    lock_timeout: Duration,
}

impl SendQueue {
    pub(crate) fn new(limit: usize, lock_timeout: Duration) -> Self {
        Self {
            buffer: Mutex::new(Buffer::default()),
            pending: Mutex::new(false),
            wake: Condvar::new(),
            limit,
            lock_timeout,
        }
    }

    /// Accepts messages again after a fresh connection.
    pub(crate) fn open(&self) -> Result<(), ClientError> {
        let mut buffer = self.lock()?;
        buffer.bytes.clear();
        buffer.open = true;
        self.set_pending(false);
        Ok(())
    }

    /// Rejects further messages and discards anything not yet written.
    pub(crate) fn close(&self) {
        match self.lock() {
            Ok(mut buffer) => {
                buffer.open = false;
                if !buffer.bytes.is_empty() {
                    trace!(
                        target: QUEUE_TARGET,
                        discarded = buffer.bytes.len(),
                        "discarding unsent bytes"
                    );
                }
                buffer.bytes.clear();
                self.set_pending(false);
            }
            Err(error) => {
                warn!(target: QUEUE_TARGET, error = %error, "send queue not cleared");
            }
        }
    }

    /// Appends one serialised line.
    ///
    /// Fails without touching the buffer when the queue is closed or when the
    /// line would push it past the limit.
    pub(crate) fn enqueue(&self, line: &[u8]) -> Result<(), ClientError> {
        let mut buffer = self.lock()?;
        if !buffer.open {
            return Err(ClientError::Stopped);
        }
        let pending = buffer.bytes.len();
        if pending.saturating_add(line.len()) > self.limit {
            return Err(ClientError::SendBufferFull {
                pending,
                incoming: line.len(),
                limit: self.limit,
            });
        }
        buffer.bytes.extend_from_slice(line);
        self.set_pending(true);
        Ok(())
    }

    /// Writes as much of the queue as `writer` accepts in one call.
    ///
    /// Only the written prefix is removed. `WouldBlock` and `Interrupted` are
    /// not errors and leave the queue as it was.
    pub(crate) fn drain<W: Write>(&self, writer: &mut W) -> Result<usize, ClientError> {
        let mut buffer = self.lock()?;
        if buffer.bytes.is_empty() {
            self.set_pending(false);
            return Ok(0);
        }
        let written = match writer.write(&buffer.bytes) {
            Ok(0) => {
                return Err(ClientError::io(
                    "write",
                    io::Error::from(io::ErrorKind::WriteZero),
                ));
            }
            Ok(written) => written.min(buffer.bytes.len()),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(0);
            }
            Err(error) => return Err(ClientError::io("write", error)),
        };
        buffer.bytes.drain(..written);
        if buffer.bytes.is_empty() {
            self.set_pending(false);
        }
        drop(buffer);
        trace!(target: QUEUE_TARGET, bytes = written, "wrote queued data");
        Ok(written)
    }

    /// Blocks until data is pending or `timeout` elapses; returns whether
    /// data is pending.
    pub(crate) fn wait_for_data(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending
            && self
                .wake
                .wait_while_for(&mut pending, |pending| !*pending, timeout)
                .timed_out()
        {
            return false;
        }
        *pending
    }

    /// Bytes waiting to be written.
    #[cfg(test)]
    pub(crate) fn len(&self) -> Result<usize, ClientError> {
        Ok(self.lock()?.bytes.len())
    }

    /// Callers hold the buffer lock.
    fn set_pending(&self, value: bool) {
        let mut pending = self.pending.lock();
        *pending = value;
        if value {
            self.wake.notify_all();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buffer>, ClientError> {
        self.buffer
            .try_lock_for(self.lock_timeout)
            .ok_or(ClientError::LockTimeout {
                waited: self.lock_timeout,
            })
    }

    #[cfg(test)]
    pub(crate) fn hold_lock_for(&self, duration: Duration) {
        let guard = self.buffer.lock();
        std::thread::sleep(duration);
        drop(guard);
    }
}
