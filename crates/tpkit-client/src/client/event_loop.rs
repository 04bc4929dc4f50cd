//! The single-threaded socket loop.

use std::io::{self, Read};
use std::net::TcpStream;

use tpkit_protocol::FrameBuffer;
use tracing::{debug, trace};

use super::Shared;
use crate::error::ClientError;
use crate::pool::WorkerPool;
use crate::readiness;

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::event_loop");

/// Owns the socket and the receive buffer for one session.
pub(super) struct EventLoop<'a> {
    shared: &'a Shared,
    pool: &'a WorkerPool,
    stream: TcpStream,
    frames: FrameBuffer,
    chunk: Vec<u8>,
}

impl<'a> EventLoop<'a> {
    pub(super) fn new(shared: &'a Shared, pool: &'a WorkerPool, stream: TcpStream) -> Self {
        Self {
            shared,
            pool,
            stream,
            frames: FrameBuffer::with_limit(shared.options.max_frame_bytes()),
            chunk: vec![0; shared.options.receive_chunk_size()],
        }
    }

    /// Runs until the session is stopped.
    ///
    /// Errors raised after another thread already stopped the session are
    /// expected side effects of the socket shutdown and are not reported.
    pub(super) fn run(mut self) -> Result<(), ClientError> {
        debug!(target: LOOP_TARGET, "event loop started");
        while self.shared.is_connected() {
            if let Err(error) = self.turn() {
                if self.shared.is_connected() {
                    return Err(error);
                }
                debug!(target: LOOP_TARGET, error = %error, "ignoring error after stop");
                break;
            }
            self.shared
                .queue
                .wait_for_data(self.shared.options.sleep_period());
        }
        debug!(target: LOOP_TARGET, "event loop finished");
        Ok(())
    }

    fn turn(&mut self) -> Result<(), ClientError> {
        let ready = readiness::wait(&self.stream, self.shared.options.socket_event_timeout())
            .map_err(|source| ClientError::io("poll", source))?;
        if !self.shared.is_connected() {
            return Ok(());
        }
        if ready.readable {
            self.read()?;
        }
        if ready.writable {
            self.shared.queue.drain(&mut self.stream)?;
        }
        Ok(())
    }

    fn read(&mut self) -> Result<(), ClientError> {
        let count = match self.stream.read(&mut self.chunk) {
            Ok(0) => return Err(ClientError::PeerClosed),
            Ok(count) => count,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(());
            }
            Err(error) => return Err(ClientError::io("read", error)),
        };
        let received = self.chunk.get(..count).unwrap_or_default();
        let frames = self.frames.extend(received)?;
        trace!(target: LOOP_TARGET, bytes = count, frames = frames.len(), "read from host");
        for frame in frames {
            self.shared.process_frame(&frame, self.pool)?;
        }
        Ok(())
    }
}
