//! Fixed-size worker pool that runs handlers off the event loop thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::ClientError;

const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Threads pulling jobs from one shared channel.
///
/// Jobs run in submission order per worker; with more than one worker,
/// completion order is unspecified.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn start(size: usize) -> Result<Self, ClientError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(size),
        };
        for index in 0..size.max(1) {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("tpkit-worker-{index}"))
                .spawn(move || work(&receiver))
                .map_err(|source| ClientError::WorkerPool { source })?;
            pool.workers.push(handle);
        }
        debug!(target: POOL_TARGET, workers = pool.workers.len(), "handler pool started");
        Ok(pool)
    }

    /// Queues `job`; returns `false` when the pool is shutting down.
    pub(crate) fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(Box::new(job)).is_ok())
    }

    /// Waits for every queued job to finish and stops the workers.
    pub(crate) fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!(target: POOL_TARGET, "handler worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(receiver: &Mutex<Receiver<Job>>) {
    loop {
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        match next {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}
