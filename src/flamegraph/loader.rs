//! Off-thread tree building.
//!
//! Each request runs on its own worker and sends back one complete tree.
//! Only the newest request's result is handed out; older results that
//! arrive late are dropped.

use super::tree::FrameTree;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Result of one load request
pub struct TreeUpdate {
    pub generation: u64,
    pub result: Result<FrameTree>,
}

pub struct TreeLoader {
    tx: Sender<TreeUpdate>,
    rx: Receiver<TreeUpdate>,
    requested: u64,
    delivered: u64,
}

impl Default for TreeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        TreeLoader {
            tx,
            rx,
            requested: 0,
            delivered: 0,
        }
    }

    /// Start building a tree on a worker thread; returns the request's generation
    pub fn request<F>(&mut self, job: F) -> Result<u64>
    where
        F: FnOnce() -> Result<FrameTree> + Send + 'static,
    {
        self.requested += 1;
        let generation = self.requested;
        let tx = self.tx.clone();
        thread::Builder::new()
            .name(format!("flame-load-{generation}"))
            .spawn(move || {
                let result = job();
                // The receiver only goes away when the host is shutting down
                let _ = tx.send(TreeUpdate { generation, result });
            })
            .map_err(|e| Error::Worker(format!("failed to spawn loader: {e}")))?;
        debug!("Requested tree load #{generation}");
        Ok(generation)
    }

    /// True while the newest request has not been delivered
    pub fn is_loading(&self) -> bool {
        self.delivered < self.requested
    }

    /// Drain finished loads without blocking, keeping only the newest request
    pub fn poll(&mut self) -> Option<TreeUpdate> {
        let mut latest = None;
        while let Ok(update) = self.rx.try_recv() {
            if let Some(update) = self.accept(update) {
                latest = Some(update);
            }
        }
        latest
    }

    /// Block until the newest request finishes or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<TreeUpdate> {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(update) => {
                    if let Some(update) = self.accept(update) {
                        return Some(update);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Tree load #{} still running after {:?}", self.requested, timeout);
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn accept(&mut self, update: TreeUpdate) -> Option<TreeUpdate> {
        if update.generation != self.requested {
            debug!(
                "Dropping stale tree load #{} (newest is #{})",
                update.generation, self.requested
            );
            return None;
        }
        self.delivered = update.generation;
        Some(update)
    }
}
