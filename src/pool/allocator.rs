//! Lease allocator
//!
//! Claims one idle browser out of the shared pool. The scan order over
//! workers is a fresh uniform shuffle per attempt so load spreads across
//! the fleet instead of always landing on the first-registered worker.
//! The claim itself is the broker's atomic pop-move; this code never
//! read-modify-writes the shared sets.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::pool::keys;
use crate::pool::lease::BrowserType;
use crate::{Error, Result};

/// Allocates browsers from the shared pool
#[derive(Debug, Clone)]
pub struct LeaseAllocator {
    broker: Arc<dyn Broker>,
}

impl LeaseAllocator {
    /// Create a new allocator over a broker connection
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Claim one free browser of the requested type.
    ///
    /// Returns the `(worker, browser_id)` pair on success, or
    /// `NoBrowsersAvailable` once every known worker has been tried.
    /// Allocation misses are never retried here; that choice belongs to
    /// the caller.
    pub async fn claim(&self, browser_type: BrowserType) -> Result<(String, String)> {
        let mut workers = self.broker.set_members(&keys::registry()).await?;
        if workers.is_empty() {
            return Err(Error::no_browsers(browser_type.as_str()));
        }

        workers.shuffle(&mut rand::thread_rng());
        debug!("Scanning {} workers for a free {} browser", workers.len(), browser_type);

        for worker in workers {
            let free = keys::free(&worker, browser_type);
            let busy = keys::busy(&worker, browser_type);

            if let Some(browser_id) = self.broker.pop_move(&free, &busy).await? {
                info!("Claimed browser {} on worker {}", browser_id, worker);
                return Ok((worker, browser_id));
            }
        }

        Err(Error::no_browsers(browser_type.as_str()))
    }

    /// Return a browser to the free set. Best-effort reconciliation used
    /// when the remote release RPC could not be delivered.
    pub async fn reclaim(&self, worker: &str, browser_type: BrowserType, browser_id: &str) -> Result<()> {
        let busy = keys::busy(worker, browser_type);
        let free = keys::free(worker, browser_type);

        self.broker.set_remove(&busy, browser_id).await?;
        self.broker.set_add(&free, browser_id).await?;
        info!("Reclaimed browser {} on worker {} into the free set", browser_id, worker);
        Ok(())
    }
}
