//! Mock broker implementation for testing
//!
//! An in-memory stand-in for the shared store. All mutation happens under
//! one lock, so `pop_move` is linearizable exactly like the server-side
//! script it models. Supports scripted failures and operation counting so
//! tests can assert on retry behavior and on the absence of broker I/O.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::traits::Broker;
use crate::{Error, Result};

/// Poll interval for the mock's blocking read
const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct MockState {
    sets: HashMap<String, HashSet<String>>,
    queues: HashMap<String, VecDeque<String>>,
    /// Scripted errors, consumed one per operation
    failures: VecDeque<Error>,
}

/// In-memory mock broker
#[derive(Debug, Default)]
pub struct MockBroker {
    state: Mutex<MockState>,
    /// Total operations attempted against this broker
    ops: AtomicU64,
}

impl MockBroker {
    /// Create an empty mock broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the shared state, recovering from a poisoned lock
    fn locked(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a set with members
    pub fn seed_set(&self, key: &str, members: &[&str]) {
        let mut state = self.locked();
        let set = state.sets.entry(key.to_string()).or_default();
        for member in members {
            set.insert(member.to_string());
        }
    }

    /// Script an error for the next operation. Multiple calls queue up,
    /// one error per subsequent operation.
    pub fn inject_failure(&self, error: Error) {
        self.locked().failures.push_back(error);
    }

    /// Number of operations attempted so far
    pub fn op_count(&self) -> u64 {
        self.ops.load(Ordering::SeqCst)
    }

    /// Members of a set, for test assertions
    pub fn set_snapshot(&self, key: &str) -> HashSet<String> {
        self.locked().sets.get(key).cloned().unwrap_or_default()
    }

    /// Queue contents, for test assertions
    pub fn queue_snapshot(&self, key: &str) -> Vec<String> {
        self.locked()
            .queues
            .get(key)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Count the op and pop any scripted failure
    fn enter_op(&self) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        match self.locked().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.enter_op()?;
        let state = self.locked();
        Ok(state
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_len(&self, key: &str) -> Result<usize> {
        self.enter_op()?;
        let state = self.locked();
        Ok(state.sets.get(key).map(|s| s.len()).unwrap_or(0))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        self.enter_op()?;
        let mut state = self.locked();
        Ok(state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.enter_op()?;
        let mut state = self.locked();
        Ok(state
            .sets
            .get_mut(key)
            .map(|s| s.remove(member))
            .unwrap_or(false))
    }

    async fn pop_move(&self, from: &str, to: &str) -> Result<Option<String>> {
        self.enter_op()?;
        // Single lock scope: the pop and the insert are one atomic step
        let mut state = self.locked();
        let member = match state.sets.get_mut(from) {
            Some(set) => match set.iter().next().cloned() {
                Some(member) => {
                    set.remove(&member);
                    Some(member)
                }
                None => None,
            },
            None => None,
        };
        if let Some(ref member) = member {
            state
                .sets
                .entry(to.to_string())
                .or_default()
                .insert(member.clone());
        }
        Ok(member)
    }

    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        self.enter_op()?;
        let mut state = self.locked();
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        self.enter_op()?;
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = self.locked();
                if let Some(payload) = state.queues.get_mut(queue).and_then(|q| q.pop_front()) {
                    return Ok(Some(payload));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.enter_op()?;
        let mut state = self.locked();
        state.sets.remove(key);
        state.queues.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.enter_op()
    }
}
