//! Broker layer traits
//!
//! This module defines the abstract interface over the shared store that
//! coordinates the whole fleet: a registry set of workers, per-worker
//! free/busy slot sets, per-worker FIFO task queues, and single-use reply
//! slots. The trait carries the atomicity contracts; the physical encoding
//! lives in the implementations.

use async_trait::async_trait;
use std::time::Duration;

use crate::Result;

/// Abstract broker connection shared by the lease allocator and the RPC
/// channel.
///
/// Implementations must make `pop_move` a single atomic step visible to
/// every client: no two concurrent callers may ever receive the same
/// member, and a member is never observable in both sets at once.
#[async_trait]
pub trait Broker: Send + Sync + std::fmt::Debug {
    /// Read all members of a set
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Number of members in a set
    async fn set_len(&self, key: &str) -> Result<usize>;

    /// Add a member to a set; returns true when newly inserted
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove a member from a set; returns true when it was present
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Atomically pop one arbitrary member of `from` and insert it into
    /// `to`, as one indivisible server-side step. Returns the moved member,
    /// or None when `from` is empty.
    async fn pop_move(&self, from: &str, to: &str) -> Result<Option<String>>;

    /// Append a payload to a FIFO queue
    async fn push(&self, queue: &str, payload: &str) -> Result<()>;

    /// Block until the head of `queue` is available or `timeout` elapses.
    /// Returns None on timeout. The read consumes the element.
    async fn blocking_pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Liveness probe
    async fn ping(&self) -> Result<()>;
}
