//! Broker key scheme
//!
//! One flat namespace, colon-separated. Workers and the fleet manager use
//! the same scheme; the client only ever reads the registry and moves
//! members between the free and busy sets.

use crate::pool::lease::BrowserType;

/// Registry set of currently-known worker names
pub fn registry() -> String {
    "apiary:workers".to_string()
}

/// Free-slot set for a worker/browser-type pair
pub fn free(worker: &str, browser_type: BrowserType) -> String {
    format!("apiary:{}:{}:free", worker, browser_type.as_str())
}

/// Busy-slot set for a worker/browser-type pair
pub fn busy(worker: &str, browser_type: BrowserType) -> String {
    format!("apiary:{}:{}:busy", worker, browser_type.as_str())
}

/// FIFO task queue for a worker
pub fn task_queue(worker: &str) -> String {
    format!("apiary:{}:tasks", worker)
}

/// Single-use reply slot for a task
pub fn reply(task_id: &str) -> String {
    format!("apiary:reply:{}", task_id)
}
