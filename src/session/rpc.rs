//! Worker RPC envelope types
//!
//! The request envelope rides a worker's task queue; the reply lands in a
//! single-use slot keyed by the task id. `action` and `args` are opaque to
//! this layer; the worker interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pool::BrowserType;

/// Request envelope enqueued onto a worker's task queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Fresh unguessable task id
    pub task_id: String,
    /// Target browser instance
    pub browser_id: String,
    /// Worker owning the browser
    pub worker_name: String,
    /// Capability name, uninterpreted here
    pub action: String,
    /// Capability payload, uninterpreted here
    pub args: Value,
    /// Reply slot key derived from the task id
    pub result_key: String,

    // Deferred session initialization, present only until the worker has
    // consumed it once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_type: Option<BrowserType>,
}

/// Reply status reported by the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// Action executed and succeeded
    Ok,
    /// Action could not be executed (or the reply never arrived)
    Error,
    /// Action executed and reported failure (assertions)
    Fail,
}

/// Reply envelope read from the reply slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    /// Human-readable message for error/fail replies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Action-specific payload
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl Reply {
    /// Synthesize a structured error reply (timeouts, transport faults)
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            error: Some(message.into()),
            data: serde_json::Map::new(),
        }
    }

    /// Whether the worker executed the action successfully
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }

    /// Fetch a field of the action-specific payload
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Fetch a string field of the action-specific payload
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }
}
