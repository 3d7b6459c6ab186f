//! Apiary: client for a shared remote browser fleet
//!
//! This library leases one browser at a time out of a pool shared by many
//! independent client processes, drives it through a correlated
//! request/response protocol over a RESP2-speaking broker, and returns it
//! to the pool on release.

pub mod error;
pub mod config;

pub mod broker;
pub mod pool;
pub mod session;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use pool::{BrowserType, Lease};
pub use session::{BrowserSession, ProfileOption, Reply, ReplyStatus, SessionOptions};

/// Apiary library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
