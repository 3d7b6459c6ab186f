//! Browser session implementation
//!
//! One `BrowserSession` drives at most one leased browser at a time.
//! Acquisition claims a slot through the allocator; every action then
//! flows through the correlated request/reply channel; release returns
//! the browser to the pool and always clears local state, whatever the
//! remote outcome.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::{Broker, RespBroker};
use crate::config::Config;
use crate::pool::{keys, BrowserType, Lease, LeaseAllocator, ProfileStore};
use crate::session::options::{ProfileOption, SessionOptions};
use crate::session::rpc::{Reply, TaskRequest};
use crate::{Error, Result};

/// Idempotent action used to push session flags to the worker before the
/// first caller-visible action
const INIT_ACTION: &str = "ping";

/// Session lifecycle state
#[derive(Debug)]
enum SessionState {
    Unacquired,
    Acquired {
        lease: Lease,
        /// Set once the worker has seen (and consumed) the session flags
        initialized: bool,
    },
}

/// A client session over the shared browser fleet
#[derive(Debug)]
pub struct BrowserSession {
    broker: Arc<dyn Broker>,
    allocator: LeaseAllocator,
    profiles: ProfileStore,
    call_timeout: Duration,
    failure_dir: PathBuf,
    state: SessionState,
}

impl BrowserSession {
    /// Connect to the broker named by `config`
    pub fn connect(config: &Config) -> Result<Self> {
        let broker = Arc::new(RespBroker::from_config(config)?) as Arc<dyn Broker>;
        Self::with_broker(broker, config)
    }

    /// Build a session over an existing broker connection
    pub fn with_broker(broker: Arc<dyn Broker>, config: &Config) -> Result<Self> {
        config.validate()?;
        let profile_dir = config
            .profile_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(ProfileStore::default_dir);

        Ok(Self {
            allocator: LeaseAllocator::new(broker.clone()),
            profiles: ProfileStore::new(profile_dir),
            call_timeout: config.call_timeout(),
            failure_dir: PathBuf::from(&config.failure_dir),
            broker,
            state: SessionState::Unacquired,
        })
    }

    /// The held lease, if any
    pub fn lease(&self) -> Option<&Lease> {
        match &self.state {
            SessionState::Acquired { lease, .. } => Some(lease),
            SessionState::Unacquired => None,
        }
    }

    /// Whether a lease is currently held
    pub fn is_acquired(&self) -> bool {
        self.lease().is_some()
    }

    /// Directory assertion-failure artifacts are written to
    pub(crate) fn failure_dir(&self) -> &PathBuf {
        &self.failure_dir
    }

    /// Default worker RPC deadline
    pub(crate) fn default_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Lease one browser of the requested type.
    ///
    /// When any session-scoped option is set, an idempotent first RPC
    /// pushes the flags to the worker before any caller-visible action.
    pub async fn acquire(&mut self, browser_type: BrowserType, options: SessionOptions) -> Result<()> {
        if self.is_acquired() {
            return Err(Error::internal("Session already holds a lease"));
        }

        let profile_id = match &options.profile {
            ProfileOption::Ephemeral => None,
            ProfileOption::Persistent => Some(self.profiles.resolve()?),
            ProfileOption::Named(id) => Some(id.clone()),
        };

        let (worker, browser_id) = self.allocator.claim(browser_type).await?;
        info!("Acquired browser {} ({}) on worker {}", browser_id, browser_type, worker);

        let lease = Lease {
            browser_id,
            worker,
            browser_type,
            video: options.video,
            record: options.record,
            profile_id,
        };
        let needs_init = options.needs_init();
        self.state = SessionState::Acquired {
            lease,
            initialized: false,
        };

        if needs_init {
            // Push the session flags ahead of the first real action. The
            // reply may still time out; the flags ride every request until
            // one physically arrives.
            let reply = self.call(INIT_ACTION, Value::Null).await?;
            if !reply.is_ok() {
                warn!(
                    "Session init call did not succeed: {}",
                    reply.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Ok(())
    }

    /// Send one action to the leased browser and wait for its reply, under
    /// the default call timeout.
    pub async fn call(&mut self, action: &str, args: Value) -> Result<Reply> {
        self.call_with_timeout(action, args, self.call_timeout).await
    }

    /// Send one action to the leased browser and wait up to `timeout` for
    /// its reply.
    ///
    /// Timeouts and broker transport faults come back as structured
    /// `{status: "error"}` replies, not errors: the remote side effect may
    /// still happen after the wait is abandoned, so callers branch on
    /// `status` uniformly. Fails with `SessionNotAcquired` — before any
    /// broker I/O — when no lease is held.
    pub async fn call_with_timeout(
        &mut self,
        action: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Reply> {
        let (lease, initialized) = match &mut self.state {
            SessionState::Acquired { lease, initialized } => (lease, initialized),
            SessionState::Unacquired => return Err(Error::SessionNotAcquired),
        };

        Self::dispatch(&self.broker, lease, initialized, action, args, timeout).await
    }

    /// One correlated request/reply exchange against a specific lease
    async fn dispatch(
        broker: &Arc<dyn Broker>,
        lease: &Lease,
        initialized: &mut bool,
        action: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Reply> {
        let task_id = Uuid::new_v4().to_string();
        let result_key = keys::reply(&task_id);

        let request = TaskRequest {
            task_id: task_id.clone(),
            browser_id: lease.browser_id.clone(),
            worker_name: lease.worker.clone(),
            action: action.to_string(),
            args,
            result_key: result_key.clone(),
            video: (!*initialized).then_some(lease.video),
            record: (!*initialized).then_some(lease.record),
            profile_id: if *initialized { None } else { lease.profile_id.clone() },
            browser_type: (!*initialized).then_some(lease.browser_type),
        };
        let payload = serde_json::to_string(&request)?;

        debug!("Dispatching {} as task {} to worker {}", action, task_id, lease.worker);

        if let Err(e) = broker.push(&keys::task_queue(&lease.worker), &payload).await {
            warn!("Failed to enqueue task {}: {}", task_id, e);
            return Ok(Reply::error(format!("Broker transport failure: {}", e)));
        }

        match broker.blocking_pop(&result_key, timeout).await {
            Ok(Some(raw)) => {
                // A reply physically arrived, so the worker has consumed
                // the session flags; stop sending them.
                *initialized = true;
                match serde_json::from_str::<Reply>(&raw) {
                    Ok(reply) => Ok(reply),
                    Err(e) => {
                        warn!("Malformed reply for task {}: {}", task_id, e);
                        Ok(Reply::error(format!("Malformed worker reply: {}", e)))
                    }
                }
            }
            Ok(None) => {
                debug!("Task {} timed out after {:?}; outcome unknown", task_id, timeout);
                Ok(Reply::error("Timeout waiting for worker"))
            }
            Err(e) => {
                warn!("Reply wait for task {} failed: {}", task_id, e);
                Ok(Reply::error(format!("Broker transport failure: {}", e)))
            }
        }
    }

    /// Release the leased browser back to the pool.
    ///
    /// Stop-capture RPCs run first when the lease requested them
    /// (best-effort), then a final `release_browser` RPC whose structured
    /// result is returned as session metadata. Local lease state is
    /// cleared on every exit path, including transport errors; a remote
    /// release that could not be delivered triggers best-effort busy-set
    /// reconciliation and is logged when even that fails.
    pub async fn release(&mut self) -> Result<Option<Reply>> {
        // Take the lease out of the session first: whatever happens below,
        // this session no longer believes it owns a browser.
        let (lease, mut initialized) =
            match std::mem::replace(&mut self.state, SessionState::Unacquired) {
                SessionState::Acquired { lease, initialized } => (lease, initialized),
                SessionState::Unacquired => return Ok(None),
            };

        if lease.video {
            self.best_effort(&lease, &mut initialized, "stop_video").await;
        }
        if lease.record {
            self.best_effort(&lease, &mut initialized, "stop_recording").await;
        }

        let final_reply = Self::dispatch(
            &self.broker,
            &lease,
            &mut initialized,
            "release_browser",
            Value::Null,
            self.call_timeout,
        )
        .await?;

        if !final_reply.is_ok() {
            warn!(
                "Remote release of browser {} did not succeed: {}",
                lease.browser_id,
                final_reply.error.as_deref().unwrap_or("unknown error")
            );
            if let Err(e) = self
                .allocator
                .reclaim(&lease.worker, lease.browser_type, &lease.browser_id)
                .await
            {
                warn!(
                    "Busy entry for browser {} on worker {} may leak: {}",
                    lease.browser_id, lease.worker, e
                );
            }
        } else {
            info!("Released browser {} on worker {}", lease.browser_id, lease.worker);
        }

        Ok(Some(final_reply))
    }

    /// Run a cleanup RPC whose failure is recorded but never blocks release
    async fn best_effort(&self, lease: &Lease, initialized: &mut bool, action: &str) {
        match Self::dispatch(
            &self.broker,
            lease,
            initialized,
            action,
            Value::Null,
            self.call_timeout,
        )
        .await
        {
            Ok(reply) if reply.is_ok() => {}
            Ok(reply) => warn!(
                "Cleanup action {} did not succeed: {}",
                action,
                reply.error.as_deref().unwrap_or("unknown error")
            ),
            Err(e) => warn!("Cleanup action {} failed: {}", action, e),
        }
    }
}
