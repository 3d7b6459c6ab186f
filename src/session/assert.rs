//! Remote assertion adapter
//!
//! Wraps actions whose semantic is "assert a condition remotely". A
//! `screenshot` flag is forced into the request so a failing assertion
//! comes back with a diagnostic image; the image is persisted to the
//! failure directory and the failure surfaces as an error carrying the
//! remote message. Artifact persistence is best-effort only and never
//! masks the assertion failure itself.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::session::client::BrowserSession;
use crate::session::rpc::{Reply, ReplyStatus};
use crate::{Error, Result};

impl BrowserSession {
    /// Run a remote assertion under the default call timeout
    pub async fn assert_action(&mut self, action: &str, selector: &str, args: Value) -> Result<Reply> {
        let timeout = self.default_timeout();
        self.assert_action_with_timeout(action, selector, args, timeout).await
    }

    /// Run a remote assertion, capturing a diagnostic artifact on failure
    pub async fn assert_action_with_timeout(
        &mut self,
        action: &str,
        selector: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Reply> {
        let mut args = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::internal(format!(
                    "Assertion args must be an object, got {}",
                    other
                )))
            }
        };
        args.entry("selector".to_string())
            .or_insert_with(|| Value::String(selector.to_string()));
        args.entry("screenshot".to_string())
            .or_insert(Value::Bool(true));

        let reply = self
            .call_with_timeout(action, Value::Object(args), timeout)
            .await?;

        if reply.status != ReplyStatus::Fail {
            return Ok(reply);
        }

        if let Some(image) = reply.get_str("screenshot") {
            self.persist_artifact(action, selector, image);
        }

        let message = reply
            .error
            .as_deref()
            .unwrap_or("Remote assertion failed")
            .to_string();
        Err(Error::assertion_failed(message))
    }

    /// Write the diagnostic image next to its peers, swallowing any
    /// persistence failure so it cannot mask the assertion itself
    fn persist_artifact(&self, action: &str, selector: &str, image_b64: &str) {
        let image = match BASE64.decode(image_b64) {
            Ok(image) => image,
            Err(e) => {
                warn!("Could not decode diagnostic image: {}", e);
                return;
            }
        };

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let filename = format!("{}_{}_{}.png", action, sanitize_selector(selector), timestamp);
        let dir = self.failure_dir().clone();
        let path = dir.join(filename);

        let written = std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::write(&path, &image));
        match written {
            Ok(()) => info!("Assertion artifact written to {}", path.display()),
            Err(e) => warn!("Could not persist assertion artifact: {}", e),
        }
    }
}

/// Reduce a selector to something safe in a filename
fn sanitize_selector(selector: &str) -> String {
    let cleaned: String = selector
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    cleaned.chars().take(48).collect()
}
