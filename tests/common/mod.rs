//! Shared acceptance-test harness
//!
//! Stands up an in-memory fleet: a seeded mock broker plus one simulated
//! worker task per worker name. Each simulated worker serves its own task
//! queue, understands a small action vocabulary, and writes every reply to
//! the request's reply slot — enough to drive the full
//! acquire -> call -> reply -> release loop without a live fleet.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use apiary::broker::{Broker, MockBroker};
use apiary::pool::keys;
use apiary::session::TaskRequest;
use apiary::BrowserType;

/// A 1x1 transparent PNG, base64-encoded
pub const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

const BROWSER_TYPES: [BrowserType; 3] =
    [BrowserType::Chrome, BrowserType::Firefox, BrowserType::Webkit];

/// An in-memory fleet of simulated workers over a shared mock broker
pub struct Fleet {
    pub broker: Arc<MockBroker>,
}

impl Fleet {
    /// Seed the registry and free sets, then start one simulated worker
    /// task per worker. All browsers are chrome.
    pub fn start(workers: &[(&str, &[&str])]) -> Self {
        let broker = Arc::new(MockBroker::new());

        for (worker, browsers) in workers {
            broker.seed_set(&keys::registry(), &[worker]);
            broker.seed_set(&keys::free(worker, BrowserType::Chrome), browsers);
            spawn_sim_worker(broker.clone(), worker);
        }

        Self { broker }
    }
}

/// One simulated worker serving its own task queue
fn spawn_sim_worker(broker: Arc<MockBroker>, worker: &str) {
    let queue = keys::task_queue(worker);
    tokio::spawn(async move {
        while let Ok(Some(raw)) = broker.blocking_pop(&queue, Duration::from_secs(30)).await {
            let request: TaskRequest = match serde_json::from_str(&raw) {
                Ok(request) => request,
                Err(_) => continue,
            };
            let reply = handle_action(&broker, &request).await;
            let _ = broker.push(&request.result_key, &reply.to_string()).await;
        }
    });
}

/// The simulated worker's action vocabulary
async fn handle_action(broker: &Arc<MockBroker>, request: &TaskRequest) -> Value {
    match request.action.as_str() {
        "ping" => json!({"status": "ok"}),
        "navigate" => {
            let url = request.args.get("url").and_then(|v| v.as_str()).unwrap_or("");
            json!({"status": "ok", "url": url})
        }
        "title" => json!({"status": "ok", "title": "Simulated Page"}),
        "screenshot" => json!({"status": "ok", "screenshot": TINY_PNG_B64}),
        "assert_visible" => {
            let selector = request
                .args
                .get("selector")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if selector.contains("missing") {
                json!({
                    "status": "fail",
                    "error": format!("no element matches {}", selector),
                    "screenshot": TINY_PNG_B64,
                })
            } else {
                json!({"status": "ok", "visible": true})
            }
        }
        "stop_video" | "stop_recording" => json!({"status": "ok"}),
        "release_browser" => {
            // A real worker tears the browser down and returns its slot to
            // the free set; mirror that so reclaim round-trips work.
            for browser_type in BROWSER_TYPES {
                let busy = keys::busy(&request.worker_name, browser_type);
                let free = keys::free(&request.worker_name, browser_type);
                if broker
                    .set_remove(&busy, &request.browser_id)
                    .await
                    .unwrap_or(false)
                {
                    let _ = broker.set_add(&free, &request.browser_id).await;
                    break;
                }
            }
            json!({"status": "ok", "released": request.browser_id})
        }
        _ => json!({"status": "ok", "echo": request.action}),
    }
}
