//! Typed action surface
//!
//! Thin wrappers mapping local method calls 1:1 onto remote action names.
//! Every method is a plain `call(action, args)` with the arguments the
//! worker expects; payloads come back to the caller as values, never as
//! files. The worker interprets the action; nothing here does.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use crate::session::client::BrowserSession;
use crate::session::rpc::Reply;
use crate::{Error, Result};

impl BrowserSession {
    /// Navigate the leased browser to a URL
    pub async fn navigate(&mut self, url: &str) -> Result<Reply> {
        self.call("navigate", json!({ "url": url })).await
    }

    /// Reload the current page
    pub async fn reload(&mut self) -> Result<Reply> {
        self.call("reload", Value::Null).await
    }

    /// Navigate back in history
    pub async fn go_back(&mut self) -> Result<Reply> {
        self.call("go_back", Value::Null).await
    }

    /// Navigate forward in history
    pub async fn go_forward(&mut self) -> Result<Reply> {
        self.call("go_forward", Value::Null).await
    }

    /// Current page URL
    pub async fn current_url(&mut self) -> Result<Option<String>> {
        let reply = self.call("current_url", Value::Null).await?;
        Ok(reply.get_str("url").map(String::from))
    }

    /// Current page title
    pub async fn title(&mut self) -> Result<Option<String>> {
        let reply = self.call("title", Value::Null).await?;
        Ok(reply.get_str("title").map(String::from))
    }

    /// Click the first element matching a selector
    pub async fn click(&mut self, selector: &str) -> Result<Reply> {
        self.call("click", json!({ "selector": selector })).await
    }

    /// Hover over the first element matching a selector
    pub async fn hover(&mut self, selector: &str) -> Result<Reply> {
        self.call("hover", json!({ "selector": selector })).await
    }

    /// Fill an input element with text
    pub async fn fill(&mut self, selector: &str, text: &str) -> Result<Reply> {
        self.call("fill", json!({ "selector": selector, "text": text })).await
    }

    /// Press a key, optionally scoped to an element
    pub async fn press(&mut self, selector: Option<&str>, key: &str) -> Result<Reply> {
        self.call("press", json!({ "selector": selector, "key": key })).await
    }

    /// Select an option of a `<select>` element by value
    pub async fn select_option(&mut self, selector: &str, value: &str) -> Result<Reply> {
        self.call("select_option", json!({ "selector": selector, "value": value }))
            .await
    }

    /// Scroll the page by a pixel delta
    pub async fn scroll(&mut self, dx: i64, dy: i64) -> Result<Reply> {
        self.call("scroll", json!({ "dx": dx, "dy": dy })).await
    }

    /// Set the viewport size
    pub async fn set_viewport(&mut self, width: u32, height: u32) -> Result<Reply> {
        self.call("set_viewport", json!({ "width": width, "height": height }))
            .await
    }

    /// Wait until an element matching the selector is present
    pub async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> Result<Reply> {
        self.call(
            "wait_for_selector",
            json!({ "selector": selector, "timeout_ms": timeout_ms }),
        )
        .await
    }

    /// Evaluate a script in the page and return its result field
    pub async fn evaluate(&mut self, script: &str) -> Result<Reply> {
        self.call("evaluate", json!({ "script": script })).await
    }

    /// Text content of the first element matching a selector
    pub async fn text_content(&mut self, selector: &str) -> Result<Option<String>> {
        let reply = self
            .call("text_content", json!({ "selector": selector }))
            .await?;
        Ok(reply.get_str("text").map(String::from))
    }

    /// Outer HTML of the current page
    pub async fn page_html(&mut self) -> Result<Option<String>> {
        let reply = self.call("page_html", Value::Null).await?;
        Ok(reply.get_str("html").map(String::from))
    }

    /// Capture a screenshot, returned as decoded PNG bytes
    pub async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let reply = self.call("screenshot", Value::Null).await?;
        let data = reply
            .get_str("screenshot")
            .ok_or_else(|| Error::internal("No image data in screenshot reply"))?;
        BASE64
            .decode(data)
            .map_err(|e| Error::internal(format!("Failed to decode screenshot: {}", e)))
    }

    /// Cookies of the current browser context
    pub async fn cookies(&mut self) -> Result<Value> {
        let reply = self.call("cookies", Value::Null).await?;
        Ok(reply.get("cookies").cloned().unwrap_or(Value::Array(vec![])))
    }

    /// Install cookies into the current browser context
    pub async fn set_cookies(&mut self, cookies: Value) -> Result<Reply> {
        self.call("set_cookies", json!({ "cookies": cookies })).await
    }

    /// Assert that an element matching the selector is visible
    pub async fn assert_visible(&mut self, selector: &str) -> Result<Reply> {
        self.assert_action("assert_visible", selector, Value::Null).await
    }

    /// Assert that an element's text contains the expected fragment
    pub async fn assert_text(&mut self, selector: &str, expected: &str) -> Result<Reply> {
        self.assert_action("assert_text", selector, json!({ "expected": expected }))
            .await
    }
}
