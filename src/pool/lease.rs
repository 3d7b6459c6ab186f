//! Lease record and browser types

use serde::{Deserialize, Serialize};

/// Browser engine offered by the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chrome,
    Firefox,
    Webkit,
}

impl BrowserType {
    /// Wire/key representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chrome => "chrome",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for BrowserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-local record of exclusively holding one browser instance.
///
/// Created by a successful acquisition, destroyed on release. At most one
/// exists per session at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Leased browser instance id
    pub browser_id: String,
    /// Worker that owns the browser
    pub worker: String,
    /// Browser engine
    pub browser_type: BrowserType,
    /// Session-scoped capture flags pushed to the worker on first contact
    pub video: bool,
    pub record: bool,
    /// Persistent profile identifier, when requested
    pub profile_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_type_wire_format() {
        assert_eq!(BrowserType::Chrome.as_str(), "chrome");
        assert_eq!(BrowserType::Webkit.to_string(), "webkit");

        let json = serde_json::to_string(&BrowserType::Firefox).unwrap();
        assert_eq!(json, "\"firefox\"");
        let parsed: BrowserType = serde_json::from_str("\"chrome\"").unwrap();
        assert_eq!(parsed, BrowserType::Chrome);
    }
}
