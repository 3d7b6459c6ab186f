//! Session options

/// Profile policy for a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileOption {
    /// No persistence; the worker uses a throwaway profile
    #[default]
    Ephemeral,
    /// Allocate-or-reuse the identifier persisted for this project
    Persistent,
    /// Use the given identifier verbatim
    Named(String),
}

/// Options supplied at acquisition time
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Capture a video of the session on the worker
    pub video: bool,
    /// Record the action stream on the worker
    pub record: bool,
    /// Browser profile policy
    pub profile: ProfileOption,
}

impl SessionOptions {
    /// Whether any session-scoped flag needs to reach the worker before
    /// the first caller-visible action
    pub fn needs_init(&self) -> bool {
        self.video || self.record || self.profile != ProfileOption::Ephemeral
    }
}
