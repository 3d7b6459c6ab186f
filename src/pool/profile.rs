//! Persistent profile identifiers
//!
//! A profile id pins a browser profile on the worker side across sessions.
//! Persistence is one file per project in a well-known directory; the file
//! holds exactly one identifier string.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;

/// Stores one persisted profile identifier per project
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store location: `$HOME/.apiary/profiles`, falling back to a
    /// working-directory-relative path when HOME is unset.
    pub fn default_dir() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".apiary").join("profiles"),
            None => PathBuf::from(".apiary/profiles"),
        }
    }

    /// Project key: the working directory's basename
    fn project_key() -> String {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "default".to_string())
    }

    fn profile_path(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{}.profile", sanitize(project)))
    }

    /// Allocate-or-reuse the persisted identifier for the current project
    pub fn resolve(&self) -> Result<String> {
        self.resolve_for(&Self::project_key())
    }

    /// Allocate-or-reuse the persisted identifier for a named project
    pub fn resolve_for(&self, project: &str) -> Result<String> {
        let path = self.profile_path(project);

        if let Ok(existing) = std::fs::read_to_string(&path) {
            let id = existing.trim();
            if !id.is_empty() {
                debug!("Reusing persisted profile {} for project {}", id, project);
                return Ok(id.to_string());
            }
        }

        let id = Uuid::new_v4().to_string();
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, &id)?;
        info!("Allocated profile {} for project {}", id, project);
        Ok(id)
    }
}

/// Keep filenames portable: alphanumerics, dash and underscore only
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
