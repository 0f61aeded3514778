//! Best-effort release of temporary engine artifacts.

use tracing::warn;

use crate::engine::TranscodeEngine;

/// Upper bound on warnings surfaced to the caller.
const MAX_WARNINGS: usize = 16;

/// Tracks every temporary artifact written during one export call.
#[derive(Debug, Default)]
pub struct TempTracker {
    names: Vec<String>,
}

impl TempTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name for end-of-call removal, returning it for chaining.
    pub fn track(&mut self, name: impl Into<String>) -> String {
        let name = name.into();
        self.names.push(name.clone());
        name
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Delete every tracked artifact. Failures are logged and returned as a
    /// bounded warning list; they never propagate, because cleanup problems
    /// must not mask the primary result.
    pub async fn release_all(&mut self, engine: &dyn TranscodeEngine) -> Vec<String> {
        let mut warnings = Vec::new();
        for name in self.names.drain(..) {
            if let Err(e) = engine.remove_file(&name).await {
                warn!(artifact = %name, error = %e, "Failed to remove temporary artifact");
                if warnings.len() < MAX_WARNINGS {
                    warnings.push(format!("failed to remove {name}: {e}"));
                }
            }
        }
        warnings
    }
}
