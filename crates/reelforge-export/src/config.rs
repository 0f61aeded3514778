//! Export configuration.

/// Configuration for the export orchestrator.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Transition length used when a clip requests one without a duration
    pub default_transition_secs: f64,
    /// Deadline for each frame-extraction sub-step
    pub frame_timeout_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_transition_secs: 0.5,
            frame_timeout_ms: 10_000,
        }
    }
}

impl ExportConfig {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            default_transition_secs: std::env::var("REELFORGE_DEFAULT_TRANSITION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.5),
            frame_timeout_ms: std::env::var("REELFORGE_FRAME_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
        }
    }
}
