//! Phased export progress events.
//!
//! Phases are monotonic and one-directional, except that any phase may jump
//! straight to `Error`. Each phase owns a percentage band; raw engine ratios
//! are clamped to [0, 1] before being rescaled into the band, because chained
//! filter stages can report past 100%.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Export pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    /// Ingesting source clips into engine storage
    Loading,
    /// Building the execution plan
    Preparing,
    /// Running the assembly graph
    Concatenating,
    /// Mixing narration and reading the artifact back
    Finalizing,
    /// Done
    Complete,
    /// Failed
    Error,
}

impl ExportPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportPhase::Loading => "loading",
            ExportPhase::Preparing => "preparing",
            ExportPhase::Concatenating => "concatenating",
            ExportPhase::Finalizing => "finalizing",
            ExportPhase::Complete => "complete",
            ExportPhase::Error => "error",
        }
    }

    /// The percentage band this phase occupies.
    pub fn band(&self) -> (f32, f32) {
        match self {
            ExportPhase::Loading => (0.0, 20.0),
            ExportPhase::Preparing => (20.0, 30.0),
            ExportPhase::Concatenating => (30.0, 85.0),
            ExportPhase::Finalizing => (85.0, 100.0),
            ExportPhase::Complete => (100.0, 100.0),
            ExportPhase::Error => (0.0, 0.0),
        }
    }

    /// Rescale a raw completion ratio into this phase's band.
    ///
    /// Ratios outside [0, 1] are clamped first.
    pub fn scale(&self, ratio: f64) -> f32 {
        let ratio = ratio.clamp(0.0, 1.0) as f32;
        let (lo, hi) = self.band();
        lo + ratio * (hi - lo)
    }

    fn rank(&self) -> u8 {
        match self {
            ExportPhase::Loading => 0,
            ExportPhase::Preparing => 1,
            ExportPhase::Concatenating => 2,
            ExportPhase::Finalizing => 3,
            ExportPhase::Complete => 4,
            ExportPhase::Error => 5,
        }
    }

    /// Whether moving to `next` preserves phase ordering.
    pub fn can_transition_to(&self, next: ExportPhase) -> bool {
        next == ExportPhase::Error || next.rank() >= self.rank()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportPhase::Complete | ExportPhase::Error)
    }
}

impl std::fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress event emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub phase: ExportPhase,

    /// Overall completion in [0, 100]
    pub progress: f32,

    pub message: String,

    /// 1-based index of the file being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u32>,

    pub timestamp: DateTime<Utc>,
}

impl ExportProgress {
    fn event(phase: ExportPhase, progress: f32, message: impl Into<String>) -> Self {
        Self {
            phase,
            progress: progress.clamp(0.0, 100.0),
            message: message.into(),
            current_file: None,
            total_files: None,
            timestamp: Utc::now(),
        }
    }

    /// Ingesting clip `current` of `total`.
    pub fn loading(current: u32, total: u32) -> Self {
        let ratio = if total == 0 {
            0.0
        } else {
            current as f64 / total as f64
        };
        let mut p = Self::event(
            ExportPhase::Loading,
            ExportPhase::Loading.scale(ratio),
            format!("Loading clip {current} of {total}"),
        );
        p.current_file = Some(current);
        p.total_files = Some(total);
        p
    }

    pub fn preparing(message: impl Into<String>) -> Self {
        Self::event(ExportPhase::Preparing, ExportPhase::Preparing.scale(0.5), message)
    }

    /// Assembly progress from a raw engine ratio.
    pub fn concatenating(ratio: f64, message: impl Into<String>) -> Self {
        Self::event(
            ExportPhase::Concatenating,
            ExportPhase::Concatenating.scale(ratio),
            message,
        )
    }

    pub fn finalizing(message: impl Into<String>) -> Self {
        Self::event(ExportPhase::Finalizing, ExportPhase::Finalizing.scale(0.5), message)
    }

    /// Attach file counters to an event.
    pub fn with_files(mut self, current: u32, total: u32) -> Self {
        self.current_file = Some(current);
        self.total_files = Some(total);
        self
    }

    pub fn complete() -> Self {
        Self::event(ExportPhase::Complete, 100.0, "Export complete")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::event(ExportPhase::Error, 0.0, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_clamps_overrange_ratio() {
        // Chained filter stages can report ratios past 1.0
        let p = ExportPhase::Concatenating.scale(1.7);
        assert!((p - 85.0).abs() < 1e-6);

        let lo = ExportPhase::Concatenating.scale(-0.2);
        assert!((lo - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_bands_cover_zero_to_hundred() {
        assert_eq!(ExportPhase::Loading.band().0, 0.0);
        assert_eq!(ExportPhase::Finalizing.band().1, 100.0);
        // Bands are contiguous
        assert_eq!(ExportPhase::Loading.band().1, ExportPhase::Preparing.band().0);
        assert_eq!(ExportPhase::Preparing.band().1, ExportPhase::Concatenating.band().0);
        assert_eq!(ExportPhase::Concatenating.band().1, ExportPhase::Finalizing.band().0);
    }

    #[test]
    fn test_transitions_are_monotonic() {
        assert!(ExportPhase::Loading.can_transition_to(ExportPhase::Preparing));
        assert!(ExportPhase::Concatenating.can_transition_to(ExportPhase::Concatenating));
        assert!(!ExportPhase::Finalizing.can_transition_to(ExportPhase::Loading));
        // Any phase may fail
        assert!(ExportPhase::Loading.can_transition_to(ExportPhase::Error));
        assert!(ExportPhase::Finalizing.can_transition_to(ExportPhase::Error));
    }

    #[test]
    fn test_loading_event_carries_file_counts() {
        let p = ExportProgress::loading(2, 4);
        assert_eq!(p.current_file, Some(2));
        assert_eq!(p.total_files, Some(4));
        assert!((p.progress - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_wire_format() {
        let p = ExportProgress::loading(1, 3);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"phase\":\"loading\""));
        assert!(json.contains("\"currentFile\":1"));
        assert!(json.contains("\"totalFiles\":3"));
    }
}
