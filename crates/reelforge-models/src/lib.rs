//! Shared data models for the ReelForge assembly pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scene clips, trims and transition specifications
//! - Export options and narration overlays
//! - Phased export progress events
//! - Encoding and normalization configuration

pub mod clip;
pub mod encoding;
pub mod export;
pub mod progress;

// Re-export common types
pub use clip::{ClipError, MediaSource, SceneClip, TransitionKind, TransitionSpec};
pub use encoding::{EncodingConfig, NormalizationTarget};
pub use export::{AudioOverlay, ExportArtifact, ExportOptions, OutputFormat};
pub use progress::{ExportPhase, ExportProgress};
