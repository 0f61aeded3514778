//! Export orchestration for the ReelForge assembly pipeline.
//!
//! The mechanism lives in `reelforge-media`; this crate supplies the policy:
//! phased progress, the fallback state machine, narration mixing and
//! configuration.

pub mod config;
pub mod error;
pub mod exporter;

pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use exporter::{ExportHandle, Exporter, ProgressSender};

// Frequently used alongside the exporter
pub use reelforge_media::{ExtractedFrame, FfmpegEngine, TranscodeEngine};
