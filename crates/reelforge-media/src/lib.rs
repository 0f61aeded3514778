//! FFmpeg mechanism layer for the ReelForge assembly pipeline.
//!
//! This crate provides:
//! - A typed filter-graph IR rendered to `filter_complex` only at the
//!   adapter boundary
//! - Transition timeline arithmetic on the output timeline
//! - Pure export-plan construction (remux / simple / trim / crossfade)
//! - The transcoding engine seam and its FFmpeg CLI implementation
//! - Narration overlay mixing and last-frame extraction

pub mod cleanup;
pub mod command;
pub mod engine;
pub mod error;
pub mod filter;
pub mod frame;
pub mod mixer;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use cleanup::TempTracker;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use engine::{new_namespace, FfmpegEngine, ProgressSink, TranscodeEngine};
pub use error::{MediaError, MediaResult};
pub use filter::{FilterChain, FilterGraph, FilterOp};
pub use frame::{extract_last_frame, ExtractedFrame};
pub use mixer::{build_mix_invocation, build_overlay_mix};
pub use plan::{
    build_concat_copy, build_conform_invocation, build_export_plan, ExportPlan, FrameSeek,
    Invocation, PlanKind,
};
pub use probe::{media_duration, probe_media, verify_non_empty, MediaInfo};
pub use progress::FfmpegProgress;
pub use timeline::{plan_transitions, total_output_duration, TransitionPoint};
