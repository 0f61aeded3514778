//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Completion ratio in [0, 1] given the expected output duration.
    ///
    /// Chained filter stages can report output time past the nominal total,
    /// so the ratio is clamped before any rescaling.
    pub fn ratio(&self, total_duration_secs: f64) -> f64 {
        if total_duration_secs <= 0.0 {
            return 0.0;
        }
        let total_ms = total_duration_secs * 1000.0;
        (self.out_time_ms as f64 / total_ms).clamp(0.0, 1.0)
    }
}
