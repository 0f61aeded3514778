//! Encoding configuration and the normalization target.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::export::OutputFormat;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Short-form portrait output resolution
pub const TARGET_WIDTH: u32 = 1080;
pub const TARGET_HEIGHT: u32 = 1920;
/// Fixed output frame rate
pub const TARGET_FPS: u32 = 30;
/// Fixed pixel format (crossfade blending needs matched formats)
pub const TARGET_PIXEL_FORMAT: &str = "yuv420p";
/// Fixed audio sample rate
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Uniform format every clip is brought to before blending.
///
/// Mismatched resolutions, frame rates or pixel formats make crossfade
/// output visually incorrect, so the crossfade plan and the re-encode
/// fallback both normalize against this target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizationTarget {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
}

impl Default for NormalizationTarget {
    fn default() -> Self {
        Self {
            width: TARGET_WIDTH,
            height: TARGET_HEIGHT,
            fps: TARGET_FPS,
            sample_rate: TARGET_SAMPLE_RATE,
        }
    }
}

impl NormalizationTarget {
    pub fn pixel_format(&self) -> &'static str {
        TARGET_PIXEL_FORMAT
    }
}

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "libvpx-vp9")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Codec selection for the requested container.
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Mp4 => Self::default(),
            OutputFormat::Webm => Self {
                codec: "libvpx-vp9".to_string(),
                audio_codec: "libopus".to_string(),
                ..Default::default()
            },
        }
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ];
        args.extend(self.extra_args.clone());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.crf, DEFAULT_CRF);
    }

    #[test]
    fn test_webm_codecs() {
        let config = EncodingConfig::for_format(OutputFormat::Webm);
        assert_eq!(config.codec, "libvpx-vp9");
        assert_eq!(config.audio_codec, "libopus");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = EncodingConfig::default().to_ffmpeg_args();
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_normalization_target_is_portrait() {
        let t = NormalizationTarget::default();
        assert!(t.height > t.width);
        assert_eq!(t.pixel_format(), "yuv420p");
    }
}
