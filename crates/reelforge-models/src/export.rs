//! Export options, narration overlays and the final artifact.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clip::MediaSource;

/// Errors raised when validating export options.
#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("overlay volume must be within [0, 1], got {0}")]
    InvalidVolume(f64),
}

/// Container format of the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Webm => "video/webm",
        }
    }

    /// Container-level muxer arguments.
    pub fn mux_args(&self) -> Vec<String> {
        match self {
            OutputFormat::Mp4 => vec!["-movflags".to_string(), "+faststart".to_string()],
            OutputFormat::Webm => Vec::new(),
        }
    }
}

/// Narration track mixed over the assembled video in a second pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioOverlay {
    /// Overlay media handle
    pub source: MediaSource,

    /// Signed offset relative to video start. Negative discards the track's
    /// lead-in; positive delays the track.
    #[serde(default)]
    pub offset_ms: i64,

    /// Overlay gain in [0, 1]
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 {
    1.0
}

impl AudioOverlay {
    pub fn new(source: MediaSource) -> Self {
        Self {
            source,
            offset_ms: 0,
            volume: 1.0,
        }
    }

    pub fn with_offset_ms(mut self, offset_ms: i64) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Seconds of lead-in discarded for a negative offset.
    pub fn lead_in_secs(&self) -> f64 {
        if self.offset_ms < 0 {
            self.offset_ms.unsigned_abs() as f64 / 1000.0
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(OptionsError::InvalidVolume(self.volume));
        }
        Ok(())
    }
}

/// Options for one export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Output container
    #[serde(default)]
    pub format: OutputFormat,

    /// Optional narration overlay, mixed after assembly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_overlay: Option<AudioOverlay>,

    /// Cut silent stretches from every clip's audio
    #[serde(default)]
    pub remove_silence: bool,
}

impl ExportOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(overlay) = &self.audio_overlay {
            overlay.validate()?;
        }
        Ok(())
    }
}

/// The finished export: raw bytes plus any best-effort cleanup warnings.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Cleanup failures that did not affect the result
    pub warnings: Vec<String>,
}

impl ExportArtifact {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            bytes,
            mime_type: format.mime_type().to_string(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        assert_eq!(OutputFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(OutputFormat::Webm.extension(), "webm");
        assert!(OutputFormat::Mp4.mux_args().contains(&"+faststart".to_string()));
        assert!(OutputFormat::Webm.mux_args().is_empty());
    }

    #[test]
    fn test_overlay_lead_in() {
        let overlay = AudioOverlay::new(MediaSource::new("narration.aac", "/tmp/n.aac"))
            .with_offset_ms(-500);
        assert!((overlay.lead_in_secs() - 0.5).abs() < 1e-9);

        let delayed = AudioOverlay::new(MediaSource::new("narration.aac", "/tmp/n.aac"))
            .with_offset_ms(250);
        assert_eq!(delayed.lead_in_secs(), 0.0);
    }

    #[test]
    fn test_overlay_volume_validation() {
        let overlay = AudioOverlay::new(MediaSource::new("n.aac", "/tmp/n.aac")).with_volume(1.5);
        assert_eq!(overlay.validate(), Err(OptionsError::InvalidVolume(1.5)));
    }

    #[test]
    fn test_options_wire_format() {
        let opts = ExportOptions {
            format: OutputFormat::Webm,
            audio_overlay: Some(
                AudioOverlay::new(MediaSource::new("n.aac", "/tmp/n.aac")).with_offset_ms(-500),
            ),
            remove_silence: true,
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"format\":\"webm\""));
        assert!(json.contains("\"offsetMs\":-500"));
        assert!(json.contains("\"removeSilence\":true"));
    }
}
