//! Scene clip inputs and transition specifications.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating clip inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ClipError {
    #[error("scene {scene_number}: trim range {start:.3}..{end:.3} is invalid for duration {duration:.3}")]
    InvalidTrim {
        scene_number: u32,
        start: f64,
        end: f64,
        duration: f64,
    },

    #[error("scene {scene_number}: duration must be positive, got {duration:.3}")]
    InvalidDuration { scene_number: u32, duration: f64 },

    #[error("scene {scene_number}: transition duration must be positive, got {duration:.3}")]
    InvalidTransition { scene_number: u32, duration: f64 },

    #[error("no clips supplied")]
    Empty,
}

/// A named media input the engine can ingest.
///
/// The `name` is the handle the clip is stored under in engine working
/// storage (prefixed with a per-call namespace); `path` is where the bytes
/// live before ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub name: String,
    pub path: PathBuf,
}

impl MediaSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Visual transition applied between a clip and its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Hard cut, no blending
    None,
    /// Plain cross-dissolve
    #[default]
    Dissolve,
    /// Dip to black between clips
    FadeBlack,
    /// Dip to white between clips
    FadeWhite,
    /// Horizontal wipe
    WipeLeft,
    /// Vertical push
    SlideUp,
}

impl TransitionKind {
    /// The xfade transition name the engine understands.
    ///
    /// Returns `None` for a hard cut, which is not rendered as a transition
    /// at all.
    pub fn as_xfade(&self) -> Option<&'static str> {
        match self {
            TransitionKind::None => None,
            TransitionKind::Dissolve => Some("fade"),
            TransitionKind::FadeBlack => Some("fadeblack"),
            TransitionKind::FadeWhite => Some("fadewhite"),
            TransitionKind::WipeLeft => Some("wipeleft"),
            TransitionKind::SlideUp => Some("slideup"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::None => "none",
            TransitionKind::Dissolve => "dissolve",
            TransitionKind::FadeBlack => "fade_black",
            TransitionKind::FadeWhite => "fade_white",
            TransitionKind::WipeLeft => "wipe_left",
            TransitionKind::SlideUp => "slide_up",
        }
    }
}

/// Transition out of a clip into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSpec {
    /// Transition style
    #[serde(default)]
    pub kind: TransitionKind,

    /// Requested duration in seconds (clamped against neighboring clips)
    pub duration: f64,
}

impl TransitionSpec {
    pub fn new(kind: TransitionKind, duration: f64) -> Self {
        Self { kind, duration }
    }

    /// A plain dissolve of the given duration.
    pub fn dissolve(duration: f64) -> Self {
        Self::new(TransitionKind::Dissolve, duration)
    }
}

/// One scene's source segment with its per-clip transform requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneClip {
    /// Source media handle
    pub source: MediaSource,

    /// Scene ordinal; clips are always processed in ascending order
    pub scene_number: u32,

    /// Full source duration in seconds
    pub duration: f64,

    /// Trim-in point in seconds (defaults to 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,

    /// Trim-out point in seconds (defaults to `duration`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,

    /// Drop the clip's own audio
    #[serde(default)]
    pub mute: bool,

    /// Transition into the following clip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<TransitionSpec>,
}

impl SceneClip {
    /// Create a clip covering the full source with no transforms.
    pub fn new(source: MediaSource, scene_number: u32, duration: f64) -> Self {
        Self {
            source,
            scene_number,
            duration,
            trim_start: None,
            trim_end: None,
            mute: false,
            transition_out: None,
        }
    }

    /// Set the trim range.
    pub fn with_trim(mut self, start: f64, end: f64) -> Self {
        self.trim_start = Some(start);
        self.trim_end = Some(end);
        self
    }

    /// Mute the clip's own audio.
    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    /// Set the outgoing transition.
    pub fn with_transition(mut self, spec: TransitionSpec) -> Self {
        self.transition_out = Some(spec);
        self
    }

    /// Resolved trim-in point.
    pub fn trim_in(&self) -> f64 {
        self.trim_start.unwrap_or(0.0)
    }

    /// Resolved trim-out point.
    pub fn trim_out(&self) -> f64 {
        self.trim_end.unwrap_or(self.duration)
    }

    /// Clip length after trim is applied.
    pub fn effective_length(&self) -> f64 {
        self.trim_out() - self.trim_in()
    }

    /// True when the trim range differs from the full source.
    pub fn has_trim(&self) -> bool {
        self.trim_in() > 0.0 || self.trim_out() < self.duration
    }

    /// The outgoing transition kind, with `None` for hard cuts and absent specs.
    pub fn transition_kind(&self) -> TransitionKind {
        self.transition_out
            .map(|t| t.kind)
            .unwrap_or(TransitionKind::None)
    }

    /// Validate duration and trim invariants.
    pub fn validate(&self) -> Result<(), ClipError> {
        if self.duration <= 0.0 {
            return Err(ClipError::InvalidDuration {
                scene_number: self.scene_number,
                duration: self.duration,
            });
        }

        let start = self.trim_in();
        let end = self.trim_out();
        if start < 0.0 || start >= end || end > self.duration {
            return Err(ClipError::InvalidTrim {
                scene_number: self.scene_number,
                start,
                end,
                duration: self.duration,
            });
        }

        if let Some(t) = self.transition_out {
            if t.kind != TransitionKind::None && t.duration <= 0.0 {
                return Err(ClipError::InvalidTransition {
                    scene_number: self.scene_number,
                    duration: t.duration,
                });
            }
        }

        Ok(())
    }
}

/// Sort clips by ascending scene number and validate every entry.
///
/// Ordering is load-bearing for transition offset arithmetic, so this runs
/// before any other pipeline step regardless of input order.
pub fn sort_and_validate(mut clips: Vec<SceneClip>) -> Result<Vec<SceneClip>, ClipError> {
    if clips.is_empty() {
        return Err(ClipError::Empty);
    }
    clips.sort_by_key(|c| c.scene_number);
    for clip in &clips {
        clip.validate()?;
    }
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(n: u32, duration: f64) -> SceneClip {
        SceneClip::new(MediaSource::new(format!("scene_{n}.mp4"), "/tmp/in.mp4"), n, duration)
    }

    #[test]
    fn test_effective_length_defaults() {
        let c = clip(1, 10.0);
        assert!((c.effective_length() - 10.0).abs() < 1e-9);
        assert!(!c.has_trim());
    }

    #[test]
    fn test_effective_length_trimmed() {
        let c = clip(1, 10.0).with_trim(2.0, 7.5);
        assert!((c.effective_length() - 5.5).abs() < 1e-9);
        assert!(c.has_trim());
    }

    #[test]
    fn test_validate_rejects_inverted_trim() {
        let c = clip(1, 10.0).with_trim(8.0, 3.0);
        assert!(matches!(c.validate(), Err(ClipError::InvalidTrim { .. })));
    }

    #[test]
    fn test_validate_rejects_trim_past_duration() {
        let c = clip(1, 10.0).with_trim(0.0, 12.0);
        assert!(matches!(c.validate(), Err(ClipError::InvalidTrim { .. })));
    }

    #[test]
    fn test_sort_orders_by_scene_number() {
        let clips = vec![clip(3, 5.0), clip(1, 5.0), clip(2, 5.0)];
        let sorted = sort_and_validate(clips).unwrap();
        let order: Vec<u32> = sorted.iter().map(|c| c.scene_number).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_rejects_empty() {
        assert_eq!(sort_and_validate(Vec::new()), Err(ClipError::Empty));
    }

    #[test]
    fn test_transition_kind_defaults_to_none() {
        assert_eq!(clip(1, 4.0).transition_kind(), TransitionKind::None);
        let c = clip(1, 4.0).with_transition(TransitionSpec::dissolve(0.5));
        assert_eq!(c.transition_kind(), TransitionKind::Dissolve);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let c = clip(2, 6.0).with_trim(1.0, 5.0);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"sceneNumber\":2"));
        assert!(json.contains("\"trimStart\":1.0"));
        assert!(json.contains("\"trimEnd\":5.0"));
    }

    #[test]
    fn test_xfade_names() {
        assert_eq!(TransitionKind::Dissolve.as_xfade(), Some("fade"));
        assert_eq!(TransitionKind::FadeBlack.as_xfade(), Some("fadeblack"));
        assert_eq!(TransitionKind::None.as_xfade(), None);
    }
}
