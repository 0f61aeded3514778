//! Transition timeline arithmetic.
//!
//! Offsets are expressed on the *output* timeline: every transition overlaps
//! its neighbors and shortens the total output, so each offset is the running
//! total of emitted content rather than a per-clip position.

use reelforge_models::{SceneClip, TransitionKind};

/// A resolved transition between two adjacent clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionPoint {
    /// Where the blend starts, in output-timeline seconds
    pub offset: f64,
    /// Blend length in seconds; 0 for a hard cut
    pub duration: f64,
    pub kind: TransitionKind,
}

impl TransitionPoint {
    pub fn is_cut(&self) -> bool {
        self.kind == TransitionKind::None
    }
}

/// Resolve transition durations and offsets for every adjacent clip pair.
///
/// A transition may consume at most half of either neighboring clip's
/// effective length. Pairs whose kind resolves to a hard cut contribute zero
/// overlap but still advance the accumulated offset.
///
/// Clips must already be sorted by scene number.
pub fn plan_transitions(clips: &[SceneClip], default_duration: f64) -> Vec<TransitionPoint> {
    let mut points = Vec::with_capacity(clips.len().saturating_sub(1));
    let mut accumulated = 0.0;

    for pair in clips.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let kind = left.transition_kind();

        let duration = if kind == TransitionKind::None {
            0.0
        } else {
            let requested = left
                .transition_out
                .map(|t| t.duration)
                .unwrap_or(default_duration);
            requested
                .min(0.5 * left.effective_length())
                .min(0.5 * right.effective_length())
        };

        let offset = accumulated + left.effective_length() - duration;
        points.push(TransitionPoint {
            offset,
            duration,
            kind,
        });
        accumulated = offset;
    }

    points
}

/// Total output duration after transition overlap is subtracted.
pub fn total_output_duration(clips: &[SceneClip], points: &[TransitionPoint]) -> f64 {
    let content: f64 = clips.iter().map(|c| c.effective_length()).sum();
    let overlap: f64 = points.iter().map(|p| p.duration).sum();
    content - overlap
}
