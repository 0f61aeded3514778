//! Narration overlay mixing.
//!
//! A second pass over the assembled video: only the audio track is
//! regenerated, the video stream is copied untouched. Mixing is never allowed
//! to sink an export: callers discard a failed mix and keep the pre-mix
//! result.

use reelforge_models::{AudioOverlay, EncodingConfig, OutputFormat};

use crate::error::{MediaError, MediaResult};
use crate::filter::{FilterChain, FilterGraph, FilterOp};
use crate::plan::Invocation;

/// Build the audio mix graph for an overlay against a video's own audio.
///
/// Input 0 is the assembled video, input 1 the overlay. A negative offset
/// discards the overlay's lead-in; a positive one delays all channels. The
/// mixed duration follows the video track, not the overlay.
///
/// Rejects overlays whose trim leaves nothing to mix.
pub fn build_overlay_mix(
    overlay: &AudioOverlay,
    overlay_duration: f64,
) -> MediaResult<FilterGraph> {
    let mut ops = Vec::new();

    if overlay.offset_ms < 0 {
        let lead_in = overlay.lead_in_secs();
        if lead_in >= overlay_duration {
            return Err(MediaError::MixVerification(format!(
                "overlay trim of {lead_in:.3}s consumes the whole {overlay_duration:.3}s track"
            )));
        }
        ops.push(FilterOp::Atrim {
            start: lead_in,
            end: overlay_duration,
        });
        ops.push(FilterOp::AsetPts);
        ops.push(FilterOp::Volume(overlay.volume));
    } else {
        ops.push(FilterOp::Volume(overlay.volume));
        if overlay.offset_ms > 0 {
            ops.push(FilterOp::Adelay {
                ms: overlay.offset_ms as u64,
            });
        }
    }

    let mut graph = FilterGraph::new();
    graph.push(FilterChain::new(["1:a"], ops, ["ov"]));
    graph.push(FilterChain::new(
        ["0:a", "ov"],
        vec![FilterOp::Amix { inputs: 2 }],
        ["aout"],
    ));
    graph.audio_out = Some("aout".to_string());
    Ok(graph)
}

/// Build the full mix invocation for the engine.
pub fn build_mix_invocation(
    video_name: &str,
    overlay_name: &str,
    overlay: &AudioOverlay,
    overlay_duration: f64,
    encoding: &EncodingConfig,
    format: OutputFormat,
    output_name: &str,
) -> MediaResult<Invocation> {
    let graph = build_overlay_mix(overlay, overlay_duration)?;
    Ok(Invocation::MixAudio {
        video: video_name.to_string(),
        overlay: overlay_name.to_string(),
        graph,
        output: output_name.to_string(),
        encoding: encoding.clone(),
        format,
    })
}
