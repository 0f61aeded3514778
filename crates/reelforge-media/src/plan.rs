//! Export plan construction.
//!
//! `build_export_plan` is pure: it inspects the clip list, picks one of the
//! whole-pipeline strategies and returns the typed invocation for it. Nothing
//! here touches the filesystem or the engine, so plan structure is asserted
//! on directly in tests.

use reelforge_models::{
    EncodingConfig, ExportOptions, NormalizationTarget, OutputFormat, SceneClip, TransitionKind,
};

use crate::error::{MediaError, MediaResult};
use crate::filter::{FilterChain, FilterGraph, FilterOp};
use crate::timeline::{plan_transitions, total_output_duration, TransitionPoint};

/// Silence-removal tuning applied per clip when requested.
const SILENCE_THRESHOLD_DB: i32 = -45;
const SILENCE_MIN_DURATION: f64 = 0.5;

/// Seek position for single-frame extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSeek {
    /// Seconds back from end of stream
    FromEnd(f64),
    /// Absolute position in seconds
    Absolute(f64),
}

/// A single engine run, in typed form.
///
/// Rendering to argv happens in the engine adapter only.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Stream-copy re-wrap of a single input into the target container.
    Remux {
        input: String,
        output: String,
        format: OutputFormat,
    },
    /// Execute a filter graph over ordered inputs and encode the result.
    Graph {
        inputs: Vec<String>,
        graph: FilterGraph,
        output: String,
        encoding: EncodingConfig,
        format: OutputFormat,
        /// Output duration in seconds, for progress scaling
        expected_duration: Option<f64>,
    },
    /// Copy-only concatenation of same-format segments (concat demuxer).
    ConcatCopy {
        inputs: Vec<String>,
        output: String,
        format: OutputFormat,
    },
    /// Regenerate the audio track only; the video stream is copied.
    MixAudio {
        video: String,
        overlay: String,
        graph: FilterGraph,
        output: String,
        encoding: EncodingConfig,
        format: OutputFormat,
    },
    /// Seek and extract one frame as JPEG.
    FrameGrab {
        input: String,
        output: String,
        seek: FrameSeek,
    },
}

impl Invocation {
    /// Name of the artifact this run produces.
    pub fn output_name(&self) -> &str {
        match self {
            Invocation::Remux { output, .. }
            | Invocation::Graph { output, .. }
            | Invocation::ConcatCopy { output, .. }
            | Invocation::MixAudio { output, .. }
            | Invocation::FrameGrab { output, .. } => output,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Invocation::Remux { .. } => "remux",
            Invocation::Graph { .. } => "graph",
            Invocation::ConcatCopy { .. } => "concat_copy",
            Invocation::MixAudio { .. } => "mix_audio",
            Invocation::FrameGrab { .. } => "frame_grab",
        }
    }
}

/// Whole-pipeline strategy, in selection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Single untrimmed clip, byte-level re-wrap
    Remux,
    /// Plain interleaved concatenation
    Simple,
    /// Per-clip transforms then concatenation
    Trim,
    /// Normalize everything, chain pairwise blends
    Crossfade,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Remux => "remux",
            PlanKind::Simple => "simple",
            PlanKind::Trim => "trim",
            PlanKind::Crossfade => "crossfade",
        }
    }

    /// Filter-graph strategies are fragile against heterogeneous sources;
    /// only those are worth one re-encode retry.
    pub fn supports_fallback(&self) -> bool {
        matches!(self, PlanKind::Trim | PlanKind::Crossfade)
    }
}

/// The selected plan plus what the orchestrator needs to drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub kind: PlanKind,
    pub invocation: Invocation,
    pub transitions: Vec<TransitionPoint>,
    /// Output duration in seconds
    pub expected_duration: f64,
}

/// Select and construct the plan for a sorted clip list.
///
/// `input_names` are the engine-storage handles, aligned with `clips`.
pub fn build_export_plan(
    clips: &[SceneClip],
    options: &ExportOptions,
    encoding: &EncodingConfig,
    target: &NormalizationTarget,
    input_names: &[String],
    output: &str,
    default_transition: f64,
) -> MediaResult<ExportPlan> {
    if clips.is_empty() || clips.len() != input_names.len() {
        return Err(MediaError::internal(format!(
            "plan construction needs one input name per clip, got {} clips / {} names",
            clips.len(),
            input_names.len()
        )));
    }

    let any_transition = clips
        .iter()
        .any(|c| c.transition_kind() != TransitionKind::None);
    let any_transform =
        options.remove_silence || clips.iter().any(|c| c.has_trim() || c.mute);

    if any_transition {
        let points = plan_transitions(clips, default_transition);
        let expected = total_output_duration(clips, &points);
        let graph = build_crossfade_graph(clips, options, target, &points);
        return Ok(ExportPlan {
            kind: PlanKind::Crossfade,
            invocation: Invocation::Graph {
                inputs: input_names.to_vec(),
                graph,
                output: output.to_string(),
                encoding: encoding.clone(),
                format: options.format,
                expected_duration: Some(expected),
            },
            transitions: points,
            expected_duration: expected,
        });
    }

    let expected: f64 = clips.iter().map(|c| c.effective_length()).sum();

    if any_transform {
        let graph = build_trim_graph(clips, options);
        return Ok(ExportPlan {
            kind: PlanKind::Trim,
            invocation: Invocation::Graph {
                inputs: input_names.to_vec(),
                graph,
                output: output.to_string(),
                encoding: encoding.clone(),
                format: options.format,
                expected_duration: Some(expected),
            },
            transitions: Vec::new(),
            expected_duration: expected,
        });
    }

    if clips.len() == 1 {
        return Ok(ExportPlan {
            kind: PlanKind::Remux,
            invocation: Invocation::Remux {
                input: input_names[0].clone(),
                output: output.to_string(),
                format: options.format,
            },
            transitions: Vec::new(),
            expected_duration: expected,
        });
    }

    let graph = build_simple_graph(clips.len());
    Ok(ExportPlan {
        kind: PlanKind::Simple,
        invocation: Invocation::Graph {
            inputs: input_names.to_vec(),
            graph,
            output: output.to_string(),
            encoding: encoding.clone(),
            format: options.format,
            expected_duration: Some(expected),
        },
        transitions: Vec::new(),
        expected_duration: expected,
    })
}

/// Direct stream-for-stream concatenation, no per-clip transforms.
fn build_simple_graph(n: usize) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let mut pads = Vec::with_capacity(n * 2);
    for i in 0..n {
        pads.push(format!("{i}:v"));
        pads.push(format!("{i}:a"));
    }
    graph.push(FilterChain::new(
        pads,
        vec![FilterOp::Concat {
            n,
            video: true,
            audio: true,
        }],
        ["vout", "aout"],
    ));
    graph.with_outputs("vout", "aout")
}

/// Per-clip audio ops shared by the trim and crossfade builders.
fn audio_clip_ops(clip: &SceneClip, options: &ExportOptions) -> Vec<FilterOp> {
    let mut ops = vec![
        FilterOp::Atrim {
            start: clip.trim_in(),
            end: clip.trim_out(),
        },
        FilterOp::AsetPts,
    ];
    if clip.mute {
        ops.push(FilterOp::Volume(0.0));
    }
    if options.remove_silence {
        ops.push(FilterOp::SilenceRemove {
            threshold_db: SILENCE_THRESHOLD_DB,
            min_duration: SILENCE_MIN_DURATION,
        });
    }
    ops
}

/// Trim/mute/filter each clip independently, reset timestamps, concatenate.
fn build_trim_graph(clips: &[SceneClip], options: &ExportOptions) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let n = clips.len();

    for (i, clip) in clips.iter().enumerate() {
        graph.push(FilterChain::new(
            [format!("{i}:v")],
            vec![
                FilterOp::Trim {
                    start: clip.trim_in(),
                    end: clip.trim_out(),
                },
                FilterOp::SetPts,
            ],
            [format!("v{i}")],
        ));
        graph.push(FilterChain::new(
            [format!("{i}:a")],
            audio_clip_ops(clip, options),
            [format!("a{i}")],
        ));
    }

    if n == 1 {
        return graph.with_outputs("v0", "a0");
    }

    let mut pads = Vec::with_capacity(n * 2);
    for i in 0..n {
        pads.push(format!("v{i}"));
        pads.push(format!("a{i}"));
    }
    graph.push(FilterChain::new(
        pads,
        vec![FilterOp::Concat {
            n,
            video: true,
            audio: true,
        }],
        ["vout", "aout"],
    ));
    graph.with_outputs("vout", "aout")
}

/// Normalization ops bringing one clip's video to the blend target.
fn normalize_video_ops(clip: &SceneClip, target: &NormalizationTarget) -> Vec<FilterOp> {
    let mut ops = Vec::new();
    if clip.has_trim() {
        ops.push(FilterOp::Trim {
            start: clip.trim_in(),
            end: clip.trim_out(),
        });
        ops.push(FilterOp::SetPts);
    }
    ops.push(FilterOp::Scale {
        width: target.width,
        height: target.height,
    });
    ops.push(FilterOp::Pad {
        width: target.width,
        height: target.height,
    });
    ops.push(FilterOp::Fps(target.fps));
    ops.push(FilterOp::Format(reelforge_models::encoding::TARGET_PIXEL_FORMAT));
    ops
}

/// Normalize every clip, then chain pairwise blends at calculated offsets.
///
/// Runs of clips joined by hard cuts are concatenated first; blends then
/// chain across the resulting groups, so a `none` transition inside an
/// otherwise-transitioned list degenerates to plain concatenation.
fn build_crossfade_graph(
    clips: &[SceneClip],
    options: &ExportOptions,
    target: &NormalizationTarget,
    points: &[TransitionPoint],
) -> FilterGraph {
    let mut graph = FilterGraph::new();

    // Mandatory normalization: blending mismatched formats is visually wrong.
    for (i, clip) in clips.iter().enumerate() {
        graph.push(FilterChain::new(
            [format!("{i}:v")],
            normalize_video_ops(clip, target),
            [format!("v{i}")],
        ));
        let mut a_ops = audio_clip_ops(clip, options);
        a_ops.push(FilterOp::Resample(target.sample_rate));
        a_ops.push(FilterOp::StereoLayout);
        graph.push(FilterChain::new([format!("{i}:a")], a_ops, [format!("a{i}")]));
    }

    // Group consecutive clips joined by hard cuts.
    let mut groups: Vec<Vec<usize>> = vec![vec![0]];
    let mut blends: Vec<TransitionPoint> = Vec::new();
    for (i, point) in points.iter().enumerate() {
        if point.is_cut() {
            groups.last_mut().expect("at least one group").push(i + 1);
        } else {
            blends.push(*point);
            groups.push(vec![i + 1]);
        }
    }

    let mut group_labels: Vec<(String, String)> = Vec::with_capacity(groups.len());
    for (g, members) in groups.iter().enumerate() {
        if members.len() == 1 {
            let i = members[0];
            group_labels.push((format!("v{i}"), format!("a{i}")));
        } else {
            let mut pads = Vec::with_capacity(members.len() * 2);
            for &i in members {
                pads.push(format!("v{i}"));
                pads.push(format!("a{i}"));
            }
            graph.push(FilterChain::new(
                pads,
                vec![FilterOp::Concat {
                    n: members.len(),
                    video: true,
                    audio: true,
                }],
                [format!("gv{g}"), format!("ga{g}")],
            ));
            group_labels.push((format!("gv{g}"), format!("ga{g}")));
        }
    }

    let (mut cur_v, mut cur_a) = group_labels[0].clone();
    for (k, blend) in blends.iter().enumerate() {
        let (next_v, next_a) = &group_labels[k + 1];
        let transition = blend
            .kind
            .as_xfade()
            .expect("blend points never carry a hard cut");
        let (out_v, out_a) = (format!("xv{}", k + 1), format!("xa{}", k + 1));

        graph.push(FilterChain::new(
            [cur_v.clone(), next_v.clone()],
            vec![FilterOp::Xfade {
                transition,
                duration: blend.duration,
                offset: blend.offset,
            }],
            [out_v.clone()],
        ));
        graph.push(FilterChain::new(
            [cur_a.clone(), next_a.clone()],
            vec![FilterOp::Acrossfade {
                duration: blend.duration,
            }],
            [out_a.clone()],
        ));

        cur_v = out_v;
        cur_a = out_a;
    }

    graph.with_outputs(cur_v, cur_a)
}

/// Per-clip conform pass used by the re-encode fallback: trim, normalize and
/// encode one clip independently so the whole set shares a format.
pub fn build_conform_invocation(
    clip: &SceneClip,
    options: &ExportOptions,
    encoding: &EncodingConfig,
    target: &NormalizationTarget,
    input_name: &str,
    output_name: &str,
) -> Invocation {
    let mut graph = FilterGraph::new();
    let mut v_ops = vec![
        FilterOp::Trim {
            start: clip.trim_in(),
            end: clip.trim_out(),
        },
        FilterOp::SetPts,
    ];
    v_ops.extend([
        FilterOp::Scale {
            width: target.width,
            height: target.height,
        },
        FilterOp::Pad {
            width: target.width,
            height: target.height,
        },
        FilterOp::Fps(target.fps),
        FilterOp::Format(reelforge_models::encoding::TARGET_PIXEL_FORMAT),
    ]);
    graph.push(FilterChain::new(["0:v"], v_ops, ["vout"]));

    let mut a_ops = audio_clip_ops(clip, options);
    a_ops.push(FilterOp::Resample(target.sample_rate));
    a_ops.push(FilterOp::StereoLayout);
    graph.push(FilterChain::new(["0:a"], a_ops, ["aout"]));

    Invocation::Graph {
        inputs: vec![input_name.to_string()],
        graph: graph.with_outputs("vout", "aout"),
        output: output_name.to_string(),
        encoding: encoding.clone(),
        format: options.format,
        expected_duration: Some(clip.effective_length()),
    }
}

/// Copy-only concatenation of conformed segments.
pub fn build_concat_copy(
    inputs: Vec<String>,
    output: &str,
    format: OutputFormat,
) -> Invocation {
    Invocation::ConcatCopy {
        inputs,
        output: output.to_string(),
        format,
    }
}
