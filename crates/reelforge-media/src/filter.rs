//! Typed filter-graph intermediate representation.
//!
//! Plans are constructed as a tagged union of primitive operations and only
//! rendered to FFmpeg's `filter_complex` syntax at the adapter boundary.
//! Construction is pure, so graph structure and rendered output can both be
//! asserted on in tests without touching the engine.

use std::fmt::Write;

/// One primitive stream operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Cut a video stream to `start..end` (source seconds)
    Trim { start: f64, end: f64 },
    /// Reset video timestamps to start at zero
    SetPts,
    /// Fit into a box, preserving aspect ratio
    Scale { width: u32, height: u32 },
    /// Pad to exact size, centering the image
    Pad { width: u32, height: u32 },
    /// Force a constant frame rate
    Fps(u32),
    /// Force a pixel format
    Format(&'static str),
    /// Cut an audio stream to `start..end`
    Atrim { start: f64, end: f64 },
    /// Reset audio timestamps to start at zero
    AsetPts,
    /// Force an audio sample rate
    Resample(u32),
    /// Force a stereo channel layout
    StereoLayout,
    /// Scale audio gain; 0.0 mutes the stream
    Volume(f64),
    /// Delay all channels by `ms`
    Adelay { ms: u64 },
    /// Drop silent stretches
    SilenceRemove { threshold_db: i32, min_duration: f64 },
    /// Blend two video streams at `offset` on the output timeline
    Xfade {
        transition: &'static str,
        duration: f64,
        offset: f64,
    },
    /// Blend two audio streams over the last `duration` seconds of the first
    Acrossfade { duration: f64 },
    /// Concatenate `n` input groups
    Concat { n: usize, video: bool, audio: bool },
    /// Mix audio streams; output duration follows the first input
    Amix { inputs: usize },
}

impl FilterOp {
    fn render(&self, out: &mut String) {
        match self {
            FilterOp::Trim { start, end } => {
                let _ = write!(out, "trim=start={start:.3}:end={end:.3}");
            }
            FilterOp::SetPts => out.push_str("setpts=PTS-STARTPTS"),
            FilterOp::Scale { width, height } => {
                let _ = write!(
                    out,
                    "scale={width}:{height}:force_original_aspect_ratio=decrease"
                );
            }
            FilterOp::Pad { width, height } => {
                let _ = write!(out, "pad={width}:{height}:(ow-iw)/2:(oh-ih)/2");
            }
            FilterOp::Fps(fps) => {
                let _ = write!(out, "fps={fps}");
            }
            FilterOp::Format(fmt) => {
                let _ = write!(out, "format={fmt}");
            }
            FilterOp::Atrim { start, end } => {
                let _ = write!(out, "atrim=start={start:.3}:end={end:.3}");
            }
            FilterOp::AsetPts => out.push_str("asetpts=PTS-STARTPTS"),
            FilterOp::Resample(rate) => {
                let _ = write!(out, "aresample={rate}");
            }
            FilterOp::StereoLayout => out.push_str("aformat=channel_layouts=stereo"),
            FilterOp::Volume(gain) => {
                let _ = write!(out, "volume={gain:.2}");
            }
            FilterOp::Adelay { ms } => {
                let _ = write!(out, "adelay={ms}:all=1");
            }
            FilterOp::SilenceRemove {
                threshold_db,
                min_duration,
            } => {
                let _ = write!(
                    out,
                    "silenceremove=stop_periods=-1:stop_duration={min_duration:.2}:stop_threshold={threshold_db}dB"
                );
            }
            FilterOp::Xfade {
                transition,
                duration,
                offset,
            } => {
                let _ = write!(
                    out,
                    "xfade=transition={transition}:duration={duration:.3}:offset={offset:.3}"
                );
            }
            // Exponential curves approximate a constant-power blend and
            // avoid the audible dip a linear crossfade produces.
            FilterOp::Acrossfade { duration } => {
                let _ = write!(out, "acrossfade=d={duration:.3}:c1=exp:c2=exp");
            }
            FilterOp::Concat { n, video, audio } => {
                let _ = write!(
                    out,
                    "concat=n={n}:v={}:a={}",
                    u8::from(*video),
                    u8::from(*audio)
                );
            }
            FilterOp::Amix { inputs } => {
                let _ = write!(out, "amix=inputs={inputs}:duration=first:dropout_transition=2");
            }
        }
    }
}

/// A linear chain of operations from labeled inputs to labeled outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub ops: Vec<FilterOp>,
    pub outputs: Vec<String>,
}

impl FilterChain {
    pub fn new(
        inputs: impl IntoIterator<Item = impl Into<String>>,
        ops: Vec<FilterOp>,
        outputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ops,
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    fn render(&self, out: &mut String) {
        for input in &self.inputs {
            let _ = write!(out, "[{input}]");
        }
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            op.render(out);
        }
        for output in &self.outputs {
            let _ = write!(out, "[{output}]");
        }
    }
}

/// A complete filter graph with its final stream labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGraph {
    pub chains: Vec<FilterChain>,
    pub video_out: Option<String>,
    pub audio_out: Option<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    pub fn with_outputs(
        mut self,
        video: impl Into<String>,
        audio: impl Into<String>,
    ) -> Self {
        self.video_out = Some(video.into());
        self.audio_out = Some(audio.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Render to `filter_complex` syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            chain.render(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_trim_chain() {
        let chain = FilterChain::new(
            ["0:v"],
            vec![FilterOp::Trim { start: 1.0, end: 5.5 }, FilterOp::SetPts],
            ["v0"],
        );
        let mut graph = FilterGraph::new();
        graph.push(chain);
        assert_eq!(
            graph.render(),
            "[0:v]trim=start=1.000:end=5.500,setpts=PTS-STARTPTS[v0]"
        );
    }

    #[test]
    fn test_render_xfade() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            ["v0", "v1"],
            vec![FilterOp::Xfade {
                transition: "fade",
                duration: 1.0,
                offset: 9.0,
            }],
            ["xv1"],
        ));
        assert_eq!(
            graph.render(),
            "[v0][v1]xfade=transition=fade:duration=1.000:offset=9.000[xv1]"
        );
    }

    #[test]
    fn test_render_interleaved_concat() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            ["0:v", "0:a", "1:v", "1:a"],
            vec![FilterOp::Concat {
                n: 2,
                video: true,
                audio: true,
            }],
            ["vout", "aout"],
        ));
        assert_eq!(graph.render(), "[0:v][0:a][1:v][1:a]concat=n=2:v=1:a=1[vout][aout]");
    }

    #[test]
    fn test_render_multiple_chains_joined_with_semicolon() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(["0:a"], vec![FilterOp::Volume(0.0)], ["a0"]));
        graph.push(FilterChain::new(["1:a"], vec![FilterOp::Volume(0.8)], ["a1"]));
        assert_eq!(graph.render(), "[0:a]volume=0.00[a0];[1:a]volume=0.80[a1]");
    }

    #[test]
    fn test_acrossfade_uses_exponential_curve() {
        let mut s = String::new();
        FilterOp::Acrossfade { duration: 0.5 }.render(&mut s);
        assert!(s.contains("c1=exp"));
        assert!(s.contains("c2=exp"));
    }

    #[test]
    fn test_amix_follows_first_input_duration() {
        let mut s = String::new();
        FilterOp::Amix { inputs: 2 }.render(&mut s);
        assert!(s.contains("duration=first"));
    }
}
