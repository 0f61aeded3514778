//! Transcoding engine adapter.
//!
//! The engine is an opaque service: write a named input, execute a typed
//! invocation, read a named output, delete a named file. Everything above
//! this seam is backend-agnostic; argv rendering lives here only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::plan::{FrameSeek, Invocation};
use crate::probe;

/// Per-run progress callback receiving a completion ratio clamped to [0, 1].
pub type ProgressSink = Box<dyn Fn(f64) + Send + Sync + 'static>;

/// Contract the pipeline holds against any transcoding backend.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Copy a source file into engine storage under `name`.
    async fn load_input(&self, name: &str, source: &Path) -> MediaResult<()>;

    /// Run one invocation. The progress sink, when given, lives for exactly
    /// this run.
    async fn execute(
        &self,
        invocation: &Invocation,
        progress: Option<ProgressSink>,
    ) -> MediaResult<()>;

    /// Read a named artifact back out of engine storage.
    async fn read_artifact(&self, name: &str) -> MediaResult<Vec<u8>>;

    /// Delete a named file from engine storage. Idempotent.
    async fn remove_file(&self, name: &str) -> MediaResult<()>;

    /// Duration in seconds of a file already in engine storage.
    async fn media_duration(&self, name: &str) -> MediaResult<f64>;
}

/// Fresh storage namespace for one export call.
///
/// Every temporary artifact name is prefixed with this, so concurrent calls
/// sharing the engine can never collide on fixed filenames.
pub fn new_namespace() -> String {
    format!("call-{}", Uuid::new_v4().simple())
}

static ENGINE: OnceCell<Arc<FfmpegEngine>> = OnceCell::const_new();

/// The ffmpeg/ffprobe CLI pair behind the [`TranscodeEngine`] contract.
pub struct FfmpegEngine {
    root: TempDir,
    run_lock: Mutex<()>,
    log_level: String,
}

impl FfmpegEngine {
    /// Acquire the shared engine session, initializing it on first use.
    ///
    /// Concurrent callers racing the first acquisition await the single
    /// in-flight initialization rather than starting a second one.
    pub async fn acquire() -> MediaResult<Arc<FfmpegEngine>> {
        ENGINE
            .get_or_try_init(|| async { Ok(Arc::new(Self::initialize()?)) })
            .await
            .cloned()
    }

    /// Create a private engine session (tests, embedding).
    pub fn initialize() -> MediaResult<Self> {
        check_ffmpeg()?;
        check_ffprobe()?;

        let root = tempfile::Builder::new()
            .prefix("reelforge-engine-")
            .tempdir()
            .map_err(|e| MediaError::EngineInit(format!("session storage: {e}")))?;

        info!(storage = %root.path().display(), "Transcoding engine session ready");
        Ok(Self {
            root,
            run_lock: Mutex::new(()),
            log_level: "error".to_string(),
        })
    }

    /// Absolute path of a named file in engine storage.
    pub fn storage_path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load_input(&self, name: &str, source: &Path) -> MediaResult<()> {
        let dest = self.storage_path(name);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| MediaError::input_fetch(name, e.to_string()))?;
        debug!(name, source = %source.display(), "Loaded input into engine storage");
        Ok(())
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        progress: Option<ProgressSink>,
    ) -> MediaResult<()> {
        // One run at a time against the shared session.
        let _guard = self.run_lock.lock().await;

        let (cmd, list_file) = render_invocation(self.root.path(), &self.log_level, invocation);

        if let Some((path, contents)) = &list_file {
            tokio::fs::write(path, contents).await?;
        }

        let runner = FfmpegRunner::new();
        let result = match (progress, expected_duration(invocation)) {
            (Some(sink), Some(expected)) => {
                runner
                    .run_with_progress(&cmd, move |p| sink(p.ratio(expected)))
                    .await
            }
            _ => runner.run(&cmd).await,
        };

        if let Some((path, _)) = list_file {
            let _ = tokio::fs::remove_file(path).await;
        }

        result
    }

    async fn read_artifact(&self, name: &str) -> MediaResult<Vec<u8>> {
        let path = self.storage_path(name);
        tokio::fs::read(&path)
            .await
            .map_err(|_| MediaError::FileNotFound(path))
    }

    async fn remove_file(&self, name: &str) -> MediaResult<()> {
        let path = self.storage_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn media_duration(&self, name: &str) -> MediaResult<f64> {
        probe::media_duration(self.storage_path(name)).await
    }
}

fn expected_duration(invocation: &Invocation) -> Option<f64> {
    match invocation {
        Invocation::Graph {
            expected_duration, ..
        } => *expected_duration,
        _ => None,
    }
}

/// Render a typed invocation to an FFmpeg command.
///
/// For copy-concatenation this also returns the demuxer list file to write
/// before the run; the file lives next to the output and is removed after.
fn render_invocation(
    root: &Path,
    log_level: &str,
    invocation: &Invocation,
) -> (FfmpegCommand, Option<(PathBuf, String)>) {
    match invocation {
        Invocation::Remux {
            input,
            output,
            format,
        } => {
            let cmd = FfmpegCommand::new(root.join(output))
                .log_level(log_level)
                .input(root.join(input))
                .codec_copy()
                .output_args(format.mux_args());
            (cmd, None)
        }

        Invocation::Graph {
            inputs,
            graph,
            output,
            encoding,
            format,
            ..
        } => {
            let mut cmd = FfmpegCommand::new(root.join(output)).log_level(log_level);
            for name in inputs {
                cmd = cmd.input(root.join(name));
            }
            cmd = cmd.filter_complex(graph.render());
            if let Some(v) = &graph.video_out {
                cmd = cmd.map(v.clone());
            }
            if let Some(a) = &graph.audio_out {
                cmd = cmd.map(a.clone());
            }
            cmd = cmd
                .output_args(encoding.to_ffmpeg_args())
                .output_args(format.mux_args());
            (cmd, None)
        }

        Invocation::ConcatCopy {
            inputs,
            output,
            format,
        } => {
            let list_path = root.join(format!("{output}.list.txt"));
            let contents: String = inputs
                .iter()
                .map(|name| format!("file '{}'\n", root.join(name).display()))
                .collect();
            let cmd = FfmpegCommand::new(root.join(output))
                .log_level(log_level)
                .input_with_args(["-f", "concat", "-safe", "0"], &list_path)
                .codec_copy()
                .output_args(format.mux_args());
            (cmd, Some((list_path, contents)))
        }

        Invocation::MixAudio {
            video,
            overlay,
            graph,
            output,
            encoding,
            format,
        } => {
            let mut cmd = FfmpegCommand::new(root.join(output))
                .log_level(log_level)
                .input(root.join(video))
                .input(root.join(overlay))
                .filter_complex(graph.render())
                // The visual component is never re-encoded here
                .map_stream("0:v")
                .output_args(["-c:v", "copy"]);
            if let Some(a) = &graph.audio_out {
                cmd = cmd.map(a.clone());
            }
            cmd = cmd
                .output_args([
                    "-c:a".to_string(),
                    encoding.audio_codec.clone(),
                    "-b:a".to_string(),
                    encoding.audio_bitrate.clone(),
                ])
                .output_args(format.mux_args());
            (cmd, None)
        }

        Invocation::FrameGrab {
            input,
            output,
            seek,
        } => {
            let seek_args: Vec<String> = match seek {
                FrameSeek::FromEnd(secs) => vec!["-sseof".to_string(), format!("-{secs:.3}")],
                FrameSeek::Absolute(secs) => vec!["-ss".to_string(), format!("{secs:.3}")],
            };
            let cmd = FfmpegCommand::new(root.join(output))
                .log_level(log_level)
                .input_with_args(seek_args, root.join(input))
                .output_args(["-frames:v", "1", "-q:v", "2"]);
            (cmd, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterChain, FilterGraph, FilterOp};
    use reelforge_models::{EncodingConfig, OutputFormat};

    fn graph() -> FilterGraph {
        let mut g = FilterGraph::new();
        g.push(FilterChain::new(
            ["0:v", "0:a", "1:v", "1:a"],
            vec![FilterOp::Concat {
                n: 2,
                video: true,
                audio: true,
            }],
            ["vout", "aout"],
        ));
        g.with_outputs("vout", "aout")
    }

    #[test]
    fn test_namespace_is_unique_per_call() {
        let a = new_namespace();
        let b = new_namespace();
        assert_ne!(a, b);
        assert!(a.starts_with("call-"));
    }

    #[test]
    fn test_render_graph_maps_both_outputs() {
        let inv = Invocation::Graph {
            inputs: vec!["ns/in_0.mp4".into(), "ns/in_1.mp4".into()],
            graph: graph(),
            output: "ns/out.mp4".into(),
            encoding: EncodingConfig::default(),
            format: OutputFormat::Mp4,
            expected_duration: Some(10.0),
        };
        let (cmd, list) = render_invocation(Path::new("/work"), "error", &inv);
        assert!(list.is_none());
        let args = cmd.build_args();
        assert!(args.contains(&"[vout]".to_string()));
        assert!(args.contains(&"[aout]".to_string()));
        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().unwrap(), "/work/ns/out.mp4");
    }

    #[test]
    fn test_render_concat_copy_builds_list_file() {
        let inv = Invocation::ConcatCopy {
            inputs: vec!["ns/seg_0.mp4".into(), "ns/seg_1.mp4".into()],
            output: "ns/out.mp4".into(),
            format: OutputFormat::Mp4,
        };
        let (cmd, list) = render_invocation(Path::new("/work"), "error", &inv);
        let (path, contents) = list.unwrap();
        assert_eq!(path, Path::new("/work/ns/out.mp4.list.txt"));
        assert!(contents.contains("file '/work/ns/seg_0.mp4'"));
        assert!(contents.contains("file '/work/ns/seg_1.mp4'"));

        let args = cmd.build_args();
        assert!(args.contains(&"concat".to_string()));
        let c = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[c + 1], "copy");
    }

    #[test]
    fn test_render_mix_copies_video_stream() {
        let mut g = FilterGraph::new();
        g.push(FilterChain::new(
            ["0:a", "1:a"],
            vec![FilterOp::Amix { inputs: 2 }],
            ["aout"],
        ));
        let inv = Invocation::MixAudio {
            video: "ns/out.mp4".into(),
            overlay: "ns/narration.aac".into(),
            graph: g.with_outputs("0:v", "aout"),
            output: "ns/mixed.mp4".into(),
            encoding: EncodingConfig::default(),
            format: OutputFormat::Mp4,
        };
        let (cmd, _) = render_invocation(Path::new("/work"), "error", &inv);
        let args = cmd.build_args();
        let copy_pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[copy_pos + 1], "copy");
        assert!(args.contains(&"0:v".to_string()));
    }

    #[test]
    fn test_render_frame_grab_seeks_before_input() {
        let inv = Invocation::FrameGrab {
            input: "ns/src.mp4".into(),
            output: "ns/frame.jpg".into(),
            seek: FrameSeek::FromEnd(0.5),
        };
        let (cmd, _) = render_invocation(Path::new("/work"), "error", &inv);
        let args = cmd.build_args();
        let sseof = args.iter().position(|a| a == "-sseof").unwrap();
        assert_eq!(args[sseof + 1], "-0.500");
        assert!(sseof < args.iter().position(|a| a == "-i").unwrap());
        assert!(args.contains(&"-frames:v".to_string()));
    }
}
