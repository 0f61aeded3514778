//! Last-frame extraction, used to seed continuity for follow-up scenes.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{new_namespace, TranscodeEngine};
use crate::error::{MediaError, MediaResult};
use crate::plan::{FrameSeek, Invocation};

/// How far back from end-of-stream the fast path seeks.
const FAST_SEEK_BACKOFF: f64 = 0.5;
/// Margin before end-of-stream for the accurate fallback seek.
const ACCURATE_SEEK_MARGIN: f64 = 0.1;

/// A single extracted frame.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Extract the final frame of a video.
///
/// The fast path seeks backwards from end-of-stream; if that fails (some
/// containers refuse `sseof`), the fallback probes the duration and
/// accurate-seeks just before it. Every async sub-step runs under its own
/// deadline so a wedged engine cannot hang the caller.
pub async fn extract_last_frame(
    engine: &dyn TranscodeEngine,
    source: &Path,
    timeout_ms: u64,
) -> MediaResult<ExtractedFrame> {
    let ns = new_namespace();
    let input = format!("{ns}/frame_src.mp4");
    let output = format!("{ns}/last_frame.jpg");

    let result = extract_inner(engine, source, &input, &output, timeout_ms).await;

    // Namespace-scoped scratch files; removal failures are not worth surfacing
    let _ = engine.remove_file(&input).await;
    let _ = engine.remove_file(&output).await;

    result
}

async fn extract_inner(
    engine: &dyn TranscodeEngine,
    source: &Path,
    input: &str,
    output: &str,
    timeout_ms: u64,
) -> MediaResult<ExtractedFrame> {
    step(timeout_ms, "load frame source", engine.load_input(input, source)).await?;

    let fast = Invocation::FrameGrab {
        input: input.to_string(),
        output: output.to_string(),
        seek: FrameSeek::FromEnd(FAST_SEEK_BACKOFF),
    };

    if let Err(e) = step(timeout_ms, "seek from end", engine.execute(&fast, None)).await {
        warn!(error = %e, "Fast end-of-stream seek failed, probing duration");

        let duration = step(timeout_ms, "probe duration", engine.media_duration(input)).await?;
        let position = (duration - ACCURATE_SEEK_MARGIN).max(0.0);
        debug!(duration, position, "Accurate-seeking to final frame");

        let accurate = Invocation::FrameGrab {
            input: input.to_string(),
            output: output.to_string(),
            seek: FrameSeek::Absolute(position),
        };
        step(timeout_ms, "seek to final frame", engine.execute(&accurate, None)).await?;
    }

    let bytes = step(timeout_ms, "read frame", engine.read_artifact(output)).await?;
    if bytes.is_empty() {
        return Err(MediaError::EmptyOutput(output.to_string()));
    }

    Ok(ExtractedFrame {
        bytes,
        mime_type: "image/jpeg".to_string(),
    })
}

/// Run one sub-step under its own deadline with a descriptive failure.
async fn step<T>(
    timeout_ms: u64,
    name: &'static str,
    fut: impl std::future::Future<Output = MediaResult<T>>,
) -> MediaResult<T> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
        .await
        .map_err(|_| MediaError::timeout(name, timeout_ms))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_fast_path_extracts_frame() {
        let engine = FakeEngine::new().with_artifact(vec![0xFF, 0xD8, 0xFF]);
        let frame = extract_last_frame(&engine, &PathBuf::from("/tmp/v.mp4"), 1000)
            .await
            .unwrap();
        assert_eq!(frame.mime_type, "image/jpeg");
        assert_eq!(frame.bytes, vec![0xFF, 0xD8, 0xFF]);

        // Fast seek only; no probe needed
        let calls = engine.calls().await;
        assert!(calls.iter().any(|c| c.contains("frame_grab")));
        assert!(!calls.iter().any(|c| c.contains("duration")));
    }

    #[tokio::test]
    async fn test_falls_back_to_accurate_seek() {
        let engine = FakeEngine::new()
            .with_artifact(vec![1, 2, 3])
            .with_failing_fast_grab()
            .with_duration(42.0);
        let frame = extract_last_frame(&engine, &PathBuf::from("/tmp/v.mp4"), 1000)
            .await
            .unwrap();
        assert_eq!(frame.bytes, vec![1, 2, 3]);

        let calls = engine.calls().await;
        assert!(calls.iter().any(|c| c.contains("duration")));
        // Accurate seek lands just before end of stream
        assert!(calls.iter().any(|c| c.contains("absolute:41.9")));
    }

    #[tokio::test]
    async fn test_wedged_probe_times_out() {
        let engine = FakeEngine::new()
            .with_failing_fast_grab()
            .with_hanging_probe();
        let err = extract_last_frame(&engine, &PathBuf::from("/tmp/v.mp4"), 50)
            .await
            .unwrap_err();
        match err {
            MediaError::Timeout { step, .. } => assert_eq!(step, "probe duration"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scratch_files_are_removed() {
        let engine = FakeEngine::new().with_artifact(vec![9]);
        extract_last_frame(&engine, &PathBuf::from("/tmp/v.mp4"), 1000)
            .await
            .unwrap();
        assert!(engine.files().await.is_empty());
    }
}
