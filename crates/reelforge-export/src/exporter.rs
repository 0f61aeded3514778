//! Export orchestration.
//!
//! Drives one export call end to end: ingest clips, select and execute a
//! plan, degrade to the per-clip re-encode fallback when the filter-graph
//! strategy fails, mix narration, and always purge per-call temp state.
//!
//! Progress is a channel of events the caller consumes; the orchestrator
//! never calls back into caller code.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use reelforge_media::{
    build_concat_copy, build_conform_invocation, build_export_plan, build_mix_invocation,
    new_namespace, ExportPlan, ExtractedFrame, FfmpegEngine, MediaError, ProgressSink,
    TempTracker, TranscodeEngine,
};
use reelforge_models::{
    clip::sort_and_validate, AudioOverlay, EncodingConfig, ExportArtifact, ExportOptions,
    ExportProgress, NormalizationTarget, SceneClip,
};

use crate::config::ExportConfig;
use crate::error::ExportResult;

/// Sender half of the progress event stream.
pub type ProgressSender = mpsc::UnboundedSender<ExportProgress>;

/// A running export: its event stream and the eventual artifact.
pub struct ExportHandle {
    pub progress: mpsc::UnboundedReceiver<ExportProgress>,
    pub result: JoinHandle<ExportResult<ExportArtifact>>,
}

/// The export pipeline, bound to an injected engine session.
#[derive(Clone)]
pub struct Exporter {
    engine: Arc<dyn TranscodeEngine>,
    config: ExportConfig,
}

impl Exporter {
    pub fn new(engine: Arc<dyn TranscodeEngine>, config: ExportConfig) -> Self {
        Self { engine, config }
    }

    /// Construct against the shared FFmpeg session.
    pub async fn with_ffmpeg(config: ExportConfig) -> ExportResult<Self> {
        let engine = FfmpegEngine::acquire().await?;
        Ok(Self::new(engine, config))
    }

    /// Spawn an export and hand back its progress stream and result handle.
    pub fn export_stream(&self, clips: Vec<SceneClip>, options: ExportOptions) -> ExportHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let exporter = self.clone();
        let result =
            tokio::spawn(async move { exporter.export(clips, options, tx).await });
        ExportHandle {
            progress: rx,
            result,
        }
    }

    /// Run one export call to completion.
    ///
    /// Every terminal path emits one final event, `Complete` or `Error`
    /// with a human-readable message, and purges per-call temp artifacts;
    /// cleanup failures surface as warnings on the artifact, never as
    /// errors.
    pub async fn export(
        &self,
        clips: Vec<SceneClip>,
        options: ExportOptions,
        progress: ProgressSender,
    ) -> ExportResult<ExportArtifact> {
        let call_id = new_namespace();
        let span = info_span!("export", call = %call_id);

        async move {
            let mut tracker = TempTracker::new();
            let result = self
                .run(&call_id, clips, &options, &mut tracker, &progress)
                .await;
            let warnings = tracker.release_all(self.engine.as_ref()).await;

            match result {
                Ok(bytes) => {
                    info!(size = bytes.len(), "Export complete");
                    let _ = progress.send(ExportProgress::complete());
                    Ok(ExportArtifact::new(bytes, options.format).with_warnings(warnings))
                }
                Err(e) => {
                    let _ = progress.send(ExportProgress::error(e.to_string()));
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        ns: &str,
        clips: Vec<SceneClip>,
        options: &ExportOptions,
        tracker: &mut TempTracker,
        progress: &ProgressSender,
    ) -> ExportResult<Vec<u8>> {
        options.validate()?;
        let clips = sort_and_validate(clips)?;
        let encoding = EncodingConfig::for_format(options.format);
        let target = NormalizationTarget::default();

        // Loading: ingest clips in scene order under the call namespace
        let total = clips.len() as u32;
        let mut input_names = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let name = tracker.track(format!("{ns}/in_{i:03}.mp4"));
            self.engine.load_input(&name, &clip.source.path).await?;
            input_names.push(name);
            let _ = progress.send(ExportProgress::loading(i as u32 + 1, total));
        }

        // Preparing
        let output = tracker.track(format!("{ns}/assembled.{}", options.format.extension()));
        let plan = build_export_plan(
            &clips,
            options,
            &encoding,
            &target,
            &input_names,
            &output,
            self.config.default_transition_secs,
        )?;
        info!(plan = plan.kind.as_str(), clips = clips.len(), "Export plan selected");
        let _ = progress.send(ExportProgress::preparing(format!(
            "Prepared {} plan for {} clips",
            plan.kind.as_str(),
            clips.len()
        )));

        // Concatenating, with one re-encode retry for graph strategies
        let assembled = match self.execute_plan(&plan, progress).await {
            Ok(()) => output,
            Err(primary) if plan.kind.supports_fallback() => {
                warn!(error = %primary, "Plan execution failed, retrying with per-clip re-encode");
                match self
                    .run_reencode_fallback(
                        ns,
                        &clips,
                        options,
                        &encoding,
                        &target,
                        &input_names,
                        tracker,
                        progress,
                    )
                    .await
                {
                    Ok(name) => name,
                    Err(fallback_err) => {
                        // The first failure is the diagnosable one
                        warn!(error = %fallback_err, "Re-encode fallback also failed");
                        return Err(primary.into());
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        // Finalizing: optional narration mix, losing it beats losing the export
        let final_name = match &options.audio_overlay {
            Some(overlay) => {
                match self
                    .mix_overlay(ns, overlay, &assembled, &encoding, options, tracker, progress)
                    .await
                {
                    Ok(mixed) => mixed,
                    Err(e) => {
                        warn!(error = %e, "Narration mix failed; keeping pre-mix result");
                        assembled
                    }
                }
            }
            None => assembled,
        };

        let _ = progress.send(ExportProgress::finalizing("Reading artifact"));
        let bytes = self.engine.read_artifact(&final_name).await?;
        if bytes.is_empty() {
            return Err(MediaError::EmptyOutput(final_name).into());
        }
        Ok(bytes)
    }

    async fn execute_plan(
        &self,
        plan: &ExportPlan,
        progress: &ProgressSender,
    ) -> Result<(), MediaError> {
        let tx = progress.clone();
        let label = plan.kind.as_str();
        // The sink lives for exactly this run
        let sink: ProgressSink = Box::new(move |ratio| {
            let _ = tx.send(ExportProgress::concatenating(
                ratio,
                format!("Assembling clips ({label} plan)"),
            ));
        });
        self.engine.execute(&plan.invocation, Some(sink)).await
    }

    /// Normalize every clip independently, then concatenate the conformed
    /// set with stream copy. Slower than one filter graph, but robust
    /// against heterogeneous source encodings.
    #[allow(clippy::too_many_arguments)]
    async fn run_reencode_fallback(
        &self,
        ns: &str,
        clips: &[SceneClip],
        options: &ExportOptions,
        encoding: &EncodingConfig,
        target: &NormalizationTarget,
        input_names: &[String],
        tracker: &mut TempTracker,
        progress: &ProgressSender,
    ) -> Result<String, MediaError> {
        let total = clips.len() as u32;
        let mut segments = Vec::with_capacity(clips.len());

        for (i, clip) in clips.iter().enumerate() {
            let segment = tracker.track(format!("{ns}/conform_{i:03}.mp4"));
            let invocation = build_conform_invocation(
                clip,
                options,
                encoding,
                target,
                &input_names[i],
                &segment,
            );
            self.engine.execute(&invocation, None).await?;
            segments.push(segment);

            let ratio = (i as f64 + 1.0) / (total as f64 + 1.0);
            let _ = progress.send(
                ExportProgress::concatenating(
                    ratio,
                    format!("Re-encoding clip {} of {}", i + 1, total),
                )
                .with_files(i as u32 + 1, total),
            );
        }

        let output = tracker.track(format!(
            "{ns}/assembled_fallback.{}",
            options.format.extension()
        ));
        let invocation = build_concat_copy(segments, &output, options.format);
        self.engine.execute(&invocation, None).await?;
        Ok(output)
    }

    /// Second pass: mix the narration overlay and verify the result before
    /// committing the swap.
    async fn mix_overlay(
        &self,
        ns: &str,
        overlay: &AudioOverlay,
        video_name: &str,
        encoding: &EncodingConfig,
        options: &ExportOptions,
        tracker: &mut TempTracker,
        progress: &ProgressSender,
    ) -> Result<String, MediaError> {
        let _ = progress.send(ExportProgress::finalizing("Mixing narration"));

        let ext = overlay
            .source
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("m4a");
        let overlay_name = tracker.track(format!("{ns}/narration.{ext}"));
        self.engine
            .load_input(&overlay_name, &overlay.source.path)
            .await?;

        let overlay_duration = self.engine.media_duration(&overlay_name).await?;
        let mixed = tracker.track(format!("{ns}/mixed.{}", options.format.extension()));
        let invocation = build_mix_invocation(
            video_name,
            &overlay_name,
            overlay,
            overlay_duration,
            encoding,
            options.format,
            &mixed,
        )?;
        self.engine.execute(&invocation, None).await?;

        // Verify before swapping in the mixed result
        let check = self.engine.read_artifact(&mixed).await?;
        if check.is_empty() {
            return Err(MediaError::MixVerification(
                "mixed artifact is empty".to_string(),
            ));
        }
        Ok(mixed)
    }

    /// Extract the final frame of a video, e.g. to seed the next scene.
    pub async fn extract_last_frame(&self, source: &Path) -> ExportResult<ExtractedFrame> {
        let frame = reelforge_media::extract_last_frame(
            self.engine.as_ref(),
            source,
            self.config.frame_timeout_ms,
        )
        .await?;
        Ok(frame)
    }
}
