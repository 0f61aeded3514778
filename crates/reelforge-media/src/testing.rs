//! Scripted in-memory engine for exercising engine-driven code paths.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::engine::{ProgressSink, TranscodeEngine};
use crate::error::{MediaError, MediaResult};
use crate::plan::{FrameSeek, Invocation};

/// In-memory [`TranscodeEngine`] with scriptable failures.
pub(crate) struct FakeEngine {
    files: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    artifact: Vec<u8>,
    duration: f64,
    fail_fast_grab: bool,
    fail_removal: bool,
    hang_probe: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            artifact: vec![1],
            duration: 10.0,
            fail_fast_grab: false,
            fail_removal: false,
            hang_probe: false,
        }
    }

    pub fn with_artifact(mut self, bytes: Vec<u8>) -> Self {
        self.artifact = bytes;
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    pub fn with_failing_fast_grab(mut self) -> Self {
        self.fail_fast_grab = true;
        self
    }

    pub fn with_failing_removal(mut self) -> Self {
        self.fail_removal = true;
        self
    }

    pub fn with_hanging_probe(mut self) -> Self {
        self.hang_probe = true;
        self
    }

    pub async fn insert_files<'a>(&self, names: impl IntoIterator<Item = &'a str>) {
        let mut files = self.files.lock().await;
        files.extend(names.into_iter().map(String::from));
    }

    pub async fn files(&self) -> HashSet<String> {
        self.files.lock().await.clone()
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn load_input(&self, name: &str, _source: &Path) -> MediaResult<()> {
        self.record(format!("load {name}")).await;
        self.files.lock().await.insert(name.to_string());
        Ok(())
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        _progress: Option<ProgressSink>,
    ) -> MediaResult<()> {
        let call = match invocation {
            Invocation::FrameGrab { seek, .. } => match seek {
                FrameSeek::FromEnd(s) => format!("frame_grab from_end:{s:.1}"),
                FrameSeek::Absolute(s) => format!("frame_grab absolute:{s:.1}"),
            },
            other => other.kind_str().to_string(),
        };
        self.record(call).await;

        if self.fail_fast_grab {
            if let Invocation::FrameGrab {
                seek: FrameSeek::FromEnd(_),
                ..
            } = invocation
            {
                return Err(MediaError::graph_execution(
                    "sseof unsupported by container",
                    None,
                    Some(1),
                ));
            }
        }

        self.files
            .lock()
            .await
            .insert(invocation.output_name().to_string());
        Ok(())
    }

    async fn read_artifact(&self, name: &str) -> MediaResult<Vec<u8>> {
        if self.files.lock().await.contains(name) {
            Ok(self.artifact.clone())
        } else {
            Err(MediaError::FileNotFound(name.into()))
        }
    }

    async fn remove_file(&self, name: &str) -> MediaResult<()> {
        if self.fail_removal {
            return Err(MediaError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }
        self.files.lock().await.remove(name);
        Ok(())
    }

    async fn media_duration(&self, name: &str) -> MediaResult<f64> {
        self.record(format!("duration {name}")).await;
        if self.hang_probe {
            std::future::pending::<()>().await;
        }
        Ok(self.duration)
    }
}
