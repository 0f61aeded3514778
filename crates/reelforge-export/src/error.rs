//! Export error types.

use thiserror::Error;

use reelforge_media::MediaError;
use reelforge_models::clip::ClipError;
use reelforge_models::export::OptionsError;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ClipError),

    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ExportError {
    /// Human-readable message for progress events and API surfaces.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
