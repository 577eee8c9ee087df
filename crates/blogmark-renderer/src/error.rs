use std::io;

use crate::resolve::ResolutionError;

/// Conversion error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("HTML text extraction failed: {0}")]
    Html(String),
}
