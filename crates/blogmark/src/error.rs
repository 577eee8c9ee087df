//! CLI error types.

use blogmark_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] blogmark_renderer::Error),

    #[error("Failed to read {path}: {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },
}
