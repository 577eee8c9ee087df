//! CLI command implementations.

mod render;
mod text;
mod title;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blogmark_config::{CliSettings, Config};
use blogmark_renderer::{Markdown, Strings};
use clap::Args;

use crate::error::CliError;

pub(crate) use render::RenderArgs;
pub(crate) use text::TextArgs;
pub(crate) use title::TitleArgs;

/// Site options shared by every command.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover blogmark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Public address for absolute links (overrides config).
    #[arg(long, env = "BLOGMARK_PUBLIC_ADDRESS")]
    public_address: Option<String>,
}

impl SiteArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load_config(self, lang: Option<String>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            public_address: self.public_address,
            default_lang: lang,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Build a converter for the configured site.
///
/// A strings directory that cannot be loaded is logged and replaced by the
/// built-in English titles.
pub(crate) fn build_markdown(config: &Config) -> Markdown {
    let strings = match &config.markdown_resolved.strings_dir {
        Some(dir) => Strings::load_dir(dir).unwrap_or_else(|e| {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to load strings, using built-in titles");
            Strings::builtin()
        }),
        None => Strings::builtin(),
    };
    Markdown::new(config.server.public_address.clone()).with_localizer(Arc::new(strings))
}

/// Read Markdown from `input`, or from stdin when it is `-`.
pub(crate) fn read_source(input: &Path) -> Result<String, CliError> {
    let wrap = |source| CliError::Input {
        path: input.display().to_string(),
        source,
    };
    if input == Path::new("-") {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(wrap)?;
        Ok(source)
    } else {
        std::fs::read_to_string(input).map_err(wrap)
    }
}
