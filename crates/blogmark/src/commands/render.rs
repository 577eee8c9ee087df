//! `blogmark render` command implementation.

use std::io;
use std::path::PathBuf;

use clap::Args;

use super::{SiteArgs, build_markdown, read_source};
use crate::error::CliError;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render, or `-` for stdin.
    input: PathBuf,

    /// Resolve link and image destinations against the public address.
    #[arg(short, long)]
    absolute: bool,

    /// Language for alert titles (overrides config).
    #[arg(short, long)]
    lang: Option<String>,

    #[command(flatten)]
    site: SiteArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, input or link resolution fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = read_source(&self.input)?;
        let config = self.site.load_config(self.lang)?;
        let md = build_markdown(&config);

        tracing::info!(
            input = %self.input.display(),
            absolute = self.absolute,
            lang = %config.markdown_resolved.default_lang,
            "Rendering"
        );
        md.convert(
            &source,
            self.absolute,
            &config.markdown_resolved.default_lang,
            &mut io::stdout().lock(),
        )?;
        Ok(())
    }
}
