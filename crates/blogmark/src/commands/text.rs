//! `blogmark text` command implementation.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use super::{SiteArgs, build_markdown, read_source};
use crate::error::CliError;

/// Arguments for the text command.
#[derive(Args)]
pub(crate) struct TextArgs {
    /// Markdown file to read, or `-` for stdin.
    input: PathBuf,

    #[command(flatten)]
    site: SiteArgs,
}

impl TextArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = read_source(&self.input)?;
        let md = build_markdown(&self.site.load_config(None)?);
        writeln!(io::stdout().lock(), "{}", md.convert_to_plain_text(&source))?;
        Ok(())
    }
}
