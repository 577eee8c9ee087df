//! `blogmark title` command implementation.

use std::io::{self, Write};

use clap::Args;

use super::{SiteArgs, build_markdown};
use crate::error::CliError;

/// Arguments for the title command.
#[derive(Args)]
pub(crate) struct TitleArgs {
    /// Title text with inline Markdown.
    title: String,

    #[command(flatten)]
    site: SiteArgs,
}

impl TitleArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let md = build_markdown(&self.site.load_config(None)?);
        writeln!(io::stdout().lock(), "{}", md.convert_title(&self.title))?;
        Ok(())
    }
}
