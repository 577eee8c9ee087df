//! blogmark CLI - Markdown conversion for blog posts.
//!
//! Provides commands for:
//! - `render`: Convert a post body to HTML
//! - `text`: Print the plain text of a post body
//! - `title`: Convert a title with inline markup to plain text

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, TextArgs, TitleArgs};
use output::Output;

/// blogmark - Markdown conversion for blog posts.
#[derive(Parser)]
#[command(name = "blogmark", version, about)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown to HTML on stdout.
    Render(RenderArgs),
    /// Print the plain text of rendered Markdown.
    Text(TextArgs),
    /// Print a title with inline markup reduced to plain text.
    Title(TitleArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Text(args) => args.execute(),
        Commands::Title(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
