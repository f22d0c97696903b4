//! CLI definitions for atlas.

use std::path::PathBuf;

use atlas_editor::Position;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "atlas",
    version,
    about = "Atlas coding workbench client",
    infer_subcommands = true,
    after_help = "Examples:\n  atlas tree --expand-all\n  atlas complete --file src/app.js --line 3 --column 12\n  atlas rectify --file src/app.js --start 1:1 --end 4:1 --prompt \"use const\" --apply\n  atlas --project demo delete --path src/old"
)]
pub struct Cli {
    /// Show debug logs.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Configuration file (defaults to ./atlas.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Project name override.
    #[arg(long, global = true)]
    pub project: Option<String>,
    /// Model id override for AI requests.
    #[arg(long, global = true)]
    pub model: Option<String>,
    /// Backend base URL override.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the project's folder tree.
    Tree {
        /// Expand every folder.
        #[arg(long)]
        expand_all: bool,
    },
    /// Ask the AI for completions at a position.
    Complete {
        /// File to complete in.
        #[arg(long)]
        file: String,
        /// 1-based line.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        line: u32,
        /// 1-based column.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        column: u32,
    },
    /// Rewrite a span of a file with the AI.
    Rectify {
        /// File holding the span.
        #[arg(long)]
        file: String,
        /// Span start as LINE:COLUMN (1-based).
        #[arg(long, value_parser = parse_position)]
        start: Position,
        /// Span end as LINE:COLUMN (1-based, exclusive).
        #[arg(long, value_parser = parse_position)]
        end: Position,
        /// Instruction steering the rewrite.
        #[arg(long, default_value = "")]
        prompt: String,
        /// Write the rewrite back and save it.
        #[arg(long)]
        apply: bool,
    },
    /// Create a file with a default name.
    Create,
    /// Rename a file or folder.
    Rename {
        /// Current path.
        #[arg(long)]
        from: String,
        /// New path.
        #[arg(long)]
        to: String,
    },
    /// Delete a file or folder.
    Delete {
        /// File or folder path.
        #[arg(long)]
        path: String,
    },
    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parses `LINE:COLUMN`, both 1-based.
pub fn parse_position(text: &str) -> Result<Position, String> {
    let (line, column) = text
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COLUMN, got '{text}'"))?;
    let parse = |part: &str, what: &str| -> Result<u32, String> {
        match part.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(format!("{what} must be a positive number, got '{part}'")),
            Ok(value) => Ok(value - 1),
        }
    };
    Ok(Position::new(parse(line, "line")?, parse(column, "column")?))
}
