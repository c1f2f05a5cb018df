mod accumulator;
mod classifier;
mod commands;
mod config;
mod diagnostics;
mod error;
mod escape;
mod federation;
#[cfg(test)]
mod fixtures;
mod frontend;
mod generator;
mod grammar;
mod heuristic;
mod huffman;
mod identity;
mod info;
mod logging;
mod master_index;
mod project_map;
mod redirect;
mod render;
mod resolver;
mod serialization;
mod snapshot;
mod symbols;
mod syntax;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::commands::{IndexRequest, Input};

/// Command-line interface.
#[derive(Parser)]
#[command(name = "codexref", version, about = "Cross-reference indexer for multi-project codebases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Manage federated index servers in .codexref.toml
    Federation {
        #[command(subcommand)]
        action: FederationAction,
    },
    /// Resolve every reference in a solution and write the index
    Index(IndexArgs),
    /// Print the output layout, configuration keys, and current state
    Info {
        /// Print as JSON instead of markdown
        #[arg(long)]
        json: bool,
        /// Index directory to report on
        #[arg(long, default_value = info::DEFAULT_OUT)]
        out: PathBuf,
    },
    /// Find declared symbols by name prefix in a written index
    Lookup {
        /// Name prefix, matched case-insensitively
        name: String,
        /// Index directory
        #[arg(long)]
        out: PathBuf,
    },
}

/// `codexref federation` subcommands.
#[derive(Subcommand)]
enum FederationAction {
    /// Add a server
    Add {
        /// Base URL or local directory of the server's index
        url: String,
    },
    /// List configured servers
    List,
    /// Remove a server
    Remove {
        /// Server to remove
        url: String,
    },
}

/// Flags of `codexref index`. Unset flags fall back to `.codexref.toml`.
#[derive(Args)]
struct IndexArgs {
    /// Count only; write nothing
    #[arg(long)]
    dry_run: bool,
    /// Federated server (repeatable); replaces the configured list
    #[arg(long = "federation", value_name = "URL")]
    federation: Vec<String>,
    /// Worker threads (default: one per CPU)
    #[arg(long)]
    jobs: Option<usize>,
    /// Documents with more lines are indexed without local highlighting or federated links
    #[arg(long, value_name = "N")]
    large_file_lines: Option<usize>,
    /// Output directory
    #[arg(long)]
    out: PathBuf,
    /// Continue an interrupted run instead of wiping the output directory
    #[arg(long)]
    resume: bool,
    /// Source tree to index with the tree-sitter frontend
    #[arg(long, value_name = "DIR", conflicts_with = "snapshot", required_unless_present = "snapshot")]
    root: Option<PathBuf>,
    /// Render documents as plain text without resolving symbols
    #[arg(long)]
    skip_semantics: bool,
    /// Semantic snapshot (JSON) written by an external frontend
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
}

impl IndexArgs {
    /// A snapshot wins over a tree; no input at all indexes the working directory.
    fn into_request(self) -> IndexRequest {
        let input = match (self.snapshot, self.root) {
            (Some(snapshot), _) => Input::Snapshot(snapshot),
            (None, root) => Input::Tree(root.unwrap_or_else(|| return PathBuf::from("."))),
        };
        return IndexRequest {
            dry_run: self.dry_run,
            federation: self.federation,
            input,
            jobs: self.jobs,
            large_file_lines: self.large_file_lines,
            out: self.out,
            resume: self.resume,
            skip_semantics: self.skip_semantics,
        };
    }
}

/// Exit code for errors that stopped the run.
const RUNTIME_ERROR: u8 = 3;

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Federation { action } => run_federation(action),
        Commands::Index(args) => commands::index(&args.into_request()),
        Commands::Info { json, out } => {
            commands::info(json, &out);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Lookup { name, out } => commands::lookup(&out, &name),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(RUNTIME_ERROR)
        },
    };
}

/// Edit or list federation servers.
///
/// # Errors
///
/// Returns errors from reading or editing the config file.
fn run_federation(action: FederationAction) -> Result<ExitCode, error::Error> {
    match action {
        FederationAction::Add { url } => commands::federation_add(&url)?,
        FederationAction::List => commands::federation_list()?,
        FederationAction::Remove { url } => commands::federation_remove(&url)?,
    }
    return Ok(ExitCode::SUCCESS);
}
