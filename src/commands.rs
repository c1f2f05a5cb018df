//! Core CLI commands for codexref: index, lookup, federation, info.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{self, Config};
use crate::error;
use crate::federation::{self, Federation};
use crate::frontend::Solution;
use crate::generator::{self, IndexOptions, RunSummary};
use crate::heuristic;
use crate::master_index::MasterIndex;
use crate::redirect;
use crate::resolver;
use crate::snapshot::SolutionSnapshot;

/// Where the solution to index comes from.
#[derive(Debug, Clone)]
pub enum Input {
    /// A JSON semantic snapshot written by an external frontend.
    Snapshot(PathBuf),
    /// A source tree indexed with the tree-sitter frontend.
    Tree(PathBuf),
}

/// Everything `codexref index` was asked to do. `None` and `false` leave
/// the config file's value in place.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    /// Count only, write nothing.
    pub dry_run: bool,
    /// Federated servers; replaces the configured list when non-empty.
    pub federation: Vec<String>,
    pub input: Input,
    pub jobs: Option<usize>,
    pub large_file_lines: Option<usize>,
    pub out: PathBuf,
    pub resume: bool,
    pub skip_semantics: bool,
}

/// Merge CLI flags over the config file.
fn index_options(config: &Config, request: &IndexRequest) -> IndexOptions {
    return IndexOptions {
        jobs: request.jobs.filter(|jobs| return *jobs > 0).or(config.jobs),
        large_file_lines: request.large_file_lines.unwrap_or(config.large_file_lines),
        out: request.out.clone(),
        persist: config.persist && !request.dry_run,
        resume: request.resume,
        skip_semantics: config.skip_semantics || request.skip_semantics,
    };
}

/// Load the solution from a snapshot file or a source tree.
///
/// # Errors
///
/// Returns snapshot read/parse errors or tree discovery errors.
fn load_solution(input: &Input, config: &Config) -> Result<Solution, error::Error> {
    return match input {
        Input::Snapshot(path) => Ok(SolutionSnapshot::read(path)?.into_solution()),
        Input::Tree(root) => heuristic::load_solution(root, config),
    };
}

/// Load a solution, index it, and report what was written.
/// Exits 1 when the run finished but some documents failed to load.
///
/// # Errors
///
/// Returns errors from config loading, solution loading, or writing the index.
pub fn index(request: &IndexRequest) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let options = index_options(&config, request);

    let solution = load_solution(&request.input, &config)?;
    let servers = if request.federation.is_empty() { &config.federation } else { &request.federation };
    let federation = Federation::load(servers);

    let summary = generator::generate(&solution, &federation, &options)?;
    print_summary(&summary, &options);

    if summary.failed_documents > 0 {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print a markdown summary of a finished run to stderr.
fn print_summary(summary: &RunSummary, options: &IndexOptions) {
    if options.persist {
        eprintln!("## Indexed into {}\n", options.out.display());
    } else {
        eprintln!("## Dry run (nothing written)\n");
    }
    eprintln!("- projects:     {} ({} skipped)", summary.projects, summary.skipped_projects);
    eprintln!("- documents:    {} ({} failed)", summary.documents, summary.failed_documents);
    eprintln!("- lines:        {} ({} bytes)", summary.lines, summary.bytes);
    eprintln!("- references:   {}", summary.references);
    eprintln!("- declarations: {}", summary.declarations);

    if summary.failed_documents > 0 {
        eprintln!();
        eprintln!("Failed documents were written without links; see the log for their paths.");
    }
    return;
}

// ── Lookup ────────────────────────────────────────────────────────────

/// Print every declared symbol whose name starts with `name`, with the
/// page and anchor its redirect points at.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `out` holds no index, or
/// `Error::IndexCorrupt` if the index or a redirect shard cannot be read.
pub fn lookup(out: &Path, name: &str) -> Result<ExitCode, error::Error> {
    let index = MasterIndex::read(out)?;
    let hits = index.lookup(name);
    if hits.is_empty() {
        eprintln!("No declared symbol starts with `{name}`.");
        return Ok(ExitCode::SUCCESS);
    }

    for entry in hits {
        let assembly = index.assembly_name(entry.assembly);
        let record = &entry.record;
        println!("{}  {} {}  [{assembly}] {}", record.name, record.kind, record.signature, record.id);
        if let Some(location) = redirect::lookup(&out.join(assembly), &record.id)? {
            println!("    {}#{}", resolver::page_url(assembly, &location.path), location.offset);
        }
    }
    return Ok(ExitCode::SUCCESS);
}

// ── Federation ────────────────────────────────────────────────────────

/// List the configured federation servers.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn federation_list() -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    if config.federation.is_empty() {
        println!("No federation servers configured.");
        return Ok(());
    }
    for (index, url) in config.federation.iter().enumerate() {
        println!("{index}  {url}");
    }
    return Ok(());
}

/// Add a federation server to the config file.
///
/// # Errors
///
/// Returns `Error::DuplicateFederationServer` if it is already listed, or
/// errors from config editing.
pub fn federation_add(url: &str) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    config::add_federation_server(&root, url)?;
    println!("Added federation server: {}", federation::normalize_url(url));
    return Ok(());
}

/// Remove a federation server from the config file.
///
/// # Errors
///
/// Returns `Error::UnknownFederationServer` if it isn't listed, or errors
/// from config editing.
pub fn federation_remove(url: &str) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    config::remove_federation_server(&root, url)?;
    println!("Removed federation server: {}", federation::normalize_url(url));
    return Ok(());
}

/// Output the codexref reference document.
pub fn info(json: bool, out: &Path) {
    return crate::info::run(json, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> IndexRequest {
        return IndexRequest {
            dry_run: false,
            federation: Vec::new(),
            input: Input::Tree(PathBuf::from(".")),
            jobs: None,
            large_file_lines: None,
            out: PathBuf::from("out"),
            resume: false,
            skip_semantics: false,
        };
    }

    #[test]
    fn config_values_apply_without_flags() {
        let config = Config::parse("jobs = 3\nlarge_file_lines = 50\nskip_semantics = true\n").unwrap();
        let options = index_options(&config, &request());
        assert_eq!(options.jobs, Some(3));
        assert_eq!(options.large_file_lines, 50);
        assert!(options.skip_semantics);
        assert!(options.persist);
    }

    #[test]
    fn flags_override_config() {
        let config = Config::parse("jobs = 3\nlarge_file_lines = 50\n").unwrap();
        let options = index_options(&config, &IndexRequest { dry_run: true, jobs: Some(8), large_file_lines: Some(7), ..request() });
        assert_eq!(options.jobs, Some(8));
        assert_eq!(options.large_file_lines, 7);
        assert!(!options.persist);
    }

    #[test]
    fn config_can_disable_persistence() {
        let config = Config::parse("persist = false\n").unwrap();
        assert!(!index_options(&config, &request()).persist);
    }
}
