use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, Config};
use crate::generator::PROCESSED_ASSEMBLIES_FILE;
use crate::grammar::SOURCE_EXTENSIONS;
use crate::master_index::MASTER_INDEX_FILE;

/// Output directory `info` reports on when `--out` is not given.
pub const DEFAULT_OUT: &str = "index";

/// Output the comprehensive codexref reference document, describing the
/// index under `out`.
pub fn run(json: bool, out: &Path) {
    let root = PathBuf::from(".");
    let state = gather_state(&root, out);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

struct CurrentState {
    config_error: Option<String>,
    config_found: bool,
    federation: Vec<String>,
    index_found: bool,
    large_file_lines: usize,
    out: PathBuf,
    processed_assemblies: Option<usize>,
}

fn gather_state(root: &Path, out: &Path) -> CurrentState {
    let config_found = root.join(config::CONFIG_FILE).exists();
    let (config, config_error) = match Config::load(root) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e.to_string())),
    };
    let processed_assemblies = std::fs::read_to_string(out.join(PROCESSED_ASSEMBLIES_FILE))
        .ok()
        .map(|content| return content.lines().filter(|line| return !line.trim().is_empty()).count());

    return CurrentState {
        config_error,
        config_found,
        federation: config.federation,
        index_found: out.join(MASTER_INDEX_FILE).exists(),
        large_file_lines: config.large_file_lines,
        out: out.to_path_buf(),
        processed_assemblies,
    };
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# codexref {version}

Cross-reference indexer: resolves every symbol reference in a multi-project
codebase and writes a browsable, searchable index.

## Workflow

    codexref index --root DIR --out DIR        Index a source tree (tree-sitter)
    codexref index --snapshot FILE --out DIR   Index a semantic snapshot (JSON)
    codexref index ... --resume                Continue an interrupted run
    codexref index ... --dry-run               Count only, write nothing
    codexref lookup --out DIR NAME             Prefix lookup in the master index
    codexref federation list|add|remove URL    Edit federated servers
    codexref info [--json] [--out DIR]         This document

## Output Layout

    <asm>/<path>.html                 rendered document with links and anchors
    <asm>/D.txt                       declared symbols: name;id;kind;signature;glyph
    <asm>/DeclarationMap.txt          =<id> blocks of path;offset
    <asm>/A.txt, <asm>/A/<hex>.txt    redirect file table and shards
    <asm>/P/<id>.html                 pages of partial types
    <asm>/R/<id>.txt                  references to <id>, grouped by target assembly
    <asm>/BaseMembers.txt             overridden members
    <asm>/ImplementedInterfaceMembers.txt
    Projects.txt, Assemblies.txt      project map
    DeclaredSymbols.txt, Huffman.txt  binary master index
    ProcessedAssemblies.txt           resume marker

## Supported Languages (tree-sitter frontend)

| Extension         | Language   |
|-------------------|------------|
| .rs               | Rust       |
| .ts .tsx .js .jsx | TypeScript |
| .go               | Go         |
| .py               | Python     |

## Configuration (.codexref.toml)

    include = [\"src/\"]                       # only index these paths
    exclude = [\"src/generated/\"]             # skip these paths
    federation = [\"https://ref.example\"]     # federated index servers
    large_file_lines = 20000                 # degrade documents above this
    skip_semantics = false                   # render without links
    persist = true                           # false: dry run
    jobs = 8                                 # worker threads

Logging: CODEXREF_LOG (or RUST_LOG) filter, CODEXREF_LOG_FORMAT=json.

## Current State

"
    );
}

fn print_markdown_state(state: &CurrentState) {
    match (&state.config_error, state.config_found) {
        (Some(reason), _) => println!("Config:     {} (invalid: {reason})", config::CONFIG_FILE),
        (None, true) => println!("Config:     {} (found)", config::CONFIG_FILE),
        (None, false) => println!("Config:     {} (not found)", config::CONFIG_FILE),
    }
    println!("Large file: {} lines", state.large_file_lines);

    if state.federation.is_empty() {
        println!("Federation: (none)");
    } else {
        println!("Federation: {}", state.federation.join(", "));
    }

    let index = if state.index_found { "found" } else { "not found" };
    match state.processed_assemblies {
        Some(n) => println!("Index:      {} ({index}, {n} assemblies processed)", state.out.display()),
        None => println!("Index:      {} ({index})", state.out.display()),
    }
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success |
| 1    | Index written, some documents failed to load |
| 3    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson {
    current_state: StateJson,
    exit_codes: Vec<ExitCodeInfo>,
    source_extensions: Vec<String>,
    version: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson {
    config_error: Option<String>,
    config_found: bool,
    federation: Vec<String>,
    index_found: bool,
    large_file_lines: usize,
    out: String,
    processed_assemblies: Option<usize>,
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_error: state.config_error.clone(),
            config_found: state.config_found,
            federation: state.federation.clone(),
            index_found: state.index_found,
            large_file_lines: state.large_file_lines,
            out: state.out.display().to_string(),
            processed_assemblies: state.processed_assemblies,
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success".to_string() },
            ExitCodeInfo { code: 1, meaning: "Index written, some documents failed to load".to_string() },
            ExitCodeInfo { code: 3, meaning: "Runtime error".to_string() },
        ],
        source_extensions: SOURCE_EXTENSIONS.iter().map(|ext| return format!(".{ext}")).collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
