use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigParse { file, reason } => render_config_parse(&file.display().to_string(), reason),
        Error::DuplicateFederationServer { url } => render_duplicate_server(url),
        Error::FederationDownload { url, reason } => render_federation_download(url, reason),
        Error::IndexCorrupt { file, reason } => render_index_corrupt(&file.display().to_string(), reason),
        Error::OutputNotDirectory { path } => render_output_not_directory(&path.display().to_string()),
        Error::OutputNotEmpty { path } => render_output_not_empty(&path.display().to_string()),
        Error::SnapshotInvalid { document, reason } => render_snapshot_invalid(document, reason),
        Error::UnknownFederationServer { url } => render_unknown_server(url),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        _ => render_generic(e),
    };
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::HuffmanUnknownSymbol { symbol } => format!("\
# Error: Huffman Table Incomplete

No code for {symbol:?}. The table must be built from every description it encodes.
"),

        Error::InvalidSymbolId { value } => format!("\
# Error: Invalid Symbol Id

`{value}` is not 16 lowercase hex characters.
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: Invalid JSON

{e}
"),
        Error::SymbolTableFull { limit } => format!("\
# Error: Symbol Table Full

The solution declares more than {limit} symbols.

## Fix

Index the source tree in parts with `include` / `exclude` in `.codexref.toml`.
"),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.codexref.toml` for typos; run `codexref info` to see every key.
"),
        _ => format!("\
# Error

{e}
"),
    };
}

fn render_config_parse(file: &str, reason: &str) -> String {
    return format!("\
# Error: Config Parse Failed

Could not edit `{file}`: {reason}

## Fix

Repair the TOML syntax by hand, then retry.
");
}

fn render_duplicate_server(url: &str) -> String {
    return format!("\
# Error: Federation Server Already Configured

`{url}` is already listed under `federation` in `.codexref.toml`.
");
}

fn render_federation_download(url: &str, reason: &str) -> String {
    return format!("\
# Error: Federation Download Failed

Could not read `{url}/Assemblies.txt`: {reason}

## Fix

Check the server URL, or set `HTTPS_PROXY` when behind an authenticating proxy.
");
}

fn render_index_corrupt(file: &str, reason: &str) -> String {
    return format!("\
# Error: Index Corrupt

`{file}`: {reason}

## Fix

Regenerate the index without `--resume`:

    codexref index --out <DIR>
");
}

fn render_output_not_directory(path: &str) -> String {
    return format!("\
# Error: Output Is Not a Directory

`{path}` exists and is a file.

## Fix

Pass a directory to `--out`.
");
}

fn render_output_not_empty(path: &str) -> String {
    return format!("\
# Error: Output Directory In Use

`{path}` has files but no `Assemblies.txt` or `ProcessedAssemblies.txt`, so it
was not written by codexref. A fresh run empties its output directory first.

## Fix

Pass an empty or new directory to `--out`, or the directory of an earlier run.
");
}

fn render_snapshot_invalid(document: &str, reason: &str) -> String {
    return format!("\
# Error: Snapshot Invalid

Document `{document}`: {reason}

## Fix

Re-export the snapshot from the frontend that produced it.
");
}

fn render_unknown_server(url: &str) -> String {
    return format!("\
# Error: Unknown Federation Server

`{url}` is not configured.

## Fix

List configured servers:

    codexref federation list
");
}

fn render_unsupported_language(ext: &str) -> String {
    return format!(
        "\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

- `.rs` Rust
- `.ts`, `.tsx`, `.js`, `.jsx` TypeScript / JavaScript
- `.go` Go
- `.py` Python
"
    );
}

// ── Run-time failure log ──────────────────────────────────────────────

/// Reports each distinct failure description once per run.
///
/// Dangling symbol keys and similar frontend inconsistencies tend to repeat
/// for every occurrence of the same symbol; only the first is logged.
#[derive(Debug, Default)]
pub struct FailureLog {
    /// Descriptions already reported.
    seen: Mutex<HashSet<String>>,
}

impl FailureLog {
    /// An empty log.
    pub fn new() -> Self {
        return Self { seen: Mutex::new(HashSet::new()) };
    }

    /// Log `description` at warn level unless it was reported before.
    /// Returns whether it was logged.
    pub fn report(&self, description: &str) -> bool {
        let first = match self.seen.lock() {
            Ok(mut seen) => seen.insert(description.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(description.to_string()),
        };
        if first {
            tracing::warn!(target: "codexref::failures", "{description}");
        }
        return first;
    }

    /// Number of distinct descriptions reported.
    pub fn distinct(&self) -> usize {
        return match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
    }
}
