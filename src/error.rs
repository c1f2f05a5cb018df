/// Crate-level error types for codexref diagnostics.
use std::path::PathBuf;

/// All errors in codexref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, server, or reason for failure.
///
/// Ordinary negative outcomes of reference resolution (no symbol, no link,
/// unknown assembly) are never errors; they are expressed as `None`.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `.codexref.toml` exists but cannot be edited as a TOML document.
    #[error("config parse failed: {}: {reason}", file.display())]
    ConfigParse {
        /// Config file that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A federation server is already configured.
    #[error("federation server already configured: `{url}`")]
    DuplicateFederationServer {
        /// The server base URL.
        url: String,
    },

    /// A federation server's assembly list could not be downloaded.
    #[error("federation download failed: {url}: {reason}")]
    FederationDownload {
        /// Server base URL or local directory.
        url: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// A referenced file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A Huffman-compressed description contains a character missing from the table.
    #[error("huffman table has no code for {symbol:?}")]
    HuffmanUnknownSymbol {
        /// Character that could not be encoded.
        symbol: char,
    },

    /// A generated index file exists but cannot be decoded.
    #[error("index corrupt: {}: {reason}", file.display())]
    IndexCorrupt {
        /// Index file that failed to decode.
        file: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// A string is not a 16-hex-character symbol identifier.
    #[error("invalid symbol id: `{value}`")]
    InvalidSymbolId {
        /// The rejected text.
        value: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// The output location exists but is not a directory.
    #[error("output path is not a directory: {}", path.display())]
    OutputNotDirectory {
        /// The offending output path.
        path: PathBuf,
    },

    /// The output directory holds files that are not an index, so it is not wiped.
    #[error("output directory is not empty and holds no index: {}", path.display())]
    OutputNotEmpty {
        /// The offending output directory.
        path: PathBuf,
    },

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A document in a semantic snapshot is internally inconsistent.
    #[error("snapshot invalid: {document}: {reason}")]
    SnapshotInvalid {
        /// Project-relative path of the offending document.
        document: String,
        /// Description of the inconsistency.
        reason: String,
    },

    /// The symbol arena ran out of 32-bit keys.
    #[error("symbol table full: more than {limit} symbols")]
    SymbolTableFull {
        /// Largest number of symbols a table can hold.
        limit: u64,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No configured federation server matches the given URL.
    #[error("unknown federation server: `{url}`")]
    UnknownFederationServer {
        /// The server base URL that was not found.
        url: String,
    },

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}
