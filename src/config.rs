use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::federation;

/// Config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".codexref.toml";

/// Documents above this many lines are indexed in degraded mode.
pub const DEFAULT_LARGE_FILE_LINES: usize = 20_000;

/// Project configuration loaded from `.codexref.toml`.
/// Include/exclude patterns are path prefixes applied by the tree-sitter frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path prefixes never indexed.
    pub exclude: Vec<String>,
    /// Base URLs (or local directories) of federated index servers.
    pub federation: Vec<String>,
    /// Path prefixes to index; empty means everything.
    pub include: Vec<String>,
    /// Worker threads; `None` sizes the pool to the CPU count.
    pub jobs: Option<usize>,
    /// Line count above which a document is considered large.
    pub large_file_lines: usize,
    /// Whether outputs are written at all. `false` is a dry run.
    pub persist: bool,
    /// Render documents without resolving any symbol.
    pub skip_semantics: bool,
}

/// Raw TOML structure for `.codexref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CodexrefTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    federation: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    jobs: Option<usize>,
    #[serde(default)]
    large_file_lines: Option<usize>,
    #[serde(default)]
    persist: Option<bool>,
    #[serde(default)]
    skip_semantics: bool,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            federation: Vec::new(),
            include: Vec::new(),
            jobs: None,
            large_file_lines: DEFAULT_LARGE_FILE_LINES,
            persist: true,
            skip_semantics: false,
        };
    }
}

impl Config {
    /// Load config from `.codexref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed: a config the
    /// user wrote is never silently replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: CodexrefTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();
        return Ok(Self {
            exclude: raw.exclude,
            federation: raw.federation,
            include: raw.include,
            jobs: raw.jobs.filter(|jobs| return *jobs > 0),
            large_file_lines: raw.large_file_lines.unwrap_or(defaults.large_file_lines),
            persist: raw.persist.unwrap_or(defaults.persist),
            skip_semantics: raw.skip_semantics,
        });
    }

    /// Check whether a source path should be indexed.
    ///
    /// A path is included if no include patterns are set (index everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

// ── Config file editing ───────────────────────────────────────────────

/// Parse a `.codexref.toml` into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::ConfigParse` on parse failure.
fn read_config_doc(root: &Path) -> Result<(PathBuf, toml_edit::DocumentMut), Error> {
    let config_path = root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::ConfigParse { file: config_path.clone(), reason: e.to_string() };
    })?;

    return Ok((config_path, doc));
}

/// Index of `url` in the `federation` array, comparing normalized URLs.
fn position_of(servers: &toml_edit::Array, url: &str) -> Option<usize> {
    let wanted = federation::normalize_url(url);
    return servers.iter().position(|value| return value.as_str().is_some_and(|text| return federation::normalize_url(text) == wanted));
}

/// Append a server to the `federation` array, creating it if needed.
///
/// # Errors
///
/// Returns `Error::DuplicateFederationServer` if the server is already listed,
/// `Error::ConfigParse` if the file can't be parsed or `federation` is not an
/// array, or `Error::Io` if writing fails.
pub fn add_federation_server(root: &Path, url: &str) -> Result<(), Error> {
    let (config_path, mut doc) = read_config_doc(root)?;

    if !doc.contains_key("federation") {
        doc["federation"] = toml_edit::value(toml_edit::Array::new());
    }
    let servers = doc
        .get_mut("federation")
        .and_then(toml_edit::Item::as_array_mut)
        .ok_or_else(|| return Error::ConfigParse { file: config_path.clone(), reason: "`federation` is not an array".to_string() })?;

    if position_of(servers, url).is_some() {
        return Err(Error::DuplicateFederationServer { url: url.to_string() });
    }
    servers.push(federation::normalize_url(url));

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

/// Remove a server from the `federation` array.
///
/// # Errors
///
/// Returns `Error::UnknownFederationServer` if the server isn't listed.
pub fn remove_federation_server(root: &Path, url: &str) -> Result<(), Error> {
    let (config_path, mut doc) = read_config_doc(root)?;

    let servers = doc
        .get_mut("federation")
        .and_then(toml_edit::Item::as_array_mut)
        .ok_or_else(|| return Error::UnknownFederationServer { url: url.to_string() })?;
    let index = position_of(servers, url).ok_or_else(|| return Error::UnknownFederationServer { url: url.to_string() })?;
    servers.remove(index);

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.persist);
        assert_eq!(config.large_file_lines, DEFAULT_LARGE_FILE_LINES);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(Config::parse("large_file_lines = \"many\""), Err(Error::TomlDe(_))));
        assert!(matches!(Config::parse("colour = true"), Err(Error::TomlDe(_))));
    }

    #[test]
    fn parses_every_key() {
        let config = Config::parse(
            "include = [\"src/\"]\nexclude = [\"src/gen/\"]\nfederation = [\"https://ref.example\"]\njobs = 4\nlarge_file_lines = 10\npersist = false\nskip_semantics = true\n",
        )
        .unwrap();
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.large_file_lines, 10);
        assert!(!config.persist);
        assert!(config.skip_semantics);
        assert!(config.should_scan("src/lib.rs"));
        assert!(!config.should_scan("src/gen/out.rs"));
        assert!(!config.should_scan("tests/a.rs"));
    }

    #[test]
    fn federation_edit_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "# keep me\nlarge_file_lines = 500\n").unwrap();

        add_federation_server(dir.path(), "https://one.example/").unwrap();
        add_federation_server(dir.path(), "https://two.example").unwrap();
        assert!(matches!(
            add_federation_server(dir.path(), "https://one.example"),
            Err(Error::DuplicateFederationServer { .. })
        ));
        remove_federation_server(dir.path(), "https://two.example/").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# keep me\n"));
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.federation, vec!["https://one.example".to_string()]);
        assert_eq!(config.large_file_lines, 500);
    }

    #[test]
    fn removing_unknown_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            remove_federation_server(dir.path(), "https://nowhere.example"),
            Err(Error::UnknownFederationServer { .. })
        ));
    }
}
