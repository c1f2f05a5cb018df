//! Other index servers whose assemblies can be linked to.
//!
//! Each server publishes `Assemblies.txt`; the list is downloaded once at
//! startup. A server that cannot be reached contributes nothing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// Attempts made through the configured proxy after an HTTP 407.
const MAX_PROXY_ATTEMPTS: u32 = 3;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One federated server and the assemblies it indexes.
#[derive(Debug, Clone)]
struct Server {
    /// Assemblies listed in the server's `Assemblies.txt`.
    assemblies: HashSet<String>,
    /// Base URL without a trailing slash.
    url: String,
}

/// Set of federated servers, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct Federation {
    /// Servers indexed by position.
    servers: Vec<Server>,
}

impl Federation {
    /// No federated servers.
    pub fn empty() -> Self {
        return Self::default();
    }

    /// Download every server's assembly list. Failures are logged and leave
    /// that server with an empty list so indices stay stable.
    pub fn load(urls: &[String]) -> Self {
        let lists = urls
            .iter()
            .map(|url| {
                let url = normalize_url(url);
                let assemblies = match fetch_assembly_list(&url) {
                    Ok(list) => {
                        tracing::info!(server = %url, assemblies = list.len(), "federation server loaded");
                        list
                    },
                    Err(err) => {
                        tracing::warn!(server = %url, error = %err, "federation server unavailable, links to it are disabled");
                        Vec::new()
                    },
                };
                return (url, assemblies);
            })
            .collect();
        return Self::from_lists(lists);
    }

    /// Build from already-known lists.
    pub fn from_lists(lists: Vec<(String, Vec<String>)>) -> Self {
        let servers = lists
            .into_iter()
            .map(|(url, assemblies)| return Server { assemblies: assemblies.into_iter().collect(), url: normalize_url(&url) })
            .collect();
        return Self { servers };
    }

    /// Index of the first server that indexes `assembly`.
    pub fn external_assembly_index(&self, assembly: &str) -> Option<usize> {
        return self.servers.iter().position(|server| return server.assemblies.contains(assembly));
    }

    /// Base URL of the server at `index`.
    pub fn server_url(&self, index: usize) -> Option<&str> {
        return self.servers.get(index).map(|server| return server.url.as_str());
    }

    /// Number of configured servers.
    pub fn len(&self) -> usize {
        return self.servers.len();
    }

    /// Whether no servers are configured.
    pub fn is_empty(&self) -> bool {
        return self.servers.is_empty();
    }
}

/// Trim trailing slashes so URLs compose with `/`.
pub fn normalize_url(url: &str) -> String {
    return url.trim().trim_end_matches('/').to_string();
}

/// Local directory behind a `file://` URL or a plain path, if the server is local.
fn local_directory(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    return Some(PathBuf::from(url));
}

/// Assembly names from the contents of an `Assemblies.txt` file.
pub fn parse_assembly_list(content: &str) -> Vec<String> {
    return content
        .lines()
        .filter_map(|line| {
            let name = line.split(';').next()?.trim();
            return (!name.is_empty()).then(|| return name.to_string());
        })
        .collect();
}

/// Read or download `Assemblies.txt` from one server.
///
/// # Errors
///
/// Returns `Error::FederationDownload` for transport failures and non-success statuses.
pub fn fetch_assembly_list(url: &str) -> Result<Vec<String>, Error> {
    if let Some(dir) = local_directory(url) {
        return read_local_list(url, &dir);
    }
    let content = download(&format!("{url}/Assemblies.txt"))?;
    return Ok(parse_assembly_list(&content));
}

/// # Errors
///
/// Returns `Error::FederationDownload` if the list cannot be read.
fn read_local_list(url: &str, dir: &Path) -> Result<Vec<String>, Error> {
    let content = std::fs::read_to_string(dir.join("Assemblies.txt")).map_err(|err| {
        return Error::FederationDownload { url: url.to_string(), reason: err.to_string() };
    })?;
    return Ok(parse_assembly_list(&content));
}

/// GET `address`, retrying through the environment proxy on HTTP 407.
///
/// # Errors
///
/// Returns `Error::FederationDownload` when every attempt fails.
fn download(address: &str) -> Result<String, Error> {
    let direct = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    match direct.get(address).call() {
        Ok(response) => return read_body(address, response),
        Err(ureq::Error::Status(407, _)) => {},
        Err(err) => return Err(download_error(address, &err.to_string())),
    }

    let Some(proxy_url) = proxy_from_env() else {
        return Err(download_error(address, "proxy authentication required and no HTTPS_PROXY/HTTP_PROXY set"));
    };
    let proxy = ureq::Proxy::new(&proxy_url).map_err(|err| return download_error(address, &err.to_string()))?;
    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).proxy(proxy).build();

    let mut last_reason = String::from("proxy authentication required");
    for attempt in 1..=MAX_PROXY_ATTEMPTS {
        match agent.get(address).call() {
            Ok(response) => return read_body(address, response),
            Err(err) => {
                tracing::debug!(url = address, attempt, error = %err, "proxy attempt failed");
                last_reason = err.to_string();
            },
        }
    }
    return Err(download_error(address, &last_reason));
}

/// # Errors
///
/// Returns `Error::FederationDownload` if the body is not valid UTF-8 text.
fn read_body(address: &str, response: ureq::Response) -> Result<String, Error> {
    return response.into_string().map_err(|err| return download_error(address, &err.to_string()));
}

fn download_error(address: &str, reason: &str) -> Error {
    return Error::FederationDownload { url: address.to_string(), reason: reason.to_string() };
}

/// Proxy URL (possibly with credentials) from the usual environment variables.
fn proxy_from_env() -> Option<String> {
    return ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
        .iter()
        .find_map(|name| return std::env::var(name).ok().filter(|value| return !value.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assembly_lines() {
        let list = parse_assembly_list("mscorlib;-1\nSystem.Core;3\n\nAcme\n");
        assert_eq!(list, vec!["mscorlib".to_string(), "System.Core".to_string(), "Acme".to_string()]);
    }

    #[test]
    fn first_matching_server_wins() {
        let federation = Federation::from_lists(vec![
            ("https://one.example/".to_string(), vec!["A".to_string()]),
            ("https://two.example".to_string(), vec!["A".to_string(), "B".to_string()]),
        ]);
        assert_eq!(federation.external_assembly_index("A"), Some(0));
        assert_eq!(federation.external_assembly_index("B"), Some(1));
        assert_eq!(federation.external_assembly_index("C"), None);
        assert_eq!(federation.server_url(0), Some("https://one.example"));
    }

    #[test]
    fn local_server_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Assemblies.txt"), "Remote.Lib;0\n").unwrap();
        let url = format!("file://{}", dir.path().display());

        let federation = Federation::load(&[url]);
        assert_eq!(federation.external_assembly_index("Remote.Lib"), Some(0));
    }

    #[test]
    fn unreachable_server_keeps_its_slot() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere").display().to_string();
        let present = tempfile::tempdir().unwrap();
        std::fs::write(present.path().join("Assemblies.txt"), "B;0\n").unwrap();

        let federation = Federation::load(&[missing, present.path().display().to_string()]);
        assert_eq!(federation.len(), 2);
        assert_eq!(federation.external_assembly_index("B"), Some(1));
    }
}
