//! Two-hop declaration redirect and partial-type pages.
//!
//! `A.txt` lists every declaring file once (`index;path`). Shards
//! `A/<first hex digit>.txt` map a shortened identifier to a file index and
//! the byte offset of the declaration anchor in that file's page.

use std::collections::BTreeMap;
use std::path::Path;

use crate::accumulator::PartialType;
use crate::error::Error;
use crate::escape;
use crate::identity;
use crate::types::{DeclarationLocation, SymbolId};

/// File table of the redirect.
pub const FILE_TABLE: &str = "A.txt";

/// Folder of redirect shards.
pub const SHARD_DIR: &str = "A";

/// Folder of partial-type pages.
pub const PARTIALS_DIR: &str = "P";

/// Write `A.txt` and the shard files for one project.
///
/// The first location of each identifier wins; partial types are reached
/// through their `P/` page instead.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be written.
pub fn write_redirects(assembly_dir: &Path, locations: &[(SymbolId, Vec<DeclarationLocation>)]) -> Result<(), Error> {
    let mut files: Vec<&str> = locations.iter().flat_map(|(_, entries)| return entries.iter().map(|entry| return entry.path.as_str())).collect();
    files.sort_unstable();
    files.dedup();

    let table: String = files.iter().enumerate().map(|(index, path)| return format!("{index};{path}\n")).collect();
    std::fs::create_dir_all(assembly_dir)?;
    std::fs::write(assembly_dir.join(FILE_TABLE), table)?;

    let mut shards: BTreeMap<char, Vec<String>> = BTreeMap::new();
    for (id, entries) in locations {
        let Some(first) = entries.first() else {
            continue;
        };
        let Ok(file_index) = files.binary_search(&first.path.as_str()) else {
            continue;
        };
        let shard = id.as_str().chars().next().unwrap_or('0');
        shards.entry(shard).or_default().push(format!("{};{file_index};{}", identity::redirect_key(id), first.offset));
    }

    let shard_dir = assembly_dir.join(SHARD_DIR);
    std::fs::create_dir_all(&shard_dir)?;
    for (shard, mut lines) in shards {
        lines.sort();
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(shard_dir.join(format!("{shard}.txt")), content)?;
    }
    return Ok(());
}

/// Follow the redirect for `id`: the declaring path and anchor offset.
///
/// # Errors
///
/// Returns `Error::Io` if the file table cannot be read, or
/// `Error::IndexCorrupt` if a shard line points at a missing file index.
pub fn lookup(assembly_dir: &Path, id: &SymbolId) -> Result<Option<DeclarationLocation>, Error> {
    let shard = id.as_str().chars().next().unwrap_or('0');
    let shard_path = assembly_dir.join(SHARD_DIR).join(format!("{shard}.txt"));
    let Ok(shard_content) = std::fs::read_to_string(&shard_path) else {
        return Ok(None);
    };
    let key = identity::redirect_key(id);
    let Some(line) = shard_content.lines().find(|line| return line.split(';').next() == Some(key)) else {
        return Ok(None);
    };

    let corrupt = |reason: String| return Error::IndexCorrupt { file: shard_path.clone(), reason };
    let mut fields = line.split(';').skip(1);
    let file_index: usize = fields
        .next()
        .and_then(|field| return field.parse().ok())
        .ok_or_else(|| return corrupt(format!("bad file index in `{line}`")))?;
    let offset: u64 = fields
        .next()
        .and_then(|field| return field.parse().ok())
        .ok_or_else(|| return corrupt(format!("bad offset in `{line}`")))?;

    let table = std::fs::read_to_string(assembly_dir.join(FILE_TABLE))?;
    let path = table
        .lines()
        .find_map(|entry| {
            let (index, path) = entry.split_once(';')?;
            return (index.parse::<usize>().ok()? == file_index).then(|| return path.to_string());
        })
        .ok_or_else(|| return corrupt(format!("file index {file_index} not in {FILE_TABLE}")))?;
    return Ok(Some(DeclarationLocation { offset, path }));
}

/// Write `P/<id>.html` for every type declared across several files.
///
/// # Errors
///
/// Returns `Error::Io` if a page cannot be written.
pub fn write_partial_pages(assembly_dir: &Path, partials: &[PartialType]) -> Result<(), Error> {
    if partials.is_empty() {
        return Ok(());
    }
    let dir = assembly_dir.join(PARTIALS_DIR);
    std::fs::create_dir_all(&dir)?;
    for partial in partials {
        std::fs::write(dir.join(format!("{}.html", partial.id)), partial_page(partial))?;
    }
    return Ok(());
}

/// HTML listing every declaring file of a partial type, sorted by path.
pub fn partial_page(partial: &PartialType) -> String {
    let mut files = partial.files.clone();
    files.sort();
    let name = escape::escape_html_text(&partial.name);
    let mut page = format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{name}</title></head><body>\n<h1>{name}</h1>\n<ul>\n");
    for file in &files {
        let href = escape::escape_html(&format!("../{}.html#{}", file.replace('\\', "/"), partial.id));
        page.push_str(&format!("<li><a href=\"{href}\">{}</a></li>\n", escape::escape_html_text(file)));
    }
    page.push_str("</ul>\n</body></html>\n");
    return page;
}
