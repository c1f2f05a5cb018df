//! Per-project index files: declared symbols, declaration map, reference
//! buckets, and member maps.
//!
//! Reference files live under the *target* assembly's folder, so several
//! projects may append to the same file at once. `ReferenceWriter` hands out
//! one lock per target assembly to keep two-line records intact.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::Error;
use crate::types::{DeclarationLocation, DeclaredSymbolRecord, MemberTarget, ReferenceRecord, SymbolId};

/// Declared symbols of a project.
pub const DECLARED_SYMBOLS_FILE: &str = "D.txt";

/// Declaration-location blocks of a project.
pub const DECLARATION_MAP_FILE: &str = "DeclarationMap.txt";

/// Overriding member → overridden member.
pub const BASE_MEMBERS_FILE: &str = "BaseMembers.txt";

/// Implementing member → interface member.
pub const IMPLEMENTED_INTERFACE_MEMBERS_FILE: &str = "ImplementedInterfaceMembers.txt";

/// Folder of per-symbol reference files inside an assembly folder.
pub const REFERENCES_DIR: &str = "R";

/// Make a free-text value safe for `;`-separated single-line records.
pub fn sanitize_field(text: &str) -> String {
    return strip_line_breaks(text).chars().map(|ch| return if ch == ';' { ':' } else { ch }).collect();
}

/// Drop `\r` and `\n`, keeping everything else verbatim.
fn strip_line_breaks(text: &str) -> String {
    return text.chars().filter(|ch| return *ch != '\r' && *ch != '\n').collect();
}

fn open_append(path: &Path) -> Result<BufWriter<std::fs::File>, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    return Ok(BufWriter::new(file));
}

// ── D.txt ─────────────────────────────────────────────────────────────

/// Write `D.txt`: one `name;id;kind;signature;glyph` line per record, in the
/// order given (the accumulator already sorts by name then id).
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be written.
pub fn write_declared_symbols(assembly_dir: &Path, records: &[DeclaredSymbolRecord]) -> Result<(), Error> {
    std::fs::create_dir_all(assembly_dir)?;
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{};{};{};{};{}\n",
            sanitize_field(&record.name),
            record.id,
            sanitize_field(&record.kind),
            sanitize_field(&record.signature),
            record.glyph
        ));
    }
    std::fs::write(assembly_dir.join(DECLARED_SYMBOLS_FILE), out)?;
    return Ok(());
}

/// Parse the contents of a `D.txt` file.
///
/// # Errors
///
/// Returns `Error::IndexCorrupt` for lines without five fields or with a
/// non-numeric glyph.
pub fn parse_declared_symbols(file: &Path, content: &str) -> Result<Vec<DeclaredSymbolRecord>, Error> {
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let corrupt = |reason: &str| {
            return Error::IndexCorrupt { file: file.to_path_buf(), reason: format!("line {}: {reason}", index.saturating_add(1)) };
        };
        let fields: Vec<&str> = line.split(';').collect();
        let [name, id, kind, signature, glyph] = fields.as_slice() else {
            return Err(corrupt("expected 5 fields"));
        };
        let glyph = glyph.parse::<u16>().map_err(|_err| return corrupt("glyph is not a number"))?;
        records.push(DeclaredSymbolRecord {
            glyph,
            id: SymbolId((*id).to_string()),
            kind: (*kind).to_string(),
            name: (*name).to_string(),
            signature: (*signature).to_string(),
        });
    }
    return Ok(records);
}

// ── DeclarationMap.txt ────────────────────────────────────────────────

/// Append `=<id>` blocks of `path;offset` lines to `DeclarationMap.txt`.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or written.
pub fn append_declaration_map(assembly_dir: &Path, locations: &[(SymbolId, Vec<DeclarationLocation>)]) -> Result<(), Error> {
    let mut out = open_append(&assembly_dir.join(DECLARATION_MAP_FILE))?;
    for (id, entries) in locations {
        writeln!(out, "={id}")?;
        for location in entries {
            writeln!(out, "{};{}", location.path, location.offset)?;
        }
    }
    out.flush()?;
    return Ok(());
}

// ── Member maps ───────────────────────────────────────────────────────

/// Write a `fromId;toAssembly;toId` member map. Nothing is written for an empty map.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be written.
pub fn write_member_map(path: &Path, entries: &[(SymbolId, MemberTarget)]) -> Result<(), Error> {
    if entries.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let out: String = entries.iter().map(|(from, target)| return format!("{from};{};{}\n", target.assembly, target.id)).collect();
    std::fs::write(path, out)?;
    return Ok(());
}

// ── R/<id>.txt ────────────────────────────────────────────────────────

/// First line of a reference record:
/// `fromAssembly;url;fromLocalPath;lineNumber;colStart;colEnd;kind`.
pub fn reference_header(record: &ReferenceRecord) -> String {
    return format!(
        "{};{};{};{};{};{};{}",
        record.from_assembly,
        record.url,
        record.from_path,
        record.line_number,
        record.column_start,
        record.column_end,
        record.kind.code()
    );
}

/// Appends reference records to `<root>/<target assembly>/R/<id>.txt`.
#[derive(Debug)]
pub struct ReferenceWriter {
    /// One lock per target assembly folder.
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Output root.
    root: PathBuf,
}

impl ReferenceWriter {
    /// Writer rooted at the output directory.
    pub fn new(root: &Path) -> Self {
        return Self { locks: DashMap::new(), root: root.to_path_buf() };
    }

    fn lock_for(&self, assembly: &str) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(assembly.to_string()).or_default();
        return Arc::clone(entry.value());
    }

    /// Append every bucket of one target assembly. Records are written as
    /// a header line followed by the escaped line text, kept verbatim apart
    /// from line breaks.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a reference file cannot be opened or written.
    pub fn append(&self, assembly: &str, buckets: &[(SymbolId, Vec<ReferenceRecord>)]) -> Result<(), Error> {
        let lock = self.lock_for(assembly);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = self.root.join(assembly).join(REFERENCES_DIR);
        std::fs::create_dir_all(&dir)?;
        for (id, records) in buckets {
            let mut out = open_append(&dir.join(format!("{id}.txt")))?;
            for record in records {
                writeln!(out, "{}", reference_header(record))?;
                writeln!(out, "{}", strip_line_breaks(&record.line_text))?;
            }
            out.flush()?;
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceKind;

    fn record(line: u32, text: &str) -> ReferenceRecord {
        return ReferenceRecord {
            column_end: 9,
            column_start: 5,
            from_assembly: "App".to_string(),
            from_path: "src/Main.cs".to_string(),
            kind: ReferenceKind::Write,
            line_number: line,
            line_text: text.to_string(),
            to_assembly: "Lib".to_string(),
            to_display_name: "count".to_string(),
            to_symbol_id: SymbolId("00112233aabbccdd".to_string()),
            url: "src/Main.cs.html".to_string(),
        };
    }

    #[test]
    fn declared_symbols_round_trip_through_text() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![DeclaredSymbolRecord {
            glyph: 72,
            id: SymbolId("0123456789abcdef".to_string()),
            kind: "method".to_string(),
            name: "Run".to_string(),
            signature: "Acme.Widget.Run(Int32;\nString)".to_string(),
        }];
        write_declared_symbols(dir.path(), &records).unwrap();

        let path = dir.path().join(DECLARED_SYMBOLS_FILE);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Run;0123456789abcdef;method;Acme.Widget.Run(Int32:String);72\n");
        let parsed = parse_declared_symbols(&path, &content).unwrap();
        assert_eq!(parsed.first().unwrap().signature, "Acme.Widget.Run(Int32:String)");
    }

    #[test]
    fn short_declared_line_is_corrupt() {
        let err = parse_declared_symbols(Path::new("D.txt"), "Run;abc\n").unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt { .. }));
    }

    #[test]
    fn declaration_map_appends_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let id = SymbolId("0123456789abcdef".to_string());
        let first = vec![(id.clone(), vec![DeclarationLocation { offset: 120, path: "A.cs".to_string() }])];
        let second = vec![(id, vec![DeclarationLocation { offset: 0, path: "B.cs".to_string() }])];
        append_declaration_map(dir.path(), &first).unwrap();
        append_declaration_map(dir.path(), &second).unwrap();

        let content = std::fs::read_to_string(dir.path().join(DECLARATION_MAP_FILE)).unwrap();
        assert_eq!(content, "=0123456789abcdef\nA.cs;120\n=0123456789abcdef\nB.cs;0\n");
    }

    #[test]
    fn reference_records_are_two_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReferenceWriter::new(dir.path());
        let id = SymbolId("00112233aabbccdd".to_string());
        writer.append("Lib", &[(id, vec![record(3, "count = 1;"), record(4, "a; b\r")])]).unwrap();

        let content = std::fs::read_to_string(dir.path().join("Lib/R/00112233aabbccdd.txt")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec!["App;src/Main.cs.html;src/Main.cs;3;5;9;7", "count = 1;", "App;src/Main.cs.html;src/Main.cs;4;5;9;7", "a; b"]
        );
    }

    #[test]
    fn reference_header_has_seven_positional_fields() {
        let header = reference_header(&record(12, "ignored"));
        let fields: Vec<&str> = header.split(';').collect();
        assert_eq!(fields, vec!["App", "src/Main.cs.html", "src/Main.cs", "12", "5", "9", "7"]);
    }

    #[test]
    fn concurrent_appends_keep_records_whole() {
        use rayon::prelude::*;

        let dir = tempfile::tempdir().unwrap();
        let writer = ReferenceWriter::new(dir.path());
        (0..32_u32).into_par_iter().for_each(|line| {
            let id = SymbolId("00112233aabbccdd".to_string());
            writer.append("Lib", &[(id, vec![record(line, "shared line")])]).unwrap();
        });

        let content = std::fs::read_to_string(dir.path().join("Lib/R/00112233aabbccdd.txt")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 64);
        for pair in lines.chunks(2) {
            assert!(pair.first().unwrap().starts_with("App;"));
            assert_eq!(*pair.get(1).unwrap(), "shared line");
        }
    }

    #[test]
    fn empty_member_map_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BASE_MEMBERS_FILE);
        write_member_map(&path, &[]).unwrap();
        assert!(!path.exists());

        let target = MemberTarget { assembly: "Lib".to_string(), id: SymbolId("ffffffffffffffff".to_string()) };
        write_member_map(&path, &[(SymbolId("0000000000000001".to_string()), target)]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0000000000000001;Lib;ffffffffffffffff\n");
    }
}
