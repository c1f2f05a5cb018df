//! Binary master index of every declared symbol in the solution.
//!
//! Layout of `DeclaredSymbols.txt`:
//!
//! ```text
//! i32 LE          record count
//! per record:
//!   varint        assembly number (line of Assemblies.txt)
//!   varint + utf8 name
//!   u64 LE        identifier
//!   varint + blob Huffman-coded "kind signature"
//!   varint        glyph
//! ```
//!
//! Records are sorted by lowercase name, then identifier, so prefix lookups
//! are a binary search.

use std::path::Path;

use crate::error::Error;
use crate::huffman::{HUFFMAN_FILE, Huffman};
use crate::identity;
use crate::project_map::ASSEMBLIES_FILE;
use crate::types::{DeclaredSymbolRecord, SymbolId};

/// Master index file.
pub const MASTER_INDEX_FILE: &str = "DeclaredSymbols.txt";

// ── Varints ───────────────────────────────────────────────────────────

/// Append `value` as a 7-bit little-endian varint.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut rest = value;
    loop {
        let low = u8::try_from(rest & 0x7f).unwrap_or(0);
        rest >>= 7;
        if rest == 0 {
            out.push(low);
            return;
        }
        out.push(low | 0x80);
    }
}

/// Read a varint at `cursor`, advancing it. `None` when truncated or longer than 64 bits.
pub fn read_varint(bytes: &[u8], cursor: &mut usize) -> Option<u64> {
    let mut value = 0_u64;
    let mut shift = 0_u32;
    loop {
        let byte = *bytes.get(*cursor)?;
        *cursor = cursor.saturating_add(1);
        let chunk = u64::from(byte & 0x7f);
        value |= chunk.checked_shl(shift)?;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift = shift.saturating_add(7);
        if shift >= 64 {
            return None;
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────

/// One declared symbol and the assembly that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEntry {
    /// Position of the assembly in `Assemblies.txt`.
    pub assembly: usize,
    /// The declared symbol.
    pub record: DeclaredSymbolRecord,
}

fn description(record: &DeclaredSymbolRecord) -> String {
    return format!("{} {}", record.kind, record.signature);
}

fn sort_entries(entries: &mut [MasterEntry]) {
    entries.sort_by(|left, right| {
        return left
            .record
            .name
            .to_lowercase()
            .cmp(&right.record.name.to_lowercase())
            .then_with(|| return left.record.id.cmp(&right.record.id));
    });
}

/// Sort `entries`, build the Huffman code, and write `DeclaredSymbols.txt`
/// and `Huffman.txt` under `root`. Returns the number of records written.
///
/// # Errors
///
/// Returns `Error::InvalidSymbolId` for a record whose id is not 16 hex
/// characters, or `Error::Io` if a file cannot be written.
pub fn write(root: &Path, mut entries: Vec<MasterEntry>) -> Result<usize, Error> {
    sort_entries(&mut entries);
    let descriptions: Vec<String> = entries.iter().map(|entry| return description(&entry.record)).collect();
    let code = Huffman::from_texts(descriptions.iter().map(String::as_str));

    let count = i32::try_from(entries.len()).unwrap_or(i32::MAX);
    let mut out = Vec::with_capacity(entries.len().saturating_mul(48));
    out.extend_from_slice(&count.to_le_bytes());
    for (entry, text) in entries.iter().zip(&descriptions) {
        write_varint(&mut out, u64::try_from(entry.assembly).unwrap_or(u64::MAX));
        write_varint(&mut out, u64::try_from(entry.record.name.len()).unwrap_or(u64::MAX));
        out.extend_from_slice(entry.record.name.as_bytes());
        out.extend_from_slice(&identity::hex_to_u64(entry.record.id.as_str())?.to_le_bytes());
        let blob = code.encode(text)?;
        write_varint(&mut out, u64::try_from(blob.len()).unwrap_or(u64::MAX));
        out.extend_from_slice(&blob);
        write_varint(&mut out, u64::from(entry.record.glyph));
    }

    std::fs::create_dir_all(root)?;
    std::fs::write(root.join(MASTER_INDEX_FILE), out)?;
    code.write(root)?;
    return Ok(entries.len());
}

/// Decoded master index with the assembly names it refers to.
#[derive(Debug, Clone)]
pub struct MasterIndex {
    /// Assembly names by number.
    pub assemblies: Vec<String>,
    /// Records in file order.
    pub entries: Vec<MasterEntry>,
}

impl MasterIndex {
    /// Read and decode the index written under `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the index is missing, or
    /// `Error::IndexCorrupt` if any part of it cannot be decoded.
    pub fn read(root: &Path) -> Result<Self, Error> {
        let path = root.join(MASTER_INDEX_FILE);
        let bytes = std::fs::read(&path).map_err(|_err| return Error::FileNotFound { path: path.clone() })?;
        let huffman_path = root.join(HUFFMAN_FILE);
        let table = std::fs::read_to_string(&huffman_path).map_err(|_err| return Error::FileNotFound { path: huffman_path.clone() })?;
        let code = Huffman::parse_table(&huffman_path, &table)?;
        let assemblies = std::fs::read_to_string(root.join(ASSEMBLIES_FILE))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| return line.split(';').next().map(str::to_string))
            .filter(|name| return !name.is_empty())
            .collect();
        let entries = decode(&path, &bytes, &code)?;
        return Ok(Self { assemblies, entries });
    }

    /// Records whose name starts with `prefix`, compared case-insensitively.
    pub fn lookup(&self, prefix: &str) -> &[MasterEntry] {
        let needle = prefix.to_lowercase();
        let start = self.entries.partition_point(|entry| return entry.record.name.to_lowercase() < needle);
        let rest = self.entries.get(start..).unwrap_or(&[]);
        let len = rest.iter().take_while(|entry| return entry.record.name.to_lowercase().starts_with(&needle)).count();
        return rest.get(..len).unwrap_or(&[]);
    }

    /// Name of an assembly number, or `?` when out of range.
    pub fn assembly_name(&self, number: usize) -> &str {
        return self.assemblies.get(number).map_or("?", String::as_str);
    }
}

/// Decode every record of a `DeclaredSymbols.txt` image.
///
/// # Errors
///
/// Returns `Error::IndexCorrupt` for truncated data, invalid UTF-8, or a
/// description the Huffman table cannot decode.
pub fn decode(file: &Path, bytes: &[u8], code: &Huffman) -> Result<Vec<MasterEntry>, Error> {
    let corrupt = |reason: &str| return Error::IndexCorrupt { file: file.to_path_buf(), reason: reason.to_string() };
    let header: [u8; 4] = bytes.get(..4).and_then(|slice| return slice.try_into().ok()).ok_or_else(|| return corrupt("missing record count"))?;
    let count = usize::try_from(i32::from_le_bytes(header)).map_err(|_err| return corrupt("negative record count"))?;

    let mut cursor = 4_usize;
    let mut entries = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let assembly = read_varint(bytes, &mut cursor).ok_or_else(|| return corrupt("truncated assembly number"))?;
        let name_len = read_varint(bytes, &mut cursor).ok_or_else(|| return corrupt("truncated name length"))?;
        let name = take(bytes, &mut cursor, name_len).ok_or_else(|| return corrupt("truncated name"))?;
        let name = String::from_utf8(name.to_vec()).map_err(|_err| return corrupt("name is not UTF-8"))?;
        let id: [u8; 8] = take(bytes, &mut cursor, 8)
            .and_then(|slice| return slice.try_into().ok())
            .ok_or_else(|| return corrupt("truncated identifier"))?;
        let blob_len = read_varint(bytes, &mut cursor).ok_or_else(|| return corrupt("truncated description length"))?;
        let blob = take(bytes, &mut cursor, blob_len).ok_or_else(|| return corrupt("truncated description"))?;
        let text = code.decode(file, blob)?;
        let glyph = read_varint(bytes, &mut cursor).ok_or_else(|| return corrupt("truncated glyph"))?;

        let (kind, signature) = text.split_once(' ').unwrap_or((text.as_str(), ""));
        entries.push(MasterEntry {
            assembly: usize::try_from(assembly).map_err(|_err| return corrupt("assembly number overflow"))?,
            record: DeclaredSymbolRecord {
                glyph: u16::try_from(glyph).map_err(|_err| return corrupt("glyph overflow"))?,
                id: SymbolId(identity::u64_to_hex(u64::from_le_bytes(id))),
                kind: kind.to_string(),
                name,
                signature: signature.to_string(),
            },
        });
    }
    return Ok(entries);
}

fn take<'b>(bytes: &'b [u8], cursor: &mut usize, len: u64) -> Option<&'b [u8]> {
    let len = usize::try_from(len).ok()?;
    let end = cursor.checked_add(len)?;
    let slice = bytes.get(*cursor..end)?;
    *cursor = end;
    return Some(slice);
}
