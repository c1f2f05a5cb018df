//! Huffman compression of symbol descriptions in the master index.
//!
//! The tree is rebuilt by the reader from `Huffman.txt` alone, so building
//! must be fully deterministic: ties are broken by code point for leaves and
//! by creation order for merged nodes.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::path::Path;

use crate::error::Error;
use crate::master_index::{read_varint, write_varint};

/// Frequency table file.
pub const HUFFMAN_FILE: &str = "Huffman.txt";

/// Arena node of the code tree.
#[derive(Debug, Clone, Copy)]
enum Node {
    /// Two children: bit 0 then bit 1.
    Branch(usize, usize),
    /// A character.
    Leaf(char),
}

/// Prefix code over the characters of every encoded description.
#[derive(Debug, Clone)]
pub struct Huffman {
    /// Bit string of each character, most significant first.
    codes: HashMap<char, Vec<bool>>,
    /// Character frequencies, sorted by code point.
    frequencies: Vec<(char, u64)>,
    /// Arena; the last node is the root.
    nodes: Vec<Node>,
}

impl Huffman {
    /// Count characters over `texts` and build the code.
    pub fn from_texts<'t>(texts: impl IntoIterator<Item = &'t str>) -> Self {
        let mut counts: BTreeMap<char, u64> = BTreeMap::new();
        for text in texts {
            for ch in text.chars() {
                let count = counts.entry(ch).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
        return Self::from_frequencies(counts.into_iter().collect());
    }

    /// Build the code from a frequency table. Duplicate characters are summed.
    pub fn from_frequencies(table: Vec<(char, u64)>) -> Self {
        let mut merged: BTreeMap<char, u64> = BTreeMap::new();
        for (ch, frequency) in table {
            let count = merged.entry(ch).or_insert(0);
            *count = count.saturating_add(frequency);
        }
        let frequencies: Vec<(char, u64)> = merged.into_iter().collect();

        let mut nodes: Vec<Node> = Vec::with_capacity(frequencies.len().saturating_mul(2));
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
        for (ch, frequency) in &frequencies {
            heap.push(Reverse((*frequency, nodes.len())));
            nodes.push(Node::Leaf(*ch));
        }
        while heap.len() > 1 {
            let (Some(Reverse((left_weight, left))), Some(Reverse((right_weight, right)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            heap.push(Reverse((left_weight.saturating_add(right_weight), nodes.len())));
            nodes.push(Node::Branch(left, right));
        }

        let mut codes = HashMap::with_capacity(frequencies.len());
        if let Some(root) = nodes.len().checked_sub(1) {
            assign_codes(&nodes, root, Vec::new(), &mut codes);
        }
        return Self { codes, frequencies, nodes };
    }

    /// Encode `text` as a varint character count followed by packed bits.
    ///
    /// # Errors
    ///
    /// Returns `Error::HuffmanUnknownSymbol` for a character outside the table.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        write_varint(&mut out, u64::try_from(text.chars().count()).unwrap_or(u64::MAX));
        let mut current = 0_u8;
        let mut used = 0_u32;
        for ch in text.chars() {
            let code = self.codes.get(&ch).ok_or(Error::HuffmanUnknownSymbol { symbol: ch })?;
            for bit in code {
                current = (current << 1) | u8::from(*bit);
                used = used.saturating_add(1);
                if used == 8 {
                    out.push(current);
                    current = 0;
                    used = 0;
                }
            }
        }
        if used > 0 {
            out.push(current << 8_u32.saturating_sub(used));
        }
        return Ok(out);
    }

    /// Decode a blob produced by `encode`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexCorrupt` (attributed to `file`) if the blob is truncated.
    pub fn decode(&self, file: &Path, blob: &[u8]) -> Result<String, Error> {
        let corrupt = |reason: &str| return Error::IndexCorrupt { file: file.to_path_buf(), reason: reason.to_string() };
        let mut cursor = 0_usize;
        let count = read_varint(blob, &mut cursor).ok_or_else(|| return corrupt("truncated huffman length"))?;
        let Some(root) = self.nodes.len().checked_sub(1) else {
            return if count == 0 { Ok(String::new()) } else { Err(corrupt("empty huffman table")) };
        };
        let bits = blob.get(cursor..).unwrap_or(&[]);
        let mut bit_index = 0_usize;
        let mut out = String::new();
        for _ in 0..count {
            let mut node = root;
            loop {
                match self.nodes.get(node) {
                    Some(Node::Leaf(ch)) => {
                        // A one-symbol tree still spends one bit per character.
                        if node == root {
                            bit_index = bit_index.saturating_add(1);
                        }
                        out.push(*ch);
                        break;
                    },
                    Some(Node::Branch(zero, one)) => {
                        let byte = bits.get(bit_index / 8).ok_or_else(|| return corrupt("truncated huffman bits"))?;
                        let bit = (byte >> (7 - (bit_index % 8))) & 1;
                        bit_index = bit_index.saturating_add(1);
                        node = if bit == 0 { *zero } else { *one };
                    },
                    None => return Err(corrupt("huffman node out of range")),
                }
            }
        }
        return Ok(out);
    }

    /// Contents of `Huffman.txt`: `codepoint;frequency`, sorted by code point.
    pub fn table_text(&self) -> String {
        return self.frequencies.iter().map(|(ch, frequency)| return format!("{};{frequency}\n", u32::from(*ch))).collect();
    }

    /// Rebuild from `Huffman.txt` contents.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexCorrupt` for malformed lines or invalid code points.
    pub fn parse_table(file: &Path, content: &str) -> Result<Self, Error> {
        let mut table = Vec::new();
        for line in content.lines().filter(|line| return !line.is_empty()) {
            let corrupt = || return Error::IndexCorrupt { file: file.to_path_buf(), reason: format!("bad huffman line `{line}`") };
            let (codepoint, frequency) = line.split_once(';').ok_or_else(corrupt)?;
            let ch = codepoint.parse::<u32>().ok().and_then(char::from_u32).ok_or_else(corrupt)?;
            let frequency = frequency.parse::<u64>().map_err(|_err| return corrupt())?;
            table.push((ch, frequency));
        }
        return Ok(Self::from_frequencies(table));
    }

    /// Write `Huffman.txt` under `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be written.
    pub fn write(&self, root: &Path) -> Result<(), Error> {
        std::fs::write(root.join(HUFFMAN_FILE), self.table_text())?;
        return Ok(());
    }
}

/// Walk the tree assigning bit strings. A lone leaf gets the code `0`.
fn assign_codes(nodes: &[Node], node: usize, prefix: Vec<bool>, codes: &mut HashMap<char, Vec<bool>>) {
    match nodes.get(node) {
        Some(Node::Leaf(ch)) => {
            let code = if prefix.is_empty() { vec![false] } else { prefix };
            codes.insert(*ch, code);
        },
        Some(Node::Branch(zero, one)) => {
            let mut left = prefix.clone();
            left.push(false);
            assign_codes(nodes, *zero, left, codes);
            let mut right = prefix;
            right.push(true);
            assign_codes(nodes, *one, right, codes);
        },
        None => {},
    }
}
