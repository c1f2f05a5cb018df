//! Post-processing of frontend classification spans.
//!
//! Turns the frontend's raw, possibly overlapping spans into a total,
//! contiguous partition of the document with canonical tags.

use crate::frontend::RawSpan;
use crate::types::{Classification, ClassifiedRange, TextRange, XmlLiteralPart};

/// Keyword texts that stay separate tokens because they resolve on their own.
const UNMERGEABLE_KEYWORDS: [&str; 5] = ["base", "new", "partial", "this", "var"];

/// Raw classification names dropped entirely.
const IGNORED: [&str; 5] = ["number", "operator", "preprocessor text", "punctuation", "xml literal - text"];

/// Post-process raw spans into a partition of `[0, text.len())`.
pub fn classify(text: &str, raw: &[RawSpan]) -> Vec<ClassifiedRange> {
    let mut sorted: Vec<RawSpan> = raw.to_vec();
    sorted.sort_by_key(|span| return span.span.start);

    let merged = merge_adjacent_keywords(text, sorted);
    let filtered: Vec<(TextRange, Classification)> = merged
        .into_iter()
        .filter_map(|span| return canonical(&span.classification).map(|tag| return (span.span, tag)))
        .collect();
    return fill_gaps(text, filtered);
}

// ── Merge ─────────────────────────────────────────────────────────────

fn is_keyword(name: &str) -> bool {
    return name == "keyword" || name.starts_with("keyword - ");
}

fn is_unmergeable(word: &str) -> bool {
    return UNMERGEABLE_KEYWORDS.iter().any(|keyword| return keyword.eq_ignore_ascii_case(word.trim()));
}

/// Merge runs of keywords separated only by spaces or tabs (`public static`).
fn merge_adjacent_keywords(text: &str, sorted: Vec<RawSpan>) -> Vec<RawSpan> {
    let mut out: Vec<RawSpan> = Vec::with_capacity(sorted.len());
    for span in sorted {
        if let Some(previous) = out.last_mut()
            && is_keyword(&previous.classification)
            && is_keyword(&span.classification)
            && previous.span.end <= span.span.start
        {
            let gap = slice(text, TextRange::new(previous.span.end, span.span.start));
            let joined_by_blanks = gap.is_some_and(|gap| return gap.chars().all(|ch| return ch == ' ' || ch == '\t'));
            let previous_text = slice(text, previous.span).unwrap_or("");
            let current_text = slice(text, span.span).unwrap_or("");
            if joined_by_blanks && !is_unmergeable(previous_text) && !is_unmergeable(current_text) {
                // Keep the earlier name so `keyword - control` runs stay tagged.
                previous.span = TextRange::new(previous.span.start, span.span.end);
                continue;
            }
        }
        out.push(span);
    }
    return out;
}

// ── Filter ────────────────────────────────────────────────────────────

/// Canonical tag for a raw classification name; `None` for ignored names.
fn canonical(name: &str) -> Option<Classification> {
    if IGNORED.contains(&name) {
        return None;
    }
    if is_keyword(name) {
        return Some(Classification::Keyword);
    }
    if name.starts_with("xml doc comment") || name == "comment" {
        return Some(Classification::Comment);
    }
    if let Some(part) = name.strip_prefix("xml literal - ") {
        return Some(xml_literal(part).map_or_else(|| return Classification::Unknown(name.to_string()), Classification::XmlLiteral));
    }
    let tag = match name {
        "class name" | "delegate name" | "enum name" | "interface name" | "module name" | "record class name"
        | "record struct name" | "struct name" | "type parameter name" => Classification::TypeName,
        "constant name" | "enum member name" | "event name" | "extension method name" | "field name" | "identifier"
        | "label name" | "local name" | "method name" | "namespace name" | "parameter name" | "property name" => {
            Classification::Identifier
        },
        "excluded code" => Classification::ExcludedCode,
        "preprocessor keyword" => Classification::PreprocessorKeyword,
        "string" | "string - escape character" | "string - verbatim" => Classification::Literal,
        other => Classification::Unknown(other.to_string()),
    };
    return Some(tag);
}

fn xml_literal(part: &str) -> Option<XmlLiteralPart> {
    return match part {
        "attribute name" => Some(XmlLiteralPart::AttributeName),
        "attribute quotes" => Some(XmlLiteralPart::AttributeQuotes),
        "attribute value" => Some(XmlLiteralPart::AttributeValue),
        "cdata section" => Some(XmlLiteralPart::CData),
        "delimiter" => Some(XmlLiteralPart::Delimiter),
        "embedded expression" => Some(XmlLiteralPart::EmbeddedExpression),
        "entity reference" => Some(XmlLiteralPart::EntityReference),
        "name" => Some(XmlLiteralPart::Name),
        "processing instruction" => Some(XmlLiteralPart::ProcessingInstruction),
        _ => None,
    };
}

// ── Fill gaps ─────────────────────────────────────────────────────────

/// Text covered by a range, `None` when the range is out of bounds or splits a character.
fn slice(text: &str, range: TextRange) -> Option<&str> {
    return text.get(range.as_usize());
}

/// Smallest char boundary at or after `offset`, clamped to the text length.
fn ceil_boundary(text: &str, offset: u32) -> u32 {
    let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
    let mut current = offset.min(len);
    while current < len && !usize::try_from(current).is_ok_and(|index| return text.is_char_boundary(index)) {
        current = current.saturating_add(1);
    }
    return current;
}

fn push_range(out: &mut Vec<ClassifiedRange>, text: &str, span: TextRange, classification: Option<Classification>) {
    if span.is_empty() {
        return;
    }
    let covered = slice(text, span).unwrap_or("").to_string();
    out.push(ClassifiedRange { classification, span, text: covered });
}

/// Clamp, de-overlap and pad so the result partitions the whole text.
fn fill_gaps(text: &str, ranges: Vec<(TextRange, Classification)>) -> Vec<ClassifiedRange> {
    let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(ranges.len().saturating_mul(2).saturating_add(1));
    let mut cursor = 0_u32;

    for (span, tag) in ranges {
        let start = ceil_boundary(text, span.start.max(cursor));
        let end = ceil_boundary(text, span.end.min(len));
        if end <= start {
            continue;
        }
        if start > cursor {
            push_range(&mut out, text, TextRange::new(cursor, start), None);
        }
        push_range(&mut out, text, TextRange::new(start, end), Some(tag));
        cursor = end;
    }
    if cursor < len {
        push_range(&mut out, text, TextRange::new(cursor, len), None);
    }
    return out;
}
