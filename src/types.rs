/// Core domain types shared by the classifier, resolver, accumulator, and serializers.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` within one document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    /// Exclusive end offset.
    pub end: u32,
    /// Inclusive start offset.
    pub start: u32,
}

impl TextRange {
    /// Build a range from its two offsets. An inverted pair collapses to an empty range.
    pub fn new(start: u32, end: u32) -> Self {
        return Self { end: end.max(start), start };
    }

    /// Whether `offset` falls inside the range.
    pub const fn contains(&self, offset: u32) -> bool {
        return self.start <= offset && offset < self.end;
    }

    /// Whether the range covers no bytes.
    pub const fn is_empty(&self) -> bool {
        return self.start >= self.end;
    }

    /// Number of bytes covered.
    pub const fn len(&self) -> u32 {
        return self.end.saturating_sub(self.start);
    }

    /// The range as `usize` bounds for slicing.
    pub fn as_usize(&self) -> std::ops::Range<usize> {
        let start = usize::try_from(self.start).unwrap_or(usize::MAX);
        let end = usize::try_from(self.end).unwrap_or(usize::MAX);
        return start..end;
    }
}

/// Identifier of a symbol bucket: normally 16 lowercase hex chars of a
/// truncated digest, but pseudo-buckets (GUID literals, the empty-array idiom)
/// use their own canonical text. Newtype prevents mixing with arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(
    /// The identifier text.
    pub String,
);

impl SymbolId {
    /// The identifier text.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Semantic kind of one reference. The discriminant is written to reference
/// files, so existing values must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Base class named in a base list.
    DerivedType,
    /// Zero-length array allocation site.
    EmptyArrayAllocation,
    /// Occurrence of a GUID literal.
    GuidUsage,
    /// Implicit constructor call, recorded against the type.
    Instantiation,
    /// Interface named in an interface's base list.
    InterfaceInheritance,
    /// Interface named in a class or struct base list.
    InterfaceImplementation,
    /// Member implementing an interface member.
    InterfaceMemberImplementation,
    /// Member overriding a base member.
    Override,
    /// Plain use.
    Reference,
    /// Field or property assignment.
    Write,
}

impl ReferenceKind {
    /// Stable integer written into `R/<id>.txt` metadata lines.
    pub const fn code(self) -> u8 {
        return match self {
            ReferenceKind::Reference => 0,
            ReferenceKind::DerivedType => 1,
            ReferenceKind::InterfaceInheritance => 2,
            ReferenceKind::InterfaceImplementation => 3,
            ReferenceKind::Override => 4,
            ReferenceKind::InterfaceMemberImplementation => 5,
            ReferenceKind::Instantiation => 6,
            ReferenceKind::Write => 7,
            ReferenceKind::GuidUsage => 8,
            ReferenceKind::EmptyArrayAllocation => 9,
        };
    }
}

/// Canonical parts of embedded XML literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlLiteralPart {
    /// Attribute name.
    AttributeName,
    /// Attribute quote characters.
    AttributeQuotes,
    /// Attribute value.
    AttributeValue,
    /// CDATA section.
    CData,
    /// Angle-bracket delimiters.
    Delimiter,
    /// Embedded expression holes.
    EmbeddedExpression,
    /// Entity reference.
    EntityReference,
    /// Element name.
    Name,
    /// Processing instruction.
    ProcessingInstruction,
}

/// Canonical classification tag of a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Comments, including documentation comments.
    Comment,
    /// Code disabled by the preprocessor.
    ExcludedCode,
    /// Names of non-type symbols.
    Identifier,
    /// Keywords.
    Keyword,
    /// String and character literals.
    Literal,
    /// Preprocessor directive keywords.
    PreprocessorKeyword,
    /// Names of types.
    TypeName,
    /// A frontend classification with no canonical mapping; kept so the
    /// renderer can still apply a class.
    Unknown(String),
    /// Parts of embedded XML literals.
    XmlLiteral(XmlLiteralPart),
}

impl Classification {
    /// Short CSS class used by the renderer.
    pub fn css_class(&self) -> &str {
        return match self {
            Classification::Comment => "c",
            Classification::ExcludedCode => "e",
            Classification::Identifier => "i",
            Classification::Keyword => "k",
            Classification::Literal => "s",
            Classification::PreprocessorKeyword => "p",
            Classification::TypeName => "t",
            Classification::Unknown(_) => "u",
            Classification::XmlLiteral(part) => match part {
                XmlLiteralPart::AttributeName => "xan",
                XmlLiteralPart::AttributeQuotes => "xaq",
                XmlLiteralPart::AttributeValue => "xav",
                XmlLiteralPart::CData => "xcd",
                XmlLiteralPart::Delimiter => "xd",
                XmlLiteralPart::EmbeddedExpression => "xee",
                XmlLiteralPart::EntityReference => "xer",
                XmlLiteralPart::Name => "xn",
                XmlLiteralPart::ProcessingInstruction => "xpi",
            },
        };
    }
}

/// One classified slice of a document after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRange {
    /// Canonical tag, or `None` for plain text.
    pub classification: Option<Classification>,
    /// Byte span within the document.
    pub span: TextRange,
    /// The literal text covered by `span`.
    pub text: String,
}

/// One occurrence of a symbol, as written to `R/<id>.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Exclusive one-based end column.
    pub column_end: u32,
    /// One-based start column.
    pub column_start: u32,
    /// Assembly of the referencing document.
    pub from_assembly: String,
    /// Project-relative path of the referencing document.
    pub from_path: String,
    /// Semantic kind of the occurrence.
    pub kind: ReferenceKind,
    /// One-based line number.
    pub line_number: u32,
    /// HTML-escaped text of the referencing line.
    pub line_text: String,
    /// Assembly owning the target symbol.
    pub to_assembly: String,
    /// Short display name of the target.
    pub to_display_name: String,
    /// Identifier of the target bucket.
    pub to_symbol_id: SymbolId,
    /// Generated page of the referencing document, relative to its assembly folder.
    pub url: String,
}

/// One declared symbol of a project, as written to `D.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSymbolRecord {
    /// Glyph code for icons and sorting.
    pub glyph: u16,
    /// Symbol identifier.
    pub id: SymbolId,
    /// Kind tag such as `class` or `method`.
    pub kind: String,
    /// Short display name.
    pub name: String,
    /// Fully qualified signature.
    pub signature: String,
}

/// Position of one declaration inside a generated document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeclarationLocation {
    /// Byte offset of the declaration anchor in the generated page.
    pub offset: u64,
    /// Project-relative path of the declaring document.
    pub path: String,
}

/// A member in another (or the same) assembly, target of base-member and
/// interface-implementation maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemberTarget {
    /// Assembly owning the member.
    pub assembly: String,
    /// Identifier of the member.
    pub id: SymbolId,
}

/// Glyph metadata attached to declaration links: icon code and nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphInfo {
    /// Number of containing types.
    pub depth: u32,
    /// Glyph code.
    pub glyph: u16,
}

/// Renderer-facing result of resolving one classified range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Declaration site: anchor with the symbol id linking to its references page.
    Declaration {
        /// Glyph metadata, omitted for large documents.
        glyph: Option<GlyphInfo>,
        /// Link to the references page.
        href: String,
        /// Anchor id.
        id: SymbolId,
    },
    /// Same-document highlight for locals, parameters, and type parameters.
    Highlight {
        /// Whether this occurrence is the definition.
        is_definition: bool,
        /// Per-document sequence number of the symbol.
        sequence: u32,
    },
    /// Hyperlink to a declaration, redirect, or references page.
    Reference {
        /// Target URL, relative to the current page unless it points to another server.
        href: String,
        /// Tooltip text, used to show type-forwarding chains.
        title: Option<String>,
    },
}
