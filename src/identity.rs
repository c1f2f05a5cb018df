/// Symbol identity: documentation ids, truncated digests, display names, glyphs.
use std::fmt::Write as _;

use sha2::{Digest as _, Sha256};

use crate::error::Error;
use crate::symbols::{Accessibility, MethodKind, RefKind, SymbolData, SymbolKey, SymbolKind, SymbolTable, TypeKind, TypeRef};
use crate::types::SymbolId;

/// Digest bytes kept in a symbol identifier.
pub const ID_BYTES: usize = 8;

/// Hex characters in a symbol identifier.
pub const ID_HEX_LENGTH: usize = ID_BYTES * 2;

/// Hex characters of the identifier prefix used as a redirect shard key.
pub const REDIRECT_KEY_HEX_LENGTH: usize = 12;

/// Glyph for symbols that map to no glyph group.
pub const UNKNOWN_GLYPH: u16 = 196;

/// Upper bound on container chains and type nesting walked while naming a
/// symbol. Frontend data with deeper chains is treated as cyclic.
const MAX_NESTING: usize = 256;

// ── Digests ───────────────────────────────────────────────────────────

/// First `ID_BYTES` of the SHA-256 digest of `text`, as lowercase hex.
pub fn string_id(text: &str) -> SymbolId {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(ID_HEX_LENGTH);
    for byte in digest.iter().take(ID_BYTES) {
        let _ = write!(out, "{byte:02x}");
    }
    return SymbolId(out);
}

/// Identifier of a document path. Separators are normalized to `/`; case is kept.
pub fn path_id(path: &str) -> SymbolId {
    return string_id(&path.replace('\\', "/"));
}

/// Identifier of a symbol, computed from its documentation id.
/// Returns `None` for keys outside the table.
pub fn symbol_id(table: &SymbolTable, key: SymbolKey) -> Option<SymbolId> {
    return documentation_id(table, key).map(|doc_id| return string_id(&doc_id));
}

/// Format a 64-bit identifier as 16 lowercase hex characters.
pub fn u64_to_hex(value: u64) -> String {
    return format!("{value:016x}");
}

/// Parse 16 hex characters back into the 64-bit identifier.
///
/// # Errors
///
/// Returns `Error::InvalidSymbolId` if `text` is not exactly 16 hex digits.
pub fn hex_to_u64(text: &str) -> Result<u64, Error> {
    if text.len() != ID_HEX_LENGTH || !text.bytes().all(|byte| return byte.is_ascii_hexdigit()) {
        return Err(Error::InvalidSymbolId { value: text.to_string() });
    }
    return u64::from_str_radix(text, 16).map_err(|_err| return Error::InvalidSymbolId { value: text.to_string() });
}

/// Shard key of an identifier used by the declaration redirect files.
pub fn redirect_key(id: &SymbolId) -> &str {
    return id.as_str().get(..REDIRECT_KEY_HEX_LENGTH).unwrap_or(id.as_str());
}

// ── Documentation ids ─────────────────────────────────────────────────

/// Canonical documentation-comment id of a symbol (`T:System.String`,
/// `M:N.C.#ctor(System.Int32)`, ...). Document-local symbols append
/// `:name` to their parent's id.
pub fn documentation_id(table: &SymbolTable, key: SymbolKey) -> Option<String> {
    let key = table.original_definition(key);
    let data = table.get(key)?;

    if data.kind.is_document_local() || matches!(data.kind, SymbolKind::Alias) {
        let parent = data.containing.and_then(|parent| return documentation_id(table, parent)).unwrap_or_default();
        return Some(format!("{parent}:{}", data.metadata_name()));
    }

    let mut out = String::new();
    match data.kind {
        SymbolKind::Namespace => {
            out.push_str("N:");
            out.push_str(&qualified_name(table, key)?);
        },
        SymbolKind::NamedType => {
            out.push_str("T:");
            out.push_str(&qualified_name(table, key)?);
        },
        SymbolKind::Method => {
            out.push_str("M:");
            out.push_str(&member_prefix(table, data)?);
            out.push_str(&method_doc_name(data));
            if !data.type_parameters.is_empty() {
                let _ = write!(out, "``{}", data.type_parameters.len());
            }
            out.push_str(&parameter_list(table, data)?);
            if data.method_kind == Some(MethodKind::Conversion)
                && let Some(ret) = &data.ty
            {
                out.push('~');
                out.push_str(&type_ref_id(table, ret, 0)?);
            }
        },
        SymbolKind::Property => {
            out.push_str("P:");
            out.push_str(&member_prefix(table, data)?);
            out.push_str(&data.metadata_name().replace('.', "#"));
            out.push_str(&parameter_list(table, data)?);
        },
        SymbolKind::Field => {
            out.push_str("F:");
            out.push_str(&member_prefix(table, data)?);
            out.push_str(data.metadata_name());
        },
        SymbolKind::Event => {
            out.push_str("E:");
            out.push_str(&member_prefix(table, data)?);
            out.push_str(&data.metadata_name().replace('.', "#"));
        },
        SymbolKind::Alias
        | SymbolKind::Label
        | SymbolKind::Local
        | SymbolKind::Parameter
        | SymbolKind::RangeVariable
        | SymbolKind::TypeParameter => return None,
    }
    return Some(out);
}

/// Method name segment: constructors by method kind, explicit implementations with `#`.
fn method_doc_name(data: &SymbolData) -> String {
    return match data.method_kind {
        Some(MethodKind::Constructor) => "#ctor".to_string(),
        Some(MethodKind::StaticConstructor) => "#cctor".to_string(),
        _ => data.metadata_name().replace('.', "#"),
    };
}

/// `Qualified.Container.` for a member, empty when the member has no container.
fn member_prefix(table: &SymbolTable, data: &SymbolData) -> Option<String> {
    let Some(container) = data.containing else {
        return Some(String::new());
    };
    let container_data = table.get(container)?;
    if container_data.is_global_namespace() {
        return Some(String::new());
    }
    return Some(format!("{}.", qualified_name(table, container)?));
}

/// Dotted name of a namespace or type with generic arity marks, e.g.
/// `System.Collections.Generic.List`1`. Also the key of type forwards.
pub fn qualified_name(table: &SymbolTable, key: SymbolKey) -> Option<String> {
    let mut segments = Vec::new();
    let mut chain = vec![key];
    chain.extend(table.containers(key));
    if chain.len() > MAX_NESTING {
        return None;
    }
    for item in chain {
        let data = table.get(item)?;
        if data.is_global_namespace() {
            continue;
        }
        let mut segment = data.name.clone();
        if data.kind == SymbolKind::NamedType && !data.type_parameters.is_empty() {
            let _ = write!(segment, "`{}", data.type_parameters.len());
        }
        segments.push(segment);
    }
    segments.reverse();
    return Some(segments.join("."));
}

/// `(T1,T2)` parameter list, empty when there are no parameters.
fn parameter_list(table: &SymbolTable, data: &SymbolData) -> Option<String> {
    if data.parameters.is_empty() {
        return Some(String::new());
    }
    let mut parts = Vec::with_capacity(data.parameters.len());
    for parameter in &data.parameters {
        let parameter_data = table.get(*parameter)?;
        let mut part = match &parameter_data.ty {
            Some(ty) => type_ref_id(table, ty, 0)?,
            None => String::new(),
        };
        if parameter_data.ref_kind != RefKind::None {
            part.push('@');
        }
        parts.push(part);
    }
    return Some(format!("({})", parts.join(",")));
}

/// Documentation-id form of a type reference.
fn type_ref_id(table: &SymbolTable, ty: &TypeRef, depth: usize) -> Option<String> {
    if depth > MAX_NESTING {
        return None;
    }
    let next = depth.saturating_add(1);
    return match ty {
        TypeRef::Array { element, rank } => {
            let element = type_ref_id(table, element, next)?;
            if *rank <= 1 {
                Some(format!("{element}[]"))
            } else {
                let dims = vec!["0:"; usize::try_from(*rank).ok()?].join(",");
                Some(format!("{element}[{dims}]"))
            }
        },
        TypeRef::Named { symbol, type_arguments } => {
            let symbol = table.original_definition(*symbol);
            if type_arguments.is_empty() {
                return qualified_name(table, symbol);
            }
            let mut name = qualified_name(table, symbol)?;
            if let Some(tick) = name.rfind('`') {
                name.truncate(tick);
            }
            let mut args = Vec::with_capacity(type_arguments.len());
            for argument in type_arguments {
                args.push(type_ref_id(table, argument, next)?);
            }
            Some(format!("{name}{{{}}}", args.join(",")))
        },
        TypeRef::Pointer(inner) => Some(format!("{}*", type_ref_id(table, inner, next)?)),
        TypeRef::TypeParameter(key) => type_parameter_position(table, *key),
    };
}

/// `` `n `` for type-level and ``` ``n ``` for method-level type parameters.
fn type_parameter_position(table: &SymbolTable, key: SymbolKey) -> Option<String> {
    let data = table.get(key)?;
    let owner_key = data.containing?;
    let owner = table.get(owner_key)?;
    let index = owner.type_parameters.iter().position(|candidate| return *candidate == key)?;

    if owner.kind == SymbolKind::Method {
        return Some(format!("``{index}"));
    }

    // Type parameters of enclosing types come first.
    let mut offset = 0_usize;
    for container in table.containers(owner_key) {
        if let Some(container_data) = table.get(container)
            && container_data.kind == SymbolKind::NamedType
        {
            offset = offset.saturating_add(container_data.type_parameters.len());
        }
    }
    return Some(format!("`{}", offset.saturating_add(index)));
}

// ── Display ───────────────────────────────────────────────────────────

/// Short display name: generic parameter list for types and generic
/// methods, containing type name for constructors.
pub fn display_name(table: &SymbolTable, key: SymbolKey) -> Option<String> {
    let data = table.get(key)?;
    if data.is_constructor() {
        let container = data.containing.and_then(|container| return table.get(container))?;
        return Some(container.name.clone());
    }
    let mut name = data.name.clone();
    if matches!(data.kind, SymbolKind::NamedType | SymbolKind::Method) && !data.type_parameters.is_empty() {
        let mut params = Vec::with_capacity(data.type_parameters.len());
        for parameter in &data.type_parameters {
            params.push(table.get(*parameter)?.name.clone());
        }
        let _ = write!(name, "<{}>", params.join(", "));
    }
    return Some(name);
}

/// Container chain plus display name plus parameter types for methods and indexers.
pub fn full_signature(table: &SymbolTable, key: SymbolKey) -> Option<String> {
    let data = table.get(key)?;
    let mut segments = Vec::new();
    for container in table.containers(key) {
        let container_data = table.get(container)?;
        if container_data.is_global_namespace() {
            continue;
        }
        segments.push(display_name(table, container)?);
    }
    segments.reverse();
    segments.push(display_name(table, key)?);
    let mut signature = segments.join(".");

    let takes_parameters = data.kind == SymbolKind::Method || (data.kind == SymbolKind::Property && !data.parameters.is_empty());
    if takes_parameters {
        let mut params = Vec::with_capacity(data.parameters.len());
        for parameter in &data.parameters {
            let parameter_data = table.get(*parameter)?;
            let mut part = match parameter_data.ref_kind {
                RefKind::In => "in ".to_string(),
                RefKind::None => String::new(),
                RefKind::Out => "out ".to_string(),
                RefKind::Ref => "ref ".to_string(),
            };
            if let Some(ty) = &parameter_data.ty {
                part.push_str(&type_display(table, ty, 0)?);
            }
            params.push(part);
        }
        let (open, close) = if data.kind == SymbolKind::Property { ('[', ']') } else { ('(', ')') };
        let _ = write!(signature, "{open}{}{close}", params.join(", "));
    }
    return Some(signature);
}

/// Human-readable form of a type reference.
fn type_display(table: &SymbolTable, ty: &TypeRef, depth: usize) -> Option<String> {
    if depth > MAX_NESTING {
        return None;
    }
    let next = depth.saturating_add(1);
    return match ty {
        TypeRef::Array { element, rank } => {
            let commas = ",".repeat(usize::try_from(rank.saturating_sub(1)).ok()?);
            Some(format!("{}[{commas}]", type_display(table, element, next)?))
        },
        TypeRef::Named { symbol, type_arguments } => {
            let name = table.get(*symbol)?.name.clone();
            if type_arguments.is_empty() {
                return Some(name);
            }
            let mut args = Vec::with_capacity(type_arguments.len());
            for argument in type_arguments {
                args.push(type_display(table, argument, next)?);
            }
            Some(format!("{name}<{}>", args.join(", ")))
        },
        TypeRef::Pointer(inner) => Some(format!("{}*", type_display(table, inner, next)?)),
        TypeRef::TypeParameter(key) => Some(table.get(*key)?.name.clone()),
    };
}

/// Kind tag written to `D.txt` and the master index.
pub fn kind_tag(table: &SymbolTable, key: SymbolKey) -> Option<&'static str> {
    let data = table.get(key)?;
    let tag = match data.kind {
        SymbolKind::Alias => "alias",
        SymbolKind::Event => "event",
        SymbolKind::Field => "field",
        SymbolKind::Label => "label",
        SymbolKind::Local => "local",
        SymbolKind::Method => "method",
        SymbolKind::NamedType => match data.type_kind {
            Some(TypeKind::Class) | None => "class",
            Some(TypeKind::Delegate) => "delegate",
            Some(TypeKind::Enum) => "enum",
            Some(TypeKind::Interface) => "interface",
            Some(TypeKind::Module) => "module",
            Some(TypeKind::Struct) => "struct",
        },
        SymbolKind::Namespace => "namespace",
        SymbolKind::Parameter => "parameter",
        SymbolKind::Property => "property",
        SymbolKind::RangeVariable => "rangevariable",
        SymbolKind::TypeParameter => "typeparameter",
    };
    return Some(tag);
}

/// Number of named types containing the symbol.
pub fn symbol_depth(table: &SymbolTable, key: SymbolKey) -> u32 {
    let count = table
        .containers(key)
        .into_iter()
        .filter(|container| return table.get(*container).is_some_and(|data| return data.kind == SymbolKind::NamedType))
        .count();
    return u32::try_from(count).unwrap_or(u32::MAX);
}

// ── Glyphs ────────────────────────────────────────────────────────────

/// Glyph group base codes; the accessibility item is added to the base.
mod group {
    pub const CLASS: u16 = 0;
    pub const CONSTANT: u16 = 6;
    pub const DELEGATE: u16 = 12;
    pub const ENUM: u16 = 18;
    pub const ENUM_MEMBER: u16 = 24;
    pub const EVENT: u16 = 30;
    pub const EXTENSION_METHOD: u16 = 220;
    pub const FIELD: u16 = 42;
    pub const INTERFACE: u16 = 48;
    pub const METHOD: u16 = 72;
    pub const MODULE: u16 = 84;
    pub const NAMESPACE: u16 = 90;
    pub const OPERATOR: u16 = 96;
    pub const PROPERTY: u16 = 102;
    pub const STRUCT: u16 = 108;
    pub const TYPE: u16 = 126;
    pub const VARIABLE: u16 = 138;
}

/// Icon code: glyph group plus accessibility item. Never fails.
pub fn glyph(table: &SymbolTable, key: SymbolKey) -> u16 {
    let Some(data) = table.get(key) else {
        return UNKNOWN_GLYPH;
    };
    let Some(base) = glyph_group(table, data) else {
        return UNKNOWN_GLYPH;
    };
    let item = match data.accessibility {
        Accessibility::Internal => 1,
        Accessibility::Private | Accessibility::PrivateProtected => 4,
        Accessibility::Protected | Accessibility::ProtectedInternal => 3,
        Accessibility::NotApplicable | Accessibility::Public => 0,
    };
    return base.saturating_add(item);
}

/// Glyph group of a symbol, `None` for kinds without an icon.
fn glyph_group(table: &SymbolTable, data: &SymbolData) -> Option<u16> {
    return match data.kind {
        SymbolKind::Alias | SymbolKind::Label => None,
        SymbolKind::Event => Some(group::EVENT),
        SymbolKind::Field => {
            let in_enum = data
                .containing
                .and_then(|container| return table.get(container))
                .is_some_and(|container| return container.type_kind == Some(TypeKind::Enum));
            if in_enum {
                Some(group::ENUM_MEMBER)
            } else if data.is_const {
                Some(group::CONSTANT)
            } else {
                Some(group::FIELD)
            }
        },
        SymbolKind::Local | SymbolKind::Parameter | SymbolKind::RangeVariable => Some(group::VARIABLE),
        SymbolKind::Method => {
            if data.is_extension_method || data.method_kind == Some(MethodKind::ReducedExtension) {
                Some(group::EXTENSION_METHOD)
            } else if matches!(data.method_kind, Some(MethodKind::Operator | MethodKind::Conversion)) {
                Some(group::OPERATOR)
            } else {
                Some(group::METHOD)
            }
        },
        SymbolKind::NamedType => Some(match data.type_kind {
            Some(TypeKind::Class) | None => group::CLASS,
            Some(TypeKind::Delegate) => group::DELEGATE,
            Some(TypeKind::Enum) => group::ENUM,
            Some(TypeKind::Interface) => group::INTERFACE,
            Some(TypeKind::Module) => group::MODULE,
            Some(TypeKind::Struct) => group::STRUCT,
        }),
        SymbolKind::Namespace => Some(group::NAMESPACE),
        SymbolKind::Property => Some(group::PROPERTY),
        SymbolKind::TypeParameter => Some(group::TYPE),
    };
}
