//! Tree-sitter frontend for plain source trees.
//!
//! Files are grouped into projects by their nearest manifest, parsed with the
//! grammar for their extension and lowered into the shared syntax vocabulary.
//! Declarations become symbols. Every other identifier binds by name: locals
//! of the enclosing function first, then the file, the project, and finally a
//! name that is unique across the solution. A name that stays ambiguous is
//! left unbound and renders as plain text.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use regex::Regex;
use tree_sitter::{Node, Parser};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::frontend::{
    AnalyzedDocument, DocumentSource, GenericSemanticFacts, GenericSyntaxFacts, Language, Project, RawSpan, Solution, SyntaxFacts,
};
use crate::grammar;
use crate::snapshot::SnapshotSemantics;
use crate::symbols::{Accessibility, MethodKind, SourceLocation, SymbolData, SymbolKey, SymbolKind, SymbolTable, TypeKind};
use crate::syntax::{NodeId, SyntaxKind, SyntaxTree};
use crate::types::TextRange;

/// Largest source file parsed.
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Deepest tree-sitter nesting lowered; deeper text stays unclassified.
const MAX_DEPTH: usize = 400;

/// Manifests that root a project, in lookup priority.
const MANIFESTS: [&str; 5] = ["Cargo.toml", "go.mod", "package.json", "pyproject.toml", "setup.py"];

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 5] = ["__pycache__", "node_modules", "target", "vendor", "venv"];

/// File stems that name their directory's module.
const MODULE_FILES: [&str; 5] = ["__init__", "index", "lib", "main", "mod"];

/// Leaf kinds lowered to identifiers.
const IDENTIFIER_KINDS: [&str; 9] = [
    "field_identifier",
    "identifier",
    "package_identifier",
    "private_property_identifier",
    "property_identifier",
    "shorthand_field_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
    "type_identifier",
];

/// Named kinds lowered to one string literal token, children included.
const STRING_KINDS: [&str; 9] = [
    "char_literal",
    "concatenated_string",
    "interpreted_string_literal",
    "raw_string_literal",
    "regex",
    "rune_literal",
    "string",
    "string_literal",
    "template_string",
];

/// Named kinds lowered to numeric literal tokens.
const NUMBER_KINDS: [&str; 7] = ["float", "float_literal", "imaginary_literal", "int_literal", "integer", "integer_literal", "number"];

const PUNCTUATION: [&str; 14] = ["(", ")", ",", "->", ".", ":", "::", ";", "=>", "?.", "[", "]", "{", "}"];

/// Kinds wrapped in one `BaseType` when they appear in a base list.
const BASE_ENTRY_KINDS: [&str; 7] = [
    "attribute",
    "identifier",
    "member_expression",
    "nested_type_identifier",
    "scoped_identifier",
    "scoped_type_identifier",
    "type_identifier",
];

// ── Discovery ─────────────────────────────────────────────────────────

/// A manifest that roots a project.
#[derive(Debug, Clone)]
struct Manifest {
    /// Directory holding the manifest.
    dir: PathBuf,
    /// Manifest file name.
    file: &'static str,
    /// Declared package name, sanitized.
    name: Option<String>,
    /// Declared dependencies.
    references: Vec<String>,
}

/// Files of one discovered project.
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    /// Assembly name: the manifest's package name, else its directory name.
    pub assembly_name: String,
    /// Project directory; document paths are relative to it.
    pub dir: PathBuf,
    /// Source files relative to `dir`, with `/` separators.
    pub files: Vec<String>,
    /// Language of the manifest, else of the first file.
    pub language: Language,
    /// Manifest path relative to the scanned root.
    pub project_path: Option<String>,
    /// Dependencies named by the manifest.
    pub references: Vec<String>,
}

/// Find every indexable source file under `root` and group files into
/// projects by their nearest manifest. Files with no manifest above them
/// form one project named after `root`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `root` is not a directory.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<ProjectPlan>, Error> {
    let root = root.canonicalize().map_err(|_err| return Error::FileNotFound { path: root.to_path_buf() })?;
    if !root.is_dir() {
        return Err(Error::FileNotFound { path: root });
    }

    let mut manifests: HashMap<PathBuf, Option<Manifest>> = HashMap::new();
    let mut plans: Vec<ProjectPlan> = Vec::new();
    let mut by_dir: HashMap<PathBuf, usize> = HashMap::new();

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| return entry.depth() == 0 || !is_skipped(entry));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !grammar::is_source_file(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if !config.should_scan(&slash_path(relative)) {
            continue;
        }

        let manifest = nearest_manifest(&root, entry.path(), &mut manifests);
        let dir = manifest.as_ref().map_or_else(|| return root.clone(), |manifest| return manifest.dir.clone());
        let index = match by_dir.get(&dir) {
            Some(index) => *index,
            None => {
                plans.push(plan_for(&root, manifest.as_ref(), entry.path()));
                by_dir.insert(dir.clone(), plans.len().saturating_sub(1));
                plans.len().saturating_sub(1)
            },
        };
        let file = entry.path().strip_prefix(&dir).map_or_else(|_err| return slash_path(relative), slash_path);
        if let Some(plan) = plans.get_mut(index) {
            plan.files.push(file);
        }
    }
    return Ok(plans);
}

/// Hidden directories, build outputs and dependency caches.
fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    return entry.file_type().is_dir() && (name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()));
}

fn slash_path(path: &Path) -> String {
    return path.components().map(|part| return part.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
}

fn nearest_manifest(root: &Path, file: &Path, cache: &mut HashMap<PathBuf, Option<Manifest>>) -> Option<Manifest> {
    for dir in file.ancestors().skip(1) {
        if !dir.starts_with(root) {
            break;
        }
        let found = cache.entry(dir.to_path_buf()).or_insert_with(|| return read_manifest(dir)).clone();
        if found.is_some() {
            return found;
        }
    }
    return None;
}

fn read_manifest(dir: &Path) -> Option<Manifest> {
    let file = MANIFESTS.into_iter().find(|name| return dir.join(name).is_file())?;
    let content = std::fs::read_to_string(dir.join(file)).unwrap_or_default();
    let (name, references) = match file {
        "Cargo.toml" => cargo_manifest(&content),
        "go.mod" => (go_module(&content), Vec::new()),
        "package.json" => package_json(&content),
        "pyproject.toml" => (pyproject_name(&content), Vec::new()),
        "setup.py" => setup_py(&content),
        _ => (None, Vec::new()),
    };
    return Some(Manifest { dir: dir.to_path_buf(), file, name: name.map(|name| return sanitize_assembly(&name)), references });
}

fn cargo_manifest(content: &str) -> (Option<String>, Vec<String>) {
    let Ok(table) = toml::from_str::<toml::Table>(content) else {
        return (None, Vec::new());
    };
    let name = table.get("package").and_then(|package| return package.get("name")).and_then(toml::Value::as_str).map(str::to_string);
    let references = table
        .get("dependencies")
        .and_then(toml::Value::as_table)
        .map(|dependencies| return dependencies.keys().cloned().collect())
        .unwrap_or_default();
    return (name, references);
}

fn go_module(content: &str) -> Option<String> {
    let module = content.lines().find_map(|line| return line.trim().strip_prefix("module "))?;
    return module.trim().rsplit('/').next().map(str::to_string);
}

fn package_json(content: &str) -> (Option<String>, Vec<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return (None, Vec::new());
    };
    let name = value.get("name").and_then(serde_json::Value::as_str).map(|name| return name.trim_start_matches('@').replace('/', "."));
    let references = value
        .get("dependencies")
        .and_then(serde_json::Value::as_object)
        .map(|dependencies| return dependencies.keys().cloned().collect())
        .unwrap_or_default();
    return (name, references);
}

fn pyproject_name(content: &str) -> Option<String> {
    let table = toml::from_str::<toml::Table>(content).ok()?;
    let project = table.get("project").and_then(|project| return project.get("name"));
    let poetry = || return table.get("tool")?.get("poetry")?.get("name");
    return project.or_else(poetry).and_then(toml::Value::as_str).map(str::to_string);
}

/// `setup(name="...", install_requires=[...])` read textually; the script is never run.
fn setup_py(content: &str) -> (Option<String>, Vec<String>) {
    let (Ok(name_pattern), Ok(requires_pattern), Ok(requirement_pattern)) = (
        Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#),
        Regex::new(r"(?s)\binstall_requires\s*=\s*\[(.*?)\]"),
        Regex::new(r#"["']\s*([A-Za-z0-9][A-Za-z0-9._-]*)"#),
    ) else {
        return (None, Vec::new());
    };
    let name = name_pattern.captures(content).and_then(|caps| return caps.get(1)).map(|name| return name.as_str().to_string());
    let references = requires_pattern
        .captures(content)
        .and_then(|caps| return caps.get(1))
        .map(|list| {
            return requirement_pattern
                .captures_iter(list.as_str())
                .filter_map(|caps| return caps.get(1).map(|requirement| return requirement.as_str().to_string()))
                .collect();
        })
        .unwrap_or_default();
    return (name, references);
}

/// Keep assembly names usable as a single path segment.
fn sanitize_assembly(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| return if ch.is_alphanumeric() || matches!(ch, '-' | '.' | '_') { ch } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    return if trimmed.is_empty() { "root".to_string() } else { trimmed.to_string() };
}

const fn manifest_language(file: &str) -> Option<Language> {
    return match file.as_bytes() {
        b"Cargo.toml" => Some(Language::Rust),
        b"go.mod" => Some(Language::Go),
        b"package.json" => Some(Language::TypeScript),
        b"pyproject.toml" | b"setup.py" => Some(Language::Python),
        _ => None,
    };
}

fn plan_for(root: &Path, manifest: Option<&Manifest>, first_file: &Path) -> ProjectPlan {
    let dir = manifest.map_or_else(|| return root.to_path_buf(), |manifest| return manifest.dir.clone());
    let dir_name = dir.file_name().map(|name| return sanitize_assembly(&name.to_string_lossy())).unwrap_or_else(|| return "root".to_string());
    let language = manifest
        .and_then(|manifest| return manifest_language(manifest.file))
        .or_else(|| return grammar::source_language(first_file).ok())
        .unwrap_or(Language::Rust);
    let project_path = manifest.and_then(|manifest| return manifest.dir.strip_prefix(root).ok().map(|dir| return slash_path(&dir.join(manifest.file))));
    return ProjectPlan {
        assembly_name: manifest.and_then(|manifest| return manifest.name.clone()).unwrap_or(dir_name),
        dir,
        files: Vec::new(),
        language,
        project_path,
        references: manifest.map(|manifest| return manifest.references.clone()).unwrap_or_default(),
    };
}

/// Namespace of a file: the assembly followed by its module path.
fn namespace_path(language: Language, assembly: &str, path: &str) -> Vec<String> {
    let stem = path.rsplit_once('.').map_or(path, |(stem, _)| return stem);
    let mut parts: Vec<&str> = stem.split('/').filter(|part| return !part.is_empty()).collect();
    if language == Language::Go {
        // A Go package is its directory.
        parts.pop();
    } else {
        if parts.first() == Some(&"src") {
            parts.remove(0);
        }
        if parts.last().is_some_and(|last| return MODULE_FILES.contains(last)) {
            parts.pop();
        }
    }
    let root = if language == Language::Rust { assembly.replace('-', "_") } else { assembly.to_string() };
    let mut namespace = Vec::with_capacity(parts.len().saturating_add(1));
    if parts.first() != Some(&root.as_str()) {
        namespace.push(root);
    }
    namespace.extend(parts.into_iter().map(str::to_string));
    return namespace;
}

// ── Lowering ──────────────────────────────────────────────────────────

fn to_offset(offset: usize) -> u32 {
    return u32::try_from(offset).unwrap_or(u32::MAX);
}

fn range_of(node: Node<'_>) -> TextRange {
    return TextRange::new(to_offset(node.start_byte()), to_offset(node.end_byte()));
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    return node.named_children(&mut cursor).next();
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    return node.children(&mut cursor).any(|child| return child.kind() == kind);
}

/// Nodes lowered to a single token: comments, strings, lifetimes.
fn is_atomic(node: Node<'_>) -> bool {
    let kind = node.kind();
    return kind.ends_with("comment") || kind == "lifetime" || (node.is_named() && STRING_KINDS.contains(&kind));
}

/// Token kind and raw classification of a non-identifier leaf.
fn token_class(node: Node<'_>, text: &str) -> (SyntaxKind, &'static str) {
    let kind = node.kind();
    if kind.ends_with("comment") {
        return (SyntaxKind::CommentToken, "comment");
    }
    if node.is_named() && STRING_KINDS.contains(&kind) {
        return (SyntaxKind::LiteralToken, "string");
    }
    if node.is_named() && NUMBER_KINDS.contains(&kind) {
        return (SyntaxKind::LiteralToken, "number");
    }
    if kind == "lifetime" || text.starts_with(|ch: char| return ch.is_alphabetic() || ch == '_') {
        return (SyntaxKind::KeywordToken, "keyword");
    }
    if PUNCTUATION.contains(&text) {
        return (SyntaxKind::PunctuationToken, "punctuation");
    }
    return (SyntaxKind::OperatorToken, "operator");
}

/// Shared-vocabulary kind of an interior tree-sitter node.
fn structural_kind(language: Language, node: Node<'_>) -> SyntaxKind {
    let parent_kind = node.parent().map_or("", |parent| return parent.kind());
    return match node.kind() {
        "abstract_class_declaration" | "class" | "class_declaration" | "class_definition" | "enum_declaration" | "enum_item"
        | "interface_declaration" | "struct_item" | "trait_item" | "type_alias_declaration" | "type_item" | "type_spec"
        | "union_item" => SyntaxKind::TypeDeclaration,
        "argument_list" if parent_kind == "class_definition" => SyntaxKind::BaseList,
        "assignment" | "assignment_expression" | "assignment_statement" | "augmented_assignment" | "augmented_assignment_expression"
        | "compound_assignment_expr" => SyntaxKind::Assignment,
        "attribute" if language == Language::Python => SyntaxKind::MemberAccess,
        "call" | "call_expression" | "macro_invocation" => SyntaxKind::Invocation,
        "dec_statement" | "inc_statement" | "update_expression" => SyntaxKind::Increment,
        "default_parameter" | "optional_parameter" | "parameter" | "parameter_declaration" | "required_parameter"
        | "typed_default_parameter" | "typed_parameter" => SyntaxKind::Parameter,
        "extends_clause" | "extends_type_clause" | "implements_clause" => SyntaxKind::BaseList,
        "field_expression" | "member_expression" | "selector_expression" => SyntaxKind::MemberAccess,
        "index_expression" | "subscript" | "subscript_expression" => SyntaxKind::ElementAccess,
        "nested_identifier" | "nested_type_identifier" | "qualified_type" | "scoped_identifier" | "scoped_type_identifier" => {
            SyntaxKind::QualifiedName
        },
        "new_expression" => SyntaxKind::ObjectCreation,
        "trait_bounds" if parent_kind == "trait_item" => SyntaxKind::BaseList,
        _ => SyntaxKind::Other,
    };
}

/// Nodes whose children attach directly to the node's parent.
fn is_transparent(node: Node<'_>) -> bool {
    // Go wraps even a single assignment target in a list.
    if node.kind() != "expression_list" || node.named_child_count() != 1 {
        return false;
    }
    return node
        .parent()
        .is_some_and(|parent| return parent.kind() == "assignment_statement" && parent.child_by_field_name("left") == Some(node));
}

/// Tree-sitter to shared-vocabulary lowering of one file.
struct Lowering<'src> {
    /// Every `Name` wrapper, in source order.
    identifiers: Vec<NodeId>,
    language: Language,
    /// Tree-sitter identifier node id to its `Name` wrapper.
    names: HashMap<usize, NodeId>,
    /// Tree-sitter interior node id to its lowered node.
    nodes: HashMap<usize, NodeId>,
    source: &'src str,
    /// Classification of every non-identifier token.
    spans: Vec<RawSpan>,
    tree: SyntaxTree,
}

impl<'src> Lowering<'src> {
    fn new(source: &'src str, language: Language) -> Self {
        let end = to_offset(source.len());
        return Self {
            identifiers: Vec::new(),
            language,
            names: HashMap::new(),
            nodes: HashMap::new(),
            source,
            spans: Vec::new(),
            tree: SyntaxTree::new(SyntaxKind::CompilationUnit, TextRange::new(0, end)),
        };
    }

    fn lower_root(&mut self, root: Node<'_>) {
        let id = self.tree.root();
        self.nodes.insert(root.id(), id);
        self.lower_children(root, id, 0);
    }

    fn lower_children(&mut self, node: Node<'_>, parent: NodeId, depth: usize) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.lower(child, parent, depth.saturating_add(1));
        }
    }

    fn lower(&mut self, node: Node<'_>, parent: NodeId, depth: usize) {
        let span = range_of(node);
        if span.is_empty() {
            return;
        }
        if node.child_count() == 0 || is_atomic(node) {
            self.token(node, parent, span);
            return;
        }
        if depth > MAX_DEPTH {
            return;
        }
        if is_transparent(node) {
            self.lower_children(node, parent, depth);
            return;
        }

        let kind = structural_kind(self.language, node);
        let Some(id) = self.tree.push_node(parent, kind, span) else {
            return;
        };
        self.nodes.insert(node.id(), id);
        if node.kind() == "impl_item" {
            self.lower_impl(node, id, depth);
        } else if kind == SyntaxKind::BaseList {
            self.lower_base_entries(node, id, depth);
        } else {
            self.lower_children(node, id, depth);
        }
    }

    /// `impl Trait for Type`: the trait becomes a one-entry base list.
    fn lower_impl(&mut self, node: Node<'_>, id: NodeId, depth: usize) {
        let implemented = node.child_by_field_name("trait");
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) == implemented
                && let Some(list) = self.tree.push_node(id, SyntaxKind::BaseList, range_of(child))
            {
                self.lower_base_entry(child, list, depth.saturating_add(1));
            } else {
                self.lower(child, id, depth.saturating_add(1));
            }
        }
    }

    fn lower_base_entries(&mut self, node: Node<'_>, list: NodeId, depth: usize) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.lower_base_entry(child, list, depth.saturating_add(1));
        }
    }

    fn lower_base_entry(&mut self, node: Node<'_>, list: NodeId, depth: usize) {
        // `Base<T>`: the head is the base, the arguments are ordinary uses.
        if node.kind() == "generic_type" {
            self.lower_base_entries(node, list, depth);
            return;
        }
        if node.is_named()
            && BASE_ENTRY_KINDS.contains(&node.kind())
            && let Some(base) = self.tree.push_node(list, SyntaxKind::BaseType, range_of(node))
        {
            self.lower(node, base, depth);
            return;
        }
        self.lower(node, list, depth);
    }

    fn token(&mut self, node: Node<'_>, parent: NodeId, span: TextRange) {
        if node.is_named() && IDENTIFIER_KINDS.contains(&node.kind()) {
            if let Some(name) = self.tree.push_node(parent, SyntaxKind::Name, span)
                && self.tree.push_node(name, SyntaxKind::IdentifierToken, span).is_some()
            {
                self.names.insert(node.id(), name);
                self.identifiers.push(name);
            }
            return;
        }
        let text = node.utf8_text(self.source.as_bytes()).unwrap_or("");
        let (kind, classification) = token_class(node, text);
        if self.tree.push_node(parent, kind, span).is_some() {
            self.spans.push(RawSpan { classification: classification.to_string(), span });
        }
    }
}

// ── Declarations ──────────────────────────────────────────────────────

/// Where a declaration lives, before symbols exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Container {
    /// The file's namespace.
    #[default]
    File,
    /// Another declaration of the same file, by index.
    Site(usize),
    /// A type of the same project, by name.
    TypeNamed(String),
}

/// One declaration found in a file.
#[derive(Debug, Clone)]
struct Declaration {
    accessibility: Accessibility,
    /// Names listed as bases, for types.
    bases: Vec<String>,
    container: Container,
    /// Trait whose same-named member this method implements.
    implements: Option<String>,
    is_const: bool,
    is_static: bool,
    kind: SymbolKind,
    method_kind: Option<MethodKind>,
    name: String,
    /// `Name` wrapper of the declaring identifier.
    name_node: NodeId,
    /// Lowered declaration node, for types.
    owner_node: Option<NodeId>,
    /// Extent of the declaration; for locals, the range they are visible in.
    scope: TextRange,
    /// Span of the declaring identifier.
    span: TextRange,
    type_kind: Option<TypeKind>,
}

/// A Rust `impl` block: members attach to a type found by name.
#[derive(Debug, Clone)]
struct ImplBlock {
    node: NodeId,
    range: TextRange,
    type_name: String,
}

/// Declaration context while walking a file.
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Enclosing function, by declaration index.
    function: Option<usize>,
    /// Trait implemented by the enclosing `impl` block.
    implements: Option<String>,
    /// Range locals declared here are visible in.
    locals: Option<TextRange>,
    /// Container of members declared here.
    owner: Option<Container>,
    /// Whether the owner is a trait or interface.
    owner_is_interface: bool,
}

impl Scope {
    fn member_container(&self) -> Container {
        return self.owner.clone().unwrap_or_default();
    }

    fn local_container(&self) -> Container {
        return self.function.map_or_else(|| return self.member_container(), Container::Site);
    }
}

/// Name of the type a type expression refers to: `a::B<T>` is `B`.
fn type_head(node: Node<'_>, source: &str) -> Option<String> {
    let inner = |field: &str| return node.child_by_field_name(field).and_then(|child| return type_head(child, source));
    return match node.kind() {
        "field_identifier" | "identifier" | "property_identifier" | "type_identifier" => {
            node.utf8_text(source.as_bytes()).ok().map(str::to_string)
        },
        "attribute" => inner("attribute"),
        "generic_type" => inner("type").or_else(|| return inner("name")),
        "member_expression" => inner("property"),
        "nested_type_identifier" | "qualified_type" | "scoped_identifier" | "scoped_type_identifier" => inner("name"),
        "pointer_type" | "reference_type" => {
            inner("type").or_else(|| return first_named(node).and_then(|child| return type_head(child, source)))
        },
        _ => None,
    };
}

fn collect_base_names(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "extends_clause" | "implements_clause" => collect_base_names(child, source, out),
            "keyword_argument" | "type_arguments" => {},
            _ => {
                if let Some(head) = type_head(child, source) {
                    out.push(head);
                }
            },
        }
    }
}

fn starts_uppercase(node: Node<'_>, source: &str) -> bool {
    return node.utf8_text(source.as_bytes()).is_ok_and(|text| return text.starts_with(char::is_uppercase));
}

/// Identifiers a pattern binds.
fn pattern_names<'t>(node: Node<'t>, language: Language, source: &str, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" | "shorthand_field_identifier" | "shorthand_property_identifier_pattern" => {
            // Capitalized Rust patterns name variants and constants.
            if language != Language::Rust || !starts_uppercase(node, source) {
                out.push(node);
            }
        },
        "attribute" | "call" | "field_expression" | "field_identifier" | "index_expression" | "member_expression"
        | "property_identifier" | "scoped_identifier" | "selector_expression" | "subscript" | "subscript_expression"
        | "type_identifier" => {},
        _ => {
            let is_pair = node.kind() == "pair_pattern";
            let mut cursor = node.walk();
            if !cursor.goto_first_child() {
                return;
            }
            loop {
                let skipped = !is_pair && matches!(cursor.field_name(), Some("default_value" | "right" | "type" | "value"));
                let child = cursor.node();
                if child.is_named() && !skipped {
                    pattern_names(child, language, source, out);
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        },
    }
}

/// Identifiers one parameter declares.
fn parameter_names<'t>(node: Node<'t>, language: Language, source: &str, out: &mut Vec<Node<'t>>) {
    if matches!(node.kind(), "comment" | "self_parameter") {
        return;
    }
    if let Some(pattern) = node.child_by_field_name("pattern") {
        pattern_names(pattern, language, source, out);
        return;
    }
    let mut cursor = node.walk();
    let named: Vec<Node<'t>> = node.children_by_field_name("name", &mut cursor).collect();
    if named.is_empty() {
        pattern_names(node, language, source, out);
    } else {
        out.extend(named);
    }
}

/// Declaration collector over one parsed file.
struct Collector<'a> {
    declarations: Vec<Declaration>,
    impls: Vec<ImplBlock>,
    language: Language,
    lowering: &'a Lowering<'a>,
    /// `(visibility start, name)` pairs already declared, for languages
    /// where assignment declares.
    seen: HashSet<(u32, String)>,
}

impl<'a> Collector<'a> {
    fn new(lowering: &'a Lowering<'a>) -> Self {
        return Self { declarations: Vec::new(), impls: Vec::new(), language: lowering.language, lowering, seen: HashSet::new() };
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        return node.utf8_text(self.lowering.source.as_bytes()).unwrap_or("");
    }

    /// A declaration named by `name`; `None` when the name was not lowered.
    fn site(&self, name: Node<'_>, kind: SymbolKind, container: Container, scope: TextRange) -> Option<Declaration> {
        let name_node = *self.lowering.names.get(&name.id())?;
        return Some(Declaration {
            accessibility: Accessibility::NotApplicable,
            bases: Vec::new(),
            container,
            implements: None,
            is_const: false,
            is_static: false,
            kind,
            method_kind: None,
            name: self.text(name).to_string(),
            name_node,
            owner_node: None,
            scope,
            span: range_of(name),
            type_kind: None,
        });
    }

    fn push(&mut self, declaration: Declaration) -> usize {
        self.declarations.push(declaration);
        return self.declarations.len().saturating_sub(1);
    }

    const fn redeclares_by_assignment(&self) -> bool {
        return matches!(self.language, Language::Go | Language::Python);
    }

    fn walk(&mut self, node: Node<'_>, scope: &Scope, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        let inner = self.visit(node, scope);
        let scope = inner.as_ref().unwrap_or(scope);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, scope, depth.saturating_add(1));
        }
    }

    /// Record what `node` declares; returns the scope for its children when it opens one.
    fn visit(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        return match self.language {
            Language::Go => self.visit_go(node, scope),
            Language::Python => self.visit_python(node, scope),
            Language::Rust => self.visit_rust(node, scope),
            Language::TypeScript => self.visit_typescript(node, scope),
            Language::CSharp | Language::VisualBasic => None,
        };
    }

    fn visit_rust(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        match node.kind() {
            "closure_expression" => return self.enter_closure(node, scope),
            "const_item" | "static_item" => {
                if let Some(mut declaration) = self.field(node, "name", SymbolKind::Field, scope) {
                    declaration.is_const = node.kind() == "const_item";
                    declaration.is_static = true;
                    self.push(declaration);
                }
            },
            "enum_item" => return self.declare_type(node, TypeKind::Enum, scope),
            "enum_variant" => {
                if let Some(mut declaration) = self.field(node, "name", SymbolKind::Field, scope) {
                    declaration.accessibility = Accessibility::Public;
                    declaration.is_const = true;
                    declaration.is_static = true;
                    self.push(declaration);
                }
            },
            "field_declaration" => {
                if let Some(declaration) = self.field(node, "name", SymbolKind::Field, scope) {
                    self.push(declaration);
                }
            },
            "for_expression" | "match_arm" => self.declare_locals(node.child_by_field_name("pattern"), scope, range_of(node)),
            "function_item" | "function_signature_item" => return self.declare_function(node, scope, MethodKind::Ordinary),
            "impl_item" => return self.enter_impl(node),
            "let_condition" => {
                let visible = node.parent().map_or_else(|| return range_of(node), range_of);
                self.declare_locals(node.child_by_field_name("pattern"), scope, visible);
            },
            "let_declaration" => {
                let visible = scope.locals.unwrap_or_else(|| return range_of(node));
                self.declare_locals(node.child_by_field_name("pattern"), scope, visible);
            },
            "struct_item" | "union_item" => return self.declare_type(node, TypeKind::Struct, scope),
            "trait_item" => return self.declare_type(node, TypeKind::Interface, scope),
            "type_item" => return self.declare_type(node, TypeKind::Class, scope),
            _ => {},
        }
        return None;
    }

    fn visit_typescript(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        match node.kind() {
            "abstract_class_declaration" | "class" | "class_declaration" | "type_alias_declaration" => {
                return self.declare_type(node, TypeKind::Class, scope);
            },
            "abstract_method_signature" | "method_definition" | "method_signature" => {
                let is_constructor = node.child_by_field_name("name").is_some_and(|name| return self.text(name) == "constructor");
                let kind = if is_constructor { MethodKind::Constructor } else { MethodKind::Ordinary };
                return self.declare_function(node, scope, kind);
            },
            "arrow_function" | "function" | "function_expression" => return self.enter_closure(node, scope),
            "catch_clause" => self.declare_locals(node.child_by_field_name("parameter"), scope, range_of(node)),
            "enum_declaration" => {
                let inner = self.declare_type(node, TypeKind::Enum, scope);
                if let Some(inner) = &inner {
                    self.declare_enum_members(node, inner);
                }
                return inner;
            },
            "for_in_statement" => self.declare_locals(node.child_by_field_name("left"), scope, range_of(node)),
            "function_declaration" | "function_signature" | "generator_function_declaration" => {
                return self.declare_function(node, scope, MethodKind::Ordinary);
            },
            "interface_declaration" => return self.declare_type(node, TypeKind::Interface, scope),
            "property_signature" => {
                if let Some(declaration) = self.field(node, "name", SymbolKind::Property, scope) {
                    self.push(declaration);
                }
            },
            "public_field_definition" => {
                if let Some(mut declaration) = self.field(node, "name", SymbolKind::Field, scope) {
                    declaration.is_static = has_child_kind(node, "static");
                    self.push(declaration);
                }
            },
            "variable_declarator" => self.declare_variable(node, scope),
            _ => {},
        }
        return None;
    }

    fn visit_go(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        match node.kind() {
            "const_spec" | "var_spec" => self.declare_go_spec(node, scope),
            "field_declaration" => {
                let mut cursor = node.walk();
                let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    if let Some(mut declaration) = self.site(name, SymbolKind::Field, scope.member_container(), range_of(node)) {
                        declaration.accessibility = self.accessibility(node, &declaration.name, scope);
                        self.push(declaration);
                    }
                }
            },
            "func_literal" => return self.enter_closure(node, scope),
            "function_declaration" | "method_elem" | "method_spec" => return self.declare_function(node, scope, MethodKind::Ordinary),
            "method_declaration" => {
                let source = self.lowering.source;
                let receiver = node
                    .child_by_field_name("receiver")
                    .and_then(first_named)
                    .and_then(|parameter| return parameter.child_by_field_name("type"))
                    .and_then(|ty| return type_head(ty, source));
                let owner = Scope { owner: receiver.map(Container::TypeNamed), ..Scope::default() };
                return self.declare_function(node, &owner, MethodKind::Ordinary);
            },
            "range_clause" => {
                let visible = node.parent().map_or_else(|| return range_of(node), range_of);
                self.declare_locals(node.child_by_field_name("left"), scope, visible);
            },
            "short_var_declaration" => {
                let visible = scope.locals.unwrap_or_else(|| return range_of(node));
                self.declare_locals(node.child_by_field_name("left"), scope, visible);
            },
            "type_alias" | "type_spec" => {
                let kind = match node.child_by_field_name("type").map(|ty| return ty.kind()) {
                    Some("interface_type") => TypeKind::Interface,
                    Some("struct_type") => TypeKind::Struct,
                    _ => TypeKind::Class,
                };
                return self.declare_type(node, kind, scope);
            },
            _ => {},
        }
        return None;
    }

    fn visit_python(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        match node.kind() {
            "assignment" => self.declare_assignment(node, scope),
            "class_definition" => return self.declare_type(node, TypeKind::Class, scope),
            "for_statement" => {
                let visible = scope.locals.unwrap_or_else(|| return range_of(node));
                self.declare_locals(node.child_by_field_name("left"), scope, visible);
            },
            "function_definition" => {
                let is_constructor = node.child_by_field_name("name").is_some_and(|name| return self.text(name) == "__init__");
                let kind = if is_constructor { MethodKind::Constructor } else { MethodKind::Ordinary };
                return self.declare_function(node, scope, kind);
            },
            "lambda" => return self.enter_closure(node, scope),
            _ => {},
        }
        return None;
    }

    fn accessibility(&self, node: Node<'_>, name: &str, scope: &Scope) -> Accessibility {
        return match self.language {
            Language::CSharp | Language::VisualBasic => Accessibility::Public,
            Language::Go => {
                if name.starts_with(char::is_uppercase) {
                    Accessibility::Public
                } else {
                    Accessibility::Internal
                }
            },
            Language::Python => {
                if name.starts_with('_') && !name.ends_with("__") {
                    Accessibility::Private
                } else {
                    Accessibility::Public
                }
            },
            Language::Rust => {
                if scope.implements.is_some() || scope.owner_is_interface || has_child_kind(node, "visibility_modifier") {
                    Accessibility::Public
                } else {
                    Accessibility::Private
                }
            },
            Language::TypeScript => {
                let mut cursor = node.walk();
                let modifier = node
                    .children(&mut cursor)
                    .find(|child| return child.kind() == "accessibility_modifier")
                    .map(|modifier| return self.text(modifier));
                match modifier {
                    Some("private") => Accessibility::Private,
                    Some("protected") => Accessibility::Protected,
                    _ => {
                        if node.child_by_field_name("name").is_some_and(|name| return name.kind() == "private_property_identifier") {
                            Accessibility::Private
                        } else {
                            Accessibility::Public
                        }
                    },
                }
            },
        };
    }

    /// A member named by `node`'s `field` child, not yet pushed.
    fn field(&self, node: Node<'_>, field: &str, kind: SymbolKind, scope: &Scope) -> Option<Declaration> {
        let name = node.child_by_field_name(field)?;
        let mut declaration = self.site(name, kind, scope.member_container(), range_of(node))?;
        declaration.accessibility = self.accessibility(node, &declaration.name, scope);
        return Some(declaration);
    }

    fn declare_type(&mut self, node: Node<'_>, type_kind: TypeKind, scope: &Scope) -> Option<Scope> {
        let name = node.child_by_field_name("name")?;
        let container = match &scope.owner {
            Some(Container::Site(owner)) if scope.function.is_none() => Container::Site(*owner),
            _ => Container::File,
        };
        let mut declaration = self.site(name, SymbolKind::NamedType, container, range_of(node))?;
        declaration.accessibility = self.accessibility(node, &declaration.name, scope);
        declaration.owner_node = self.lowering.nodes.get(&node.id()).copied();
        declaration.type_kind = Some(type_kind);
        declaration.bases = self.bases_of(node);
        let index = self.push(declaration);
        self.declare_type_parameters(node, index);
        return Some(Scope {
            function: None,
            implements: None,
            locals: None,
            owner: Some(Container::Site(index)),
            owner_is_interface: type_kind == TypeKind::Interface,
        });
    }

    fn bases_of(&self, node: Node<'_>) -> Vec<String> {
        let source = self.lowering.source;
        let mut bases = Vec::new();
        let lists: Vec<Node<'_>> = match node.kind() {
            "class_definition" => node.child_by_field_name("superclasses").into_iter().collect(),
            "trait_item" => node.child_by_field_name("bounds").into_iter().collect(),
            _ => {
                let mut cursor = node.walk();
                node.named_children(&mut cursor)
                    .filter(|child| return matches!(child.kind(), "class_heritage" | "extends_type_clause"))
                    .collect()
            },
        };
        for list in lists {
            collect_base_names(list, source, &mut bases);
        }
        return bases;
    }

    fn declare_type_parameters(&mut self, node: Node<'_>, owner: usize) {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return;
        };
        let mut cursor = list.walk();
        let names: Vec<Node<'_>> = list
            .named_children(&mut cursor)
            .filter_map(|parameter| {
                return match parameter.kind() {
                    "type_identifier" => Some(parameter),
                    "constrained_type_parameter" | "optional_type_parameter" | "type_parameter" => parameter
                        .child_by_field_name("left")
                        .or_else(|| return parameter.child_by_field_name("name")),
                    _ => None,
                };
            })
            .collect();
        for name in names {
            if let Some(declaration) = self.site(name, SymbolKind::TypeParameter, Container::Site(owner), range_of(node)) {
                self.push(declaration);
            }
        }
    }

    fn declare_function(&mut self, node: Node<'_>, scope: &Scope, method_kind: MethodKind) -> Option<Scope> {
        let name = node.child_by_field_name("name")?;
        let range = range_of(node);
        let (container, visible, kind) = match scope.function {
            Some(function) => (Container::Site(function), scope.locals.unwrap_or(range), MethodKind::LocalFunction),
            None => (scope.member_container(), range, method_kind),
        };
        let mut declaration = self.site(name, SymbolKind::Method, container, visible)?;
        declaration.accessibility = self.accessibility(node, &declaration.name, scope);
        declaration.implements.clone_from(&scope.implements);
        declaration.is_static = self.is_static(node, scope);
        declaration.method_kind = Some(kind);
        let index = self.push(declaration);

        self.declare_type_parameters(node, index);
        for field in ["receiver", "parameters"] {
            if let Some(parameters) = node.child_by_field_name(field) {
                self.declare_parameters(parameters, index, range);
            }
        }
        return Some(Scope { function: Some(index), implements: None, locals: Some(range), owner: None, owner_is_interface: false });
    }

    fn is_static(&self, node: Node<'_>, scope: &Scope) -> bool {
        if scope.owner.is_none() || scope.function.is_some() {
            return false;
        }
        return match self.language {
            Language::Rust => {
                node.child_by_field_name("parameters").is_none_or(|parameters| return !has_child_kind(parameters, "self_parameter"))
            },
            Language::TypeScript => has_child_kind(node, "static"),
            Language::CSharp | Language::Go | Language::Python | Language::VisualBasic => false,
        };
    }

    fn declare_parameters(&mut self, list: Node<'_>, method: usize, range: TextRange) {
        let mut names = Vec::new();
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            parameter_names(parameter, self.language, self.lowering.source, &mut names);
        }
        for name in names {
            if self.redeclares_by_assignment() {
                self.seen.insert((range.start, self.text(name).to_string()));
            }
            if let Some(declaration) = self.site(name, SymbolKind::Parameter, Container::Site(method), range) {
                self.push(declaration);
            }
        }
    }

    fn enter_impl(&mut self, node: Node<'_>) -> Option<Scope> {
        let source = self.lowering.source;
        let type_name = node.child_by_field_name("type").and_then(|ty| return type_head(ty, source))?;
        let implements = node.child_by_field_name("trait").and_then(|implemented| return type_head(implemented, source));
        if let Some(id) = self.lowering.nodes.get(&node.id()) {
            self.impls.push(ImplBlock { node: *id, range: range_of(node), type_name: type_name.clone() });
        }
        return Some(Scope { function: None, implements, locals: None, owner: Some(Container::TypeNamed(type_name)), owner_is_interface: false });
    }

    /// Closures, lambdas and arrow functions: parameters are locals of the body.
    fn enter_closure(&mut self, node: Node<'_>, scope: &Scope) -> Option<Scope> {
        let range = range_of(node);
        let parameters = node.child_by_field_name("parameters").or_else(|| return node.child_by_field_name("parameter"));
        if let Some(parameters) = parameters {
            let mut names = Vec::new();
            if parameters.kind() == "identifier" {
                names.push(parameters);
            } else {
                let mut cursor = parameters.walk();
                for parameter in parameters.named_children(&mut cursor) {
                    parameter_names(parameter, self.language, self.lowering.source, &mut names);
                }
            }
            for name in names {
                if let Some(declaration) = self.site(name, SymbolKind::Local, scope.local_container(), range) {
                    self.push(declaration);
                }
            }
        }
        return Some(Scope { locals: Some(range), ..scope.clone() });
    }

    fn declare_locals(&mut self, pattern: Option<Node<'_>>, scope: &Scope, visible: TextRange) {
        let Some(pattern) = pattern else {
            return;
        };
        let mut names = Vec::new();
        pattern_names(pattern, self.language, self.lowering.source, &mut names);
        for name in names {
            if self.redeclares_by_assignment() && !self.seen.insert((visible.start, self.text(name).to_string())) {
                continue;
            }
            if let Some(declaration) = self.site(name, SymbolKind::Local, scope.local_container(), visible) {
                self.push(declaration);
            }
        }
    }

    fn declare_variable(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if scope.function.is_some() || scope.locals.is_some() {
            let visible = scope.locals.unwrap_or_else(|| return range_of(node));
            self.declare_locals(Some(name), scope, visible);
            return;
        }
        let is_const = node.parent().is_some_and(|declaration| {
            let mut cursor = declaration.walk();
            return declaration.children(&mut cursor).next().is_some_and(|keyword| return keyword.kind() == "const");
        });
        let mut names = Vec::new();
        pattern_names(name, self.language, self.lowering.source, &mut names);
        for name in names {
            if let Some(mut declaration) = self.site(name, SymbolKind::Field, scope.member_container(), range_of(node)) {
                declaration.accessibility = Accessibility::Public;
                declaration.is_const = is_const;
                declaration.is_static = true;
                self.push(declaration);
            }
        }
    }

    fn declare_enum_members(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        let names: Vec<Node<'_>> = body
            .named_children(&mut cursor)
            .filter_map(|member| {
                return match member.kind() {
                    "enum_assignment" => member.child_by_field_name("name"),
                    "property_identifier" => Some(member),
                    _ => None,
                };
            })
            .collect();
        for name in names {
            if let Some(mut declaration) = self.site(name, SymbolKind::Field, scope.member_container(), range_of(name)) {
                declaration.accessibility = Accessibility::Public;
                declaration.is_const = true;
                declaration.is_static = true;
                self.push(declaration);
            }
        }
    }

    fn declare_go_spec(&mut self, node: Node<'_>, scope: &Scope) {
        let mut cursor = node.walk();
        let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        if scope.function.is_some() {
            let visible = scope.locals.unwrap_or_else(|| return range_of(node));
            for name in names {
                self.declare_locals(Some(name), scope, visible);
            }
            return;
        }
        for name in names {
            if let Some(mut declaration) = self.site(name, SymbolKind::Field, scope.member_container(), range_of(node)) {
                declaration.accessibility = self.accessibility(node, &declaration.name, scope);
                declaration.is_const = node.kind() == "const_spec";
                declaration.is_static = true;
                self.push(declaration);
            }
        }
    }

    /// Python: the first assignment to a name in a scope declares it.
    fn declare_assignment(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if scope.function.is_some() {
            let visible = scope.locals.unwrap_or_else(|| return range_of(node));
            self.declare_locals(Some(left), scope, visible);
            return;
        }
        let owner_start = match &scope.owner {
            Some(Container::Site(owner)) => self.declarations.get(*owner).map_or(0, |owner| return owner.scope.start),
            _ => 0,
        };
        let mut names = Vec::new();
        pattern_names(left, self.language, self.lowering.source, &mut names);
        for name in names {
            if !self.seen.insert((owner_start, self.text(name).to_string())) {
                continue;
            }
            if let Some(mut declaration) = self.site(name, SymbolKind::Field, scope.member_container(), range_of(node)) {
                declaration.accessibility = self.accessibility(node, &declaration.name, scope);
                declaration.is_static = true;
                self.push(declaration);
            }
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────

/// One source file lowered into the shared vocabulary.
struct LoweredFile {
    declarations: Vec<Declaration>,
    identifiers: Vec<NodeId>,
    impls: Vec<ImplBlock>,
    namespace: Vec<String>,
    path: String,
    spans: Vec<RawSpan>,
    text: String,
    tree: SyntaxTree,
}

/// A file that could not be read or parsed.
#[derive(Debug, Clone)]
struct FailedFile {
    file: PathBuf,
    path: String,
    reason: String,
    /// Text, when it could be read.
    text: Option<String>,
}

fn lower_file(plan: &ProjectPlan, relative: &str) -> Result<LoweredFile, FailedFile> {
    let full = plan.dir.join(relative);
    let failed = |reason: String, text: Option<&str>| {
        return FailedFile { file: full.clone(), path: relative.to_string(), reason, text: text.map(str::to_string) };
    };

    let size = std::fs::metadata(&full).map_err(|e| return failed(e.to_string(), None))?.len();
    if size > MAX_FILE_SIZE {
        return Err(failed(format!("file is {size} bytes, over the {MAX_FILE_SIZE} byte limit"), None));
    }
    let text = std::fs::read_to_string(&full).map_err(|e| return failed(e.to_string(), None))?;
    let language = grammar::source_language(&full).map_err(|e| return failed(e.to_string(), Some(&text)))?;
    let grammar = grammar::language_for_path(&full).map_err(|e| return failed(e.to_string(), Some(&text)))?;

    let mut parser = Parser::new();
    parser.set_language(&grammar).map_err(|e| return failed(e.to_string(), Some(&text)))?;
    let parsed = parser.parse(&text, None).ok_or_else(|| return failed("tree-sitter returned None".to_string(), Some(&text)))?;

    let mut lowering = Lowering::new(&text, language);
    lowering.lower_root(parsed.root_node());
    let (declarations, impls) = {
        let mut collector = Collector::new(&lowering);
        collector.walk(parsed.root_node(), &Scope::default(), 0);
        (collector.declarations, collector.impls)
    };
    let Lowering { identifiers, spans, tree, .. } = lowering;

    return Ok(LoweredFile {
        declarations,
        identifiers,
        impls,
        namespace: namespace_path(language, &plan.assembly_name, relative),
        path: relative.to_string(),
        spans,
        text,
        tree,
    });
}

// ── Symbols ───────────────────────────────────────────────────────────

/// Name tables shared by every binder.
#[derive(Debug, Default)]
struct Names {
    /// Members of each type by name.
    members: HashMap<SymbolKey, HashMap<String, Vec<SymbolKey>>>,
    /// Every member of each project by name.
    project_members: Vec<HashMap<String, Vec<SymbolKey>>>,
    /// Namespace-level declarations of each project by name.
    projects: Vec<HashMap<String, Vec<SymbolKey>>>,
    /// Namespace-level declarations across the solution by name.
    solution: HashMap<String, Vec<SymbolKey>>,
}

fn unique(candidates: &[SymbolKey]) -> Option<SymbolKey> {
    return match candidates {
        [only] => Some(*only),
        _ => None,
    };
}

/// Read-only queries over the finished tables.
#[derive(Clone, Copy)]
struct Lookup<'a> {
    names: &'a Names,
    table: &'a SymbolTable,
}

impl Lookup<'_> {
    fn is_kind(&self, key: SymbolKey, kind: SymbolKind) -> bool {
        return self.table.get(key).is_some_and(|data| return data.kind == kind);
    }

    /// A type by name: same namespace first, then the project, then a
    /// name unique across the solution.
    fn find_type(&self, project: usize, name: &str, namespace: Option<SymbolKey>) -> Option<SymbolKey> {
        let in_project: Vec<SymbolKey> = self
            .names
            .projects
            .get(project)
            .and_then(|names| return names.get(name))
            .into_iter()
            .flatten()
            .copied()
            .filter(|key| return self.is_kind(*key, SymbolKind::NamedType))
            .collect();
        let same_namespace = in_project
            .iter()
            .copied()
            .find(|key| return namespace.is_some() && self.table.get(*key).is_some_and(|data| return data.containing == namespace));
        if let Some(found) = same_namespace.or_else(|| return in_project.first().copied()) {
            return Some(found);
        }
        let global: Vec<SymbolKey> = self
            .names
            .solution
            .get(name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|key| return self.is_kind(*key, SymbolKind::NamedType))
            .collect();
        return unique(&global);
    }

    fn member_named(&self, owner: SymbolKey, name: &str, kind: Option<SymbolKind>) -> Option<SymbolKey> {
        let candidates = self.names.members.get(&owner)?.get(name)?;
        return candidates.iter().copied().find(|key| return kind.is_none_or(|kind| return self.is_kind(*key, kind)));
    }

    /// `owner` followed by its base types, nearest first.
    fn base_chain(&self, owner: SymbolKey) -> Vec<SymbolKey> {
        let mut chain = vec![owner];
        let mut current = owner;
        while let Some(base) = self.table.get(current).and_then(|data| return data.base_type) {
            if chain.contains(&base) || chain.len() > 32 {
                break;
            }
            chain.push(base);
            current = base;
        }
        return chain;
    }

    /// Every interface `owner` or one of its bases implements, transitively.
    fn interface_closure(&self, owner: SymbolKey) -> Vec<SymbolKey> {
        let mut pending: Vec<SymbolKey> = self
            .base_chain(owner)
            .into_iter()
            .filter_map(|ty| return self.table.get(ty))
            .flat_map(|data| return data.interfaces.iter().copied())
            .collect();
        let mut seen: Vec<SymbolKey> = Vec::new();
        while let Some(interface) = pending.pop() {
            if seen.contains(&interface) || interface == owner {
                continue;
            }
            seen.push(interface);
            if let Some(data) = self.table.get(interface) {
                pending.extend(data.interfaces.iter().copied());
            }
        }
        return seen;
    }

    /// A member of `owner`, its bases, or its interfaces.
    fn member_in_hierarchy(&self, owner: SymbolKey, name: &str) -> Option<SymbolKey> {
        let mut hierarchy = self.base_chain(owner);
        hierarchy.extend(self.interface_closure(owner));
        return hierarchy.into_iter().find_map(|ty| return self.member_named(ty, name, None));
    }
}

/// Per-file lookup tables produced while building symbols.
#[derive(Debug, Default)]
struct FileSymbols {
    /// Declaring node to symbol.
    declared: Vec<(NodeId, SymbolKey)>,
    /// Locals, parameters, type parameters and local functions, with the
    /// range each is visible in.
    locals: Vec<(String, TextRange, SymbolKey)>,
    namespace: Option<SymbolKey>,
    /// Type bodies and impl blocks.
    types: Vec<(TextRange, SymbolKey)>,
}

impl FileSymbols {
    /// Innermost local named `name` visible at `offset`.
    fn local(&self, name: &str, offset: u32) -> Option<SymbolKey> {
        return self
            .locals
            .iter()
            .filter(|(local, range, _)| return local == name && range.contains(offset))
            .min_by_key(|(_, range, _)| return range.len())
            .map(|(_, _, key)| return *key);
    }

    /// Innermost type body or impl block containing `offset`.
    fn enclosing_type(&self, offset: u32) -> Option<SymbolKey> {
        return self
            .types
            .iter()
            .filter(|(range, _)| return range.contains(offset))
            .min_by_key(|(range, _)| return range.len())
            .map(|(_, key)| return *key);
    }
}

/// Base names waiting for every project's types to exist.
struct PendingBases {
    bases: Vec<String>,
    key: SymbolKey,
    namespace: SymbolKey,
    project: usize,
}

/// A method declared in an `impl` of a named trait.
struct PendingImpl {
    key: SymbolKey,
    namespace: SymbolKey,
    project: usize,
    trait_name: String,
}

/// Builds the solution's symbol table project by project.
struct SymbolBuilder {
    global: SymbolKey,
    implementations: Vec<PendingImpl>,
    inheritance: Vec<PendingBases>,
    names: Names,
    namespaces: HashMap<Vec<String>, SymbolKey>,
    table: SymbolTable,
}

impl SymbolBuilder {
    fn new() -> Result<Self, Error> {
        let mut table = SymbolTable::new();
        let global = table.push(SymbolData::new(SymbolKind::Namespace, ""))?;
        return Ok(Self {
            global,
            implementations: Vec::new(),
            inheritance: Vec::new(),
            names: Names::default(),
            namespaces: HashMap::new(),
            table,
        });
    }

    const fn lookup(&self) -> Lookup<'_> {
        return Lookup { names: &self.names, table: &self.table };
    }

    fn namespace(&mut self, path: &[String], assembly: &str) -> Result<SymbolKey, Error> {
        let mut current = self.global;
        for depth in 1..=path.len() {
            let prefix = path.get(..depth).unwrap_or_default().to_vec();
            current = match self.namespaces.get(&prefix) {
                Some(key) => *key,
                None => {
                    let mut data = SymbolData::new(SymbolKind::Namespace, prefix.last().map_or("", String::as_str));
                    data.accessibility = Accessibility::Public;
                    data.assembly = Some(assembly.to_string());
                    data.containing = Some(current);
                    let key = self.table.push(data)?;
                    self.namespaces.insert(prefix, key);
                    key
                },
            };
        }
        return Ok(current);
    }

    fn register_name(&mut self, project: usize, container: SymbolKey, name: &str, key: SymbolKey) {
        if self.lookup().is_kind(container, SymbolKind::Namespace) {
            if let Some(names) = self.names.projects.get_mut(project) {
                names.entry(name.to_string()).or_default().push(key);
            }
            self.names.solution.entry(name.to_string()).or_default().push(key);
        } else {
            self.names.members.entry(container).or_default().entry(name.to_string()).or_default().push(key);
            if let Some(names) = self.names.project_members.get_mut(project) {
                names.entry(name.to_string()).or_default().push(key);
            }
        }
    }

    fn add_project(&mut self, project: usize, assembly: &str, files: &[Result<LoweredFile, FailedFile>]) -> Result<Vec<FileSymbols>, Error> {
        self.names.projects.push(HashMap::new());
        self.names.project_members.push(HashMap::new());
        let mut out: Vec<FileSymbols> = files.iter().map(|_| return FileSymbols::default()).collect();
        let mut keys: Vec<Vec<Option<SymbolKey>>> = files
            .iter()
            .map(|file| return vec![None; file.as_ref().map_or(0, |file| return file.declarations.len())])
            .collect();

        // Types first, so impl blocks and receivers in any file find them.
        for ((file, symbols), file_keys) in files.iter().zip(&mut out).zip(&mut keys) {
            let Ok(file) = file else {
                continue;
            };
            let namespace = self.namespace(&file.namespace, assembly)?;
            symbols.namespace = Some(namespace);
            self.add_types(project, assembly, file, namespace, file_keys)?;
        }
        for ((file, symbols), file_keys) in files.iter().zip(&mut out).zip(&mut keys) {
            if let Ok(file) = file {
                self.add_members(project, assembly, file, symbols, file_keys)?;
            }
        }
        return Ok(out);
    }

    fn add_types(&mut self, project: usize, assembly: &str, file: &LoweredFile, namespace: SymbolKey, keys: &mut [Option<SymbolKey>]) -> Result<(), Error> {
        for (position, declaration) in file.declarations.iter().enumerate() {
            if declaration.kind != SymbolKind::NamedType {
                continue;
            }
            let container = match declaration.container {
                Container::Site(owner) => keys.get(owner).copied().flatten().unwrap_or(namespace),
                Container::File | Container::TypeNamed(_) => namespace,
            };
            let key = self.declare_type(project, assembly, &file.path, container, declaration)?;
            if let Some(slot) = keys.get_mut(position) {
                *slot = Some(key);
            }
            if !declaration.bases.is_empty() {
                self.inheritance.push(PendingBases { bases: declaration.bases.clone(), key, namespace, project });
            }
        }
        return Ok(());
    }

    /// Declare a type, merging with an existing declaration of the same
    /// name and kind in the same container into a partial type.
    fn declare_type(&mut self, project: usize, assembly: &str, path: &str, container: SymbolKey, declaration: &Declaration) -> Result<SymbolKey, Error> {
        let location = SourceLocation { document: path.to_string(), span: declaration.span };
        let scope = if self.lookup().is_kind(container, SymbolKind::Namespace) {
            self.names.projects.get(project)
        } else {
            self.names.members.get(&container)
        };
        let existing = scope.and_then(|names| return names.get(&declaration.name)).and_then(|candidates| {
            return candidates.iter().copied().find(|candidate| {
                return self.table.get(*candidate).is_some_and(|data| {
                    return data.kind == SymbolKind::NamedType && data.containing == Some(container) && data.type_kind == declaration.type_kind;
                });
            });
        });
        if let Some(key) = existing {
            if let Some(data) = self.table.get_mut(key) {
                data.locations.push(location);
            }
            return Ok(key);
        }

        let mut data = SymbolData::new(SymbolKind::NamedType, &declaration.name);
        data.accessibility = declaration.accessibility;
        data.assembly = Some(assembly.to_string());
        data.containing = Some(container);
        data.locations.push(location);
        data.type_kind = declaration.type_kind;
        let key = self.table.push(data)?;
        self.register_name(project, container, &declaration.name, key);
        return Ok(key);
    }

    fn add_members(&mut self, project: usize, assembly: &str, file: &LoweredFile, symbols: &mut FileSymbols, keys: &mut [Option<SymbolKey>]) -> Result<(), Error> {
        let namespace = symbols.namespace.unwrap_or(self.global);
        for (position, declaration) in file.declarations.iter().enumerate() {
            if declaration.kind == SymbolKind::NamedType {
                continue;
            }
            let container = match &declaration.container {
                Container::File => namespace,
                Container::Site(owner) => keys.get(*owner).copied().flatten().unwrap_or(namespace),
                Container::TypeNamed(name) => self.lookup().find_type(project, name, Some(namespace)).unwrap_or(namespace),
            };
            let key = self.declare_member(assembly, &file.path, container, declaration)?;
            if let Some(slot) = keys.get_mut(position) {
                *slot = Some(key);
            }

            let is_local_function = declaration.method_kind == Some(MethodKind::LocalFunction);
            if is_local_function || matches!(declaration.kind, SymbolKind::Local | SymbolKind::Parameter | SymbolKind::TypeParameter) {
                symbols.locals.push((declaration.name.clone(), declaration.scope, key));
            } else {
                self.register_name(project, container, &declaration.name, key);
            }
            if let Some(trait_name) = &declaration.implements {
                self.implementations.push(PendingImpl { key, namespace, project, trait_name: trait_name.clone() });
            }
        }

        for (declaration, key) in file.declarations.iter().zip(keys.iter()) {
            let Some(key) = key else {
                continue;
            };
            symbols.declared.push((declaration.name_node, *key));
            if let Some(owner) = declaration.owner_node {
                symbols.declared.push((owner, *key));
                symbols.types.push((declaration.scope, *key));
            }
        }
        for block in &file.impls {
            if let Some(key) = self.lookup().find_type(project, &block.type_name, Some(namespace)) {
                symbols.declared.push((block.node, key));
                symbols.types.push((block.range, key));
            }
        }
        return Ok(());
    }

    fn declare_member(&mut self, assembly: &str, path: &str, container: SymbolKey, declaration: &Declaration) -> Result<SymbolKey, Error> {
        let mut data = SymbolData::new(declaration.kind, &declaration.name);
        data.accessibility = declaration.accessibility;
        data.assembly = Some(assembly.to_string());
        data.containing = Some(container);
        data.is_const = declaration.is_const;
        data.is_static = declaration.is_static;
        data.locations.push(SourceLocation { document: path.to_string(), span: declaration.span });
        data.method_kind = declaration.method_kind;
        let key = self.table.push(data)?;

        if let Some(owner) = self.table.get_mut(container) {
            match declaration.kind {
                SymbolKind::Parameter if owner.kind == SymbolKind::Method => owner.parameters.push(key),
                SymbolKind::TypeParameter => owner.type_parameters.push(key),
                _ => {},
            }
        }
        return Ok(key);
    }

    /// Resolve base names and relate members to what they override or implement.
    fn link_inheritance(&mut self) {
        for pending in std::mem::take(&mut self.inheritance) {
            for base_name in &pending.bases {
                let Some(base) = self.lookup().find_type(pending.project, base_name, Some(pending.namespace)) else {
                    continue;
                };
                let base_is_interface = self.table.get(base).is_some_and(|data| return data.type_kind == Some(TypeKind::Interface));
                let Some(data) = self.table.get_mut(pending.key) else {
                    continue;
                };
                if base == pending.key {
                    continue;
                }
                if base_is_interface || data.type_kind == Some(TypeKind::Interface) || data.base_type.is_some() {
                    if !data.interfaces.contains(&base) {
                        data.interfaces.push(base);
                    }
                } else {
                    data.base_type = Some(base);
                }
            }
        }

        for pending in std::mem::take(&mut self.implementations) {
            let lookup = self.lookup();
            let Some(implemented) = lookup.find_type(pending.project, &pending.trait_name, Some(pending.namespace)) else {
                continue;
            };
            let Some(method) = self.table.get(pending.key) else {
                continue;
            };
            let target = lookup.member_named(implemented, &method.name, Some(SymbolKind::Method));
            let owner = method.containing;
            if let Some(target) = target
                && let Some(data) = self.table.get_mut(pending.key)
                && !data.implemented_interface_members.contains(&target)
            {
                data.implemented_interface_members.push(target);
            }
            if let Some(owner) = owner
                && let Some(data) = self.table.get_mut(owner)
                && data.kind == SymbolKind::NamedType
                && !data.interfaces.contains(&implemented)
            {
                data.interfaces.push(implemented);
            }
        }
        self.link_members();
    }

    fn link_members(&mut self) {
        let types: Vec<SymbolKey> = self
            .table
            .iter()
            .filter(|(_, data)| return data.kind == SymbolKind::NamedType && (data.base_type.is_some() || !data.interfaces.is_empty()))
            .map(|(key, _)| return key)
            .collect();

        for owner in types {
            let lookup = self.lookup();
            let methods: Vec<(SymbolKey, String)> = lookup
                .names
                .members
                .get(&owner)
                .into_iter()
                .flat_map(|members| return members.iter())
                .flat_map(|(name, keys)| return keys.iter().map(move |key| return (*key, name.clone())))
                .filter(|(key, _)| {
                    return lookup.table.get(*key).is_some_and(|data| return data.kind == SymbolKind::Method && !data.is_constructor());
                })
                .collect();
            let ancestors: Vec<SymbolKey> = lookup.base_chain(owner).into_iter().skip(1).collect();
            let interfaces = lookup.interface_closure(owner);

            let links: Vec<(SymbolKey, Option<SymbolKey>, Vec<SymbolKey>)> = methods
                .into_iter()
                .map(|(method, name)| {
                    let overridden = ancestors.iter().find_map(|ancestor| return lookup.member_named(*ancestor, &name, Some(SymbolKind::Method)));
                    let implemented = interfaces
                        .iter()
                        .filter_map(|interface| return lookup.member_named(*interface, &name, Some(SymbolKind::Method)))
                        .collect();
                    return (method, overridden, implemented);
                })
                .collect();

            for (method, overridden, implemented) in links {
                let Some(data) = self.table.get_mut(method) else {
                    continue;
                };
                if data.overridden.is_none() {
                    data.overridden = overridden;
                }
                for target in implemented {
                    if !data.implemented_interface_members.contains(&target) {
                        data.implemented_interface_members.push(target);
                    }
                }
            }
        }
    }
}

// ── Binding ───────────────────────────────────────────────────────────

/// Raw classification of an identifier naming `data`.
fn classification_of(table: &SymbolTable, data: &SymbolData) -> &'static str {
    let in_enum = || {
        return data
            .containing
            .and_then(|container| return table.get(container))
            .is_some_and(|container| return container.type_kind == Some(TypeKind::Enum));
    };
    return match data.kind {
        SymbolKind::Alias | SymbolKind::RangeVariable => "identifier",
        SymbolKind::Event => "event name",
        SymbolKind::Field if in_enum() => "enum member name",
        SymbolKind::Field if data.is_const => "constant name",
        SymbolKind::Field => "field name",
        SymbolKind::Label => "label name",
        SymbolKind::Local => "local name",
        SymbolKind::Method => "method name",
        SymbolKind::NamedType => match data.type_kind {
            Some(TypeKind::Delegate) => "delegate name",
            Some(TypeKind::Enum) => "enum name",
            Some(TypeKind::Interface) => "interface name",
            Some(TypeKind::Module) => "module name",
            Some(TypeKind::Struct) => "struct name",
            Some(TypeKind::Class) | None => "class name",
        },
        SymbolKind::Namespace => "namespace name",
        SymbolKind::Parameter => "parameter name",
        SymbolKind::Property => "property name",
        SymbolKind::TypeParameter => "type parameter name",
    };
}

/// Binds the identifiers of one project's files.
struct Binder<'a> {
    lookup: Lookup<'a>,
    project: usize,
}

impl Binder<'_> {
    fn bind(&self, file: LoweredFile, symbols: &FileSymbols) -> HeuristicDocument {
        let LoweredFile { identifiers, path, mut spans, text, tree, .. } = file;
        let declared: HashMap<NodeId, SymbolKey> = symbols.declared.iter().copied().collect();
        let mut bound: HashMap<NodeId, SymbolKey> = HashMap::new();

        for name in identifiers {
            let Some(span) = tree.span(name) else {
                continue;
            };
            let key = match declared.get(&name) {
                Some(key) => Some(*key),
                None => {
                    let found = self.resolve(&tree, &text, &path, symbols, name);
                    if let Some(key) = found {
                        bound.insert(name, key);
                        let token = tree.children(name).first().copied();
                        if let Some(bindable) = token.and_then(|token| return GenericSyntaxFacts.bindable_parent(&tree, token)) {
                            bound.insert(bindable, key);
                        }
                    }
                    found
                },
            };
            let classification = key
                .and_then(|key| return self.lookup.table.get(key))
                .map_or("identifier", |data| return classification_of(self.lookup.table, data));
            spans.push(RawSpan { classification: classification.to_string(), span });
        }

        let prepared = PreparedDocument { bound, declared, spans, text, tree };
        return HeuristicDocument { path, prepared: Prepared::Ready(prepared) };
    }

    fn resolve(&self, tree: &SyntaxTree, text: &str, path: &str, symbols: &FileSymbols, name: NodeId) -> Option<SymbolKey> {
        let offset = tree.span(name)?.start;
        let word = tree.text(text, name);

        if let Some(parent) = tree.parent(name)
            && let Some(kind @ (SyntaxKind::MemberAccess | SyntaxKind::QualifiedName)) = tree.kind(parent)
            && let [receiver, .., last] = tree.children(parent)
            && *last == name
        {
            let member = self.resolve_member(tree, text, symbols, *receiver, word, offset);
            if kind == SyntaxKind::MemberAccess || member.is_some() {
                return member;
            }
            return self.resolve_global(word, path, symbols.namespace);
        }
        if word == "Self" {
            return symbols.enclosing_type(offset);
        }
        if let Some(local) = symbols.local(word, offset) {
            return Some(local);
        }
        return self.resolve_global(word, path, symbols.namespace);
    }

    /// `receiver.word` or `receiver::word`.
    fn resolve_member(&self, tree: &SyntaxTree, text: &str, symbols: &FileSymbols, receiver: NodeId, word: &str, offset: u32) -> Option<SymbolKey> {
        let receiver_text = tree.text(text, receiver).trim();
        let owner = if matches!(receiver_text, "Self" | "cls" | "self" | "this") {
            symbols.enclosing_type(offset)
        } else if tree.kind(receiver) == Some(SyntaxKind::Name) && symbols.local(receiver_text, offset).is_none() {
            self.lookup.find_type(self.project, receiver_text, symbols.namespace)
        } else {
            None
        };
        if let Some(owner) = owner
            && let Some(member) = self.lookup.member_in_hierarchy(owner, word)
        {
            return Some(member);
        }
        let candidates = self.lookup.names.project_members.get(self.project)?.get(word)?;
        return unique(candidates);
    }

    /// The file, then the namespace, then a project-unique name, then a
    /// solution-unique name.
    fn resolve_global(&self, word: &str, path: &str, namespace: Option<SymbolKey>) -> Option<SymbolKey> {
        let table = self.lookup.table;
        if let Some(candidates) = self.lookup.names.projects.get(self.project).and_then(|names| return names.get(word)) {
            let in_file = candidates.iter().copied().find(|key| {
                return table.get(*key).is_some_and(|data| return data.locations.iter().any(|location| return location.document == path));
            });
            let in_namespace = || {
                return candidates
                    .iter()
                    .copied()
                    .find(|key| return namespace.is_some() && table.get(*key).is_some_and(|data| return data.containing == namespace));
            };
            return in_file.or_else(in_namespace).or_else(|| return unique(candidates));
        }
        return unique(self.lookup.names.solution.get(word)?);
    }
}

// ── Documents ─────────────────────────────────────────────────────────

/// Analysis of one file, ready for a worker to load.
#[derive(Debug, Clone)]
struct PreparedDocument {
    bound: HashMap<NodeId, SymbolKey>,
    declared: HashMap<NodeId, SymbolKey>,
    spans: Vec<RawSpan>,
    text: String,
    tree: SyntaxTree,
}

#[derive(Debug)]
enum Prepared {
    Failed(FailedFile),
    Ready(PreparedDocument),
}

/// A document of the tree-sitter frontend.
#[derive(Debug)]
struct HeuristicDocument {
    path: String,
    prepared: Prepared,
}

impl DocumentSource for HeuristicDocument {
    fn path(&self) -> &str {
        return &self.path;
    }

    fn load(&self) -> Result<AnalyzedDocument, Error> {
        return match &self.prepared {
            Prepared::Failed(failed) => Err(Error::ParseFailed { file: failed.file.clone(), reason: failed.reason.clone() }),
            Prepared::Ready(document) => Ok(AnalyzedDocument {
                semantics: Some(Box::new(SnapshotSemantics::new(document.declared.clone(), document.bound.clone()))),
                spans: document.spans.clone(),
                text: document.text.clone(),
                tree: document.tree.clone(),
            }),
        };
    }

    fn raw_text(&self) -> Option<String> {
        return match &self.prepared {
            Prepared::Failed(failed) => failed.text.clone(),
            Prepared::Ready(document) => Some(document.text.clone()),
        };
    }
}

/// Discover, parse and bind every project under `root`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `root` is not a directory, or
/// `Error::SymbolTableFull` if the tree declares more symbols than keys exist.
/// Files that cannot be read or parsed never fail the run; their documents
/// fail to load.
pub fn load_solution(root: &Path, config: &Config) -> Result<Solution, Error> {
    let plans = discover(root, config)?;
    let lowered: Vec<Vec<Result<LoweredFile, FailedFile>>> = plans
        .iter()
        .map(|plan| return plan.files.par_iter().map(|file| return lower_file(plan, file)).collect())
        .collect();
    let file_count: usize = lowered.iter().map(Vec::len).sum();
    tracing::info!(projects = plans.len(), files = file_count, root = %root.display(), "parsed source tree");

    let mut builder = SymbolBuilder::new()?;
    let file_symbols: Vec<Vec<FileSymbols>> = plans
        .iter()
        .zip(&lowered)
        .enumerate()
        .map(|(index, (plan, files))| return builder.add_project(index, &plan.assembly_name, files))
        .collect::<Result<_, _>>()?;
    builder.link_inheritance();
    let SymbolBuilder { names, table, .. } = builder;

    let projects = plans
        .into_iter()
        .zip(lowered)
        .zip(file_symbols)
        .enumerate()
        .map(|(index, ((plan, files), symbols))| {
            let binder = Binder { lookup: Lookup { names: &names, table: &table }, project: index };
            let documents: Vec<Box<dyn DocumentSource>> = files
                .into_par_iter()
                .zip(symbols)
                .map(|(file, symbols)| {
                    let document = match file {
                        Ok(file) => binder.bind(file, &symbols),
                        Err(failed) => HeuristicDocument { path: failed.path.clone(), prepared: Prepared::Failed(failed) },
                    };
                    return Box::new(document) as Box<dyn DocumentSource>;
                })
                .collect();
            return Project {
                assembly_name: plan.assembly_name,
                documents,
                language: plan.language,
                project_path: plan.project_path,
                references: plan.references,
                semantic_facts: Arc::new(GenericSemanticFacts),
                syntax_facts: Arc::new(GenericSyntaxFacts),
            };
        })
        .collect();

    return Ok(Solution { projects, symbols: Arc::new(table), type_forwards: Vec::new() });
}
