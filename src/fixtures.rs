//! Test-only builders for syntax trees and symbol tables.

use std::collections::HashMap;

use crate::frontend::{RawSpan, SemanticModel};
use crate::symbols::{Accessibility, MethodKind, SourceLocation, SymbolData, SymbolKey, SymbolKind, SymbolTable, TypeKind, TypeRef};
use crate::syntax::{FlatNode, NodeId, SyntaxKind, SyntaxTree};
use crate::types::TextRange;

// ── Syntax ────────────────────────────────────────────────────────────

/// Builds a document by appending text; every token appended also becomes
/// a leaf of the innermost open node.
pub struct TreeBuilder {
    nodes: Vec<FlatNode>,
    open: Vec<u32>,
    spans: Vec<RawSpan>,
    text: String,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let root = FlatNode { kind: SyntaxKind::CompilationUnit, parent: None, span: TextRange::new(0, 0) };
        return Self { nodes: vec![root], open: vec![0], spans: Vec::new(), text: String::new() };
    }

    fn offset(&self) -> u32 {
        return u32::try_from(self.text.len()).unwrap();
    }

    fn push(&mut self, kind: SyntaxKind, span: TextRange) -> NodeId {
        let parent = *self.open.last().unwrap();
        let id = u32::try_from(self.nodes.len()).unwrap();
        self.nodes.push(FlatNode { kind, parent: Some(parent), span });
        return NodeId(id);
    }

    /// Open a node of `kind` at the current offset.
    pub fn open(&mut self, kind: SyntaxKind) -> NodeId {
        let start = self.offset();
        let id = self.push(kind, TextRange::new(start, start));
        self.open.push(id.0);
        return id;
    }

    /// Close `id`, which must be the innermost open node.
    pub fn close(&mut self, id: NodeId) {
        assert_eq!(self.open.pop(), Some(id.0), "unbalanced close");
        let end = self.offset();
        let node = self.nodes.get_mut(usize::try_from(id.0).unwrap()).unwrap();
        node.span = TextRange::new(node.span.start, end);
    }

    /// Append a token with an optional raw classification.
    pub fn token(&mut self, kind: SyntaxKind, text: &str, classification: Option<&str>) -> NodeId {
        let start = self.offset();
        self.text.push_str(text);
        let span = TextRange::new(start, self.offset());
        if let Some(name) = classification {
            self.spans.push(RawSpan { classification: name.to_string(), span });
        }
        return self.push(kind, span);
    }

    /// Append an identifier wrapped in a `Name` node; returns the `Name`.
    pub fn name(&mut self, text: &str) -> NodeId {
        return self.name_as(text, "identifier");
    }

    /// Like `name`, with an explicit classification.
    pub fn name_as(&mut self, text: &str, classification: &str) -> NodeId {
        let name = self.open(SyntaxKind::Name);
        self.token(SyntaxKind::IdentifierToken, text, Some(classification));
        self.close(name);
        return name;
    }

    /// Append a bare identifier token without a `Name` wrapper.
    pub fn ident(&mut self, text: &str, classification: &str) -> NodeId {
        return self.token(SyntaxKind::IdentifierToken, text, Some(classification));
    }

    pub fn keyword(&mut self, text: &str) -> NodeId {
        return self.token(SyntaxKind::KeywordToken, text, Some("keyword"));
    }

    pub fn literal(&mut self, text: &str) -> NodeId {
        let classification = if text.starts_with(['"', '@', '\'']) { "string" } else { "number" };
        return self.token(SyntaxKind::LiteralToken, text, Some(classification));
    }

    pub fn punct(&mut self, text: &str) -> NodeId {
        return self.token(SyntaxKind::PunctuationToken, text, Some("punctuation"));
    }

    pub fn operator(&mut self, text: &str) -> NodeId {
        return self.token(SyntaxKind::OperatorToken, text, Some("operator"));
    }

    /// Append a single space (trivia, not a node).
    pub fn space(&mut self) {
        self.text.push(' ');
    }

    /// Append a newline (trivia, not a node).
    pub fn newline(&mut self) {
        self.text.push('\n');
    }

    pub fn finish(self) -> (SyntaxTree, String) {
        let (tree, text, _) = self.finish_with_spans();
        return (tree, text);
    }

    pub fn finish_with_spans(mut self) -> (SyntaxTree, String, Vec<RawSpan>) {
        assert_eq!(self.open.len(), 1, "unclosed nodes");
        let end = self.offset();
        if let Some(root) = self.nodes.first_mut() {
            root.span = TextRange::new(0, end);
        }
        let tree = SyntaxTree::try_from(self.nodes).unwrap();
        return (tree, self.text, self.spans);
    }
}

// ── Semantics ─────────────────────────────────────────────────────────

/// Map-backed semantic model.
#[derive(Default)]
pub struct MapSemantics {
    pub bound: HashMap<NodeId, SymbolKey>,
    pub declared: HashMap<NodeId, SymbolKey>,
}

impl SemanticModel for MapSemantics {
    fn declared_symbol(&self, node: NodeId) -> Option<SymbolKey> {
        return self.declared.get(&node).copied();
    }

    fn bound_symbol(&self, node: NodeId) -> Option<SymbolKey> {
        return self.bound.get(&node).copied();
    }
}

// ── Symbols ───────────────────────────────────────────────────────────

/// Symbol table builder rooted at a global namespace.
pub struct SymbolFixture {
    assembly: String,
    global: SymbolKey,
    table: SymbolTable,
}

impl SymbolFixture {
    pub fn new(assembly: &str) -> Self {
        let mut table = SymbolTable::new();
        let global = table.push(SymbolData::new(SymbolKind::Namespace, "")).unwrap();
        return Self { assembly: assembly.to_string(), global, table };
    }

    pub fn global(&self) -> SymbolKey {
        return self.global;
    }

    /// Push a symbol owned by the fixture's assembly.
    pub fn symbol(&mut self, kind: SymbolKind, name: &str, containing: SymbolKey) -> SymbolKey {
        let mut data = SymbolData::new(kind, name);
        data.containing = Some(containing);
        data.assembly = Some(self.assembly.clone());
        if !kind.is_document_local() && kind != SymbolKind::Namespace {
            data.accessibility = Accessibility::Public;
        }
        return self.table.push(data).unwrap();
    }

    pub fn namespace(&mut self, name: &str) -> SymbolKey {
        let global = self.global;
        return self.symbol(SymbolKind::Namespace, name, global);
    }

    pub fn type_in(&mut self, container: SymbolKey, name: &str, kind: TypeKind) -> SymbolKey {
        let key = self.symbol(SymbolKind::NamedType, name, container);
        self.with(key, |data| data.type_kind = Some(kind));
        return key;
    }

    pub fn method_in(&mut self, container: SymbolKey, name: &str, kind: Option<MethodKind>) -> SymbolKey {
        let key = self.symbol(SymbolKind::Method, name, container);
        self.with(key, |data| data.method_kind = Some(kind.unwrap_or(MethodKind::Ordinary)));
        return key;
    }

    pub fn member_in(&mut self, container: SymbolKey, kind: SymbolKind, name: &str) -> SymbolKey {
        return self.symbol(kind, name, container);
    }

    pub fn param_of(&mut self, method: SymbolKey, name: &str, ty: TypeRef) -> SymbolKey {
        let key = self.symbol(SymbolKind::Parameter, name, method);
        self.with(key, |data| data.ty = Some(ty));
        self.with(method, |data| data.parameters.push(key));
        return key;
    }

    pub fn type_parameter(&mut self, owner: SymbolKey, name: &str) -> SymbolKey {
        let key = self.symbol(SymbolKind::TypeParameter, name, owner);
        self.with(owner, |data| data.type_parameters.push(key));
        return key;
    }

    pub fn local(&mut self, owner: SymbolKey, name: &str) -> SymbolKey {
        return self.symbol(SymbolKind::Local, name, owner);
    }

    /// A type in another assembly, with no source locations.
    pub fn metadata_type(&mut self, namespace: &str, name: &str, assembly: &str) -> SymbolKey {
        let global = self.global;
        let mut ns = SymbolData::new(SymbolKind::Namespace, namespace);
        ns.containing = Some(global);
        ns.assembly = Some(assembly.to_string());
        let ns = self.table.push(ns).unwrap();
        let mut data = SymbolData::new(SymbolKind::NamedType, name);
        data.containing = Some(ns);
        data.assembly = Some(assembly.to_string());
        data.accessibility = Accessibility::Public;
        data.type_kind = Some(TypeKind::Struct);
        return self.table.push(data).unwrap();
    }

    /// A constructed symbol whose original definition is `definition`.
    pub fn constructed(&mut self, definition: SymbolKey) -> SymbolKey {
        let mut data = self.table.get(definition).unwrap().clone();
        data.original_definition = Some(definition);
        return self.table.push(data).unwrap();
    }

    pub fn set_accessibility(&mut self, key: SymbolKey, accessibility: Accessibility) {
        self.with(key, |data| data.accessibility = accessibility);
    }

    /// Add a source location.
    pub fn locate(&mut self, key: SymbolKey, document: &str, span: TextRange) {
        self.with(key, |data| data.locations.push(SourceLocation { document: document.to_string(), span }));
    }

    pub fn with(&mut self, key: SymbolKey, edit: impl FnOnce(&mut SymbolData)) {
        edit(self.table.get_mut(key).unwrap());
    }

    pub fn table(&self) -> SymbolTable {
        return self.table.clone();
    }
}
