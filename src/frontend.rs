//! Boundary between compiler frontends and the indexing core.
//!
//! A frontend yields projects whose documents load into text, a syntax tree,
//! raw classification spans and (optionally) a semantic model. The core
//! consumes nothing else.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::symbols::{SymbolKey, SymbolTable, TypeForward};
use crate::syntax::{NodeId, SyntaxKind, SyntaxTree};
use crate::types::TextRange;

/// Source language of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// C#.
    CSharp,
    /// Go.
    Go,
    /// Python.
    Python,
    /// Rust.
    Rust,
    /// TypeScript and JavaScript.
    TypeScript,
    /// Visual Basic.
    VisualBasic,
}

/// Classification span as produced by the frontend, before post-processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    /// Fine-grained classification name such as `class name` or `keyword`.
    pub classification: String,
    /// Byte span in the document text.
    pub span: TextRange,
}

/// Semantic queries over one document's syntax tree.
pub trait SemanticModel {
    /// Symbol declared by `node`, if `node` is a declaration.
    fn declared_symbol(&self, node: NodeId) -> Option<SymbolKey>;

    /// Symbol `node` binds to, if any.
    fn bound_symbol(&self, node: NodeId) -> Option<SymbolKey>;
}

/// Syntax-level predicate: which node to ask the semantic model about.
pub trait SyntaxFacts: Send + Sync {
    /// The node whose binding describes `token`.
    fn bindable_parent(&self, tree: &SyntaxTree, token: NodeId) -> Option<NodeId>;
}

/// Semantic-level predicate: whether an expression is assigned to.
pub trait SemanticFacts: Send + Sync {
    /// Whether `node` is the target of an assignment, increment, or by-ref argument.
    fn is_written_to(&self, tree: &SyntaxTree, node: NodeId) -> bool;
}

/// Everything the core needs about one loaded document.
pub struct AnalyzedDocument {
    /// Semantic model, absent when semantics are skipped or unavailable.
    pub semantics: Option<Box<dyn SemanticModel>>,
    /// Raw classification spans.
    pub spans: Vec<RawSpan>,
    /// Full document text.
    pub text: String,
    /// Syntax tree over `text`.
    pub tree: SyntaxTree,
}

impl fmt::Debug for AnalyzedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("AnalyzedDocument")
            .field("semantics", &self.semantics.is_some())
            .field("spans", &self.spans.len())
            .field("text_len", &self.text.len())
            .field("nodes", &self.tree.len())
            .finish();
    }
}

/// A document that can be loaded on demand by a worker.
pub trait DocumentSource: Send + Sync {
    /// Project-relative path with `/` separators.
    fn path(&self) -> &str;

    /// Load text, syntax, classification, and semantics.
    ///
    /// # Errors
    ///
    /// Returns the frontend's error; the document is then rendered unlinked.
    fn load(&self) -> Result<AnalyzedDocument, Error>;

    /// Document text without analysis, for the unlinked page written when
    /// `load` fails. `None` when even the text is unavailable.
    fn raw_text(&self) -> Option<String> {
        return None;
    }
}

/// One compilation unit of a solution.
pub struct Project {
    /// Assembly name; unique across the solution.
    pub assembly_name: String,
    /// Documents of the project.
    pub documents: Vec<Box<dyn DocumentSource>>,
    /// Source language.
    pub language: Language,
    /// Path of the project file, when one exists.
    pub project_path: Option<String>,
    /// Assemblies referenced by this project.
    pub references: Vec<String>,
    /// Write-context predicate.
    pub semantic_facts: Arc<dyn SemanticFacts>,
    /// Bindable-parent predicate.
    pub syntax_facts: Arc<dyn SyntaxFacts>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Project")
            .field("assembly_name", &self.assembly_name)
            .field("documents", &self.documents.len())
            .field("language", &self.language)
            .field("project_path", &self.project_path)
            .finish_non_exhaustive();
    }
}

/// All projects of one run plus the shared symbol arena.
#[derive(Debug)]
pub struct Solution {
    /// Projects in load order.
    pub projects: Vec<Project>,
    /// Shared symbol arena.
    pub symbols: Arc<SymbolTable>,
    /// Type forwards declared by any assembly in the solution.
    pub type_forwards: Vec<TypeForward>,
}

// ── Generic predicates ────────────────────────────────────────────────

/// `SyntaxFacts` over the shared node vocabulary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSyntaxFacts;

impl SyntaxFacts for GenericSyntaxFacts {
    fn bindable_parent(&self, tree: &SyntaxTree, token: NodeId) -> Option<NodeId> {
        let parent = tree.parent(token)?;
        let token_kind = tree.kind(token)?;

        if token_kind == SyntaxKind::PunctuationToken {
            return (tree.kind(parent)? == SyntaxKind::ElementAccess).then_some(parent);
        }
        if token_kind == SyntaxKind::KeywordToken {
            return Some(parent);
        }

        let mut current = if tree.kind(parent)? == SyntaxKind::Name { parent } else { token };
        // The right-most part of a dotted name binds as the whole name.
        while let Some(up) = tree.parent(current) {
            let up_kind = tree.kind(up)?;
            let is_last = tree.children(up).last() == Some(&current);
            if matches!(up_kind, SyntaxKind::QualifiedName | SyntaxKind::MemberAccess) && is_last {
                current = up;
            } else {
                break;
            }
        }

        // `new Foo(...)` binds to the constructor through the creation node.
        if let Some(up) = tree.parent(current)
            && tree.kind(up) == Some(SyntaxKind::ObjectCreation)
            && current != token
        {
            return Some(up);
        }
        return Some(current);
    }
}

/// `SemanticFacts` over the shared node vocabulary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSemanticFacts;

impl SemanticFacts for GenericSemanticFacts {
    fn is_written_to(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        let mut current = node;
        while let Some(up) = tree.parent(current) {
            let up_kind = tree.kind(up);
            let is_last = tree.children(up).last() == Some(&current);
            if matches!(up_kind, Some(SyntaxKind::MemberAccess | SyntaxKind::QualifiedName)) && is_last {
                current = up;
            } else if up_kind == Some(SyntaxKind::Name) {
                current = up;
            } else {
                break;
            }
        }

        let Some(parent) = tree.parent(current) else {
            return false;
        };
        return match tree.kind(parent) {
            Some(SyntaxKind::Assignment) => tree.children(parent).first() == Some(&current),
            Some(SyntaxKind::Increment | SyntaxKind::RefArgument) => true,
            _ => false,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TreeBuilder;

    #[test]
    fn dotted_name_binds_as_whole() {
        let mut builder = TreeBuilder::new();
        let access = builder.open(SyntaxKind::MemberAccess);
        builder.name("a");
        builder.punct(".");
        let member = builder.name("b");
        builder.close(access);
        let (tree, _) = builder.finish();

        let token = tree.children(member).first().copied().unwrap();
        assert_eq!(GenericSyntaxFacts.bindable_parent(&tree, token), Some(access));
    }

    #[test]
    fn qualifier_binds_alone() {
        let mut builder = TreeBuilder::new();
        let access = builder.open(SyntaxKind::MemberAccess);
        let receiver = builder.name("a");
        builder.punct(".");
        builder.name("b");
        builder.close(access);
        let (tree, _) = builder.finish();

        let token = tree.children(receiver).first().copied().unwrap();
        assert_eq!(GenericSyntaxFacts.bindable_parent(&tree, token), Some(receiver));
    }

    #[test]
    fn element_access_bracket_binds_to_indexer() {
        let mut builder = TreeBuilder::new();
        let access = builder.open(SyntaxKind::ElementAccess);
        builder.name("list");
        let bracket = builder.punct("[");
        builder.literal("0");
        builder.punct("]");
        builder.close(access);
        let (tree, _) = builder.finish();

        assert_eq!(GenericSyntaxFacts.bindable_parent(&tree, bracket), Some(access));
    }

    #[test]
    fn object_creation_type_binds_to_creation() {
        let mut builder = TreeBuilder::new();
        let creation = builder.open(SyntaxKind::ObjectCreation);
        builder.keyword("new");
        builder.space();
        let name = builder.name("Widget");
        builder.punct("(");
        builder.punct(")");
        builder.close(creation);
        let (tree, _) = builder.finish();

        let token = tree.children(name).first().copied().unwrap();
        assert_eq!(GenericSyntaxFacts.bindable_parent(&tree, token), Some(creation));
    }

    #[test]
    fn assignment_target_is_written() {
        let mut builder = TreeBuilder::new();
        let assign = builder.open(SyntaxKind::Assignment);
        let access = builder.open(SyntaxKind::MemberAccess);
        builder.name("this");
        builder.punct(".");
        let field = builder.name("count");
        builder.close(access);
        builder.space();
        builder.operator("=");
        builder.space();
        let value = builder.name("other");
        builder.close(assign);
        let (tree, _) = builder.finish();

        assert!(GenericSemanticFacts.is_written_to(&tree, access));
        assert!(GenericSemanticFacts.is_written_to(&tree, field));
        assert!(!GenericSemanticFacts.is_written_to(&tree, value));
    }

    #[test]
    fn increment_and_ref_are_written() {
        let mut builder = TreeBuilder::new();
        let increment = builder.open(SyntaxKind::Increment);
        let counter = builder.name("counter");
        builder.operator("++");
        builder.close(increment);
        builder.punct(";");
        let argument = builder.open(SyntaxKind::RefArgument);
        builder.keyword("ref");
        builder.space();
        let slot = builder.name("slot");
        builder.close(argument);
        let (tree, _) = builder.finish();

        assert!(GenericSemanticFacts.is_written_to(&tree, counter));
        assert!(GenericSemanticFacts.is_written_to(&tree, slot));
    }
}
