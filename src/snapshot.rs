//! JSON semantic snapshot frontend.
//!
//! Any compiler frontend can feed the indexer by exporting a snapshot: the
//! solution's symbol table, type forwards, and for every document its text,
//! flat syntax tree, classification spans, and declaration/binding maps.
//! Documents are validated when a worker loads them, so one inconsistent
//! document degrades alone instead of failing the run.

use std::collections::HashMap;
use std::path::{Component, Path};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::frontend::{AnalyzedDocument, DocumentSource, GenericSemanticFacts, GenericSyntaxFacts, Language, Project, RawSpan, SemanticModel, Solution};
use crate::symbols::{SymbolKey, SymbolTable, TypeForward};
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::TextRange;

/// Whole-solution snapshot as written by a frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    /// Projects in load order.
    pub projects: Vec<ProjectSnapshot>,
    /// Solution-wide symbol arena.
    #[serde(default)]
    pub symbols: SymbolTable,
    /// Type forwards declared by referenced assemblies.
    #[serde(default)]
    pub type_forwards: Vec<TypeForward>,
}

/// One project of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Assembly name; must be unique in the solution.
    pub assembly_name: String,
    /// Documents of the project.
    #[serde(default)]
    pub documents: Vec<DocumentSnapshot>,
    /// Source language.
    pub language: Language,
    /// Path of the project file, if any.
    #[serde(default)]
    pub project_path: Option<String>,
    /// Names of referenced assemblies.
    #[serde(default)]
    pub references: Vec<String>,
}

/// One document of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// `(node, symbol)` pairs: the symbol each node binds to.
    #[serde(default)]
    pub bound: Vec<(NodeId, SymbolKey)>,
    /// `(node, symbol)` pairs: the symbol each node declares.
    #[serde(default)]
    pub declared: Vec<(NodeId, SymbolKey)>,
    /// Project-relative path with `/` separators.
    pub path: String,
    /// Raw classification spans.
    #[serde(default)]
    pub spans: Vec<RawSpan>,
    /// Full document text.
    pub text: String,
    /// Flat syntax tree; parents precede children.
    pub tree: SyntaxTree,
}

/// Map-backed semantic model of one snapshot document.
#[derive(Debug, Default)]
pub struct SnapshotSemantics {
    /// Bound symbol per node.
    bound: HashMap<NodeId, SymbolKey>,
    /// Declared symbol per node.
    declared: HashMap<NodeId, SymbolKey>,
}

impl SnapshotSemantics {
    /// A model over prebuilt declaration and binding maps.
    pub const fn new(declared: HashMap<NodeId, SymbolKey>, bound: HashMap<NodeId, SymbolKey>) -> Self {
        return Self { bound, declared };
    }
}

impl SemanticModel for SnapshotSemantics {
    fn declared_symbol(&self, node: NodeId) -> Option<SymbolKey> {
        return self.declared.get(&node).copied();
    }

    fn bound_symbol(&self, node: NodeId) -> Option<SymbolKey> {
        return self.bound.get(&node).copied();
    }
}

/// Lazily validated snapshot document.
struct SnapshotDocument {
    data: DocumentSnapshot,
    symbols: Arc<SymbolTable>,
}

impl DocumentSource for SnapshotDocument {
    fn path(&self) -> &str {
        return &self.data.path;
    }

    fn load(&self) -> Result<AnalyzedDocument, Error> {
        validate(&self.data, &self.symbols)?;
        let semantics = SnapshotSemantics {
            bound: self.data.bound.iter().copied().collect(),
            declared: self.data.declared.iter().copied().collect(),
        };
        return Ok(AnalyzedDocument {
            semantics: Some(Box::new(semantics)),
            spans: self.data.spans.clone(),
            text: self.data.text.clone(),
            tree: self.data.tree.clone(),
        });
    }

    fn raw_text(&self) -> Option<String> {
        return Some(self.data.text.clone());
    }
}

/// Whether `path` stays inside the folder it is joined onto: relative, with
/// no `..`, root, or prefix components.
fn is_contained(path: &str) -> bool {
    let mut components = Path::new(path).components().peekable();
    return components.peek().is_some() && components.all(|component| return matches!(component, Component::Normal(_)));
}

/// Check a document against its own text and the symbol table.
///
/// # Errors
///
/// Returns `Error::SnapshotInvalid` naming the first inconsistency found.
pub fn validate(document: &DocumentSnapshot, symbols: &SymbolTable) -> Result<(), Error> {
    let invalid = |reason: String| return Error::SnapshotInvalid { document: document.path.clone(), reason };
    let text = &document.text;
    if !is_contained(&document.path) {
        return Err(invalid("document path must be relative and stay inside its project".to_string()));
    }
    let in_text = |span: TextRange| {
        let range = span.as_usize();
        return text.is_char_boundary(range.start) && text.is_char_boundary(range.end) && range.end <= text.len();
    };

    for index in 0..document.tree.len() {
        let id = NodeId(u32::try_from(index).map_err(|_err| return invalid("too many nodes".to_string()))?);
        let span = document.tree.span(id).ok_or_else(|| return invalid(format!("node {index} missing")))?;
        if !in_text(span) {
            return Err(invalid(format!("node {index} span {}..{} is outside the text", span.start, span.end)));
        }
    }
    for raw in &document.spans {
        if !in_text(raw.span) {
            return Err(invalid(format!("classification `{}` at {}..{} is outside the text", raw.classification, raw.span.start, raw.span.end)));
        }
    }
    for (node, key) in document.declared.iter().chain(&document.bound) {
        if document.tree.node(*node).is_none() {
            return Err(invalid(format!("semantic map names node {} which is not in the tree", node.0)));
        }
        if !symbols.contains(*key) {
            return Err(invalid(format!("semantic map names symbol {} which is not in the table", key.0)));
        }
    }
    return Ok(());
}

impl SolutionSnapshot {
    /// Parse snapshot JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the text is not a valid snapshot, or
    /// `Error::SnapshotInvalid` if an assembly name or document path would
    /// write outside the output directory.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let snapshot: Self = serde_json::from_str(content)?;
        snapshot.check_output_paths()?;
        return Ok(snapshot);
    }

    /// Every assembly name must be one path segment and every document path
    /// must stay inside its assembly folder.
    fn check_output_paths(&self) -> Result<(), Error> {
        for project in &self.projects {
            let name = &project.assembly_name;
            if !is_contained(name) || Path::new(name).components().count() != 1 {
                return Err(Error::SnapshotInvalid {
                    document: project.project_path.clone().unwrap_or_else(|| return name.clone()),
                    reason: format!("assembly name `{name}` is not a single path segment"),
                });
            }
            if let Some(document) = project.documents.iter().find(|document| return !is_contained(&document.path)) {
                return Err(Error::SnapshotInvalid {
                    document: document.path.clone(),
                    reason: "document path must be relative and stay inside its project".to_string(),
                });
            }
        }
        return Ok(());
    }

    /// Read and parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, or `Error::Json`
    /// if it is not a valid snapshot.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|_err| return Error::FileNotFound { path: path.to_path_buf() })?;
        return Self::parse(&content);
    }

    /// Turn the snapshot into a solution whose documents load from memory.
    pub fn into_solution(self) -> Solution {
        let symbols = Arc::new(self.symbols);
        let projects = self
            .projects
            .into_iter()
            .map(|project| {
                let documents: Vec<Box<dyn DocumentSource>> = project
                    .documents
                    .into_iter()
                    .map(|data| return Box::new(SnapshotDocument { data, symbols: Arc::clone(&symbols) }) as Box<dyn DocumentSource>)
                    .collect();
                return Project {
                    assembly_name: project.assembly_name,
                    documents,
                    language: project.language,
                    project_path: project.project_path,
                    references: project.references,
                    semantic_facts: Arc::new(GenericSemanticFacts),
                    syntax_facts: Arc::new(GenericSyntaxFacts),
                };
            })
            .collect();
        return Solution { projects, symbols, type_forwards: self.type_forwards };
    }
}
