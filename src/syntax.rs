//! Language-neutral syntax tree shared by all frontends.
//!
//! Nodes live in an arena indexed by `NodeId`. Token leaves carry one of the
//! `*Token` kinds; interior nodes carry the structural kinds the resolver and
//! the predicate services care about, everything else is `Other`.

use serde::{Deserialize, Serialize};

use crate::types::TextRange;

/// Index of a node in its `SyntaxTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(
    /// Position in the arena.
    pub u32,
);

/// Shared node vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxKind {
    // ── Tokens ──
    /// Comment trivia kept as a token.
    CommentToken,
    /// Identifier.
    IdentifierToken,
    /// Keyword, including contextual keywords such as `partial`.
    KeywordToken,
    /// String, character, or numeric literal.
    LiteralToken,
    /// Operator such as `=` or `++`.
    OperatorToken,
    /// Punctuation such as `[`, `(`, `,`.
    PunctuationToken,

    // ── Nodes ──
    /// `new T[...]` / `New T(...)`.
    ArrayCreation,
    /// `{ ... }` initializer of an array creation.
    ArrayInitializer,
    /// `[size, ...]` of an array creation.
    ArrayRankSpecifier,
    /// `target = value` and compound assignments.
    Assignment,
    /// Base list of a type declaration.
    BaseList,
    /// One entry of a base list.
    BaseType,
    /// Root of a document.
    CompilationUnit,
    /// `receiver[index]`.
    ElementAccess,
    /// `x++`, `--x`.
    Increment,
    /// Call expression.
    Invocation,
    /// `receiver.member`.
    MemberAccess,
    /// Simple name wrapping one identifier token.
    Name,
    /// `new T(...)`.
    ObjectCreation,
    /// Parameter declaration.
    Parameter,
    /// `A.B` in type or namespace position.
    QualifiedName,
    /// `ref x` / `out x` argument.
    RefArgument,
    /// Class, struct, interface, enum, or record declaration.
    TypeDeclaration,
    /// Any node the core does not need to tell apart.
    #[serde(other)]
    Other,
}

impl SyntaxKind {
    /// Whether this kind is a leaf token.
    pub const fn is_token(self) -> bool {
        return matches!(
            self,
            SyntaxKind::CommentToken
                | SyntaxKind::IdentifierToken
                | SyntaxKind::KeywordToken
                | SyntaxKind::LiteralToken
                | SyntaxKind::OperatorToken
                | SyntaxKind::PunctuationToken
        );
    }
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Children in source order.
    pub children: Vec<NodeId>,
    /// Node kind.
    pub kind: SyntaxKind,
    /// Parent node; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Byte span in the document text.
    pub span: TextRange,
}

/// Serialized form of one node: parents always precede their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    /// Node kind.
    pub kind: SyntaxKind,
    /// Index of the parent in the flat list; absent for the root.
    #[serde(default)]
    pub parent: Option<u32>,
    /// Byte span in the document text.
    pub span: TextRange,
}

/// Arena syntax tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FlatNode>", into = "Vec<FlatNode>")]
pub struct SyntaxTree {
    /// Nodes indexed by `NodeId`.
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// A tree holding only a root of `kind` over `span`.
    pub fn new(kind: SyntaxKind, span: TextRange) -> Self {
        return Self {
            nodes: vec![SyntaxNode { children: Vec::new(), kind, parent: None, span }],
        };
    }

    /// The root node.
    pub const fn root(&self) -> NodeId {
        return NodeId(0);
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        let index = usize::try_from(id.0).ok()?;
        return self.nodes.get(index);
    }

    /// Node kind, `None` for an unknown id.
    pub fn kind(&self, id: NodeId) -> Option<SyntaxKind> {
        return self.node(id).map(|node| return node.kind);
    }

    /// Node span, `None` for an unknown id.
    pub fn span(&self, id: NodeId) -> Option<TextRange> {
        return self.node(id).map(|node| return node.span);
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        return self.node(id)?.parent;
    }

    /// Children of a node in source order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        return self.node(id).map_or(&[], |node| return node.children.as_slice());
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        return std::iter::successors(self.parent(id), move |current| return self.parent(*current));
    }

    /// Source text covered by a node.
    pub fn text<'src>(&self, source: &'src str, id: NodeId) -> &'src str {
        return self
            .span(id)
            .and_then(|span| return source.get(span.as_usize()))
            .unwrap_or("");
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    /// Whether the tree has no nodes (never true for a constructed tree).
    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    /// Append a child under `parent` and return its id. Children must be
    /// pushed in source order.
    ///
    /// Returns `None` if `parent` is not in the tree.
    pub fn push_node(&mut self, parent: NodeId, kind: SyntaxKind, span: TextRange) -> Option<NodeId> {
        let parent_index = usize::try_from(parent.0).ok()?;
        if parent_index >= self.nodes.len() {
            return None;
        }
        let id = NodeId(u32::try_from(self.nodes.len()).ok()?);
        self.nodes.push(SyntaxNode { children: Vec::new(), kind, parent: Some(parent), span });
        self.nodes.get_mut(parent_index)?.children.push(id);
        return Some(id);
    }

    /// The innermost token whose span contains `offset`.
    ///
    /// Descends from the root through the child covering `offset`; returns
    /// `None` when the deepest covering node is not a token.
    pub fn find_token(&self, offset: u32) -> Option<NodeId> {
        let mut current = self.root();
        if !self.span(current)?.contains(offset) {
            return None;
        }
        loop {
            let next = self
                .children(current)
                .iter()
                .copied()
                .find(|child| return self.span(*child).is_some_and(|span| return span.contains(offset)));
            match next {
                Some(child) => current = child,
                None => break,
            }
        }
        return self.kind(current).filter(|kind| return kind.is_token()).map(|_| return current);
    }
}

impl TryFrom<Vec<FlatNode>> for SyntaxTree {
    type Error = String;

    fn try_from(flat: Vec<FlatNode>) -> Result<Self, Self::Error> {
        let mut nodes: Vec<SyntaxNode> = Vec::with_capacity(flat.len());
        for (index, item) in flat.into_iter().enumerate() {
            let parent = match (index, item.parent) {
                (0, None) => None,
                (0, Some(_)) => return Err("root node must not have a parent".to_string()),
                (_, None) => return Err(format!("node {index} has no parent")),
                (_, Some(parent)) => {
                    let parent_index = usize::try_from(parent).map_err(|err| return err.to_string())?;
                    if parent_index >= index {
                        return Err(format!("node {index} appears before its parent {parent}"));
                    }
                    let own = u32::try_from(index).map_err(|err| return err.to_string())?;
                    if let Some(parent_node) = nodes.get_mut(parent_index) {
                        parent_node.children.push(NodeId(own));
                    }
                    Some(NodeId(parent))
                },
            };
            nodes.push(SyntaxNode { children: Vec::new(), kind: item.kind, parent, span: item.span });
        }
        if nodes.is_empty() {
            return Err("syntax tree has no root".to_string());
        }
        return Ok(Self { nodes });
    }
}

impl From<SyntaxTree> for Vec<FlatNode> {
    fn from(tree: SyntaxTree) -> Self {
        return tree
            .nodes
            .into_iter()
            .map(|node| {
                return FlatNode { kind: node.kind, parent: node.parent.map(|parent| return parent.0), span: node.span };
            })
            .collect();
    }
}
