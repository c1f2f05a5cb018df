//! Reference and declaration resolution for one document.
//!
//! Every classified range of a document is fed through
//! `DocumentResolver::resolve_range`, which decides whether the range is a
//! declaration, a reference, a local highlight, or plain text. Side effects
//! (references, declarations, base-member maps) land in the project's
//! `ProjectAccumulator`; the returned `Link` is handed to the renderer.

use std::collections::{HashMap, HashSet};

use crate::accumulator::ProjectAccumulator;
use crate::diagnostics::FailureLog;
use crate::escape;
use crate::federation::Federation;
use crate::frontend::{AnalyzedDocument, Language, SemanticFacts, SemanticModel, SyntaxFacts};
use crate::identity;
use crate::symbols::{MethodKind, SymbolData, SymbolKey, SymbolKind, SymbolTable, TypeForward, TypeKind};
use crate::syntax::{NodeId, SyntaxKind, SyntaxTree};
use crate::types::{
    Classification, ClassifiedRange, GlyphInfo, Link, MemberTarget, ReferenceKind, ReferenceRecord, SymbolId, TextRange,
};

/// Pseudo-assembly collecting GUID literal usages.
pub const GUID_ASSEMBLY: &str = "GUID";

/// Pseudo-assembly and bucket collecting zero-length array allocations.
pub const EMPTY_ARRAY_ASSEMBLY: &str = "mscorlib";

/// Bucket id of zero-length array allocations.
pub const EMPTY_ARRAY_ID: &str = "EmptyArrayAllocation";

/// Non-identifier texts that still resolve to a symbol.
const RESOLVABLE_KEYWORDS: [&str; 6] = ["[", "base", "new", "partial", "this", "var"];

// ── Type forwarding ───────────────────────────────────────────────────

/// `(assembly, type)` → assembly the type was forwarded to.
#[derive(Debug, Clone, Default)]
pub struct ForwardingTable {
    /// Forward targets keyed by source assembly and qualified type name.
    forwards: HashMap<(String, String), String>,
}

impl ForwardingTable {
    /// Index a list of forwards. Later duplicates are ignored.
    pub fn new(forwards: &[TypeForward]) -> Self {
        let mut map = HashMap::with_capacity(forwards.len());
        for forward in forwards {
            map.entry((forward.from_assembly.clone(), forward.type_name.clone()))
                .or_insert_with(|| return forward.to_assembly.clone());
        }
        return Self { forwards: map };
    }

    /// Follow forwards from `assembly` for `type_name`. Returns the final
    /// assembly and the chain of assemblies visited, starting with `assembly`.
    /// Stops at the first repeated assembly.
    pub fn resolve(&self, assembly: &str, type_name: &str) -> (String, Vec<String>) {
        let mut chain = vec![assembly.to_string()];
        let mut current = assembly.to_string();
        while let Some(next) = self.forwards.get(&(current.clone(), type_name.to_string())) {
            if chain.contains(next) {
                break;
            }
            chain.push(next.clone());
            current = next.clone();
        }
        return (current, chain);
    }
}

// ── Project context ───────────────────────────────────────────────────

/// Everything a document resolver shares with the rest of its project.
pub struct ProjectContext<'run> {
    /// Sink for references and declarations.
    pub accumulator: &'run ProjectAccumulator,
    /// Assembly of the project.
    pub assembly: &'run str,
    /// Once-per-description failure reporter.
    pub failures: &'run FailureLog,
    /// Federated servers.
    pub federation: &'run Federation,
    /// Type forwarding chains.
    pub forwards: &'run ForwardingTable,
    /// Project language.
    pub language: Language,
    /// Write-context predicate.
    pub semantic_facts: &'run dyn SemanticFacts,
    /// Assemblies that have a project in this solution.
    pub solution_assemblies: &'run HashSet<String>,
    /// Shared symbol arena.
    pub symbols: &'run SymbolTable,
    /// Bindable-parent predicate.
    pub syntax_facts: &'run dyn SyntaxFacts,
}

/// Where a target symbol can be browsed.
enum Home {
    /// Declared in a source document of this solution.
    Source {
        /// Owning assembly.
        assembly: String,
        /// Relative link to the declaration or partial page.
        href: String,
    },
    /// Metadata symbol of an assembly that is part of this solution.
    Solution {
        /// Owning assembly after forwarding.
        assembly: String,
        /// Relative link to the redirect page.
        href: String,
        /// Forwarding chain, when the type was forwarded.
        title: Option<String>,
    },
    /// Metadata symbol indexed by a federated server.
    Federated {
        /// Owning assembly after forwarding.
        assembly: String,
        /// Absolute link on the federated server.
        href: String,
        /// Forwarding chain, when the type was forwarded.
        title: Option<String>,
    },
}

impl Home {
    fn assembly(&self) -> &str {
        return match self {
            Home::Federated { assembly, .. } | Home::Solution { assembly, .. } | Home::Source { assembly, .. } => assembly,
        };
    }
}

// ── Document resolver ─────────────────────────────────────────────────

/// Declaration waiting for the renderer's anchor offset.
#[derive(Debug, Clone)]
struct PendingDeclaration {
    id: SymbolId,
    key: SymbolKey,
}

/// Resolves the classified ranges of one document.
pub struct DocumentResolver<'a> {
    ctx: &'a ProjectContext<'a>,
    declared_here: HashSet<SymbolKey>,
    href_prefix: String,
    is_large: bool,
    line_starts: Vec<usize>,
    local_sequences: HashMap<SymbolKey, u32>,
    path: &'a str,
    pending: Option<PendingDeclaration>,
    semantics: Option<&'a dyn SemanticModel>,
    text: &'a str,
    tree: &'a SyntaxTree,
}

impl<'a> DocumentResolver<'a> {
    /// Resolver for `document` at project-relative `path`.
    pub fn new(ctx: &'a ProjectContext<'a>, path: &'a str, document: &'a AnalyzedDocument, is_large: bool) -> Self {
        let page = page_url(ctx.assembly, path);
        let depth = page.matches('/').count();
        let mut line_starts = vec![0];
        line_starts.extend(document.text.match_indices('\n').map(|(index, _)| return index.saturating_add(1)));
        return Self {
            ctx,
            declared_here: HashSet::new(),
            href_prefix: "../".repeat(depth),
            is_large,
            line_starts,
            local_sequences: HashMap::new(),
            path,
            pending: None,
            semantics: document.semantics.as_deref(),
            text: &document.text,
            tree: &document.tree,
        };
    }

    /// Resolve one range into a link descriptor, recording any side effects.
    /// `None` means the range renders as plain text.
    pub fn resolve_range(&mut self, range: &ClassifiedRange) -> Option<Link> {
        self.pending = None;

        if range.classification == Some(Classification::Literal) {
            return self.resolve_guid(range);
        }

        let is_name = matches!(range.classification, Some(Classification::Identifier | Classification::TypeName));
        let text = range.text.trim();
        if !is_name && !RESOLVABLE_KEYWORDS.iter().any(|keyword| return keyword.eq_ignore_ascii_case(text)) {
            return None;
        }

        let token = self.tree.find_token(range.span.start)?;
        if text.eq_ignore_ascii_case("new") {
            if self.is_empty_array_creation(token) {
                self.record_reference(range, EMPTY_ARRAY_ASSEMBLY, &SymbolId(EMPTY_ARRAY_ID.to_string()), EMPTY_ARRAY_ID, ReferenceKind::EmptyArrayAllocation);
            }
            return None;
        }

        let semantics = self.semantics?;
        let parent = self.tree.parent(token)?;
        if let Some(declared) = semantics.declared_symbol(parent) {
            return self.resolve_declaration(range, token, declared);
        }

        let bindable = self.ctx.syntax_facts.bindable_parent(self.tree, token)?;
        let bound = semantics.bound_symbol(bindable).or_else(|| return semantics.bound_symbol(token))?;
        return self.resolve_reference(range, bindable, bound);
    }

    /// Register the declaration queued by the last `resolve_range` call, using
    /// the renderer's byte offset of the anchor.
    pub fn record_declaration(&mut self, offset: u64) {
        if let Some(pending) = self.pending.take() {
            self.ctx.accumulator.add_declared_symbol(self.ctx.symbols, pending.key, &pending.id, self.path, offset);
        }
    }

    /// Symbol data, logging dangling keys once.
    fn symbol(&self, key: SymbolKey) -> Option<&'a SymbolData> {
        let symbols: &'a SymbolTable = self.ctx.symbols;
        let data = symbols.get(key);
        if data.is_none() {
            self.ctx.failures.report(&format!("symbol key {} is not in the symbol table", key.0));
        }
        return data;
    }

    fn symbol_id(&self, key: SymbolKey) -> Option<SymbolId> {
        let id = identity::symbol_id(self.ctx.symbols, key);
        if id.is_none() {
            self.ctx.failures.report(&format!("symbol key {} has no documentation id", key.0));
        }
        return id;
    }

    // ── Literals ──

    fn resolve_guid(&mut self, range: &ClassifiedRange) -> Option<Link> {
        let guid = parse_guid(&range.text)?;
        let id = SymbolId(guid);
        self.record_reference(range, GUID_ASSEMBLY, &id, id.as_str(), ReferenceKind::GuidUsage);
        return Some(Link::Reference { href: format!("{}{GUID_ASSEMBLY}/R/{id}.html", self.href_prefix), title: None });
    }

    // ── Empty arrays ──

    /// Whether the `new` token starts a zero-length array allocation.
    fn is_empty_array_creation(&self, token: NodeId) -> bool {
        let Some(creation) = self.tree.parent(token) else {
            return false;
        };
        if self.tree.kind(creation) != Some(SyntaxKind::ArrayCreation) {
            return false;
        }
        let children = self.tree.children(creation);
        let rank = children.iter().find(|child| return self.tree.kind(**child) == Some(SyntaxKind::ArrayRankSpecifier));
        let initializer = children.iter().find(|child| return self.tree.kind(**child) == Some(SyntaxKind::ArrayInitializer));

        let Some(rank) = rank else {
            return false;
        };
        let size = strip_delimiters(self.tree.text(self.text, *rank));
        if size.is_empty() {
            return initializer.is_some_and(|init| return strip_delimiters(self.tree.text(self.text, *init)).is_empty());
        }
        if size == "0" {
            return true;
        }
        if self.ctx.language == Language::VisualBasic {
            let normalized: Vec<String> = size.split_whitespace().map(str::to_ascii_lowercase).collect();
            return normalized == ["-1"] || normalized == ["0", "to", "-1"];
        }
        return false;
    }

    // ── Declarations ──

    fn resolve_declaration(&mut self, range: &ClassifiedRange, token: NodeId, declared: SymbolKey) -> Option<Link> {
        let data = self.symbol(declared)?;
        let token_kind = self.tree.kind(token)?;
        let text = range.text.trim();

        if token_kind == SyntaxKind::KeywordToken {
            if text.eq_ignore_ascii_case("partial") && data.kind == SymbolKind::NamedType && data.locations.len() > 1 {
                let id = self.symbol_id(declared)?;
                let assembly = data.assembly.as_deref().unwrap_or(self.ctx.assembly);
                return Some(Link::Reference { href: format!("{}{assembly}/P/{id}.html", self.href_prefix), title: None });
            }
            // `this` on an extension receiver, and every other declaring keyword.
            return None;
        }

        if is_explicit_interface_implementation(data) {
            return self.resolve_explicit_implementation(range, declared, data);
        }

        if data.kind.is_document_local() {
            return self.highlight(declared, true);
        }

        let id = self.symbol_id(declared)?;
        let assembly = data.assembly.as_deref().unwrap_or(self.ctx.assembly);
        let glyph = (!self.is_large).then(|| {
            return GlyphInfo { depth: identity::symbol_depth(self.ctx.symbols, declared), glyph: identity::glyph(self.ctx.symbols, declared) };
        });
        let href = format!("{}{assembly}/R/{id}.html", self.href_prefix);

        if self.declared_here.insert(declared) {
            self.pending = Some(PendingDeclaration { id: id.clone(), key: declared });
            self.record_inheritance(range, data, &id);
        }
        return Some(Link::Declaration { glyph, href, id });
    }

    /// Override and implicit interface-implementation edges of a newly declared member.
    fn record_inheritance(&self, range: &ClassifiedRange, data: &SymbolData, member_id: &SymbolId) {
        if data.is_static || !matches!(data.kind, SymbolKind::Method | SymbolKind::Property | SymbolKind::Event) {
            return;
        }
        if let Some(overridden) = data.overridden
            && let Some((target, target_id)) = self.record_target(range, overridden, ReferenceKind::Override)
        {
            self.ctx.accumulator.add_base_member(member_id.clone(), MemberTarget { assembly: target, id: target_id });
        }
        for interface_member in &data.implemented_interface_members {
            if let Some((target, target_id)) = self.record_target(range, *interface_member, ReferenceKind::InterfaceMemberImplementation) {
                self.ctx.accumulator.add_implemented_interface_member(member_id.clone(), MemberTarget { assembly: target, id: target_id });
            }
        }
    }

    /// `void IShape.Draw()`: a reference to the interface member, not a declaration.
    fn resolve_explicit_implementation(&self, range: &ClassifiedRange, declared: SymbolKey, data: &SymbolData) -> Option<Link> {
        let member_id = self.symbol_id(declared)?;
        let mut link = None;
        for interface_member in &data.explicit_interface_implementations {
            let Some(home) = self.home(*interface_member) else {
                continue;
            };
            let Some((assembly, target_id)) = self.record_target(range, *interface_member, ReferenceKind::InterfaceMemberImplementation) else {
                continue;
            };
            self.ctx.accumulator.add_implemented_interface_member(member_id.clone(), MemberTarget { assembly, id: target_id });
            if link.is_none() {
                link = self.link_for(home);
            }
        }
        return link;
    }

    /// Record a reference from `range` to `target` if it has a home. Returns
    /// the owning assembly and identifier of the target.
    fn record_target(&self, range: &ClassifiedRange, target: SymbolKey, kind: ReferenceKind) -> Option<(String, SymbolId)> {
        let target = self.ctx.symbols.original_definition(target);
        let home = self.home(target)?;
        let id = self.symbol_id(target)?;
        let display = identity::display_name(self.ctx.symbols, target).unwrap_or_default();
        let assembly = home.assembly().to_string();
        self.record_reference(range, &assembly, &id, &display, kind);
        return Some((assembly, id));
    }

    // ── References ──

    fn resolve_reference(&mut self, range: &ClassifiedRange, bindable: NodeId, bound: SymbolKey) -> Option<Link> {
        let data = self.symbol(bound)?;
        if data.kind.is_document_local() {
            return self.highlight(bound, false);
        }

        let mut target = data.reduced_from.unwrap_or(bound);
        target = self.ctx.symbols.original_definition(target);
        let target_data = self.symbol(target)?;

        let kind = if target_data.is_constructor() && target_data.is_implicitly_declared {
            target = target_data.containing?;
            ReferenceKind::Instantiation
        } else if let Some(kind) = self.base_list_kind(bindable, target_data) {
            kind
        } else if matches!(target_data.kind, SymbolKind::Field | SymbolKind::Property)
            && self.ctx.semantic_facts.is_written_to(self.tree, bindable)
        {
            ReferenceKind::Write
        } else {
            ReferenceKind::Reference
        };

        let home = self.home(target)?;
        let id = self.symbol_id(target)?;
        let display = identity::display_name(self.ctx.symbols, target).unwrap_or_default();
        self.record_reference(range, home.assembly(), &id, &display, kind);
        return self.link_for(home);
    }

    /// Inheritance kind when `bindable` names a type in a base list.
    fn base_list_kind(&self, bindable: NodeId, target: &SymbolData) -> Option<ReferenceKind> {
        if target.kind != SymbolKind::NamedType {
            return None;
        }
        let base_type = self.tree.parent(bindable)?;
        if self.tree.kind(base_type)? != SyntaxKind::BaseType {
            return None;
        }
        let base_list = self.tree.parent(base_type)?;
        if self.tree.kind(base_list)? != SyntaxKind::BaseList {
            return None;
        }
        let semantics = self.semantics?;
        let owner = self
            .tree
            .ancestors(base_list)
            .find_map(|node| {
                let key = semantics.declared_symbol(node)?;
                return self.ctx.symbols.get(key).filter(|data| return data.kind == SymbolKind::NamedType);
            })?;

        if target.type_kind != Some(TypeKind::Interface) {
            return Some(ReferenceKind::DerivedType);
        }
        if owner.type_kind == Some(TypeKind::Interface) {
            return Some(ReferenceKind::InterfaceInheritance);
        }
        return Some(ReferenceKind::InterfaceImplementation);
    }

    /// In-document highlight for locals, parameters, and type parameters.
    fn highlight(&mut self, key: SymbolKey, is_definition: bool) -> Option<Link> {
        if self.is_large {
            return None;
        }
        let next = u32::try_from(self.local_sequences.len()).unwrap_or(u32::MAX);
        let sequence = *self.local_sequences.entry(key).or_insert(next);
        return Some(Link::Highlight { is_definition, sequence });
    }

    // ── Homes ──

    /// Where `key` can be browsed, or `None` when it is not indexed anywhere reachable.
    fn home(&self, key: SymbolKey) -> Option<Home> {
        let key = self.ctx.symbols.original_definition(key);
        let data = self.symbol(key)?;
        let assembly = data.assembly.clone()?;
        let id = self.symbol_id(key)?;

        if let Some(location) = data.locations.first()
            && self.ctx.solution_assemblies.contains(&assembly)
        {
            let href = if data.kind == SymbolKind::NamedType && data.locations.len() > 1 {
                format!("{}{assembly}/P/{id}.html", self.href_prefix)
            } else {
                format!("{}{}#{id}", self.href_prefix, page_url(&assembly, &location.document))
            };
            return Some(Home::Source { assembly, href });
        }

        let (assembly, chain) = match self.ctx.symbols.top_level_type(key) {
            Some(top) => {
                let type_name = identity::qualified_name(self.ctx.symbols, top)?;
                self.ctx.forwards.resolve(&assembly, &type_name)
            },
            None => (assembly.clone(), vec![assembly]),
        };
        let title = (chain.len() > 1).then(|| return format!("Type forwarded: {}", chain.join(" -> ")));

        if self.ctx.solution_assemblies.contains(&assembly) {
            let href = format!("{}{assembly}/A.html#{id}", self.href_prefix);
            return Some(Home::Solution { assembly, href, title });
        }
        if let Some(index) = self.ctx.federation.external_assembly_index(&assembly) {
            let server = self.ctx.federation.server_url(index)?;
            let href = format!("{server}/{assembly}/A.html#{id}");
            return Some(Home::Federated { assembly, href, title });
        }
        return None;
    }

    /// Link for a home; federated links are suppressed in large documents.
    fn link_for(&self, home: Home) -> Option<Link> {
        return match home {
            Home::Federated { href, title, .. } => (!self.is_large).then_some(Link::Reference { href, title }),
            Home::Solution { href, title, .. } => Some(Link::Reference { href, title }),
            Home::Source { href, .. } => Some(Link::Reference { href, title: None }),
        };
    }

    // ── Records ──

    fn record_reference(&self, range: &ClassifiedRange, assembly: &str, id: &SymbolId, display: &str, kind: ReferenceKind) {
        let start = usize::try_from(range.span.start).unwrap_or(usize::MAX);
        let line_index = self.line_starts.partition_point(|line_start| return *line_start <= start).saturating_sub(1);
        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        let line_end = self.line_starts.get(line_index.saturating_add(1)).copied().unwrap_or(self.text.len());
        let line = self.text.get(line_start..line_end).unwrap_or("").trim_end_matches(['\n', '\r']);
        let prefix = self.text.get(line_start..start).unwrap_or("");

        let column_start = count_chars(prefix).saturating_add(1);
        let column_end = column_start.saturating_add(count_chars(&range.text));
        let record = ReferenceRecord {
            column_end,
            column_start,
            from_assembly: self.ctx.assembly.to_string(),
            from_path: self.path.to_string(),
            kind,
            line_number: u32::try_from(line_index.saturating_add(1)).unwrap_or(u32::MAX),
            line_text: escape::escape_html_text(line),
            to_assembly: assembly.to_string(),
            to_display_name: display.to_string(),
            to_symbol_id: id.clone(),
            url: format!("{}.html", self.path),
        };
        self.ctx.accumulator.add_reference(assembly, id.clone(), record);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Generated page of a document, relative to the output root.
pub fn page_url(assembly: &str, path: &str) -> String {
    return format!("{assembly}/{}.html", path.replace('\\', "/"));
}

fn count_chars(text: &str) -> u32 {
    return u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
}

/// Inside of a `[...]`, `(...)`, or `{...}` with whitespace trimmed.
fn strip_delimiters(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix(['[', '(', '{'])
        .and_then(|rest| return rest.strip_suffix([']', ')', '}']))
        .unwrap_or(trimmed);
    return inner.trim();
}

fn is_explicit_interface_implementation(data: &SymbolData) -> bool {
    return data.method_kind == Some(MethodKind::ExplicitInterfaceImplementation)
        || (!data.explicit_interface_implementations.is_empty()
            && matches!(data.kind, SymbolKind::Method | SymbolKind::Property | SymbolKind::Event));
}

/// Canonical lowercase hyphenated form of a GUID literal, if the text is one.
pub fn parse_guid(literal: &str) -> Option<String> {
    let text = literal.trim();
    let text = text.strip_prefix('@').unwrap_or(text);
    let text = text.strip_prefix('"').and_then(|rest| return rest.strip_suffix('"')).unwrap_or(text);
    if !matches!(text.len(), 32 | 36 | 38) {
        return None;
    }
    let guid = uuid::Uuid::parse_str(text).ok()?;
    return Some(guid.hyphenated().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier;
    use crate::fixtures::{MapSemantics, SymbolFixture, TreeBuilder};
    use crate::frontend::{GenericSemanticFacts, GenericSyntaxFacts};

    struct Harness {
        accumulator: ProjectAccumulator,
        failures: FailureLog,
        federation: Federation,
        forwards: ForwardingTable,
        language: Language,
        solution: HashSet<String>,
        table: SymbolTable,
    }

    impl Harness {
        fn new(table: SymbolTable) -> Self {
            return Self {
                accumulator: ProjectAccumulator::new("App"),
                failures: FailureLog::new(),
                federation: Federation::empty(),
                forwards: ForwardingTable::default(),
                language: Language::CSharp,
                solution: ["App".to_string(), "Lib".to_string()].into_iter().collect(),
                table,
            };
        }

        /// Resolve every range; declarations are registered at the range start.
        fn run(&self, path: &str, builder: TreeBuilder, semantics: MapSemantics, large: bool) -> Vec<(String, Option<Link>)> {
            let (tree, text, spans) = builder.finish_with_spans();
            let document = AnalyzedDocument { semantics: Some(Box::new(semantics)), spans, text, tree };
            let ctx = ProjectContext {
                accumulator: &self.accumulator,
                assembly: "App",
                failures: &self.failures,
                federation: &self.federation,
                forwards: &self.forwards,
                language: self.language,
                semantic_facts: &GenericSemanticFacts,
                solution_assemblies: &self.solution,
                symbols: &self.table,
                syntax_facts: &GenericSyntaxFacts,
            };
            let mut resolver = DocumentResolver::new(&ctx, path, &document, large);
            let mut out = Vec::new();
            for range in classifier::classify(&document.text, &document.spans) {
                let link = resolver.resolve_range(&range);
                resolver.record_declaration(u64::from(range.span.start));
                out.push((range.text.clone(), link));
            }
            return out;
        }

        fn records(&self, assembly: &str) -> Vec<ReferenceRecord> {
            return self
                .accumulator
                .references()
                .into_iter()
                .filter(|(name, _)| name == assembly)
                .flat_map(|(_, buckets)| buckets.into_iter().flat_map(|(_, records)| records))
                .collect();
        }
    }

    fn link_of<'a>(results: &'a [(String, Option<Link>)], text: &str) -> Option<&'a Link> {
        return results.iter().find(|(range, _)| range == text).and_then(|(_, link)| link.as_ref());
    }

    #[test]
    fn guid_literal_records_canonical_usage() {
        let harness = Harness::new(SymbolFixture::new("App").table());
        let mut builder = TreeBuilder::new();
        builder.literal("\"6F9619FF-8B86-D011-B42D-00C04FC964FF\"");
        builder.punct(";");
        builder.literal("\"6F9619FF-8B86-D011-B42D-00C04FC964FZ\"");
        let results = harness.run("src/Ids.cs", builder, MapSemantics::default(), false);

        let records = harness.records(GUID_ASSEMBLY);
        assert_eq!(records.len(), 1);
        let record = records.first().unwrap();
        assert_eq!(record.to_symbol_id.as_str(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert_eq!(record.kind, ReferenceKind::GuidUsage);
        assert_eq!(
            results.first().unwrap().1,
            Some(Link::Reference { href: "../../../GUID/R/6f9619ff-8b86-d011-b42d-00c04fc964ff.html".to_string(), title: None })
        );
        assert_eq!(results.last().unwrap().1, None);
    }

    #[test]
    fn guid_shaped_text_that_is_not_a_guid_stays_a_plain_literal() {
        let harness = Harness::new(SymbolFixture::new("App").table());
        let mut builder = TreeBuilder::new();
        builder.literal("\"12345678-1234-1234-1234-123456789012\"");
        builder.punct(";");
        builder.literal("\"not-a-guid-but-36-characters-long!!\"");
        builder.punct(";");
        builder.literal("\"not-a-guid-but-36-characters-long!!!\"");
        let results = harness.run("src/Ids.cs", builder, MapSemantics::default(), false);

        let records = harness.records(GUID_ASSEMBLY);
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().unwrap().to_symbol_id.as_str(), "12345678-1234-1234-1234-123456789012");
        assert_eq!(link_of(&results, "\"not-a-guid-but-36-characters-long!!\""), None);
        assert_eq!(link_of(&results, "\"not-a-guid-but-36-characters-long!!!\""), None);
        assert!(parse_guid("\"not-a-guid-but-36-characters-long!!\"").is_none());
    }

    #[test]
    fn guid_parsing_accepts_three_lengths() {
        assert!(parse_guid("@\"6F9619FF8B86D011B42D00C04FC964FF\"").is_some());
        assert!(parse_guid("\"{6F9619FF-8B86-D011-B42D-00C04FC964FF}\"").is_some());
        assert!(parse_guid("\"hello\"").is_none());
    }

    #[test]
    fn zero_length_array_is_one_empty_allocation() {
        let harness = Harness::new(SymbolFixture::new("App").table());
        let mut builder = TreeBuilder::new();
        let creation = builder.open(SyntaxKind::ArrayCreation);
        builder.keyword("new");
        builder.space();
        builder.keyword("int");
        let rank = builder.open(SyntaxKind::ArrayRankSpecifier);
        builder.punct("[");
        builder.literal("0");
        builder.punct("]");
        builder.close(rank);
        builder.close(creation);
        let results = harness.run("A.cs", builder, MapSemantics::default(), false);

        let records = harness.records(EMPTY_ARRAY_ASSEMBLY);
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().unwrap().kind, ReferenceKind::EmptyArrayAllocation);
        assert_eq!(records.first().unwrap().to_symbol_id.as_str(), EMPTY_ARRAY_ID);
        assert!(results.iter().all(|(_, link)| link.is_none()));
        assert_eq!(harness.accumulator.reference_count(), 1);
    }

    #[test]
    fn sized_array_and_empty_initializer() {
        let harness = Harness::new(SymbolFixture::new("App").table());
        let mut builder = TreeBuilder::new();
        let sized = builder.open(SyntaxKind::ArrayCreation);
        builder.keyword("new");
        builder.space();
        builder.keyword("int");
        let rank = builder.open(SyntaxKind::ArrayRankSpecifier);
        builder.punct("[");
        builder.literal("4");
        builder.punct("]");
        builder.close(rank);
        builder.close(sized);
        builder.punct(";");
        let empty = builder.open(SyntaxKind::ArrayCreation);
        builder.keyword("new");
        builder.space();
        builder.keyword("int");
        let rank = builder.open(SyntaxKind::ArrayRankSpecifier);
        builder.punct("[");
        builder.punct("]");
        builder.close(rank);
        builder.space();
        let init = builder.open(SyntaxKind::ArrayInitializer);
        builder.punct("{");
        builder.space();
        builder.punct("}");
        builder.close(init);
        builder.close(empty);
        harness.run("A.cs", builder, MapSemantics::default(), false);

        assert_eq!(harness.records(EMPTY_ARRAY_ASSEMBLY).len(), 1);
    }

    #[test]
    fn visual_basic_minus_one_bound() {
        let mut harness = Harness::new(SymbolFixture::new("App").table());
        harness.language = Language::VisualBasic;
        let mut builder = TreeBuilder::new();
        let creation = builder.open(SyntaxKind::ArrayCreation);
        builder.keyword("New");
        builder.space();
        builder.keyword("Integer");
        let rank = builder.open(SyntaxKind::ArrayRankSpecifier);
        builder.punct("(");
        builder.literal("0");
        builder.space();
        builder.keyword("To");
        builder.space();
        builder.operator("-");
        builder.literal("1");
        builder.punct(")");
        builder.close(rank);
        builder.space();
        let init = builder.open(SyntaxKind::ArrayInitializer);
        builder.punct("{");
        builder.punct("}");
        builder.close(init);
        builder.close(creation);
        harness.run("A.vb", builder, MapSemantics::default(), false);

        assert_eq!(harness.records(EMPTY_ARRAY_ASSEMBLY).len(), 1);
    }

    /// `class Derived : Base, IShape { }` plus `interface IFancy : IShape { }`.
    #[test]
    fn base_list_kinds() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let base = fx.type_in(ns, "Base", TypeKind::Class);
        let shape = fx.type_in(ns, "IShape", TypeKind::Interface);
        let derived = fx.type_in(ns, "Derived", TypeKind::Class);
        let fancy = fx.type_in(ns, "IFancy", TypeKind::Interface);
        for (key, file) in [(base, "Base.cs"), (shape, "IShape.cs"), (derived, "A.cs"), (fancy, "A.cs")] {
            fx.locate(key, file, TextRange::new(0, 1));
        }
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let mut semantics = MapSemantics::default();
        let decl = builder.open(SyntaxKind::TypeDeclaration);
        builder.keyword("class");
        builder.space();
        builder.ident("Derived", "class name");
        builder.space();
        builder.punct(":");
        builder.space();
        let list = builder.open(SyntaxKind::BaseList);
        let first = builder.open(SyntaxKind::BaseType);
        let base_name = builder.name_as("Base", "class name");
        builder.close(first);
        builder.punct(",");
        builder.space();
        let second = builder.open(SyntaxKind::BaseType);
        let shape_name = builder.name_as("IShape", "interface name");
        builder.close(second);
        builder.close(list);
        builder.close(decl);
        builder.newline();
        let decl2 = builder.open(SyntaxKind::TypeDeclaration);
        builder.keyword("interface");
        builder.space();
        builder.ident("IFancy", "interface name");
        builder.punct(":");
        let list2 = builder.open(SyntaxKind::BaseList);
        let third = builder.open(SyntaxKind::BaseType);
        let shape_again = builder.name_as("IShape", "interface name");
        builder.close(third);
        builder.close(list2);
        builder.close(decl2);
        semantics.declared.insert(decl, derived);
        semantics.declared.insert(decl2, fancy);
        semantics.bound.insert(base_name, base);
        semantics.bound.insert(shape_name, shape);
        semantics.bound.insert(shape_again, shape);
        harness.run("A.cs", builder, semantics, false);

        let mut kinds: Vec<(String, ReferenceKind)> =
            harness.records("App").into_iter().map(|record| (record.to_display_name, record.kind)).collect();
        kinds.sort_by(|left, right| left.0.cmp(&right.0).then(left.1.code().cmp(&right.1.code())));
        assert_eq!(
            kinds,
            vec![
                ("Base".to_string(), ReferenceKind::DerivedType),
                ("IShape".to_string(), ReferenceKind::InterfaceInheritance),
                ("IShape".to_string(), ReferenceKind::InterfaceImplementation),
            ]
        );
    }

    #[test]
    fn write_detection_comes_from_project_facts() {
        struct AlwaysWritten;
        impl SemanticFacts for AlwaysWritten {
            fn is_written_to(&self, _tree: &SyntaxTree, _node: NodeId) -> bool {
                return true;
            }
        }

        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let base = fx.type_in(ns, "Base", TypeKind::Class);
        let derived = fx.type_in(ns, "Derived", TypeKind::Class);
        let count = fx.member_in(base, SymbolKind::Field, "count");
        for key in [base, derived, count] {
            fx.locate(key, "A.cs", TextRange::new(0, 1));
        }
        let table = fx.table();

        let mut builder = TreeBuilder::new();
        let decl = builder.open(SyntaxKind::TypeDeclaration);
        builder.keyword("class");
        builder.space();
        builder.ident("Derived", "class name");
        let list = builder.open(SyntaxKind::BaseList);
        let base_type = builder.open(SyntaxKind::BaseType);
        let base_name = builder.name_as("Base", "class name");
        builder.close(base_type);
        builder.close(list);
        builder.close(decl);
        builder.space();
        let field = builder.name_as("count", "field name");
        let (tree, text, spans) = builder.finish_with_spans();
        let mut semantics = MapSemantics::default();
        semantics.declared.insert(decl, derived);
        semantics.bound.insert(base_name, base);
        semantics.bound.insert(field, count);
        let document = AnalyzedDocument { semantics: Some(Box::new(semantics)), spans, text, tree };

        let harness = Harness::new(table);
        let ctx = ProjectContext {
            accumulator: &harness.accumulator,
            assembly: "App",
            failures: &harness.failures,
            federation: &harness.federation,
            forwards: &harness.forwards,
            language: Language::CSharp,
            semantic_facts: &AlwaysWritten,
            solution_assemblies: &harness.solution,
            symbols: &harness.table,
            syntax_facts: &GenericSyntaxFacts,
        };
        let mut resolver = DocumentResolver::new(&ctx, "A.cs", &document, false);
        for range in classifier::classify(&document.text, &document.spans) {
            resolver.resolve_range(&range);
        }

        let kinds: Vec<(String, ReferenceKind)> =
            harness.records("App").into_iter().map(|record| (record.to_display_name, record.kind)).collect();
        assert!(kinds.contains(&("Base".to_string(), ReferenceKind::DerivedType)));
        assert!(kinds.contains(&("count".to_string(), ReferenceKind::Write)));
    }

    #[test]
    fn field_write_and_read() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let count = fx.member_in(widget, SymbolKind::Field, "count");
        fx.locate(count, "Widget.cs", TextRange::new(0, 5));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let assign = builder.open(SyntaxKind::Assignment);
        let target = builder.name_as("count", "field name");
        builder.space();
        builder.operator("=");
        builder.space();
        let value = builder.name_as("count", "field name");
        builder.close(assign);
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(target, count);
        semantics.bound.insert(value, count);
        harness.run("Program.cs", builder, semantics, false);

        let kinds: Vec<ReferenceKind> = harness.records("App").into_iter().map(|record| record.kind).collect();
        assert_eq!(kinds, vec![ReferenceKind::Write, ReferenceKind::Reference]);
    }

    #[test]
    fn unreachable_metadata_gets_no_link_and_no_record() {
        let mut fx = SymbolFixture::new("App");
        let console = fx.metadata_type("System", "Console", "System.Console");
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let name = builder.name_as("Console", "class name");
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(name, console);
        let results = harness.run("Program.cs", builder, semantics, false);

        assert_eq!(link_of(&results, "Console"), None);
        assert_eq!(harness.accumulator.reference_count(), 0);
    }

    #[test]
    fn federated_target_links_to_server_unless_large() {
        let mut fx = SymbolFixture::new("App");
        let console = fx.metadata_type("System", "Console", "System.Console");
        let mut harness = Harness::new(fx.table());
        harness.federation = Federation::from_lists(vec![("https://ref.example".to_string(), vec!["System.Console".to_string()])]);

        let build = || {
            let mut builder = TreeBuilder::new();
            let name = builder.name_as("Console", "class name");
            let mut semantics = MapSemantics::default();
            semantics.bound.insert(name, console);
            return (builder, semantics);
        };
        let (builder, semantics) = build();
        let results = harness.run("Program.cs", builder, semantics, false);
        let id = identity::symbol_id(&harness.table, console).unwrap();
        assert_eq!(
            link_of(&results, "Console"),
            Some(&Link::Reference { href: format!("https://ref.example/System.Console/A.html#{id}"), title: None })
        );

        let (builder, semantics) = build();
        let results = harness.run("Big.cs", builder, semantics, true);
        assert_eq!(link_of(&results, "Console"), None);
        assert_eq!(harness.records("System.Console").len(), 2);
    }

    #[test]
    fn forwarded_type_links_to_solution_redirect_with_chain() {
        let mut fx = SymbolFixture::new("App");
        let list = fx.metadata_type("Acme", "Bag", "Old.Lib");
        let mut harness = Harness::new(fx.table());
        harness.forwards = ForwardingTable::new(&[
            TypeForward { from_assembly: "Old.Lib".to_string(), to_assembly: "Mid.Lib".to_string(), type_name: "Acme.Bag".to_string() },
            TypeForward { from_assembly: "Mid.Lib".to_string(), to_assembly: "Lib".to_string(), type_name: "Acme.Bag".to_string() },
        ]);

        let mut builder = TreeBuilder::new();
        let name = builder.name_as("Bag", "class name");
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(name, list);
        let results = harness.run("src/Program.cs", builder, semantics, false);

        let id = identity::symbol_id(&harness.table, list).unwrap();
        assert_eq!(
            link_of(&results, "Bag"),
            Some(&Link::Reference {
                href: format!("../../Lib/A.html#{id}"),
                title: Some("Type forwarded: Old.Lib -> Mid.Lib -> Lib".to_string()),
            })
        );
        assert_eq!(harness.records("Lib").len(), 1);
    }

    #[test]
    fn forwarding_cycles_terminate() {
        let table = ForwardingTable::new(&[
            TypeForward { from_assembly: "A".to_string(), to_assembly: "B".to_string(), type_name: "T".to_string() },
            TypeForward { from_assembly: "B".to_string(), to_assembly: "A".to_string(), type_name: "T".to_string() },
        ]);
        let (last, chain) = table.resolve("A", "T");
        assert_eq!(last, "B");
        assert_eq!(chain, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn declaration_links_and_registers_once() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        fx.locate(widget, "Widget.cs", TextRange::new(6, 12));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let decl = builder.open(SyntaxKind::TypeDeclaration);
        builder.keyword("class");
        builder.space();
        builder.ident("Widget", "class name");
        builder.close(decl);
        let mut semantics = MapSemantics::default();
        semantics.declared.insert(decl, widget);
        let results = harness.run("Widget.cs", builder, semantics, false);

        let id = identity::symbol_id(&harness.table, widget).unwrap();
        assert_eq!(
            link_of(&results, "Widget"),
            Some(&Link::Declaration { glyph: Some(GlyphInfo { depth: 0, glyph: 0 }), href: format!("../App/R/{id}.html"), id: id.clone() })
        );
        assert_eq!(harness.accumulator.declaration_locations(), vec![(id, vec![crate::types::DeclarationLocation { offset: 6, path: "Widget.cs".to_string() }])]);
    }

    #[test]
    fn override_and_implicit_interface_edges() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let shape = fx.type_in(ns, "IShape", TypeKind::Interface);
        let area = fx.method_in(shape, "Area", None);
        let base = fx.type_in(ns, "ShapeBase", TypeKind::Class);
        let base_area = fx.method_in(base, "Area", None);
        let circle = fx.type_in(ns, "Circle", TypeKind::Class);
        let circle_area = fx.method_in(circle, "Area", None);
        fx.with(circle_area, |data| {
            data.overridden = Some(base_area);
            data.implemented_interface_members.push(area);
        });
        for key in [area, base_area, circle_area] {
            fx.locate(key, "Shapes.cs", TextRange::new(0, 4));
        }
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let decl = builder.open(SyntaxKind::Other);
        builder.keyword("override");
        builder.space();
        builder.ident("Area", "method name");
        builder.close(decl);
        let mut semantics = MapSemantics::default();
        semantics.declared.insert(decl, circle_area);
        harness.run("Shapes.cs", builder, semantics, false);

        let kinds: Vec<ReferenceKind> = harness.records("App").into_iter().map(|record| record.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&ReferenceKind::Override));
        assert!(kinds.contains(&ReferenceKind::InterfaceMemberImplementation));
        assert_eq!(harness.accumulator.base_members().len(), 1);
        assert_eq!(harness.accumulator.implemented_interface_members().len(), 1);
    }

    #[test]
    fn explicit_implementation_is_reference_not_declaration() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let shape = fx.type_in(ns, "IShape", TypeKind::Interface);
        let draw = fx.method_in(shape, "Draw", None);
        let circle = fx.type_in(ns, "Circle", TypeKind::Class);
        let explicit = fx.method_in(circle, "Acme.IShape.Draw", Some(MethodKind::ExplicitInterfaceImplementation));
        fx.with(explicit, |data| data.explicit_interface_implementations.push(draw));
        fx.locate(draw, "IShape.cs", TextRange::new(0, 4));
        fx.locate(explicit, "Circle.cs", TextRange::new(0, 4));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let decl = builder.open(SyntaxKind::Other);
        builder.ident("Draw", "method name");
        builder.close(decl);
        let mut semantics = MapSemantics::default();
        semantics.declared.insert(decl, explicit);
        let results = harness.run("Circle.cs", builder, semantics, false);

        let draw_id = identity::symbol_id(&harness.table, draw).unwrap();
        assert_eq!(link_of(&results, "Draw"), Some(&Link::Reference { href: format!("../App/IShape.cs.html#{draw_id}"), title: None }));
        assert_eq!(harness.accumulator.declared_count(), 0);
        assert_eq!(harness.accumulator.implemented_interface_members().len(), 1);
        assert_eq!(harness.records("App").first().unwrap().kind, ReferenceKind::InterfaceMemberImplementation);
    }

    #[test]
    fn partial_type_links_to_partial_page() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        fx.locate(widget, "Widget.B.cs", TextRange::new(14, 20));
        fx.locate(widget, "Widget.A.cs", TextRange::new(14, 20));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let decl = builder.open(SyntaxKind::TypeDeclaration);
        builder.keyword("partial");
        builder.space();
        builder.keyword("class");
        builder.space();
        builder.ident("Widget", "class name");
        builder.close(decl);
        builder.newline();
        let use_site = builder.name_as("Widget", "class name");
        let mut semantics = MapSemantics::default();
        semantics.declared.insert(decl, widget);
        semantics.bound.insert(use_site, widget);
        let results = harness.run("Widget.A.cs", builder, semantics, false);

        let id = identity::symbol_id(&harness.table, widget).unwrap();
        let partial_href = format!("../App/P/{id}.html");
        assert_eq!(link_of(&results, "partial"), Some(&Link::Reference { href: partial_href.clone(), title: None }));
        let use_link = results.iter().rev().find(|(text, _)| text == "Widget").and_then(|(_, link)| link.clone());
        assert_eq!(use_link, Some(Link::Reference { href: partial_href, title: None }));
        let partials = harness.accumulator.partial_types();
        assert_eq!(partials.first().unwrap().files, vec!["Widget.A.cs".to_string(), "Widget.B.cs".to_string()]);
    }

    #[test]
    fn locals_highlight_with_sequences() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let run = fx.method_in(widget, "Run", None);
        let first = fx.local(run, "a");
        let second = fx.local(run, "b");
        let harness = Harness::new(fx.table());

        let build = || {
            let mut builder = TreeBuilder::new();
            let mut semantics = MapSemantics::default();
            let decl = builder.open(SyntaxKind::Other);
            builder.ident("a", "local name");
            builder.close(decl);
            builder.space();
            let use_b = builder.name_as("b", "local name");
            builder.space();
            let use_a = builder.name_as("a", "local name");
            semantics.declared.insert(decl, first);
            semantics.bound.insert(use_b, second);
            semantics.bound.insert(use_a, first);
            return (builder, semantics);
        };
        let (builder, semantics) = build();
        let results = harness.run("A.cs", builder, semantics, false);
        let links: Vec<Option<Link>> = results.into_iter().filter(|(text, _)| text.trim() != "").map(|(_, link)| link).collect();
        assert_eq!(
            links,
            vec![
                Some(Link::Highlight { is_definition: true, sequence: 0 }),
                Some(Link::Highlight { is_definition: false, sequence: 1 }),
                Some(Link::Highlight { is_definition: false, sequence: 0 }),
            ]
        );
        assert_eq!(harness.accumulator.reference_count(), 0);

        let (builder, semantics) = build();
        let results = harness.run("Big.cs", builder, semantics, true);
        assert!(results.iter().all(|(_, link)| link.is_none()));
    }

    #[test]
    fn implicit_constructor_is_instantiation_of_type() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let ctor = fx.method_in(widget, ".ctor", Some(MethodKind::Constructor));
        fx.with(ctor, |data| data.is_implicitly_declared = true);
        fx.locate(widget, "Widget.cs", TextRange::new(0, 6));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let creation = builder.open(SyntaxKind::ObjectCreation);
        builder.keyword("new");
        builder.space();
        builder.name_as("Widget", "class name");
        builder.punct("()");
        builder.close(creation);
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(creation, ctor);
        let results = harness.run("Program.cs", builder, semantics, false);

        let records = harness.records("App");
        assert_eq!(records.len(), 1);
        let record = records.first().unwrap();
        assert_eq!(record.kind, ReferenceKind::Instantiation);
        assert_eq!(record.to_symbol_id, identity::symbol_id(&harness.table, widget).unwrap());
        assert_eq!(link_of(&results, "new"), None);
    }

    #[test]
    fn record_positions_and_escaping() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let bag = fx.type_in(ns, "Bag", TypeKind::Class);
        fx.type_parameter(bag, "T");
        fx.locate(bag, "Bag.cs", TextRange::new(0, 3));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        builder.token(SyntaxKind::CommentToken, "// é", Some("comment"));
        builder.newline();
        builder.token(SyntaxKind::OperatorToken, "x<", None);
        let name = builder.name_as("Bag", "class name");
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(name, bag);
        harness.run("src/Use.cs", builder, semantics, false);

        let record = harness.records("App").into_iter().next().unwrap();
        assert_eq!(record.line_number, 2);
        assert_eq!(record.column_start, 3);
        assert_eq!(record.column_end, 6);
        assert_eq!(record.line_text, "x&lt;Bag");
        assert_eq!(record.url, "src/Use.cs.html");
        assert_eq!(record.to_display_name, "Bag<T>");
    }

    #[test]
    fn dangling_keys_are_plain_text_and_logged_once() {
        let harness = Harness::new(SymbolFixture::new("App").table());
        let mut builder = TreeBuilder::new();
        let first = builder.name_as("Ghost", "class name");
        builder.space();
        let second = builder.name_as("Ghost", "class name");
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(first, SymbolKey(404));
        semantics.bound.insert(second, SymbolKey(404));
        let results = harness.run("A.cs", builder, semantics, false);

        assert!(results.iter().all(|(_, link)| link.is_none()));
        assert_eq!(harness.failures.distinct(), 1);
    }

    #[test]
    fn qualified_name_binds_at_its_last_segment() {
        let mut fx = SymbolFixture::new("App");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        fx.locate(widget, "Widget.cs", TextRange::new(0, 6));
        let harness = Harness::new(fx.table());

        let mut builder = TreeBuilder::new();
        let access = builder.open(SyntaxKind::QualifiedName);
        builder.name_as("Acme", "namespace name");
        builder.punct(".");
        builder.name_as("Widget", "class name");
        builder.close(access);
        let mut semantics = MapSemantics::default();
        semantics.bound.insert(access, widget);
        let results = harness.run("A.cs", builder, semantics, false);

        assert!(link_of(&results, "Widget").is_some());
        assert_eq!(link_of(&results, "Acme"), None);
    }
}
