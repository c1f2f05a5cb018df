//! Per-project index state shared by every worker processing the project.
//!
//! All mutation goes through `&self`. References use two-level locking: the
//! outer map's shard lock is held only long enough to fetch the per-assembly
//! inner map, then the inner shard lock guards one symbol bucket.

use std::sync::Arc;

use dashmap::DashMap;

use crate::identity;
use crate::symbols::{SymbolKey, SymbolKind, SymbolTable};
use crate::types::{DeclarationLocation, DeclaredSymbolRecord, MemberTarget, ReferenceRecord, SymbolId};

/// Reference buckets of one target assembly.
type Buckets = DashMap<SymbolId, Vec<ReferenceRecord>>;

/// A declared symbol plus the document that first declared it.
#[derive(Debug, Clone)]
struct DeclaredEntry {
    /// Project-relative path of the first declaring document.
    path: String,
    /// Record written to `D.txt`.
    record: DeclaredSymbolRecord,
}

/// Type declared across several files, listed on a partial-disambiguation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialType {
    /// Declaring documents, sorted.
    pub files: Vec<String>,
    /// Identifier of the type.
    pub id: SymbolId,
    /// Display name of the type.
    pub name: String,
}

/// Everything one project contributes to the index.
#[derive(Debug)]
pub struct ProjectAccumulator {
    /// Assembly of the project.
    assembly: String,
    /// Base member of each overriding member.
    base_members: DashMap<SymbolId, MemberTarget>,
    /// Declared symbols deduplicated by identifier.
    declared: DashMap<SymbolId, DeclaredEntry>,
    /// Interface members implemented by each member.
    implemented_interface_members: DashMap<SymbolId, Vec<MemberTarget>>,
    /// Declaration occurrences in generated pages.
    locations: DashMap<SymbolId, Vec<DeclarationLocation>>,
    /// Types with more than one declaring file.
    partials: DashMap<SymbolId, PartialType>,
    /// References keyed by target assembly, then symbol.
    references: DashMap<String, Arc<Buckets>>,
}

impl ProjectAccumulator {
    /// An empty accumulator for `assembly`.
    pub fn new(assembly: &str) -> Self {
        return Self {
            assembly: assembly.to_string(),
            base_members: DashMap::new(),
            declared: DashMap::new(),
            implemented_interface_members: DashMap::new(),
            locations: DashMap::new(),
            partials: DashMap::new(),
            references: DashMap::new(),
        };
    }

    /// Assembly of the project.
    pub fn assembly(&self) -> &str {
        return &self.assembly;
    }

    // ── Recording ──

    /// Append a reference to the `(assembly, id)` bucket.
    pub fn add_reference(&self, assembly: &str, id: SymbolId, record: ReferenceRecord) {
        let buckets = self.buckets(assembly);
        buckets.entry(id).or_default().push(record);
    }

    /// Fetch or create the inner map for `assembly`, releasing the outer lock.
    fn buckets(&self, assembly: &str) -> Arc<Buckets> {
        if let Some(existing) = self.references.get(assembly) {
            return Arc::clone(existing.value());
        }
        return Arc::clone(self.references.entry(assembly.to_string()).or_default().value());
    }

    /// Register a declaration occurrence. Returns `true` the first time the
    /// identifier is declared in this project.
    ///
    /// Document-local symbols are ignored. Constructors get a declared-symbol
    /// record but no per-occurrence location.
    pub fn add_declared_symbol(&self, table: &SymbolTable, key: SymbolKey, id: &SymbolId, path: &str, offset: u64) -> bool {
        let Some(data) = table.get(key) else {
            return false;
        };
        if data.kind.is_document_local() {
            return false;
        }

        let mut first = false;
        self.declared.entry(id.clone()).or_insert_with(|| {
            first = true;
            let record = DeclaredSymbolRecord {
                glyph: identity::glyph(table, key),
                id: id.clone(),
                kind: identity::kind_tag(table, key).unwrap_or("symbol").to_string(),
                name: identity::display_name(table, key).unwrap_or_else(|| return data.name.clone()),
                signature: identity::full_signature(table, key).unwrap_or_else(|| return data.name.clone()),
            };
            return DeclaredEntry { path: path.to_string(), record };
        });

        if !data.is_constructor() {
            self.locations
                .entry(id.clone())
                .or_default()
                .push(DeclarationLocation { offset, path: path.to_string() });
        }

        if first && data.kind == SymbolKind::NamedType && data.locations.len() > 1 {
            let mut files: Vec<String> = data.locations.iter().map(|location| return location.document.clone()).collect();
            files.sort();
            files.dedup();
            let name = identity::display_name(table, key).unwrap_or_else(|| return data.name.clone());
            self.partials.insert(id.clone(), PartialType { files, id: id.clone(), name });
        }
        return first;
    }

    /// Record that `member` overrides `target`.
    pub fn add_base_member(&self, member: SymbolId, target: MemberTarget) {
        self.base_members.entry(member).or_insert(target);
    }

    /// Record that `member` implements interface member `target`.
    pub fn add_implemented_interface_member(&self, member: SymbolId, target: MemberTarget) {
        let mut entry = self.implemented_interface_members.entry(member).or_default();
        if !entry.contains(&target) {
            entry.push(target);
        }
    }

    /// Give every declared symbol without a location one `(declaring path, 0)` entry.
    pub fn fill_missing_locations(&self) {
        for entry in &self.declared {
            if !self.locations.contains_key(entry.key()) {
                self.locations
                    .entry(entry.key().clone())
                    .or_default()
                    .push(DeclarationLocation { offset: 0, path: entry.value().path.clone() });
            }
        }
    }

    /// Fold in everything one finished document staged. Records already
    /// present keep their first writer.
    pub fn absorb(&self, document: Self) {
        for (id, entry) in document.declared {
            self.declared.entry(id).or_insert(entry);
        }
        for (id, locations) in document.locations {
            self.locations.entry(id).or_default().extend(locations);
        }
        for (id, partial) in document.partials {
            self.partials.entry(id).or_insert(partial);
        }
        for (assembly, staged) in document.references {
            let buckets = self.buckets(&assembly);
            for bucket in staged.iter() {
                buckets.entry(bucket.key().clone()).or_default().extend(bucket.value().iter().cloned());
            }
        }
        for (member, target) in document.base_members {
            self.add_base_member(member, target);
        }
        for (member, targets) in document.implemented_interface_members {
            for target in targets {
                self.add_implemented_interface_member(member.clone(), target);
            }
        }
    }

    // ── Snapshots for serialization ──

    /// Declared symbols sorted by name, then identifier.
    pub fn declared_symbols(&self) -> Vec<DeclaredSymbolRecord> {
        let mut records: Vec<DeclaredSymbolRecord> = self.declared.iter().map(|entry| return entry.value().record.clone()).collect();
        records.sort_by(|left, right| return left.name.cmp(&right.name).then_with(|| return left.id.cmp(&right.id)));
        return records;
    }

    /// Declaration locations sorted by identifier; each list keeps occurrence order.
    pub fn declaration_locations(&self) -> Vec<(SymbolId, Vec<DeclarationLocation>)> {
        let mut out: Vec<(SymbolId, Vec<DeclarationLocation>)> =
            self.locations.iter().map(|entry| return (entry.key().clone(), entry.value().clone())).collect();
        out.sort_by(|left, right| return left.0.cmp(&right.0));
        return out;
    }

    /// References grouped by target assembly and symbol, both sorted.
    pub fn references(&self) -> Vec<(String, Vec<(SymbolId, Vec<ReferenceRecord>)>)> {
        let mut out = Vec::with_capacity(self.references.len());
        for assembly in &self.references {
            let mut buckets: Vec<(SymbolId, Vec<ReferenceRecord>)> =
                assembly.value().iter().map(|bucket| return (bucket.key().clone(), bucket.value().clone())).collect();
            buckets.sort_by(|left, right| return left.0.cmp(&right.0));
            out.push((assembly.key().clone(), buckets));
        }
        out.sort_by(|left, right| return left.0.cmp(&right.0));
        return out;
    }

    /// Base-member map sorted by member identifier.
    pub fn base_members(&self) -> Vec<(SymbolId, MemberTarget)> {
        let mut out: Vec<(SymbolId, MemberTarget)> =
            self.base_members.iter().map(|entry| return (entry.key().clone(), entry.value().clone())).collect();
        out.sort();
        return out;
    }

    /// Interface-implementation map flattened and sorted.
    pub fn implemented_interface_members(&self) -> Vec<(SymbolId, MemberTarget)> {
        let mut out: Vec<(SymbolId, MemberTarget)> = self
            .implemented_interface_members
            .iter()
            .flat_map(|entry| {
                let member = entry.key().clone();
                return entry.value().iter().map(move |target| return (member.clone(), target.clone())).collect::<Vec<_>>();
            })
            .collect();
        out.sort();
        return out;
    }

    /// Types declared in more than one file.
    pub fn partial_types(&self) -> Vec<PartialType> {
        let mut out: Vec<PartialType> = self.partials.iter().map(|entry| return entry.value().clone()).collect();
        out.sort_by(|left, right| return left.id.cmp(&right.id));
        return out;
    }

    /// Total references recorded.
    pub fn reference_count(&self) -> u64 {
        let total: usize = self
            .references
            .iter()
            .map(|assembly| return assembly.value().iter().map(|bucket| return bucket.value().len()).sum::<usize>())
            .sum();
        return u64::try_from(total).unwrap_or(u64::MAX);
    }

    /// Number of distinct declared symbols.
    pub fn declared_count(&self) -> u64 {
        return u64::try_from(self.declared.len()).unwrap_or(u64::MAX);
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;
    use crate::fixtures::SymbolFixture;
    use crate::symbols::{MethodKind, TypeKind};
    use crate::types::{ReferenceKind, TextRange};

    fn record(from_path: &str, line: u32, target: &SymbolId) -> ReferenceRecord {
        return ReferenceRecord {
            column_end: 5,
            column_start: 1,
            from_assembly: "App".to_string(),
            from_path: from_path.to_string(),
            kind: ReferenceKind::Reference,
            line_number: line,
            line_text: "text".to_string(),
            to_assembly: "Lib".to_string(),
            to_display_name: "Widget".to_string(),
            to_symbol_id: target.clone(),
            url: format!("{from_path}.html"),
        };
    }

    #[test]
    fn partial_declaration_yields_one_record_two_locations() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        fx.locate(widget, "B.cs", TextRange::new(10, 16));
        fx.locate(widget, "A.cs", TextRange::new(20, 26));
        let table = fx.table();
        let id = identity::symbol_id(&table, widget).unwrap();

        let accumulator = ProjectAccumulator::new("Lib");
        assert!(accumulator.add_declared_symbol(&table, widget, &id, "B.cs", 100));
        assert!(!accumulator.add_declared_symbol(&table, widget, &id, "A.cs", 200));

        assert_eq!(accumulator.declared_symbols().len(), 1);
        let locations = accumulator.declaration_locations();
        assert_eq!(locations.first().unwrap().1.len(), 2);

        let partials = accumulator.partial_types();
        assert_eq!(partials.len(), 1);
        assert_eq!(partials.first().unwrap().files, vec!["A.cs".to_string(), "B.cs".to_string()]);
    }

    #[test]
    fn locals_are_ignored() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let run = fx.method_in(widget, "Run", None);
        let local = fx.local(run, "count");
        let table = fx.table();
        let id = identity::symbol_id(&table, local).unwrap();

        let accumulator = ProjectAccumulator::new("Lib");
        assert!(!accumulator.add_declared_symbol(&table, local, &id, "A.cs", 0));
        assert_eq!(accumulator.declared_count(), 0);
    }

    #[test]
    fn constructors_get_fallback_location_only() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let ctor = fx.method_in(widget, ".ctor", Some(MethodKind::Constructor));
        let table = fx.table();
        let id = identity::symbol_id(&table, ctor).unwrap();

        let accumulator = ProjectAccumulator::new("Lib");
        accumulator.add_declared_symbol(&table, ctor, &id, "Widget.cs", 42);
        assert!(accumulator.declaration_locations().is_empty());

        accumulator.fill_missing_locations();
        let locations = accumulator.declaration_locations();
        assert_eq!(locations, vec![(id, vec![DeclarationLocation { offset: 0, path: "Widget.cs".to_string() }])]);
    }

    #[test]
    fn declared_symbols_sorted_by_name_then_id() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let zeta = fx.type_in(ns, "Zeta", TypeKind::Class);
        let alpha = fx.type_in(ns, "Alpha", TypeKind::Struct);
        let table = fx.table();

        let accumulator = ProjectAccumulator::new("Lib");
        for key in [zeta, alpha] {
            let id = identity::symbol_id(&table, key).unwrap();
            accumulator.add_declared_symbol(&table, key, &id, "A.cs", 0);
        }
        let names: Vec<String> = accumulator.declared_symbols().into_iter().map(|record| record.name).collect();
        assert_eq!(names, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn interface_implementations_deduplicate() {
        let accumulator = ProjectAccumulator::new("Lib");
        let member = identity::string_id("M:Acme.Widget.Area");
        let target = MemberTarget { assembly: "Lib".to_string(), id: identity::string_id("M:Acme.IShape.Area") };
        accumulator.add_implemented_interface_member(member.clone(), target.clone());
        accumulator.add_implemented_interface_member(member.clone(), target.clone());
        assert_eq!(accumulator.implemented_interface_members(), vec![(member, target)]);
    }

    #[test]
    fn absorbed_documents_merge_and_keep_the_first_declarer() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let table = fx.table();
        let id = identity::symbol_id(&table, widget).unwrap();
        let target = identity::string_id("T:Acme.Gadget");

        let project = ProjectAccumulator::new("Lib");
        let first = ProjectAccumulator::new("Lib");
        first.add_declared_symbol(&table, widget, &id, "A.cs", 10);
        first.add_reference("Lib", target.clone(), record("A.cs", 1, &target));
        project.absorb(first);

        let second = ProjectAccumulator::new("Lib");
        second.add_declared_symbol(&table, widget, &id, "B.cs", 20);
        second.add_reference("Lib", target.clone(), record("B.cs", 2, &target));
        project.absorb(second);

        assert_eq!(project.declared_count(), 1);
        assert_eq!(project.reference_count(), 2);
        let locations = project.declaration_locations();
        let paths: Vec<&str> = locations.first().unwrap().1.iter().map(|location| location.path.as_str()).collect();
        assert_eq!(paths, vec!["A.cs", "B.cs"]);
    }

    #[test]
    fn concurrent_references_and_declarations() {
        let mut fx = SymbolFixture::new("Lib");
        let ns = fx.namespace("Acme");
        let widget = fx.type_in(ns, "Widget", TypeKind::Class);
        let table = Arc::new(fx.table());
        let id = identity::symbol_id(&table, widget).unwrap();
        let accumulator = Arc::new(ProjectAccumulator::new("App"));
        let targets: Vec<SymbolId> = (0..16).map(|index| identity::string_id(&format!("T:Type{index}"))).collect();

        (0..4000_u32).into_par_iter().for_each(|index| {
            let target = &targets[usize::try_from(index).unwrap() % targets.len()];
            let assembly = if index % 2 == 0 { "Lib" } else { "Other" };
            accumulator.add_reference(assembly, target.clone(), record("Program.cs", index, target));
            accumulator.add_declared_symbol(&table, widget, &id, "Widget.cs", u64::from(index));
        });

        assert_eq!(accumulator.reference_count(), 4000);
        assert_eq!(accumulator.declared_count(), 1);
        assert_eq!(accumulator.declaration_locations().first().unwrap().1.len(), 4000);
        let assemblies: Vec<String> = accumulator.references().into_iter().map(|(assembly, _)| assembly).collect();
        assert_eq!(assemblies, vec!["Lib".to_string(), "Other".to_string()]);
    }
}
