//! One indexing run over a loaded solution.
//!
//! Projects are indexed in parallel on a dedicated rayon pool; each project's
//! documents are split into one chunk per thread and each chunk is walked
//! sequentially. A finished project writes its own files, then hands its
//! declared symbols to the aggregator thread over a channel. The aggregator
//! appends the resume marker as projects arrive and writes the solution-wide
//! tables once every project is done.

use std::collections::HashSet;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use rayon::prelude::*;

use crate::accumulator::ProjectAccumulator;
use crate::classifier;
use crate::diagnostics::FailureLog;
use crate::error::Error;
use crate::federation::Federation;
use crate::frontend::{AnalyzedDocument, DocumentSource, Project, Solution};
use crate::master_index::{self, MasterEntry};
use crate::project_map::{self, ASSEMBLIES_FILE};
use crate::redirect;
use crate::render::{self, HtmlPage};
use crate::resolver::{DocumentResolver, ForwardingTable, ProjectContext};
use crate::serialization::{self, BASE_MEMBERS_FILE, DECLARED_SYMBOLS_FILE, IMPLEMENTED_INTERFACE_MEMBERS_FILE, ReferenceWriter};
use crate::types::DeclaredSymbolRecord;

/// Resume marker: one finished assembly per line.
pub const PROCESSED_ASSEMBLIES_FILE: &str = "ProcessedAssemblies.txt";

/// Settings of one run, after config file and CLI flags are merged.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Worker threads; `None` sizes the pool to the CPU count.
    pub jobs: Option<usize>,
    /// Documents with more lines are indexed in degraded mode.
    pub large_file_lines: usize,
    /// Output directory.
    pub out: PathBuf,
    /// Write outputs; `false` is a dry run that only counts.
    pub persist: bool,
    /// Skip assemblies listed in the resume marker instead of wiping the output.
    pub resume: bool,
    /// Render every document without semantics.
    pub skip_semantics: bool,
}

/// Running totals shared by every worker.
#[derive(Debug, Default)]
pub struct Counters {
    bytes: AtomicU64,
    documents: AtomicU64,
    failed_documents: AtomicU64,
    lines: AtomicU64,
    references: AtomicU64,
}

fn bump(counter: &AtomicU64, amount: usize) {
    counter.fetch_add(u64::try_from(amount).unwrap_or(u64::MAX), Ordering::Relaxed);
}

/// Totals reported when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Bytes of source text indexed.
    pub bytes: u64,
    /// Distinct declared symbols written to the master index.
    pub declarations: u64,
    /// Documents indexed, including failed ones.
    pub documents: u64,
    /// Documents whose frontend failed; written unlinked.
    pub failed_documents: u64,
    /// Lines of source text indexed.
    pub lines: u64,
    /// Projects indexed in this run.
    pub projects: u64,
    /// References recorded.
    pub references: u64,
    /// Projects skipped as duplicates or as already processed.
    pub skipped_projects: u64,
}

/// What a finished project hands to the aggregator.
#[derive(Debug)]
struct ProjectDone {
    assembly: String,
    declared: Vec<DeclaredSymbolRecord>,
}

/// State shared by every worker of a run.
struct Run<'r> {
    /// Assemblies with a project in the solution.
    assemblies: HashSet<String>,
    counters: Counters,
    failures: FailureLog,
    federation: &'r Federation,
    forwards: ForwardingTable,
    options: &'r IndexOptions,
    references: ReferenceWriter,
    solution: &'r Solution,
}

// ── Output directory ──────────────────────────────────────────────────

fn read_processed(out: &Path) -> Result<HashSet<String>, Error> {
    let content = match std::fs::read_to_string(out.join(PROCESSED_ASSEMBLIES_FILE)) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(Error::Io(e)),
        Ok(content) => content,
    };
    return Ok(content.lines().map(str::trim).filter(|line| return !line.is_empty()).map(str::to_string).collect());
}

/// Make `out` ready for writing and return the assemblies a resumed run skips.
///
/// Outputs are append-only, so a run that does not resume starts from an
/// empty directory. Only a directory that already holds an index is wiped.
///
/// # Errors
///
/// Returns `Error::OutputNotDirectory` if `out` is a file,
/// `Error::OutputNotEmpty` if it holds files but no index, or `Error::Io`.
fn prepare_output(out: &Path, resume: bool) -> Result<HashSet<String>, Error> {
    if out.exists() && !out.is_dir() {
        return Err(Error::OutputNotDirectory { path: out.to_path_buf() });
    }
    if resume {
        let processed = read_processed(out)?;
        tracing::info!(out = %out.display(), processed = processed.len(), "resuming previous run");
        std::fs::create_dir_all(out)?;
        return Ok(processed);
    }

    if out.is_dir() && std::fs::read_dir(out)?.next().is_some() {
        let is_index = out.join(ASSEMBLIES_FILE).exists() || out.join(PROCESSED_ASSEMBLIES_FILE).exists();
        if !is_index {
            return Err(Error::OutputNotEmpty { path: out.to_path_buf() });
        }
        tracing::warn!(out = %out.display(), "deleting the previous index: outputs are append-only; pass --resume to continue it instead");
        std::fs::remove_dir_all(out)?;
    }
    std::fs::create_dir_all(out)?;
    return Ok(HashSet::new());
}

fn mark_processed(out: &Path, assembly: &str) -> Result<(), Error> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(out.join(PROCESSED_ASSEMBLIES_FILE))?;
    writeln!(file, "{assembly}")?;
    return Ok(());
}

/// First project of every assembly name; later duplicates are reported and dropped.
fn distinct_projects(solution: &Solution) -> (Vec<&Project>, u64) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::with_capacity(solution.projects.len());
    let mut duplicates = 0_u64;
    for project in &solution.projects {
        if seen.insert(project.assembly_name.as_str()) {
            kept.push(project);
        } else {
            duplicates = duplicates.saturating_add(1);
            tracing::warn!(
                assembly = %project.assembly_name,
                project = project.project_path.as_deref().unwrap_or("-"),
                "duplicate assembly name; keeping the first project"
            );
        }
    }
    return (kept, duplicates);
}

/// `(assembly, project path)` pairs for the project map: every project plus
/// every referenced assembly that has none.
fn project_pairs(projects: &[&Project]) -> Vec<(String, Option<String>)> {
    let mut pairs: Vec<(String, Option<String>)> =
        projects.iter().map(|project| return (project.assembly_name.clone(), project.project_path.clone())).collect();
    let known: HashSet<String> = pairs.iter().map(|(assembly, _)| return assembly.clone()).collect();
    let mut referenced: Vec<String> = projects
        .iter()
        .flat_map(|project| return project.references.iter())
        .filter(|assembly| return !known.contains(*assembly))
        .cloned()
        .collect();
    referenced.sort();
    referenced.dedup();
    pairs.extend(referenced.into_iter().map(|assembly| return (assembly, None)));
    return pairs;
}

// ── Workers ───────────────────────────────────────────────────────────

impl Run<'_> {
    fn index_project(&self, project: &Project) -> Result<ProjectDone, Error> {
        let accumulator = ProjectAccumulator::new(&project.assembly_name);
        let ctx = ProjectContext {
            accumulator: &accumulator,
            assembly: &project.assembly_name,
            failures: &self.failures,
            federation: self.federation,
            forwards: &self.forwards,
            language: project.language,
            semantic_facts: project.semantic_facts.as_ref(),
            solution_assemblies: &self.assemblies,
            symbols: &self.solution.symbols,
            syntax_facts: project.syntax_facts.as_ref(),
        };

        let threads = rayon::current_num_threads().max(1);
        let chunk_size = project.documents.len().div_ceil(threads).max(1);
        project.documents.par_chunks(chunk_size).try_for_each(|chunk| {
            for document in chunk {
                self.index_document(&ctx, document.as_ref())?;
            }
            return Ok::<(), Error>(());
        })?;

        accumulator.fill_missing_locations();
        let declared = accumulator.declared_symbols();
        if self.options.persist {
            self.write_project(&accumulator, &declared)?;
        }
        let references = accumulator.reference_count();
        self.counters.references.fetch_add(references, Ordering::Relaxed);
        tracing::info!(
            assembly = %project.assembly_name,
            documents = project.documents.len(),
            references,
            declarations = accumulator.declared_count(),
            "indexed project"
        );
        return Ok(ProjectDone { assembly: project.assembly_name.clone(), declared });
    }

    /// Load, classify, resolve and render one document.
    ///
    /// Loading and resolving both run under `catch_unwind`. Records are staged
    /// in a per-document accumulator and reach the project only once the page
    /// is complete, so a frontend panic leaves nothing half-recorded.
    fn index_document(&self, ctx: &ProjectContext<'_>, document: &dyn DocumentSource) -> Result<(), Error> {
        let path = document.path();
        bump(&self.counters.documents, 1);
        let mut loaded = match panic::catch_unwind(AssertUnwindSafe(|| return document.load())) {
            Ok(Ok(loaded)) => loaded,
            Ok(Err(e)) => return self.write_unlinked(ctx.assembly, document, &e.to_string()),
            Err(_panic) => return self.write_unlinked(ctx.assembly, document, "frontend panicked while loading"),
        };
        if self.options.skip_semantics {
            loaded.semantics = None;
        }

        let lines = loaded.text.lines().count();
        let is_large = lines > self.options.large_file_lines;
        let staged = ProjectAccumulator::new(ctx.assembly);
        let document_ctx = ProjectContext { accumulator: &staged, ..*ctx };
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| return render_document(&document_ctx, path, &loaded, is_large)));
        let Ok((page, ranges)) = rendered else {
            return self.write_unlinked(ctx.assembly, document, "frontend panicked while resolving");
        };
        ctx.accumulator.absorb(staged);
        bump(&self.counters.lines, lines);
        bump(&self.counters.bytes, loaded.text.len());
        tracing::debug!(assembly = ctx.assembly, path, lines, large = is_large, ranges, "indexed document");

        if self.options.persist {
            render::write_page(&self.options.out, ctx.assembly, path, &page)?;
        }
        return Ok(());
    }

    /// A document the frontend could not load or resolve is written as plain text.
    fn write_unlinked(&self, assembly: &str, document: &dyn DocumentSource, reason: &str) -> Result<(), Error> {
        bump(&self.counters.failed_documents, 1);
        tracing::error!(assembly, path = document.path(), reason, "document failed; writing it unlinked");
        if !self.options.persist {
            return Ok(());
        }
        let Some(text) = document.raw_text() else {
            return Ok(());
        };
        bump(&self.counters.lines, text.lines().count());
        bump(&self.counters.bytes, text.len());
        let page = render::plain_page(assembly, document.path(), &text);
        return render::write_page(&self.options.out, assembly, document.path(), &page);
    }

    fn write_project(&self, accumulator: &ProjectAccumulator, declared: &[DeclaredSymbolRecord]) -> Result<(), Error> {
        let dir = self.options.out.join(accumulator.assembly());
        std::fs::create_dir_all(&dir)?;
        serialization::write_declared_symbols(&dir, declared)?;

        let locations = accumulator.declaration_locations();
        serialization::append_declaration_map(&dir, &locations)?;
        redirect::write_redirects(&dir, &locations)?;
        redirect::write_partial_pages(&dir, &accumulator.partial_types())?;

        for (target, buckets) in accumulator.references() {
            self.references.append(&target, &buckets)?;
        }
        serialization::write_member_map(&dir.join(BASE_MEMBERS_FILE), &accumulator.base_members())?;
        serialization::write_member_map(&dir.join(IMPLEMENTED_INTERFACE_MEMBERS_FILE), &accumulator.implemented_interface_members())?;
        return Ok(());
    }
}

/// Classify and resolve every range of a loaded document into its page.
/// Returns the finished HTML and the number of ranges.
fn render_document(ctx: &ProjectContext<'_>, path: &str, loaded: &AnalyzedDocument, is_large: bool) -> (String, usize) {
    let ranges = classifier::classify(&loaded.text, &loaded.spans);
    let mut page = HtmlPage::begin(ctx.assembly, path);
    let mut resolver = DocumentResolver::new(ctx, path, loaded, is_large);
    for range in &ranges {
        let anchor = page.position();
        let link = resolver.resolve_range(range);
        page.write_range(range, link.as_ref());
        resolver.record_declaration(anchor);
    }
    return (page.finish(), ranges.len());
}

// ── Aggregation ───────────────────────────────────────────────────────

/// Inputs of the solution-wide tables.
struct Aggregate<'a> {
    /// Set when a worker failed; global tables are then left unwritten.
    aborted: &'a AtomicBool,
    out: &'a Path,
    pairs: Vec<(String, Option<String>)>,
    persist: bool,
    /// Assemblies finished by an earlier run; their `D.txt` is read back.
    resumed: Vec<String>,
}

fn read_declared(out: &Path, assembly: &str) -> Result<Vec<DeclaredSymbolRecord>, Error> {
    let file = out.join(assembly).join(DECLARED_SYMBOLS_FILE);
    return match std::fs::read_to_string(&file) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::Io(e)),
        Ok(content) => serialization::parse_declared_symbols(&file, &content),
    };
}

/// Collect finished projects, then write the project map and master index.
/// Returns the number of declared symbols indexed.
fn aggregate(receiver: &Receiver<ProjectDone>, input: Aggregate<'_>) -> Result<u64, Error> {
    let mut declared: Vec<(String, Vec<DeclaredSymbolRecord>)> = Vec::new();
    let mut failure: Option<Error> = None;
    for done in receiver {
        if input.persist
            && failure.is_none()
            && let Err(e) = mark_processed(input.out, &done.assembly)
        {
            failure = Some(e);
        }
        declared.push((done.assembly, done.declared));
    }
    if let Some(e) = failure {
        return Err(e);
    }
    if input.aborted.load(Ordering::Relaxed) {
        return Ok(0);
    }
    if input.persist {
        for assembly in input.resumed {
            let records = read_declared(input.out, &assembly)?;
            declared.push((assembly, records));
        }
    }

    let map = project_map::normalize(&input.pairs);
    let mut entries: Vec<MasterEntry> = Vec::new();
    for (assembly, records) in declared {
        let Some(number) = map.assemblies.iter().position(|(name, _)| return *name == assembly) else {
            continue;
        };
        entries.extend(records.into_iter().map(|record| return MasterEntry { assembly: number, record }));
    }
    let count = u64::try_from(entries.len()).unwrap_or(u64::MAX);
    if input.persist {
        map.write(input.out)?;
        master_index::write(input.out, entries)?;
    }
    return Ok(count);
}

// ── Entry point ───────────────────────────────────────────────────────

/// Index every project of `solution` into `options.out`.
///
/// # Errors
///
/// Returns `Error::OutputNotDirectory` or `Error::OutputNotEmpty` for an
/// unusable output directory, or `Error::Io` when a file cannot be written.
/// Documents that fail to load never fail the run; they are counted in
/// `RunSummary::failed_documents`.
pub fn generate(solution: &Solution, federation: &Federation, options: &IndexOptions) -> Result<RunSummary, Error> {
    let processed = if options.persist { prepare_output(&options.out, options.resume)? } else { HashSet::new() };
    let (distinct, duplicates) = distinct_projects(solution);
    let pairs = project_pairs(&distinct);
    let (resumed, pending): (Vec<&Project>, Vec<&Project>) =
        distinct.into_iter().partition(|project| return processed.contains(&project.assembly_name));
    for project in &resumed {
        tracing::info!(assembly = %project.assembly_name, "already processed; skipping");
    }

    let run = Run {
        assemblies: solution.projects.iter().map(|project| return project.assembly_name.clone()).collect(),
        counters: Counters::default(),
        failures: FailureLog::new(),
        federation,
        forwards: ForwardingTable::new(&solution.type_forwards),
        options,
        references: ReferenceWriter::new(&options.out),
        solution,
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.unwrap_or(0))
        .build()
        .map_err(|e| return Error::Io(std::io::Error::other(e)))?;

    let aborted = AtomicBool::new(false);
    let input = Aggregate {
        aborted: &aborted,
        out: &options.out,
        pairs,
        persist: options.persist,
        resumed: resumed.iter().map(|project| return project.assembly_name.clone()).collect(),
    };
    let (worked, declarations) = thread::scope(|scope| {
        let (sender, receiver) = crossbeam_channel::unbounded::<ProjectDone>();
        let aggregator = scope.spawn(move || return aggregate(&receiver, input));
        let worked = pool.install(|| {
            return pending.par_iter().try_for_each(|project| {
                let done = run.index_project(project).inspect_err(|_e| {
                    aborted.store(true, Ordering::Relaxed);
                })?;
                if sender.send(done).is_err() {
                    tracing::warn!(assembly = %project.assembly_name, "aggregator stopped before the project finished");
                }
                return Ok::<(), Error>(());
            });
        });
        drop(sender);
        let declarations = aggregator.join().unwrap_or_else(|_panic| return Err(Error::Io(std::io::Error::other("aggregator panicked"))));
        return (worked, declarations);
    });
    worked?;
    let declarations = declarations?;

    let counters = &run.counters;
    let summary = RunSummary {
        bytes: counters.bytes.load(Ordering::Relaxed),
        declarations,
        documents: counters.documents.load(Ordering::Relaxed),
        failed_documents: counters.failed_documents.load(Ordering::Relaxed),
        lines: counters.lines.load(Ordering::Relaxed),
        projects: u64::try_from(pending.len()).unwrap_or(u64::MAX),
        references: counters.references.load(Ordering::Relaxed),
        skipped_projects: duplicates.saturating_add(u64::try_from(resumed.len()).unwrap_or(u64::MAX)),
    };
    tracing::info!(
        projects = summary.projects,
        documents = summary.documents,
        failed = summary.failed_documents,
        references = summary.references,
        declarations = summary.declarations,
        frontend_inconsistencies = run.failures.distinct(),
        "index finished"
    );
    return Ok(summary);
}
