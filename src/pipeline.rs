//! The analysis pipeline.
//!
//! Turns a list of source files into a [`CodeGraph`] in three phases:
//! 1. Extraction, in parallel with rayon. Each file is read, parsed and
//!    tagged without touching shared state.
//! 2. Merge, single-threaded and strictly in scan order. Exports and import
//!    aliases go into the [`SymbolIndex`], definitions become nodes, and
//!    references are buffered.
//! 3. Resolution, once every file has been merged
//!    ([`crate::resolver::resolve_references`]).
//!
//! All run state lives in an [`AnalysisContext`] created at the start of the
//! run and dropped at its end.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{ExtractError, RepographError, ScanError};
use crate::extractor::{ExtractOptions, Lang, TagExtractor, detect_language};
use crate::globals::GlobalSymbols;
use crate::graph::{CodeGraph, Graph, GraphStore};
use crate::progress::{Phase, Progress};
use crate::resolver::{ResolutionStats, resolve_references};
use crate::symbols::{SymbolIndex, resolve_specifier};
use crate::types::{FileTags, Tag};
use crate::walker::Walker;

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

/// Per-run knobs, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub extract: ExtractOptions,
    pub extra_globals: Vec<String>,
    pub max_file_size_kb: u64,
    pub timestamps: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AnalysisOptions {
    fn from(config: &Config) -> Self {
        Self {
            extract: ExtractOptions {
                include_text: config.extract.include_text,
                strict_syntax: config.extract.strict_syntax,
            },
            extra_globals: config.extract.extra_globals.clone(),
            max_file_size_kb: config.scan.max_file_size_kb,
            timestamps: config.output.timestamps,
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files that got a File node, including those that failed to parse.
    pub files_processed: usize,
    pub files_failed_parse: usize,
    /// Files that could not be read or are not a supported language.
    pub files_skipped: usize,
    pub definitions: usize,
    pub references: usize,
    pub resolution: ResolutionStats,
    pub nodes: usize,
    pub edges: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Mutable state of one analysis run, threaded through every stage.
#[derive(Debug)]
pub struct AnalysisContext {
    pub repo_root: PathBuf,
    pub symbols: SymbolIndex,
    pub store: GraphStore,
    /// References waiting for the resolution pass, in merge order.
    pub references: Vec<Tag>,
    /// Repo-relative paths of every file submitted to the run.
    known_files: HashSet<String>,
}

impl AnalysisContext {
    pub fn new(repo_root: &Path, repo_id: &str, timestamps: bool) -> Self {
        let created_at = timestamps.then(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
        Self {
            repo_root: repo_root.to_path_buf(),
            symbols: SymbolIndex::new(),
            store: GraphStore::new(repo_id, repo_root, created_at),
            references: Vec::new(),
            known_files: HashSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file extraction (parallel phase)
// ---------------------------------------------------------------------------

/// What the parallel phase produced for one file.
enum FileOutcome {
    Extracted {
        rel_path: String,
        lang: Lang,
        line_count: usize,
        tags: FileTags,
    },
    ParseFailed {
        rel_path: String,
        line_count: usize,
        error: ExtractError,
    },
    Unsupported(String),
    Unreadable(ScanError),
}

/// Repo-relative path with `/` separators.
pub fn relative_path(path: &Path, repo_root: &Path) -> String {
    path.strip_prefix(repo_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Read a candidate file, enforcing the size limit and UTF-8.
pub fn read_source(path: &Path, max_file_size_kb: u64) -> Result<String, ScanError> {
    let meta = std::fs::metadata(path).map_err(|source| ScanError::Access {
        path: path.to_path_buf(),
        source,
    })?;
    let size_kb = meta.len().div_ceil(1024);
    if size_kb > max_file_size_kb {
        return Err(ScanError::TooLarge {
            path: path.to_path_buf(),
            size_kb,
            limit_kb: max_file_size_kb,
        });
    }
    let bytes = std::fs::read(path).map_err(|source| ScanError::Access {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| ScanError::NotUtf8(path.to_path_buf()))
}

fn extract_one(path: &Path, repo_root: &Path, extractor: &TagExtractor, max_kb: u64) -> FileOutcome {
    let rel_path = relative_path(path, repo_root);
    let Some(lang) = detect_language(path) else {
        return FileOutcome::Unsupported(rel_path);
    };
    let source = match read_source(path, max_kb) {
        Ok(s) => s,
        Err(e) => return FileOutcome::Unreadable(e),
    };
    let line_count = source.lines().count();
    match extractor.extract(&source, &rel_path, lang) {
        Ok(tags) => FileOutcome::Extracted {
            rel_path,
            lang,
            line_count,
            tags,
        },
        Err(error) => FileOutcome::ParseFailed {
            rel_path,
            line_count,
            error,
        },
    }
}

// ---------------------------------------------------------------------------
// Merge (single writer)
// ---------------------------------------------------------------------------

/// Fold one file's extraction result into the run state.
fn merge(ctx: &mut AnalysisContext, outcome: FileOutcome, summary: &mut RunSummary) {
    match outcome {
        FileOutcome::Extracted {
            rel_path,
            lang,
            line_count,
            tags,
        } => {
            let file_id = ctx.store.ensure_file_node(&rel_path, line_count);

            ctx.symbols.record_exports(&rel_path, tags.exports);
            if let Some(name) = &tags.default_export {
                ctx.symbols.record_default_export(&rel_path, name);
            }
            for binding in &tags.imports {
                let known = &ctx.known_files;
                let Some(source) =
                    resolve_specifier(&rel_path, &binding.specifier, lang, |p| known.contains(p))
                else {
                    continue;
                };
                if !ctx
                    .symbols
                    .resolve_import_alias(&binding.local, &source, &binding.imported)
                {
                    debug!(
                        file = %rel_path,
                        import = %binding.imported,
                        from = %source,
                        "import not linked: source export not known yet"
                    );
                }
            }

            for mut tag in tags.tags {
                if tag.is_definition() {
                    ctx.symbols
                        .record_definition(&tag.name, tag.tag_type, &tag.file_path, tag.start_line);
                    ctx.store.add_definition_node(&file_id, &tag);
                    summary.definitions += 1;
                } else {
                    if let Some((origin, _)) = ctx.symbols.alias(&tag.name) {
                        tag.target_file = Some(origin.to_string());
                    }
                    ctx.references.push(tag);
                    summary.references += 1;
                }
            }
            summary.files_processed += 1;
        }
        FileOutcome::ParseFailed {
            rel_path,
            line_count,
            error,
        } => {
            warn!(file = %rel_path, error = %error, "parse failed; file kept without tags");
            ctx.store.ensure_file_node(&rel_path, line_count);
            summary.files_failed_parse += 1;
            summary.files_processed += 1;
        }
        FileOutcome::Unsupported(rel_path) => {
            debug!(file = %rel_path, "unsupported language; skipped");
            summary.files_skipped += 1;
        }
        FileOutcome::Unreadable(error) => {
            warn!(error = %error, "skipping file");
            summary.files_skipped += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Analyze `files` (absolute paths under `repo_root`, in scan order).
///
/// Never fails: unreadable and unparsable files are counted in the summary
/// and the graph is always produced.
pub fn run(
    repo_root: &Path,
    files: &[PathBuf],
    repo_id: &str,
    options: &AnalysisOptions,
    progress: &Progress,
) -> (CodeGraph, RunSummary) {
    let start = Instant::now();
    let extractor = TagExtractor::new(
        GlobalSymbols::with_extra(options.extra_globals.iter().cloned()),
        options.extract,
    );

    let mut ctx = AnalysisContext::new(repo_root, repo_id, options.timestamps);
    ctx.known_files = files.iter().map(|p| relative_path(p, repo_root)).collect();

    progress.begin(Phase::Extract, files.len());
    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| {
            let outcome = extract_one(path, repo_root, &extractor, options.max_file_size_kb);
            progress.file_extracted(!matches!(outcome, FileOutcome::ParseFailed { .. }));
            outcome
        })
        .collect();

    let mut summary = RunSummary::default();
    progress.begin(Phase::Merge, outcomes.len());
    for outcome in outcomes {
        merge(&mut ctx, outcome, &mut summary);
        progress.step(1);
    }

    let references = std::mem::take(&mut ctx.references);
    progress.begin(Phase::Resolve, references.len());
    summary.resolution = resolve_references(&mut ctx.store, &ctx.symbols, &references);
    progress.step(references.len());

    let graph = ctx.store.freeze();
    summary.nodes = graph.number_of_nodes();
    summary.edges = graph.number_of_edges();
    summary.elapsed = start.elapsed();

    info!(
        files = summary.files_processed,
        failed = summary.files_failed_parse,
        skipped = summary.files_skipped,
        definitions = summary.definitions,
        references = summary.references,
        nodes = summary.nodes,
        edges = summary.edges,
        "graph assembled"
    );
    progress.finish(&summary);
    (graph, summary)
}

/// Walk `repo_root` with the configured scan rules and analyze every file.
pub fn analyze_repo(
    repo_root: &Path,
    repo_id: &str,
    config: &Config,
    progress: &Progress,
) -> Result<(CodeGraph, RunSummary)> {
    let files = Walker::with_config(repo_root, &config.scan).collect_paths()?;
    Ok(run(
        repo_root,
        &files,
        repo_id,
        &AnalysisOptions::from(config),
        progress,
    ))
}

/// Extract the tags of a single file, without any cross-file linkage.
pub fn file_tags(path: &Path, repo_root: &Path, config: &Config) -> Result<FileTags, RepographError> {
    let options = AnalysisOptions::from(config);
    let rel_path = relative_path(path, repo_root);
    let source = read_source(path, options.max_file_size_kb)?;
    let extractor = TagExtractor::new(
        GlobalSymbols::with_extra(options.extra_globals),
        options.extract,
    );
    Ok(extractor.extract_path(path, &rel_path, &source)?)
}
