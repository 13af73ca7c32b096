//! Output formatting: plain text (default) and JSON (`--json`).
//!
//! Run summaries and tag listings flow through a [`Formatter`] which writes
//! to an arbitrary [`std::io::Write`] destination (typically stdout). The
//! graph export goes to a file via [`write_graph`]. Hints and errors always
//! go to stderr via [`print_hint`] and [`print_error`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::graph::CodeGraph;
use crate::pipeline::RunSummary;
use crate::resolver::ResolutionStats;
use crate::types::{ImportBinding, Tag, TagKind};

// ---------------------------------------------------------------------------
// Serializable output types
// ---------------------------------------------------------------------------

/// The JSON shape of a [`RunSummary`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub repo_id: String,
    pub files_processed: usize,
    pub files_failed_parse: usize,
    pub files_skipped: usize,
    pub definitions: usize,
    pub references: usize,
    pub resolution: ResolutionStats,
    pub nodes: usize,
    pub edges: usize,
    pub elapsed_ms: u128,
    /// Where the graph was written, when `--out` was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_file: Option<String>,
}

impl SummaryOutput {
    pub fn new(repo_id: &str, summary: &RunSummary, graph_file: Option<&Path>) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            files_processed: summary.files_processed,
            files_failed_parse: summary.files_failed_parse,
            files_skipped: summary.files_skipped,
            definitions: summary.definitions,
            references: summary.references,
            resolution: summary.resolution,
            nodes: summary.nodes,
            edges: summary.edges,
            elapsed_ms: summary.elapsed.as_millis(),
            graph_file: graph_file.map(|p| p.display().to_string()),
        }
    }
}

/// One line of `repograph tags --json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "record")]
pub enum TagListing<'a> {
    Tag(&'a Tag),
    Export { name: &'a str },
    Import(&'a ImportBinding),
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Output formatter that renders results either as aligned text or as JSON.
pub struct Formatter<W: Write> {
    writer: W,
    json: bool,
}

impl<W: Write> Formatter<W> {
    /// Create a new formatter.
    ///
    /// * `writer` - The destination for output (e.g. `std::io::stdout()`).
    /// * `json`   - When `true`, emit JSON; otherwise, emit text.
    pub fn new(writer: W, json: bool) -> Self {
        Self { writer, json }
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        let line = serde_json::to_string(value).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Format the end-of-run summary.
    pub fn format_summary(&mut self, summary: &SummaryOutput) -> std::io::Result<()> {
        if self.json {
            return self.write_json(summary);
        }
        let res = &summary.resolution;
        writeln!(self.writer, "repo        {}", summary.repo_id)?;
        writeln!(
            self.writer,
            "files       {} processed, {} failed to parse, {} skipped",
            summary.files_processed, summary.files_failed_parse, summary.files_skipped
        )?;
        writeln!(
            self.writer,
            "tags        {} definitions, {} references",
            summary.definitions, summary.references
        )?;
        writeln!(
            self.writer,
            "resolution  {} resolved, {} unresolved, {} orphaned",
            res.resolved,
            res.unresolved,
            res.orphaned()
        )?;
        writeln!(
            self.writer,
            "graph       {} nodes, {} edges",
            summary.nodes, summary.edges
        )?;
        if let Some(ref path) = summary.graph_file {
            writeln!(self.writer, "written     {path}")?;
        }
        writeln!(self.writer, "elapsed     {}ms", summary.elapsed_ms)
    }

    /// Format a single tag.
    ///
    /// Text format: `file:line:  kind type name` with the enclosing scope
    /// appended as `(in Parent)`.
    pub fn format_tag(&mut self, tag: &Tag) -> std::io::Result<()> {
        if self.json {
            return self.write_json(&TagListing::Tag(tag));
        }
        let kind = match tag.kind {
            TagKind::Definition => "def",
            TagKind::Reference => "ref",
        };
        write!(
            self.writer,
            "{}:{}:  {kind} {} {}",
            tag.file_path, tag.start_line, tag.tag_type, tag.name
        )?;
        if let Some(ref parent) = tag.parent {
            write!(self.writer, " (in {})", parent.name)?;
        }
        writeln!(self.writer)
    }

    /// Format an exported name of the listed file.
    pub fn format_export(&mut self, file: &str, name: &str) -> std::io::Result<()> {
        if self.json {
            return self.write_json(&TagListing::Export { name });
        }
        writeln!(self.writer, "{file}:  export {name}")
    }

    /// Format an import binding of the listed file.
    pub fn format_import(&mut self, file: &str, import: &ImportBinding) -> std::io::Result<()> {
        if self.json {
            return self.write_json(&TagListing::Import(import));
        }
        if import.local == import.imported {
            writeln!(self.writer, "{file}:  import {} from {}", import.local, import.specifier)
        } else {
            writeln!(
                self.writer,
                "{file}:  import {} as {} from {}",
                import.imported, import.local, import.specifier
            )
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Graph export
// ---------------------------------------------------------------------------

/// Write `graph` to `path` as `{ "nodes": [...], "edges": [...] }`.
pub fn write_graph(path: &Path, graph: &CodeGraph) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create graph file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, graph)
        .with_context(|| format!("failed to write graph file: {}", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Stderr helpers
// ---------------------------------------------------------------------------

/// Print a hint message to stderr (suppressed when `json` is true).
pub fn print_hint(msg: &str, json: bool) {
    if !json {
        eprintln!("hint: {msg}");
    }
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("error: {msg}");
}

/// Format a [`RepographError`](crate::errors::RepographError) to stderr with
/// structured `error:` / `hint:` lines.
///
/// * Always prints `error: <message>` to stderr.
/// * When `json` is `false` and the error carries a contextual hint, also
///   prints `hint: <suggestion>` to stderr.
/// * Returns the appropriate process exit code.
pub fn format_error(err: &crate::errors::RepographError, json: bool) -> i32 {
    print_error(&format!("{err:#}"));
    if let Some(hint) = err.hint() {
        print_hint(hint, json);
    }
    err.exit_code()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::{Location, ParentRef, TagType};

    /// Helper: renders output into a String.
    fn render<F>(json: bool, f: F) -> String
    where
        F: FnOnce(&mut Formatter<&mut Vec<u8>>) -> std::io::Result<()>,
    {
        let mut buf = Vec::new();
        {
            let mut fmt = Formatter::new(&mut buf, json);
            f(&mut fmt).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    fn summary() -> SummaryOutput {
        let run = RunSummary {
            files_processed: 3,
            files_failed_parse: 1,
            files_skipped: 2,
            definitions: 10,
            references: 7,
            resolution: ResolutionStats {
                resolved: 4,
                unresolved: 2,
                missing_file_nodes: 0,
                missing_definition_nodes: 1,
            },
            nodes: 20,
            edges: 25,
            elapsed: Duration::from_millis(42),
        };
        SummaryOutput::new("abc123", &run, None)
    }

    fn method_tag() -> Tag {
        Tag {
            name: "run".into(),
            tag_type: TagType::Method,
            kind: TagKind::Definition,
            file_path: "src/a.ts".into(),
            target_file: None,
            start_line: 3,
            end_line: 5,
            text: None,
            parent: Some(ParentRef {
                name: "Runner".into(),
                tag_type: TagType::Class,
                location: Location {
                    file_path: "src/a.ts".into(),
                    start_line: 1,
                },
            }),
        }
    }

    #[test]
    fn summary_text_lists_every_counter() {
        let out = render(false, |fmt| fmt.format_summary(&summary()));
        assert!(out.contains("3 processed, 1 failed to parse, 2 skipped"), "got: {out}");
        assert!(out.contains("4 resolved, 2 unresolved, 1 orphaned"), "got: {out}");
        assert!(out.contains("20 nodes, 25 edges"), "got: {out}");
        assert!(!out.contains("written"));
    }

    #[test]
    fn summary_json_uses_camel_case() {
        let out = render(true, |fmt| fmt.format_summary(&summary()));
        let v: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["repoId"], "abc123");
        assert_eq!(v["filesFailedParse"], 1);
        assert_eq!(v["resolution"]["missingDefinitionNodes"], 1);
        assert_eq!(v["elapsedMs"], 42);
        assert!(v.get("graphFile").is_none());
    }

    #[test]
    fn tag_text_format_includes_parent() {
        let out = render(false, |fmt| fmt.format_tag(&method_tag()));
        assert_eq!(out, "src/a.ts:3:  def method run (in Runner)\n");
    }

    #[test]
    fn tag_json_is_one_line_per_record() {
        let import = ImportBinding {
            local: "h".into(),
            imported: "helper".into(),
            specifier: "./util".into(),
        };
        let out = render(true, |fmt| {
            fmt.format_tag(&method_tag())?;
            fmt.format_export("src/a.ts", "Runner")?;
            fmt.format_import("src/a.ts", &import)
        });
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["record"], "tag");
        assert_eq!(lines[0]["type"], "Method");
        assert_eq!(lines[0]["parent"]["name"], "Runner");
        assert_eq!(lines[1]["record"], "export");
        assert_eq!(lines[1]["name"], "Runner");
        assert_eq!(lines[2]["record"], "import");
        assert_eq!(lines[2]["imported"], "helper");
    }

    #[test]
    fn import_text_shows_rename() {
        let import = ImportBinding {
            local: "h".into(),
            imported: "helper".into(),
            specifier: "./util".into(),
        };
        let out = render(false, |fmt| fmt.format_import("b.ts", &import));
        assert_eq!(out, "b.ts:  import helper as h from ./util\n");
    }

    #[test]
    fn graph_export_has_nodes_and_edges() {
        use crate::graph::GraphStore;

        let dir = tempfile::tempdir().unwrap();
        let mut store = GraphStore::new("r", dir.path(), None);
        store.ensure_file_node("src/a.ts", 4);
        let graph = store.freeze();

        let out = dir.path().join("graph.json");
        write_graph(&out, &graph).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        // repository, folder, file
        assert_eq!(v["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(v["edges"].as_array().unwrap().len(), 2);
        assert_eq!(v["edges"][0]["type"], "Contains");
        assert!(v.get("repoId").is_none());
    }

    #[test]
    fn format_error_returns_exit_code() {
        let err = crate::errors::RepographError::Usage("no such path".into());
        assert_eq!(format_error(&err, true), crate::errors::EXIT_USAGE);
    }
}
