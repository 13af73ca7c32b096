//! Command dispatch: turns parsed CLI arguments into pipeline runs and
//! formatted output.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::{BuildArgs, Cli, Command, TagsArgs};
use crate::config::{Config, OutputFormat};
use crate::errors::RepographError;
use crate::graph::repo_id_for;
use crate::output::{Formatter, SummaryOutput, write_graph};
use crate::pipeline::{analyze_repo, file_tags};
use crate::progress::{Progress, detect_mode};

pub fn dispatch(cli: Cli) -> Result<(), RepographError> {
    match cli.command {
        Command::Build(ref args) => build(args, cli.json, cli.quiet),
        Command::Tags(ref args) => tags(args, cli.json),
    }
}

/// `--json` on the command line wins over `[output] format`.
fn wants_json(flag: bool, config: &Config) -> bool {
    flag || config.output.format == OutputFormat::Json
}

/// Canonicalize a directory argument; a missing or non-directory path is a
/// usage error.
fn repo_root(path: &Path) -> Result<PathBuf, RepographError> {
    let root = path.canonicalize().map_err(|e| {
        RepographError::Usage(format!("cannot open {}: {e}", path.display()))
    })?;
    if !root.is_dir() {
        return Err(RepographError::Usage(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(root)
}

fn build(args: &BuildArgs, json_flag: bool, quiet: bool) -> Result<(), RepographError> {
    let root = repo_root(&args.path)?;
    let config = Config::load(Some(&root))?;
    let json = wants_json(json_flag, &config);
    let repo_id = args.repo_id.clone().unwrap_or_else(|| repo_id_for(&root));
    debug!(root = %root.display(), repo_id = %repo_id, "building graph");

    let progress = Progress::new(detect_mode(json || quiet));
    let (graph, summary) = analyze_repo(&root, &repo_id, &config, &progress)?;

    if let Some(ref out) = args.out {
        write_graph(out, &graph)?;
    }

    let stdout = std::io::stdout();
    let mut fmt = Formatter::new(stdout.lock(), json);
    fmt.format_summary(&SummaryOutput::new(graph.repo_id(), &summary, args.out.as_deref()))?;
    fmt.flush()?;
    Ok(())
}

fn tags(args: &TagsArgs, json_flag: bool) -> Result<(), RepographError> {
    let cwd = Path::new(".");
    let config = Config::load(Some(cwd))?;
    let json = wants_json(json_flag, &config);
    let extracted = file_tags(&args.file, cwd, &config)?;

    let stdout = std::io::stdout();
    let mut fmt = Formatter::new(stdout.lock(), json);
    let file = args.file.to_string_lossy();
    for tag in &extracted.tags {
        fmt.format_tag(tag)?;
    }
    for name in &extracted.exports {
        fmt.format_export(&file, name)?;
    }
    for import in &extracted.imports {
        fmt.format_import(&file, import)?;
    }
    fmt.flush()?;
    Ok(())
}
