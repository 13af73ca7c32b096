//! Build a typed code graph from a source tree.
//!
//! A run walks the repository, extracts definition and reference [`Tag`]s
//! from every supported file in parallel, merges them in scan order into a
//! [`SymbolIndex`] and a [`GraphStore`], then resolves references into
//! `References` edges once every file is known.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use repograph::config::Config;
//! use repograph::graph::{Graph, repo_id_for};
//! use repograph::pipeline::analyze_repo;
//! use repograph::progress::Progress;
//!
//! # fn main() -> anyhow::Result<()> {
//! let root = Path::new(".").canonicalize()?;
//! let config = Config::load(Some(&root))?;
//! let (graph, summary) = analyze_repo(&root, &repo_id_for(&root), &config, &Progress::silent())?;
//! println!("{} nodes, {} resolved", graph.number_of_nodes(), summary.resolution.resolved);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod globals;
pub mod graph;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod router;
pub mod symbols;
pub mod types;
pub mod walker;

pub use errors::RepographError;
pub use graph::{CodeGraph, Graph, GraphStore};
pub use pipeline::{AnalysisContext, RunSummary, analyze_repo};
pub use symbols::SymbolIndex;
pub use types::{EdgeType, GraphEdgeData, GraphNodeData, NodeType, Tag, TagKind, TagType};
