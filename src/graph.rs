//! Graph assembly: node identity, the mutable store used during a run, and
//! the frozen read-only graph handed to callers.
//!
//! Node ids are `SHA-256(repo_id || 0x00 || disambiguator)` truncated to 16
//! bytes of hex, where the disambiguator is `repo:root`, `folder:<rel>`,
//! `file:<rel>`, `<abs file>:<name>:<line>` for definitions or
//! `<abs file>:<name>:<line>:ref` for reference nodes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{EdgeType, GraphEdgeData, GraphNodeData, NodeType, Tag};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Deterministic node id for `disambiguator` within `repo_id`.
pub fn node_id(repo_id: &str, disambiguator: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(disambiguator.as_bytes());
    hex_encode(&hasher.finalize()[..16])
}

/// Default repository id: short digest of the canonical root path.
pub fn repo_id_for(root: &Path) -> String {
    let canonical = root.to_string_lossy();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex_encode(&hasher.finalize()[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Read-only view
// ---------------------------------------------------------------------------

/// What persistence sees of an assembled graph. There are no mutators.
pub trait Graph {
    /// Nodes in insertion order.
    fn nodes(&self) -> &[GraphNodeData];
    /// Edges in insertion order.
    fn edges(&self) -> &[GraphEdgeData];

    fn number_of_nodes(&self) -> usize {
        self.nodes().len()
    }

    fn number_of_edges(&self) -> usize {
        self.edges().len()
    }
}

/// An assembled graph, frozen at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct CodeGraph {
    #[serde(skip)]
    repo_id: String,
    nodes: Vec<GraphNodeData>,
    edges: Vec<GraphEdgeData>,
}

impl CodeGraph {
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn node(&self, id: &str) -> Option<&GraphNodeData> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    pub fn edges_of_type(&self, edge_type: EdgeType) -> impl Iterator<Item = &GraphEdgeData> {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }
}

impl Graph for CodeGraph {
    fn nodes(&self) -> &[GraphNodeData] {
        &self.nodes
    }

    fn edges(&self) -> &[GraphEdgeData] {
        &self.edges
    }
}

// ---------------------------------------------------------------------------
// Mutable store
// ---------------------------------------------------------------------------

/// The in-run node/edge store. Single writer; insertion is idempotent for
/// both nodes and edges.
#[derive(Debug)]
pub struct GraphStore {
    repo_id: String,
    repo_root: PathBuf,
    root_id: String,
    created_at: Option<u64>,
    nodes: Vec<GraphNodeData>,
    node_ids: HashSet<String>,
    edges: Vec<GraphEdgeData>,
    edge_keys: HashSet<(String, String, EdgeType)>,
    /// repo-relative folder path -> node id
    folders: HashMap<String, String>,
}

impl GraphStore {
    /// A store holding only the repository root node.
    pub fn new(repo_id: &str, repo_root: &Path, created_at: Option<u64>) -> Self {
        let root_id = node_id(repo_id, "repo:root");
        let mut store = Self {
            repo_id: repo_id.to_string(),
            repo_root: repo_root.to_path_buf(),
            root_id: root_id.clone(),
            created_at,
            nodes: Vec::new(),
            node_ids: HashSet::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            folders: HashMap::new(),
        };
        let name = repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        let root = store.make_node(root_id, name, NodeType::Repository, ".", 0, 0);
        store.insert_node(GraphNodeData {
            is_directory: Some(true),
            ..root
        });
        store
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn make_node(
        &self,
        node_id: String,
        name: String,
        node_type: NodeType,
        file_path: &str,
        start_line: usize,
        end_line: usize,
    ) -> GraphNodeData {
        GraphNodeData {
            node_id,
            repo_id: self.repo_id.clone(),
            name,
            node_type,
            file_path: file_path.to_string(),
            start_line,
            end_line,
            text: None,
            is_directory: None,
            is_reference: None,
            created_at: self.created_at,
        }
    }

    /// Insert unless a node with the same id exists. Returns whether it was
    /// inserted.
    fn insert_node(&mut self, node: GraphNodeData) -> bool {
        if !self.node_ids.insert(node.node_id.clone()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Insert an edge unless it exists. For `Contains`, also refuse when the
    /// reverse edge exists.
    pub fn add_unique_edge(&mut self, source: &str, target: &str, edge_type: EdgeType) -> bool {
        if edge_type == EdgeType::Contains
            && self
                .edge_keys
                .contains(&(target.to_string(), source.to_string(), EdgeType::Contains))
        {
            return false;
        }
        if !self
            .edge_keys
            .insert((source.to_string(), target.to_string(), edge_type))
        {
            return false;
        }
        self.edges.push(GraphEdgeData {
            source_id: source.to_string(),
            target_id: target.to_string(),
            edge_type,
            repo_id: self.repo_id.clone(),
        });
        true
    }

    /// Ensure a Folder node for `rel_folder` and all its ancestors, each
    /// contained by its parent. `""` and `"."` are the repository root.
    ///
    /// Walks root to leaf, consulting the memo table for every prefix.
    pub fn ensure_folder_node(&mut self, rel_folder: &str) -> String {
        let mut parent_id = self.root_id.clone();
        let mut prefix = String::new();
        for segment in rel_folder.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            if let Some(id) = self.folders.get(&prefix) {
                parent_id = id.clone();
                continue;
            }
            let id = node_id(&self.repo_id, &format!("folder:{prefix}"));
            let node = self.make_node(id.clone(), segment.to_string(), NodeType::Folder, &prefix, 0, 0);
            self.insert_node(GraphNodeData {
                is_directory: Some(true),
                ..node
            });
            self.add_unique_edge(&parent_id, &id, EdgeType::Contains);
            self.folders.insert(prefix.clone(), id.clone());
            parent_id = id;
        }
        parent_id
    }

    pub fn file_id(&self, rel_file: &str) -> String {
        node_id(&self.repo_id, &format!("file:{rel_file}"))
    }

    /// Ensure the File node for `rel_file`, contained by its folder.
    pub fn ensure_file_node(&mut self, rel_file: &str, line_count: usize) -> String {
        let (folder, name) = rel_file.rsplit_once('/').unwrap_or(("", rel_file));
        let folder_id = self.ensure_folder_node(folder);
        let id = self.file_id(rel_file);
        let node = self.make_node(
            id.clone(),
            name.to_string(),
            NodeType::File,
            rel_file,
            1,
            line_count.max(1),
        );
        self.insert_node(GraphNodeData {
            is_directory: Some(false),
            ..node
        });
        self.add_unique_edge(&folder_id, &id, EdgeType::Contains);
        id
    }

    fn abs_path(&self, rel_file: &str) -> String {
        self.repo_root.join(rel_file).to_string_lossy().into_owned()
    }

    /// Id of the definition of `name` declared at `line` of `rel_file`.
    pub fn definition_id(&self, rel_file: &str, name: &str, line: usize) -> String {
        node_id(
            &self.repo_id,
            &format!("{}:{name}:{line}", self.abs_path(rel_file)),
        )
    }

    /// Id of the reference node for a reference tag.
    pub fn reference_id(&self, tag: &Tag) -> String {
        node_id(
            &self.repo_id,
            &format!("{}:{}:{}:ref", self.abs_path(&tag.file_path), tag.name, tag.start_line),
        )
    }

    /// Add a node for a definition tag and a `Contains` edge from its file.
    pub fn add_definition_node(&mut self, file_id: &str, tag: &Tag) -> String {
        let id = self.definition_id(&tag.file_path, &tag.name, tag.start_line);
        let node = self.make_node(
            id.clone(),
            tag.name.clone(),
            NodeType::for_definition(tag.tag_type),
            &tag.file_path,
            tag.start_line,
            tag.end_line,
        );
        self.insert_node(GraphNodeData {
            text: tag.text.clone(),
            ..node
        });
        self.add_unique_edge(file_id, &id, EdgeType::Contains);
        id
    }

    /// Add the node for a reference tag. Returns its id and whether it was
    /// newly created.
    pub fn add_reference_node(&mut self, tag: &Tag) -> (String, bool) {
        let id = self.reference_id(tag);
        let node = self.make_node(
            id.clone(),
            tag.name.clone(),
            NodeType::Reference,
            &tag.file_path,
            tag.start_line,
            tag.end_line,
        );
        let created = self.insert_node(GraphNodeData {
            text: tag.text.clone(),
            is_reference: Some(true),
            ..node
        });
        (id, created)
    }

    /// Stop mutation and hand out the read-only graph.
    pub fn freeze(self) -> CodeGraph {
        CodeGraph {
            repo_id: self.repo_id,
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
