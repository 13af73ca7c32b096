//! The reference-resolution pass.
//!
//! Runs once after every file has been merged. Each buffered reference tag
//! is looked up in the [`SymbolIndex`]; hits become a reference node under
//! the caller's File node plus a `References` edge to the definition node.
//! Misses are counted, never raised.

use serde::Serialize;
use tracing::{debug, info};

use crate::graph::GraphStore;
use crate::symbols::{SymbolIndex, SymbolLocation};
use crate::types::{EdgeType, Tag};

/// Diagnostic counters of one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    /// References linked to a definition node.
    pub resolved: usize,
    /// References with no matching definition.
    pub unresolved: usize,
    /// Matched references whose file node is not in the graph.
    pub missing_file_nodes: usize,
    /// Matched references whose definition node is not in the graph.
    pub missing_definition_nodes: usize,
}

impl ResolutionStats {
    /// References that matched but could not be attached.
    pub fn orphaned(&self) -> usize {
        self.missing_file_nodes + self.missing_definition_nodes
    }
}

/// A reference's matching definition: the defining file, the name it was
/// declared under, and its line.
struct Target<'a> {
    loc: &'a SymbolLocation,
    name: &'a str,
}

/// Find the definition a reference points at.
///
/// With a `target_file`, the imported name is tried in that file first,
/// then the declaration behind a `default` import, then the local name.
/// Otherwise, or on a miss, the plain name-based lookup applies.
fn find_target<'a>(index: &'a SymbolIndex, tag: &'a Tag) -> Option<Target<'a>> {
    let candidates = tag.tag_type.resolution_candidates();

    if let Some(target_file) = tag.target_file.as_deref() {
        let imported = index
            .alias(&tag.name)
            .filter(|(file, _)| *file == target_file)
            .map(|(_, name)| name);
        let default_decl = imported
            .filter(|name| *name == "default")
            .and_then(|_| index.default_export(target_file));
        let names = imported
            .into_iter()
            .chain(default_decl)
            .chain([tag.name.as_str()]);
        for name in names {
            for ty in candidates {
                if let Some(loc) = index.lookup_in_file(target_file, name, *ty) {
                    return Some(Target { loc, name });
                }
            }
        }
    }

    candidates.iter().find_map(|ty| {
        index.lookup(&tag.name, *ty).map(|loc| Target {
            loc,
            name: tag.name.as_str(),
        })
    })
}

/// Link every reference in `references` into `store`.
pub fn resolve_references(store: &mut GraphStore, index: &SymbolIndex, references: &[Tag]) -> ResolutionStats {
    let mut stats = ResolutionStats::default();

    for tag in references {
        let Some(target) = find_target(index, tag) else {
            stats.unresolved += 1;
            debug!(name = %tag.name, kind = %tag.tag_type, file = %tag.file_path, line = tag.start_line, "unresolved reference");
            continue;
        };

        let file_id = store.file_id(&tag.file_path);
        if !store.contains_node(&file_id) {
            stats.missing_file_nodes += 1;
            debug!(name = %tag.name, file = %tag.file_path, "reference file node missing");
            continue;
        }

        let (ref_id, created) = store.add_reference_node(tag);
        if created {
            store.add_unique_edge(&file_id, &ref_id, EdgeType::Contains);
        }

        let def_id = store.definition_id(&target.loc.file, target.name, target.loc.line);
        if store.contains_node(&def_id) {
            store.add_unique_edge(&ref_id, &def_id, EdgeType::References);
            stats.resolved += 1;
        } else {
            stats.missing_definition_nodes += 1;
            debug!(
                name = %tag.name,
                target = %target.loc.file,
                line = target.loc.line,
                "definition node missing"
            );
        }
    }

    info!(
        resolved = stats.resolved,
        unresolved = stats.unresolved,
        orphaned = stats.orphaned(),
        "references resolved"
    );
    stats
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::graph::Graph;
    use crate::types::{TagKind, TagType};

    fn tag(name: &str, tag_type: TagType, kind: TagKind, file: &str, line: usize) -> Tag {
        Tag {
            name: name.into(),
            tag_type,
            kind,
            file_path: file.into(),
            target_file: None,
            start_line: line,
            end_line: line,
            text: None,
            parent: None,
        }
    }

    /// A store and index with `helper` defined in `a.ts` and `b.ts` present.
    fn setup() -> (GraphStore, SymbolIndex) {
        let mut store = GraphStore::new("r", Path::new("/repo"), None);
        let mut index = SymbolIndex::new();
        let a = store.ensure_file_node("a.ts", 3);
        store.ensure_file_node("b.ts", 3);
        let helper = tag("helper", TagType::Function, TagKind::Definition, "a.ts", 1);
        store.add_definition_node(&a, &helper);
        index.record_definition("helper", TagType::Function, "a.ts", 1);
        (store, index)
    }

    #[test]
    fn resolves_cross_file_call() {
        let (mut store, index) = setup();
        let call = tag("helper", TagType::FunctionCall, TagKind::Reference, "b.ts", 2);
        let stats = resolve_references(&mut store, &index, std::slice::from_ref(&call));
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 0);

        let def_id = store.definition_id("a.ts", "helper", 1);
        let ref_id = store.reference_id(&call);
        let b_id = store.file_id("b.ts");
        let graph = store.freeze();
        let refs: Vec<_> = graph.edges_of_type(EdgeType::References).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_id, ref_id);
        assert_eq!(refs[0].target_id, def_id);
        assert!(graph
            .edges()
            .iter()
            .any(|e| e.edge_type == EdgeType::Contains && e.source_id == b_id && e.target_id == ref_id));
        assert_eq!(graph.node(&ref_id).unwrap().is_reference, Some(true));
    }

    #[test]
    fn unknown_name_is_counted_not_raised() {
        let (mut store, index) = setup();
        let before = store.node_count();
        let call = tag("bar", TagType::FunctionCall, TagKind::Reference, "b.ts", 2);
        let stats = resolve_references(&mut store, &index, &[call]);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.resolved, 0);
        assert_eq!(store.node_count(), before);
    }

    #[test]
    fn call_type_must_match_definition_type() {
        let (mut store, index) = setup();
        // `x.helper()` is a method call; only a Function named helper exists.
        let call = tag("helper", TagType::MethodCall, TagKind::Reference, "b.ts", 2);
        let stats = resolve_references(&mut store, &index, &[call]);
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn missing_file_node_is_orphaned() {
        let (mut store, index) = setup();
        let call = tag("helper", TagType::FunctionCall, TagKind::Reference, "gone.ts", 1);
        let stats = resolve_references(&mut store, &index, &[call]);
        assert_eq!(stats.missing_file_nodes, 1);
        assert_eq!(stats.orphaned(), 1);
    }

    #[test]
    fn missing_definition_node_is_orphaned() {
        let (mut store, mut index) = setup();
        index.record_definition("ghost", TagType::Function, "a.ts", 9);
        let call = tag("ghost", TagType::FunctionCall, TagKind::Reference, "b.ts", 2);
        let stats = resolve_references(&mut store, &index, &[call]);
        assert_eq!(stats.missing_definition_nodes, 1);
        assert_eq!(stats.resolved, 0);
    }

    #[test]
    fn duplicate_reference_yields_one_edge() {
        let (mut store, index) = setup();
        let call = tag("helper", TagType::FunctionCall, TagKind::Reference, "b.ts", 2);
        resolve_references(&mut store, &index, &[call.clone(), call]);
        let graph = store.freeze();
        assert_eq!(graph.edges_of_type(EdgeType::References).count(), 1);
    }

    #[test]
    fn target_file_prefers_the_imported_definition() {
        let (mut store, mut index) = setup();
        // A second `helper` defined later elsewhere wins the plain lookup.
        let c = store.ensure_file_node("c.ts", 5);
        let other = tag("helper", TagType::Function, TagKind::Definition, "c.ts", 4);
        store.add_definition_node(&c, &other);
        index.record_definition("helper", TagType::Function, "c.ts", 4);
        index.record_exports("a.ts", ["helper"]);
        index.resolve_import_alias("h", "a.ts", "helper");

        let mut call = tag("h", TagType::FunctionCall, TagKind::Reference, "b.ts", 2);
        call.target_file = Some("a.ts".into());
        let stats = resolve_references(&mut store, &index, std::slice::from_ref(&call));
        assert_eq!(stats.resolved, 1);

        let expected = store.definition_id("a.ts", "helper", 1);
        let graph = store.freeze();
        let edge = graph.edges_of_type(EdgeType::References).next().unwrap();
        assert_eq!(edge.target_id, expected);
    }
}
