//! End-to-end runs of the library pipeline over throwaway repositories.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use repograph::config::Config;
use repograph::graph::{Graph, node_id};
use repograph::pipeline::analyze_repo;
use repograph::progress::Progress;
use repograph::{EdgeType, NodeType};

fn write(root: &Path, rel: &str, content: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, content).unwrap();
}

#[test]
fn mixed_language_repo_builds_a_connected_graph() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "web/format.ts", "export function format(x: string) { return x; }\n");
    write(
        root,
        "web/main.ts",
        "import { format as fmt } from './format';\nclass App {\n  render() { return fmt('hi'); }\n}\nnew App().render();\n",
    );
    write(root, "py/models.py", "class User:\n    def save(self):\n        pass\n");
    write(root, "py/main.py", "from .models import User\nu = User()\nu.save()\n");
    write(root, "node_modules/dep/index.js", "function dep() {}\n");
    write(root, "README.md", "# not code\n");

    let config = Config::load(Some(root)).unwrap();
    let (graph, summary) = analyze_repo(root, "it-repo", &config, &Progress::silent()).unwrap();

    assert_eq!(summary.files_processed, 4, "node_modules and README are never scanned");
    assert_eq!(summary.files_failed_parse, 0);
    assert!(
        graph.nodes().iter().all(|n| !n.file_path.starts_with("node_modules")),
        "ignored directories leave no nodes"
    );

    // Every edge endpoint is a node.
    let ids: HashSet<&str> = graph.nodes().iter().map(|n| n.node_id.as_str()).collect();
    for e in graph.edges() {
        assert!(ids.contains(e.source_id.as_str()), "dangling source {e:?}");
        assert!(ids.contains(e.target_id.as_str()), "dangling target {e:?}");
    }

    // `fmt(...)` goes through the import alias to `format` in format.ts, merged
    // before main.ts.
    let abs_format = root.join("web/format.ts").to_string_lossy().into_owned();
    let format_id = node_id("it-repo", &format!("{abs_format}:format:1"));
    assert!(
        graph
            .edges_of_type(EdgeType::References)
            .any(|e| e.target_id == format_id),
        "aliased call should reference format.ts#format"
    );

    // `new App()` and `User()` resolve to their classes.
    let classes: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|n| n.node_type == NodeType::Class)
        .map(|n| n.node_id.as_str())
        .collect();
    assert_eq!(classes.len(), 2);
    for class in classes {
        assert!(
            graph
                .edges_of_type(EdgeType::References)
                .any(|e| e.target_id == class),
            "class {class} should be referenced"
        );
    }

    assert_eq!(summary.nodes, graph.number_of_nodes());
    assert_eq!(summary.edges, graph.number_of_edges());
}

#[test]
fn per_repo_config_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.ts", "export function a() {}\n");
    write(root, "src/a.test.ts", "a();\n");
    write(
        root,
        ".repograph/config.toml",
        "[scan]\npatterns = [\"*.test.ts\"]\n\n[extract]\ninclude_text = false\n\n[output]\ntimestamps = true\n",
    );

    let config = Config::load(Some(root)).unwrap();
    let (graph, summary) = analyze_repo(root, "cfg", &config, &Progress::silent()).unwrap();

    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.references, 0);
    assert!(graph.nodes().iter().all(|n| n.text.is_none()));
    assert!(graph.nodes().iter().all(|n| n.created_at.is_some()));
}

#[test]
fn broken_file_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "good.js", "function ok() {}\nok();\n");
    write(root, "bad.js", "function (( {\n");

    let config = Config::load(Some(root)).unwrap();
    let (graph, summary) = analyze_repo(root, "r", &config, &Progress::silent()).unwrap();

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.files_failed_parse, 1);
    assert_eq!(summary.resolution.resolved, 1);
    assert!(graph.node(&node_id("r", "file:bad.js")).is_some());
}
