//! Source file discovery.
//!
//! Wraps the `ignore` crate's `WalkBuilder` to provide a walker that:
//! - Respects `.gitignore` rules
//! - Skips configured ignore-names (dependency and build output directories)
//! - Skips hidden files/directories when asked to
//! - Yields only files with a supported language extension
//! - Visits entries in directory pre-order, sorted by file name

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::warn;

use crate::config::ScanConfig;
use crate::extractor::detect_language;

/// A file-system walker over one repository root.
pub struct Walker {
    root: PathBuf,
    ignore_names: Vec<String>,
    patterns: Vec<String>,
    skip_hidden: bool,
}

impl Walker {
    /// Create a new walker rooted at the given path with default scan
    /// settings.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_config(root, &ScanConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(root: P, scan: &ScanConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ignore_names: scan.ignore_names.clone(),
            patterns: scan.patterns.clone(),
            skip_hidden: scan.skip_hidden,
        }
    }

    /// Build the underlying `WalkBuilder` with all our configuration applied.
    fn make_builder(&self) -> Result<WalkBuilder> {
        let mut builder = WalkBuilder::new(&self.root);

        builder.standard_filters(true);
        // Hidden entries are handled by the filter below so the root itself
        // may be hidden.
        builder.hidden(false);
        builder.sort_by_file_name(|a, b| a.cmp(b));

        // In the overrides system a glob with `!` means "exclude".
        let mut overrides = OverrideBuilder::new(&self.root);
        for name in &self.ignore_names {
            overrides
                .add(&format!("!{name}/"))
                .with_context(|| format!("invalid ignore name: {name}"))?;
        }
        for pattern in &self.patterns {
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        builder.overrides(overrides.build().context("failed to build scan overrides")?);

        let skip_hidden = self.skip_hidden;
        builder.filter_entry(move |entry| {
            if !skip_hidden || entry.depth() == 0 {
                return true;
            }
            !entry.file_name().to_string_lossy().starts_with('.')
        });

        Ok(builder)
    }

    /// Walk the file tree and collect every supported source file, in scan
    /// order.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>> {
        let builder = self.make_builder()?;
        let mut paths = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if detect_language(entry.path()).is_some() {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: create a temporary directory tree for testing.
    struct TestDir {
        dir: tempfile::TempDir,
    }

    impl TestDir {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Create a file (and any necessary parent directories).
        fn create_file(&self, relative: &str) {
            let p = self.dir.path().join(relative);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&p, "content").unwrap();
        }
    }

    /// Paths relative to the test root, in walk order.
    fn relative(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| {
                p.strip_prefix(root)
                    .ok()
                    .map(|r| r.to_string_lossy().replace('\\', "/"))
            })
            .collect()
    }

    #[test]
    fn respects_gitignore() {
        let td = TestDir::new();
        // The ignore crate only respects .gitignore inside a git repository.
        fs::create_dir(td.path().join(".git")).unwrap();
        td.create_file("keep.ts");
        td.create_file("generated.ts");
        fs::write(td.path().join(".gitignore"), "generated.ts\n").unwrap();

        let rel = relative(td.path(), &Walker::new(td.path()).collect_paths().unwrap());
        assert_eq!(rel, vec!["keep.ts".to_string()]);
    }

    #[test]
    fn skips_default_ignore_names() {
        let td = TestDir::new();
        td.create_file("src/main.ts");
        td.create_file("node_modules/pkg/index.js");
        td.create_file("vendor/lib.js");
        td.create_file("dist/bundle.js");
        td.create_file("coverage/lcov.js");
        td.create_file("__pycache__/mod.py");
        td.create_file(".venv/lib/site.py");

        let rel = relative(td.path(), &Walker::new(td.path()).collect_paths().unwrap());
        assert_eq!(rel, vec!["src/main.ts".to_string()], "got: {rel:?}");
    }

    #[test]
    fn only_supported_languages() {
        let td = TestDir::new();
        td.create_file("a.ts");
        td.create_file("b.py");
        td.create_file("c.rs");
        td.create_file("README.md");

        let rel = relative(td.path(), &Walker::new(td.path()).collect_paths().unwrap());
        assert_eq!(rel, vec!["a.ts".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn hidden_entries_follow_config() {
        let td = TestDir::new();
        td.create_file("visible.js");
        td.create_file(".hidden/secret.js");

        let rel = relative(td.path(), &Walker::new(td.path()).collect_paths().unwrap());
        assert_eq!(rel, vec!["visible.js".to_string()]);

        let scan = ScanConfig {
            skip_hidden: false,
            ..ScanConfig::default()
        };
        let rel = relative(
            td.path(),
            &Walker::with_config(td.path(), &scan).collect_paths().unwrap(),
        );
        assert!(rel.contains(&".hidden/secret.js".to_string()), "got: {rel:?}");
    }

    #[test]
    fn extra_patterns_exclude_files() {
        let td = TestDir::new();
        td.create_file("src/app.ts");
        td.create_file("src/app.test.ts");

        let scan = ScanConfig {
            patterns: vec!["*.test.ts".into()],
            ..ScanConfig::default()
        };
        let rel = relative(
            td.path(),
            &Walker::with_config(td.path(), &scan).collect_paths().unwrap(),
        );
        assert_eq!(rel, vec!["src/app.ts".to_string()]);
    }

    #[test]
    fn order_is_preorder_by_name() {
        let td = TestDir::new();
        td.create_file("b.ts");
        td.create_file("a/z.ts");
        td.create_file("a/m/y.ts");
        td.create_file("c.ts");

        let walker = Walker::new(td.path());
        let first = relative(td.path(), &walker.collect_paths().unwrap());
        let second = relative(td.path(), &walker.collect_paths().unwrap());
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec!["a/m/y.ts", "a/z.ts", "b.ts", "c.ts"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }
}
