//! The run-scoped Symbol Index.
//!
//! Maps defined names to where they were declared, files to the names they
//! export, and import aliases to the `file#name` they stand for. Lookups are
//! name-based: when two files define the same `name:type`, the one merged
//! last wins the plain lookup. Per-file lookups stay exact.

use std::collections::{HashMap, HashSet};

use crate::extractor::Lang;
use crate::types::TagType;

/// Where a definition was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolLocation {
    /// Repo-relative path.
    pub file: String,
    /// 1-based start line.
    pub line: usize,
}

/// Key of the defined-symbols map: `"<name>:<type>"`.
pub fn symbol_key(name: &str, tag_type: TagType) -> String {
    format!("{name}:{}", tag_type.as_str())
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    defined: HashMap<String, SymbolLocation>,
    by_file: HashMap<String, HashMap<String, SymbolLocation>>,
    exports: HashMap<String, HashSet<String>>,
    /// file -> name of the declaration exported as `default`
    default_exports: HashMap<String, String>,
    /// local alias -> `"<file>#<exported name>"`
    aliases: HashMap<String, String>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition. Re-recording the same fact changes nothing; a
    /// different location for the same key replaces the old one.
    pub fn record_definition(&mut self, name: &str, tag_type: TagType, file: &str, line: usize) {
        let key = symbol_key(name, tag_type);
        let loc = SymbolLocation {
            file: file.to_string(),
            line,
        };
        self.by_file
            .entry(file.to_string())
            .or_default()
            .insert(key.clone(), loc.clone());
        self.defined.insert(key, loc);
    }

    /// Record the names `file` exports.
    pub fn record_exports<I, S>(&mut self, file: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports
            .entry(file.to_string())
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    pub fn record_default_export(&mut self, file: &str, name: &str) {
        self.default_exports
            .insert(file.to_string(), name.to_string());
    }

    pub fn default_export(&self, file: &str) -> Option<&str> {
        self.default_exports.get(file).map(String::as_str)
    }

    pub fn is_exported(&self, file: &str, name: &str) -> bool {
        self.exports.get(file).is_some_and(|names| names.contains(name))
    }

    /// Register `local` as an alias of `source_file#exported`.
    ///
    /// Only takes effect when `source_file` is already known to export
    /// `exported`. Returns whether an alias is now registered.
    pub fn resolve_import_alias(&mut self, local: &str, source_file: &str, exported: &str) -> bool {
        if !self.is_exported(source_file, exported) {
            return false;
        }
        self.aliases
            .insert(local.to_string(), format!("{source_file}#{exported}"));
        true
    }

    /// The `(file, exported name)` an import alias stands for.
    pub fn alias(&self, local: &str) -> Option<(&str, &str)> {
        self.aliases.get(local).and_then(|v| v.rsplit_once('#'))
    }

    /// Plain-name lookup (last writer wins).
    pub fn lookup(&self, name: &str, tag_type: TagType) -> Option<&SymbolLocation> {
        self.defined.get(&symbol_key(name, tag_type))
    }

    /// Lookup restricted to definitions made in `file`.
    pub fn lookup_in_file(&self, file: &str, name: &str, tag_type: TagType) -> Option<&SymbolLocation> {
        self.by_file.get(file)?.get(&symbol_key(name, tag_type))
    }

    /// Number of distinct `name:type` keys.
    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

// ---------------------------------------------------------------------------
// Module specifiers
// ---------------------------------------------------------------------------

/// Resolve an import specifier written in `importer` to a processed file.
///
/// Paths are repo-relative with `/` separators. `exists` answers whether a
/// candidate path is part of the processed set. Bare package specifiers
/// never resolve.
pub fn resolve_specifier(
    importer: &str,
    specifier: &str,
    lang: Lang,
    exists: impl Fn(&str) -> bool,
) -> Option<String> {
    let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let candidates = match lang {
        Lang::Python => python_candidates(dir, specifier)?,
        _ => script_candidates(dir, specifier, lang)?,
    };
    candidates.into_iter().find(|c| exists(c))
}

fn script_candidates(dir: &str, specifier: &str, lang: Lang) -> Option<Vec<String>> {
    let relative = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../");
    if !relative {
        return None;
    }
    let base = normalize(&join(dir, specifier))?;
    let mut out = vec![base.clone()];
    for ext in lang.module_extensions() {
        out.push(format!("{base}.{ext}"));
    }
    // `./util.js` written in TypeScript sources refers to `./util.ts`.
    if let Some(stem) = base.strip_suffix(".js") {
        out.push(format!("{stem}.ts"));
        out.push(format!("{stem}.tsx"));
    }
    for ext in lang.module_extensions() {
        out.push(join(&base, &format!("index.{ext}")));
    }
    Some(out)
}

fn python_candidates(dir: &str, specifier: &str) -> Option<Vec<String>> {
    let dots = specifier.chars().take_while(|c| *c == '.').count();
    let module = specifier[dots..].replace('.', "/");
    let base = if dots == 0 {
        module
    } else {
        let mut up = dir.to_string();
        for _ in 1..dots {
            up = join(&up, "..");
        }
        normalize(&join(&up, &module))?
    };
    if base.is_empty() {
        return Some(vec!["__init__.py".to_string()]);
    }
    Some(vec![format!("{base}.py"), join(&base, "__init__.py")])
}

fn join(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{dir}/{rest}"),
    }
}

/// Collapse `.` and `..` segments. `None` when the path escapes the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_definition_wins_plain_lookup() {
        let mut idx = SymbolIndex::new();
        idx.record_definition("helper", TagType::Function, "a.ts", 1);
        idx.record_definition("helper", TagType::Function, "b.ts", 7);
        let loc = idx.lookup("helper", TagType::Function).unwrap();
        assert_eq!(loc.file, "b.ts");
        assert_eq!(loc.line, 7);
        assert_eq!(idx.len(), 1);

        // Per-file lookups keep both.
        assert_eq!(
            idx.lookup_in_file("a.ts", "helper", TagType::Function).unwrap().line,
            1
        );
    }

    #[test]
    fn recording_twice_is_a_noop() {
        let mut idx = SymbolIndex::new();
        idx.record_definition("Foo", TagType::Class, "a.ts", 3);
        idx.record_definition("Foo", TagType::Class, "a.ts", 3);
        assert_eq!(idx.len(), 1);
        assert_eq!(
            idx.lookup("Foo", TagType::Class),
            Some(&SymbolLocation {
                file: "a.ts".into(),
                line: 3
            })
        );
    }

    #[test]
    fn type_is_part_of_the_key() {
        let mut idx = SymbolIndex::new();
        idx.record_definition("run", TagType::Method, "a.ts", 2);
        assert!(idx.lookup("run", TagType::Function).is_none());
    }

    #[test]
    fn alias_requires_known_export() {
        let mut idx = SymbolIndex::new();
        assert!(!idx.resolve_import_alias("h", "util.ts", "helper"));
        idx.record_exports("util.ts", ["helper"]);
        assert!(idx.resolve_import_alias("h", "util.ts", "helper"));
        assert_eq!(idx.alias("h"), Some(("util.ts", "helper")));
        // Idempotent.
        assert!(idx.resolve_import_alias("h", "util.ts", "helper"));
        assert_eq!(idx.alias_count(), 1);
    }

    #[test]
    fn relative_specifier_with_extension_probe() {
        let files = ["src/util.ts", "src/lib/index.ts"];
        let exists = |p: &str| files.contains(&p);
        assert_eq!(
            resolve_specifier("src/main.ts", "./util", Lang::TypeScript, exists).as_deref(),
            Some("src/util.ts")
        );
        assert_eq!(
            resolve_specifier("src/main.ts", "./lib", Lang::TypeScript, exists).as_deref(),
            Some("src/lib/index.ts")
        );
        assert_eq!(
            resolve_specifier("src/lib/index.ts", "../util.js", Lang::TypeScript, exists)
                .as_deref(),
            Some("src/util.ts")
        );
    }

    #[test]
    fn bare_and_escaping_specifiers_do_not_resolve() {
        let exists = |_: &str| true;
        assert!(resolve_specifier("a.ts", "react", Lang::TypeScript, exists).is_none());
        assert!(resolve_specifier("a.ts", "../../x", Lang::TypeScript, exists).is_none());
    }

    #[test]
    fn python_relative_and_absolute_modules() {
        let files = ["pkg/util.py", "pkg/sub/__init__.py", "pkg/models.py"];
        let exists = |p: &str| files.contains(&p);
        assert_eq!(
            resolve_specifier("pkg/app.py", ".util", Lang::Python, exists).as_deref(),
            Some("pkg/util.py")
        );
        assert_eq!(
            resolve_specifier("pkg/sub/x.py", "..models", Lang::Python, exists).as_deref(),
            Some("pkg/models.py")
        );
        assert_eq!(
            resolve_specifier("main.py", "pkg.sub", Lang::Python, exists).as_deref(),
            Some("pkg/sub/__init__.py")
        );
    }
}
