//! Tag extraction from tree-sitter syntax trees.
//!
//! Provides language detection by file extension (the supported-language
//! allowlist), parser construction, and a single depth-first walk per file
//! that emits definition and reference [`Tag`]s together with the file's
//! export names and import bindings.
//!
//! Each syntax node is first classified into a small closed set of
//! [`Syntax`] kinds; everything the walk does is an exhaustive match over
//! that set. The walk runs on an explicit stack whose frames each carry
//! their enclosing scope, so a scope entered for a class or function body
//! is left when its subtree is done, and deeply nested input cannot exhaust
//! the call stack.

use std::path::Path;
use std::rc::Rc;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::errors::ExtractError;
use crate::globals::GlobalSymbols;
use crate::types::{FileTags, ImportBinding, ParentRef, Tag, TagKind, TagType};

/// Supported programming languages with bundled Tree-sitter grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl Lang {
    /// Returns the human-readable name for this language.
    pub fn name(self) -> &'static str {
        match self {
            Lang::TypeScript => "TypeScript",
            Lang::Tsx => "TSX",
            Lang::JavaScript => "JavaScript",
            Lang::Python => "Python",
        }
    }

    /// File extensions tried, in order, when resolving an import specifier
    /// written without one.
    pub fn module_extensions(self) -> &'static [&'static str] {
        match self {
            Lang::Python => &["py"],
            _ => &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"],
        }
    }
}

/// Detect the programming language of a file based on its extension.
///
/// Returns `None` for unsupported or missing extensions.
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "ts" | "mts" | "cts" => Some(Lang::TypeScript),
        "tsx" => Some(Lang::Tsx),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "py" => Some(Lang::Python),
        _ => None,
    }
}

/// Return the Tree-sitter [`Language`] grammar for the given language.
fn grammar_for(lang: Lang) -> Language {
    match lang {
        Lang::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Lang::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Lang::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Lang::Python => tree_sitter_python::LANGUAGE.into(),
    }
}

/// Create a new [`Parser`] configured for the given language.
pub fn get_parser(lang: Lang) -> Result<Parser, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(lang))
        .map_err(|e| ExtractError::Grammar(format!("{}: {e}", lang.name())))?;
    Ok(parser)
}

/// Parse `source`, failing with a file-scoped [`ExtractError::Parse`] when no
/// tree is produced or, if `strict` is set, when the tree contains syntax
/// errors.
pub fn parse_source(lang: Lang, source: &str, file: &str, strict: bool) -> Result<Tree, ExtractError> {
    let mut parser = get_parser(lang)?;
    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| ExtractError::Parse {
            file: file.to_string(),
            line: 1,
        })?;
    if strict && let Some(line) = first_error_line(tree.root_node()) {
        return Err(ExtractError::Parse {
            file: file.to_string(),
            line,
        });
    }
    Ok(tree)
}

/// 1-based line of the first ERROR or MISSING node, if any.
///
/// Iterative pre-order walk that only descends into subtrees reporting an
/// error, so nesting depth never grows the call stack.
fn first_error_line(root: Node) -> Option<usize> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Some(root.start_position().row + 1);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Knobs for [`TagExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Keep the verbatim source span on each tag.
    pub include_text: bool,
    /// Treat a tree with syntax errors as a parse failure.
    pub strict_syntax: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_text: true,
            strict_syntax: true,
        }
    }
}

/// Turns one file's source into [`FileTags`].
///
/// Holds no per-file state, so one extractor can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct TagExtractor {
    globals: GlobalSymbols,
    options: ExtractOptions,
}

impl TagExtractor {
    pub fn new(globals: GlobalSymbols, options: ExtractOptions) -> Self {
        Self { globals, options }
    }

    /// Detect the language of `path` and extract tags from `source`.
    ///
    /// `file` is the repo-relative path recorded on every tag.
    pub fn extract_path(&self, path: &Path, file: &str, source: &str) -> Result<FileTags, ExtractError> {
        let lang = detect_language(path).ok_or_else(|| ExtractError::Unsupported(file.to_string()))?;
        self.extract(source, file, lang)
    }

    /// Extract tags from `source` written in `lang`.
    pub fn extract(&self, source: &str, file: &str, lang: Lang) -> Result<FileTags, ExtractError> {
        let tree = parse_source(lang, source, file, self.options.strict_syntax)?;
        let mut walk = Walk {
            src: source.as_bytes(),
            file,
            lang,
            globals: &self.globals,
            options: self.options,
            out: FileTags::default(),
        };
        walk.run(tree.root_node());
        Ok(walk.out)
    }
}

// ---------------------------------------------------------------------------
// Syntax classification
// ---------------------------------------------------------------------------

/// The syntax elements extraction cares about. Everything else is `Other`.
enum Syntax<'t, 's> {
    Class {
        name: &'s str,
    },
    Function {
        name: &'s str,
    },
    Method {
        name: &'s str,
        tag_type: TagType,
    },
    /// `name = value` inside a `const`/`let`/`var` declaration.
    Binding {
        name: &'s str,
        value: Option<Node<'t>>,
    },
    TypeDecl {
        name: &'s str,
        tag_type: TagType,
    },
    Call {
        callee: &'s str,
        /// Receiver chain of a member call, `None` for a plain call.
        receiver: Option<Vec<&'s str>>,
        tag_type: TagType,
    },
    Import(Vec<ImportBinding>),
    Export {
        names: Vec<String>,
        /// Declaration behind `export default`, when it has a name.
        default_name: Option<String>,
    },
    Other,
}

/// Get the text content of a node.
fn node_text<'s>(node: Node, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

/// Find a named child by its field name and return its text.
fn field_text<'s>(node: Node, field: &str, src: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, src))
}

/// Strip string-literal quotes.
fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string()
}

/// True if `node` has a direct child (named or anonymous) of `kind`.
fn has_child_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

/// Flatten a receiver expression into its identifier chain, root first.
///
/// `this.repo.items` yields `["this", "repo", "items"]`; parts that are not
/// plain names (subscripts, literals) are skipped.
fn receiver_chain<'s>(mut node: Node, src: &'s [u8]) -> Vec<&'s str> {
    // Collected leaf to root, then flipped.
    let mut chain = Vec::new();
    loop {
        let next = match node.kind() {
            "identifier" | "this" | "super" | "property_identifier" | "private_property_identifier" => {
                chain.push(node_text(node, src));
                None
            }
            "member_expression" | "attribute" => {
                let field = if node.kind() == "attribute" { "attribute" } else { "property" };
                if let Some(prop) = node.child_by_field_name(field) {
                    chain.push(node_text(prop, src));
                }
                node.child_by_field_name("object")
            }
            "call_expression" | "call" => node.child_by_field_name("function"),
            "non_null_expression" | "parenthesized_expression" | "await_expression" => {
                node.named_child(0u32)
            }
            _ => None,
        };
        match next {
            Some(n) => node = n,
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// Resolve a callee node to its name and, for member accesses, the
/// receiver chain.
///
/// The same rule names both the calling scope's definitions and the called
/// target: the bare identifier, or the property of a member access.
fn callee_name<'s>(callee: Node, src: &'s [u8]) -> Option<(&'s str, Option<Vec<&'s str>>)> {
    let field = match callee.kind() {
        "identifier" => return Some((node_text(callee, src), None)),
        "member_expression" => "property",
        "attribute" => "attribute",
        _ => return None,
    };
    let prop = callee.child_by_field_name(field)?;
    let receiver = callee
        .child_by_field_name("object")
        .map(|object| receiver_chain(object, src))
        .unwrap_or_default();
    Some((node_text(prop, src), Some(receiver)))
}

/// Whether a `variable_declarator` sits directly in a module-level
/// declaration (optionally wrapped in `export`).
fn is_module_level(declarator: Node) -> bool {
    let Some(decl) = declarator.parent() else {
        return false;
    };
    match decl.parent() {
        Some(p) if p.kind() == "program" => true,
        Some(p) if p.kind() == "export_statement" => {
            p.parent().is_some_and(|pp| pp.kind() == "program")
        }
        _ => false,
    }
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Classify a JS/TS class member that defines a method.
fn js_method_type(node: Node, name_node: Node, src: &[u8]) -> TagType {
    let mut cursor = node.walk();
    let is_private = name_node.kind() == "private_property_identifier"
        || node
            .children(&mut cursor)
            .any(|c| c.kind() == "accessibility_modifier" && node_text(c, src) == "private");
    if is_private {
        TagType::PrivateMethod
    } else if has_child_kind(node, "static") {
        TagType::StaticMethod
    } else {
        TagType::Method
    }
}

fn classify_js<'t, 's>(node: Node<'t>, src: &'s [u8]) -> Syntax<'t, 's> {
    match node.kind() {
        "class_declaration" | "abstract_class_declaration" | "class" => {
            match field_text(node, "name", src) {
                Some(name) => Syntax::Class { name },
                None => Syntax::Other,
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            match field_text(node, "name", src) {
                Some(name) => Syntax::Function { name },
                None => Syntax::Other,
            }
        }
        "method_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return Syntax::Other;
            };
            if !matches!(
                name_node.kind(),
                "property_identifier" | "private_property_identifier"
            ) {
                return Syntax::Other;
            }
            Syntax::Method {
                name: node_text(name_node, src),
                tag_type: js_method_type(node, name_node, src),
            }
        }
        // Class fields holding a function: `handle = () => {}`.
        "public_field_definition" | "field_definition" => {
            let name_node = node
                .child_by_field_name("name")
                .or_else(|| node.child_by_field_name("property"));
            let value = node.child_by_field_name("value");
            match (name_node, value) {
                (Some(name_node), Some(value)) if is_function_value(value.kind()) => {
                    Syntax::Method {
                        name: node_text(name_node, src),
                        tag_type: js_method_type(node, name_node, src),
                    }
                }
                _ => Syntax::Other,
            }
        }
        "variable_declarator" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return Syntax::Other;
            };
            if name_node.kind() != "identifier" {
                return Syntax::Other;
            }
            Syntax::Binding {
                name: node_text(name_node, src),
                value: node.child_by_field_name("value"),
            }
        }
        "type_alias_declaration" | "interface_declaration" | "enum_declaration" => {
            let tag_type = match node.kind() {
                "type_alias_declaration" => TagType::TypeAlias,
                "interface_declaration" => TagType::Interface,
                _ => TagType::Enum,
            };
            match field_text(node, "name", src) {
                Some(name) => Syntax::TypeDecl { name, tag_type },
                None => Syntax::Other,
            }
        }
        "call_expression" => {
            let Some(func) = node.child_by_field_name("function") else {
                return Syntax::Other;
            };
            match callee_name(func, src) {
                Some((callee, receiver)) => Syntax::Call {
                    callee,
                    tag_type: if receiver.is_some() {
                        TagType::MethodCall
                    } else {
                        TagType::FunctionCall
                    },
                    receiver,
                },
                None => Syntax::Other,
            }
        }
        "new_expression" => {
            let Some(ctor) = node.child_by_field_name("constructor") else {
                return Syntax::Other;
            };
            match callee_name(ctor, src) {
                Some((callee, receiver)) => Syntax::Call {
                    callee,
                    receiver,
                    tag_type: TagType::ConstructorCall,
                },
                None => Syntax::Other,
            }
        }
        "import_statement" => {
            let Some(source) = node.child_by_field_name("source") else {
                return Syntax::Other;
            };
            let specifier = unquote(node_text(source, src));
            let mut bindings = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "import_clause" {
                    js_import_clause(child, src, &specifier, &mut bindings);
                }
            }
            Syntax::Import(bindings)
        }
        "export_statement" => {
            let is_default = has_child_kind(node, "default");
            let mut declared = Vec::new();
            if let Some(decl) = node.child_by_field_name("declaration") {
                declaration_names(decl, src, &mut declared);
            }
            let mut default_name = None;
            // `export default class Foo {}` may parse as a class expression,
            // `export default foo;` names an existing binding.
            if let Some(value) = node.child_by_field_name("value") {
                if value.kind() == "identifier" {
                    default_name = Some(node_text(value, src).to_string());
                } else if let Some(name) = field_text(value, "name", src) {
                    declared.push(name.to_string());
                }
            }
            if is_default && default_name.is_none() {
                default_name = declared.first().cloned();
            }

            let mut names = Vec::new();
            if is_default {
                names.push("default".to_string());
            }
            names.extend(declared);
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() != "export_clause" {
                    continue;
                }
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "export_specifier" {
                        continue;
                    }
                    let Some(local) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let local = unquote(node_text(local, src));
                    let exported = spec
                        .child_by_field_name("alias")
                        .map(|a| unquote(node_text(a, src)))
                        .unwrap_or_else(|| local.clone());
                    if exported == "default" {
                        default_name = Some(local);
                    }
                    names.push(exported);
                }
            }
            Syntax::Export { names, default_name }
        }
        _ => Syntax::Other,
    }
}

/// Collect the bindings of one `import_clause`. Namespace imports
/// (`* as ns`) carry no single exported name and are skipped.
fn js_import_clause(clause: Node, src: &[u8], specifier: &str, out: &mut Vec<ImportBinding>) {
    let mut cursor = clause.walk();
    for part in clause.named_children(&mut cursor) {
        match part.kind() {
            "identifier" => out.push(ImportBinding {
                local: node_text(part, src).to_string(),
                imported: "default".to_string(),
                specifier: specifier.to_string(),
            }),
            "named_imports" => {
                let mut inner = part.walk();
                for spec in part.named_children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let local = spec.child_by_field_name("alias").unwrap_or(name);
                    out.push(ImportBinding {
                        local: unquote(node_text(local, src)),
                        imported: unquote(node_text(name, src)),
                        specifier: specifier.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

/// Names introduced by an exported declaration.
fn declaration_names(decl: Node, src: &[u8], out: &mut Vec<String>) {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for d in decl.named_children(&mut cursor) {
                if d.kind() == "variable_declarator"
                    && let Some(name) = d.child_by_field_name("name")
                    && name.kind() == "identifier"
                {
                    out.push(node_text(name, src).to_string());
                }
            }
        }
        _ => {
            if let Some(name) = field_text(decl, "name", src) {
                out.push(name.to_string());
            }
        }
    }
}

fn classify_python<'t, 's>(node: Node<'t>, src: &'s [u8], scope: Option<&ParentRef>) -> Syntax<'t, 's> {
    match node.kind() {
        "class_definition" => match field_text(node, "name", src) {
            Some(name) => Syntax::Class { name },
            None => Syntax::Other,
        },
        "function_definition" => {
            let Some(name) = field_text(node, "name", src) else {
                return Syntax::Other;
            };
            let in_class = scope.is_some_and(|s| s.tag_type == TagType::Class);
            if !in_class {
                return Syntax::Function { name };
            }
            let is_static = node.parent().is_some_and(|p| {
                if p.kind() != "decorated_definition" {
                    return false;
                }
                let mut cursor = p.walk();
                let found = p.named_children(&mut cursor).any(|c| {
                    c.kind() == "decorator" && node_text(c, src).contains("staticmethod")
                });
                found
            });
            let is_dunder = name.starts_with("__") && name.ends_with("__");
            let tag_type = if name.starts_with('_') && !is_dunder {
                TagType::PrivateMethod
            } else if is_static {
                TagType::StaticMethod
            } else {
                TagType::Method
            };
            Syntax::Method { name, tag_type }
        }
        "call" => {
            let Some(func) = node.child_by_field_name("function") else {
                return Syntax::Other;
            };
            match callee_name(func, src) {
                Some((callee, receiver @ Some(_))) => Syntax::Call {
                    callee,
                    receiver,
                    tag_type: TagType::MethodCall,
                },
                Some((callee, None)) => {
                    let tag_type = if callee.starts_with(|c: char| c.is_uppercase()) {
                        TagType::ConstructorCall
                    } else {
                        TagType::FunctionCall
                    };
                    Syntax::Call {
                        callee,
                        receiver: None,
                        tag_type,
                    }
                }
                None => Syntax::Other,
            }
        }
        "import_from_statement" => {
            let Some(module) = node.child_by_field_name("module_name") else {
                return Syntax::Other;
            };
            let specifier = node_text(module, src).to_string();
            let mut bindings = Vec::new();
            let mut cursor = node.walk();
            for name_node in node.children_by_field_name("name", &mut cursor) {
                let (imported, local) = match name_node.kind() {
                    "aliased_import" => {
                        let imported = field_text(name_node, "name", src).unwrap_or("");
                        let local = field_text(name_node, "alias", src).unwrap_or(imported);
                        (imported, local)
                    }
                    _ => {
                        let text = node_text(name_node, src);
                        (text, text)
                    }
                };
                if imported.is_empty() {
                    continue;
                }
                bindings.push(ImportBinding {
                    local: local.to_string(),
                    imported: imported.to_string(),
                    specifier: specifier.clone(),
                });
            }
            Syntax::Import(bindings)
        }
        _ => Syntax::Other,
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Enclosing scope shared by every frame below one definition.
type Scope = Option<Rc<ParentRef>>;

/// Per-file traversal state.
struct Walk<'s> {
    src: &'s [u8],
    file: &'s str,
    lang: Lang,
    globals: &'s GlobalSymbols,
    options: ExtractOptions,
    out: FileTags,
}

impl<'s> Walk<'s> {
    fn classify<'t>(&self, node: Node<'t>, scope: Option<&ParentRef>) -> Syntax<'t, 's> {
        match self.lang {
            Lang::TypeScript | Lang::Tsx | Lang::JavaScript => classify_js(node, self.src),
            Lang::Python => classify_python(node, self.src, scope),
        }
    }

    fn make_tag(
        &self,
        name: &str,
        tag_type: TagType,
        kind: TagKind,
        node: Node,
        scope: Option<&ParentRef>,
    ) -> Tag {
        Tag {
            name: name.to_string(),
            tag_type,
            kind,
            file_path: self.file.to_string(),
            target_file: None,
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            text: self
                .options
                .include_text
                .then(|| node_text(node, self.src).to_string()),
            parent: scope.cloned(),
        }
    }

    /// Push a definition and return it as the scope for its body.
    fn define(&mut self, name: &str, tag_type: TagType, node: Node, scope: Option<&ParentRef>) -> Scope {
        let tag = self.make_tag(name, tag_type, TagKind::Definition, node, scope);
        let parent = tag.as_parent();
        self.out.tags.push(tag);
        // Python has no export syntax: public top-level names are exported.
        if self.lang == Lang::Python && scope.is_none() && !name.starts_with('_') {
            self.export(name.to_string());
        }
        Some(Rc::new(parent))
    }

    fn export(&mut self, name: String) {
        if !self.out.exports.contains(&name) {
            self.out.exports.push(name);
        }
    }

    /// Depth-first, pre-order walk from `root` on an explicit stack.
    ///
    /// Each frame carries its own scope, so leaving a subtree restores the
    /// enclosing scope by popping, and nesting depth never grows the call
    /// stack.
    fn run(&mut self, root: Node) {
        let mut stack: Vec<(Node, Scope)> = vec![(root, None)];
        let mut children = Vec::new();
        while let Some((node, scope)) = stack.pop() {
            let Some((body, inner)) = self.visit(node, &scope) else {
                continue;
            };
            let mut cursor = body.walk();
            children.extend(body.children(&mut cursor));
            // Reversed so the first child is popped first.
            while let Some(child) = children.pop() {
                stack.push((child, inner.clone()));
            }
        }
    }

    /// Handle one node. Returns whose children to visit next and under
    /// which scope, or `None` to skip the subtree.
    fn visit<'t>(&mut self, node: Node<'t>, scope: &Scope) -> Option<(Node<'t>, Scope)> {
        let outer = scope.as_deref();
        let next = match self.classify(node, outer) {
            Syntax::Class { name } => (node, self.define(name, TagType::Class, node, outer)),
            Syntax::Function { name } => (node, self.define(name, TagType::Function, node, outer)),
            Syntax::Method { name, tag_type } => (node, self.define(name, tag_type, node, outer)),
            Syntax::Binding { name, value } => match value {
                Some(v) if is_function_value(v.kind()) => {
                    (v, self.define(name, TagType::Function, node, outer))
                }
                Some(v) if v.kind() == "class" => (v, self.define(name, TagType::Class, node, outer)),
                _ => {
                    if is_module_level(node) {
                        self.define(name, TagType::Variable, node, outer);
                    }
                    (node, scope.clone())
                }
            },
            Syntax::TypeDecl { name, tag_type } => {
                self.define(name, tag_type, node, outer);
                (node, scope.clone())
            }
            Syntax::Call {
                callee,
                receiver,
                tag_type,
            } => {
                if !callee.is_empty()
                    && !self
                        .globals
                        .should_ignore_call(self.lang, callee, receiver.as_deref())
                {
                    let tag = self.make_tag(callee, tag_type, TagKind::Reference, node, outer);
                    self.out.tags.push(tag);
                }
                (node, scope.clone())
            }
            Syntax::Import(bindings) => {
                self.out.imports.extend(bindings);
                return None;
            }
            Syntax::Export {
                names,
                default_name,
            } => {
                for name in names {
                    self.export(name);
                }
                if default_name.is_some() {
                    self.out.default_export = default_name;
                }
                (node, scope.clone())
            }
            Syntax::Other => (node, scope.clone()),
        };
        Some(next)
    }
}
