//! Shared types and data structures.
//!
//! Two families live here: [`Tag`]s, the transient extraction records produced
//! per file, and the graph records ([`GraphNodeData`], [`GraphEdgeData`]) that
//! are handed to persistence.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// What a tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagType {
    Class,
    Function,
    Method,
    StaticMethod,
    PrivateMethod,
    FunctionCall,
    MethodCall,
    ConstructorCall,
    Variable,
    TypeAlias,
    Interface,
    Enum,
}

impl TagType {
    /// The name used in symbol-index keys (`"<name>:<type>"`).
    pub fn as_str(self) -> &'static str {
        match self {
            TagType::Class => "class",
            TagType::Function => "function",
            TagType::Method => "method",
            TagType::StaticMethod => "static_method",
            TagType::PrivateMethod => "private_method",
            TagType::FunctionCall => "function_call",
            TagType::MethodCall => "method_call",
            TagType::ConstructorCall => "constructor_call",
            TagType::Variable => "variable",
            TagType::TypeAlias => "type_alias",
            TagType::Interface => "interface",
            TagType::Enum => "enum",
        }
    }

    /// True for the call-site types that only ever appear on references.
    pub fn is_call(self) -> bool {
        matches!(
            self,
            TagType::FunctionCall | TagType::MethodCall | TagType::ConstructorCall
        )
    }

    /// Definition types a reference of this type may resolve to, in lookup
    /// order. Empty for definition types.
    pub fn resolution_candidates(self) -> &'static [TagType] {
        match self {
            TagType::FunctionCall => &[TagType::Function, TagType::Variable],
            TagType::MethodCall => &[
                TagType::Method,
                TagType::StaticMethod,
                TagType::PrivateMethod,
            ],
            TagType::ConstructorCall => &[TagType::Class],
            _ => &[],
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a tag declares a name or uses one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagKind {
    Definition,
    Reference,
}

/// A position in the repository: repo-relative file path and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file_path: String,
    pub start_line: usize,
}

/// The enclosing scope of a tag, held by value.
///
/// This is a lookup key (name, type, where it was declared), never a link
/// into another tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParentRef {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub location: Location,
}

/// A definition or reference extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub kind: TagKind,
    /// Repo-relative path of the file the tag was extracted from.
    pub file_path: String,
    /// Origin file of the referenced name, when an import alias resolved it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    /// 1-based first line.
    pub start_line: usize,
    /// 1-based last line.
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl Tag {
    pub fn is_definition(&self) -> bool {
        self.kind == TagKind::Definition
    }

    /// This tag seen as the enclosing scope of the tags nested inside it.
    pub fn as_parent(&self) -> ParentRef {
        ParentRef {
            name: self.name.clone(),
            tag_type: self.tag_type,
            location: Location {
                file_path: self.file_path.clone(),
                start_line: self.start_line,
            },
        }
    }
}

/// One binding of an import statement, e.g. `import { a as b } from './x'`
/// is `{ local: "b", imported: "a", specifier: "./x" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBinding {
    pub local: String,
    pub imported: String,
    pub specifier: String,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTags {
    /// Definitions and references in traversal order.
    pub tags: Vec<Tag>,
    /// Names the file exports.
    pub exports: Vec<String>,
    /// Name of the declaration exported as `default`.
    pub default_export: Option<String>,
    /// Import bindings in source order.
    pub imports: Vec<ImportBinding>,
}

// ---------------------------------------------------------------------------
// Graph records
// ---------------------------------------------------------------------------

/// The kind of a graph vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Repository,
    Folder,
    File,
    Class,
    Function,
    Method,
    Variable,
    TypeAlias,
    Interface,
    Enum,
    /// A resolved usage site.
    Reference,
}

impl NodeType {
    /// Node type of a definition tag. Method variants collapse into `Method`.
    pub fn for_definition(tag_type: TagType) -> NodeType {
        debug_assert!(!tag_type.is_call(), "{tag_type} is not a definition type");
        match tag_type {
            TagType::Class => NodeType::Class,
            TagType::Function => NodeType::Function,
            TagType::Method | TagType::StaticMethod | TagType::PrivateMethod => NodeType::Method,
            TagType::Variable => NodeType::Variable,
            TagType::TypeAlias => NodeType::TypeAlias,
            TagType::Interface => NodeType::Interface,
            TagType::Enum => NodeType::Enum,
            TagType::FunctionCall | TagType::MethodCall | TagType::ConstructorCall => {
                NodeType::Reference
            }
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Repository => "repository",
            NodeType::Folder => "folder",
            NodeType::File => "file",
            NodeType::Class => "class",
            NodeType::Function => "function",
            NodeType::Method => "method",
            NodeType::Variable => "variable",
            NodeType::TypeAlias => "type_alias",
            NodeType::Interface => "interface",
            NodeType::Enum => "enum",
            NodeType::Reference => "reference",
        };
        write!(f, "{s}")
    }
}

/// A graph vertex. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNodeData {
    pub node_id: String,
    pub repo_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reference: Option<bool>,
    /// Seconds since the Unix epoch, when timestamps are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

/// The kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeType {
    Contains,
    References,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Contains => write!(f, "CONTAINS"),
            EdgeType::References => write!(f, "REFERENCES"),
        }
    }
}

/// A directed, typed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdgeData {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub repo_id: String,
}
