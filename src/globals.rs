//! Global symbols per language.
//!
//! Calls whose target is a language built-in, a platform global or a
//! standard-library method never become reference tags; see
//! [`GlobalSymbols::should_ignore_call`]. Globals are checked against bare
//! callees and the root of a receiver chain, method names only against the
//! property of a member call.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::extractor::Lang;

/// ECMAScript built-in objects, constructors and functions.
const LANGUAGE_BUILTINS: &[&str] = &[
    "Array",
    "ArrayBuffer",
    "BigInt",
    "Boolean",
    "DataView",
    "Date",
    "Error",
    "EvalError",
    "Function",
    "Intl",
    "JSON",
    "Map",
    "Math",
    "Number",
    "Object",
    "Promise",
    "Proxy",
    "RangeError",
    "ReferenceError",
    "Reflect",
    "RegExp",
    "Set",
    "String",
    "Symbol",
    "SyntaxError",
    "TypeError",
    "URIError",
    "WeakMap",
    "WeakSet",
    "Uint8Array",
    "Int32Array",
    "Float64Array",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "eval",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "globalThis",
    "undefined",
];

/// Browser and Node.js globals.
const PLATFORM_GLOBALS: &[&str] = &[
    "console",
    "window",
    "document",
    "navigator",
    "location",
    "localStorage",
    "sessionStorage",
    "fetch",
    "setTimeout",
    "clearTimeout",
    "setInterval",
    "clearInterval",
    "setImmediate",
    "queueMicrotask",
    "requestAnimationFrame",
    "structuredClone",
    "alert",
    "process",
    "require",
    "module",
    "exports",
    "Buffer",
    "URL",
    "URLSearchParams",
    "AbortController",
    "TextEncoder",
    "TextDecoder",
    "Headers",
    "Request",
    "Response",
    "Event",
    "EventTarget",
    "describe",
    "it",
    "test",
    "expect",
    "beforeEach",
    "afterEach",
    "beforeAll",
    "afterAll",
    "jest",
];

/// Standard-library methods on strings, collections, promises and the
/// console.
const STDLIB_METHODS: &[&str] = &[
    // console
    "log",
    "info",
    "warn",
    "error",
    "debug",
    "trace",
    "table",
    // arrays
    "push",
    "pop",
    "shift",
    "unshift",
    "slice",
    "splice",
    "concat",
    "join",
    "reverse",
    "sort",
    "indexOf",
    "lastIndexOf",
    "includes",
    "find",
    "findIndex",
    "filter",
    "map",
    "forEach",
    "reduce",
    "reduceRight",
    "some",
    "every",
    "flat",
    "flatMap",
    "fill",
    "at",
    "from",
    "isArray",
    // objects
    "keys",
    "values",
    "entries",
    "assign",
    "freeze",
    "hasOwnProperty",
    "toString",
    "valueOf",
    "stringify",
    "parse",
    // strings
    "split",
    "trim",
    "trimStart",
    "trimEnd",
    "replace",
    "replaceAll",
    "toLowerCase",
    "toUpperCase",
    "startsWith",
    "endsWith",
    "substring",
    "substr",
    "charAt",
    "charCodeAt",
    "padStart",
    "padEnd",
    "match",
    "matchAll",
    "localeCompare",
    "toFixed",
    // maps and sets
    "get",
    "set",
    "has",
    "add",
    "delete",
    "clear",
    // promises
    "then",
    "catch",
    "finally",
    "resolve",
    "reject",
    "all",
    "allSettled",
    "race",
    // functions
    "call",
    "apply",
    "bind",
    // math
    "max",
    "min",
    "floor",
    "ceil",
    "round",
    "abs",
    "random",
    "now",
];

/// Python built-in functions, types and exceptions.
const PYTHON_BUILTINS: &[&str] = &[
    "print",
    "len",
    "range",
    "str",
    "int",
    "float",
    "bool",
    "list",
    "dict",
    "set",
    "tuple",
    "isinstance",
    "issubclass",
    "super",
    "open",
    "enumerate",
    "zip",
    "sorted",
    "reversed",
    "sum",
    "min",
    "max",
    "abs",
    "any",
    "all",
    "getattr",
    "setattr",
    "hasattr",
    "type",
    "repr",
    "format",
    "Exception",
    "ValueError",
    "KeyError",
    "TypeError",
    "RuntimeError",
];

/// Methods of Python's built-in str, list and dict types.
const PYTHON_METHODS: &[&str] = &[
    "__init__",
    "append",
    "extend",
    "insert",
    "items",
    "keys",
    "values",
    "update",
    "setdefault",
    "strip",
    "split",
    "join",
    "format",
];

static SCRIPT_GLOBALS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| LANGUAGE_BUILTINS.iter().chain(PLATFORM_GLOBALS).copied().collect());

static SCRIPT_METHODS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STDLIB_METHODS.iter().copied().collect());

static PYTHON_GLOBALS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| PYTHON_BUILTINS.iter().copied().collect());

static PYTHON_METHOD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| PYTHON_METHODS.iter().copied().collect());

fn globals_for(lang: Lang) -> &'static HashSet<&'static str> {
    match lang {
        Lang::TypeScript | Lang::Tsx | Lang::JavaScript => &SCRIPT_GLOBALS,
        Lang::Python => &PYTHON_GLOBALS,
    }
}

fn methods_for(lang: Lang) -> &'static HashSet<&'static str> {
    match lang {
        Lang::TypeScript | Lang::Tsx | Lang::JavaScript => &SCRIPT_METHODS,
        Lang::Python => &PYTHON_METHOD_SET,
    }
}

/// The set of names that are never project-internal call targets: the
/// built-in lists above plus any extra names from configuration.
#[derive(Debug, Clone, Default)]
pub struct GlobalSymbols {
    extra: HashSet<String>,
}

impl GlobalSymbols {
    /// The built-in set only.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in set extended with `extra` names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is a global identifier of `lang`, or one of the
    /// configured extra names.
    pub fn is_global(&self, lang: Lang, name: &str) -> bool {
        globals_for(lang).contains(name) || self.extra.contains(name)
    }

    /// Decide whether a call site should be dropped.
    ///
    /// `receiver` is `None` for a plain call and the receiver chain of a
    /// member call otherwise (root first, e.g. `["this", "items"]` for
    /// `this.items.push()`). A plain call is dropped when its name is a
    /// global. A member call is dropped when its property is a
    /// standard-library method or the root of its chain is a global.
    /// `Error` construction is always dropped.
    pub fn should_ignore_call(&self, lang: Lang, callee: &str, receiver: Option<&[&str]>) -> bool {
        if callee == "Error" {
            return true;
        }
        let Some(chain) = receiver else {
            return self.is_global(lang, callee);
        };
        if methods_for(lang).contains(callee) {
            return true;
        }
        chain
            .first()
            .is_some_and(|root| !matches!(*root, "this" | "self") && self.is_global(lang, root))
    }
}
