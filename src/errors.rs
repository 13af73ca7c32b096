//! Application error types and user-facing error formatting.
//!
//! Provides structured error types for each layer:
//! - [`ExtractError`] for file-scoped parse failures (never fatal to a run)
//! - [`ScanError`] for files that cannot be read (skipped with a warning)
//! - [`RepographError`] as the unified top-level error type
//!
//! Unresolved references are not errors at all; they are counted in
//! [`crate::resolver::ResolutionStats`].

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `0` - success
/// * `1` - general runtime error
/// * `2` - usage / argument error (bad CLI invocation)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Layer-specific error types
// ---------------------------------------------------------------------------

/// Errors raised while extracting tags from a single file.
///
/// Scoped to that file: the pipeline records the file with zero tags and
/// moves on.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The syntax tree could not be produced, or contains syntax errors.
    #[error("parse error in {file} at line {line}")]
    Parse { file: String, line: usize },

    /// The file extension is not on the supported-language allowlist.
    #[error("unsupported language: {0}")]
    Unsupported(String),

    /// The grammar could not be loaded into the parser (ABI mismatch).
    #[error("failed to load grammar: {0}")]
    Grammar(String),
}

/// Errors raised while reading a candidate file.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size_kb} KiB, over the {limit_kb} KiB limit", .path.display())]
    TooLarge {
        path: PathBuf,
        size_kb: u64,
        limit_kb: u64,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    NotUtf8(PathBuf),
}

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

/// Unified error type for the entire application.
#[derive(Error, Debug)]
pub enum RepographError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usage / argument error (exit code 2).
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepographError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RepographError::Usage(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Return an optional human-readable hint that may help the user fix
    /// the problem.  Returns `None` when no specific guidance applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RepographError::Extract(ExtractError::Unsupported(_)) => {
                Some("supported extensions: .ts .tsx .mts .cts .js .jsx .mjs .cjs .py")
            }
            RepographError::Extract(ExtractError::Grammar(_)) => {
                Some("the bundled grammar does not match the tree-sitter runtime; rebuild")
            }
            RepographError::Scan(ScanError::TooLarge { .. }) => {
                Some("raise [scan] max_file_size_kb in .repograph/config.toml")
            }
            RepographError::Io(e) | RepographError::Scan(ScanError::Access { source: e, .. })
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                Some("verify the file or directory exists")
            }
            RepographError::Io(e) | RepographError::Scan(ScanError::Access { source: e, .. })
                if e.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                Some("check file permissions")
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
