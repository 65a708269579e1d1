//! Error types for tree editing and sandbox bootstrap.

use thiserror::Error;

/// Top-level error type for treehouse operations.
///
/// Structural variants (`DuplicateSibling`, `NotFound`, `ParentNotFolder`,
/// `TargetIsFolder`) are recoverable: the tree they were raised against is
/// left unmodified. Bootstrap variants are terminal for the current attempt
/// and require an explicit re-trigger.
#[derive(Error, Debug)]
pub enum Error {
    /// A sibling with the same name (and extension, for files) already exists.
    #[error("a sibling named '{path}' already exists")]
    DuplicateSibling { path: String },

    /// No node exists at the given path.
    #[error("no node found at '{path}'")]
    NotFound { path: String },

    /// The parent path resolves to a file, not a folder.
    #[error("parent '{path}' is a file, not a folder")]
    ParentNotFolder { path: String },

    /// A content operation targeted a folder.
    #[error("'{path}' is a folder, not a file")]
    TargetIsFolder { path: String },

    /// The sandbox runtime failed to boot or became unusable.
    #[error("sandbox runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Writing files into the sandbox filesystem failed.
    #[error("failed to mount files: {0}")]
    Mount(String),

    /// The dependency install command exited non-zero.
    #[error("dependency install failed with exit code {0}")]
    InstallFailed(i32),

    /// The build command exited non-zero.
    #[error("build failed with exit code {0}")]
    BuildFailed(i32),

    /// The manifest declares neither a `dev` nor a `start` script.
    #[error("no start or dev script found in package.json")]
    NoStartCommand,

    /// The manifest could not be parsed.
    #[error("invalid package.json: {0}")]
    ManifestInvalid(String),

    /// The persistence collaborator failed; surfaced verbatim, never retried.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// IO error during runtime operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for treehouse operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true for structural-conflict errors raised by tree edits.
    ///
    /// These are surfaced to the editing UI and never abort a session.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::DuplicateSibling { .. }
                | Error::NotFound { .. }
                | Error::ParentNotFolder { .. }
                | Error::TargetIsFolder { .. }
        )
    }
}
