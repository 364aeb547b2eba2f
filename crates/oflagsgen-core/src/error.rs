//! Error types for oflagsgen

use thiserror::Error;

/// oflagsgen error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compiler not found: {0}")]
    CompilerNotFound(String),

    #[error("Compiler exited with status {code}: {stderr}")]
    CompilerFailed { code: i32, stderr: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Expansion error: {0}")]
    Expand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code to report for this error.
    ///
    /// A failing compiler's own status is passed through; everything else
    /// is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::CompilerFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Result type alias for oflagsgen
pub type Result<T> = std::result::Result<T, Error>;
