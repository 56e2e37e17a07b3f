// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when locating the worker interpreter
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("Configured worker interpreter not found: {path}")]
    ExplicitMissing { path: PathBuf },

    #[error("No worker interpreter found (tried {tried:?}, PATH and install directories)")]
    NotFound { tried: Vec<String> },
}
