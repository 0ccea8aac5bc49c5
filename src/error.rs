//! Error type for bundle generation.

use std::path::PathBuf;

use thiserror::Error;

use crate::ports::compiler::Diagnostic;

/// Errors produced while generating a declaration bundle.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// No output file was configured.
    #[error("an output file is required (set `out`)")]
    MissingOutput,

    /// No `tsconfig.json` could be found for project-based discovery.
    #[error("Unable to resolve configuration: no tsconfig.json found at \"{}\"", .path.display())]
    ConfigNotFound {
        /// Where the configuration was looked for.
        path: PathBuf,
    },

    /// A configuration file exists but could not be understood.
    #[error("invalid configuration {}: {message}", .path.display())]
    InvalidConfig {
        /// The offending configuration file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A generator option has an unusable value.
    #[error("invalid option `{option}`: {message}")]
    InvalidOption {
        /// Option name.
        option: &'static str,
        /// What went wrong.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being attempted, e.g. "failed to read".
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying error from the filesystem port.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The compiler could not be run at all.
    #[error("compiler failed: {0}")]
    Compiler(Box<dyn std::error::Error + Send + Sync>),

    /// The compiler reported diagnostics that block declaration output.
    #[error("Declaration generation failed{}", format_diagnostics(.diagnostics))]
    EmitFailed {
        /// The blocking diagnostics.
        diagnostics: Vec<Diagnostic>,
    },

    /// `main` does not name any module in the bundle.
    #[error("main module {0} was not found")]
    MainNotFound(String),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("\n{d}")).collect()
}
