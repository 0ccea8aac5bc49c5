//! Compiler port: the declaration emitter treated as a black box.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::options::{ModuleResolution, Target};

/// Compiler settings that influence declaration output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitOptions {
    /// Language target.
    pub target: Target,
    /// Module resolution strategy, if not the compiler default.
    pub module_resolution: Option<ModuleResolution>,
    /// `@types` packages to load.
    pub types: Option<Vec<String>>,
    /// Base URL for non-relative module names.
    pub base_url: Option<PathBuf>,
    /// Whether JavaScript inputs are compiled too.
    pub allow_js: bool,
}

/// One request to emit declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitRequest {
    /// Resolved `tsconfig.json` when the inputs come from a project.
    pub project: Option<PathBuf>,
    /// Absolute input files. The compiler receives them directly only when
    /// there is no project.
    pub files: Vec<PathBuf>,
    /// Directory that emitted declarations are laid out relative to.
    pub root_dir: PathBuf,
    /// Compiler settings.
    pub options: EmitOptions,
}

/// A declaration file produced by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedDeclaration {
    /// `/`-separated path relative to the emit root, e.g. `sub/Bar.d.ts`.
    pub path: String,
    /// Declaration text.
    pub text: String,
}

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    /// An error.
    Error,
    /// A warning.
    Warning,
    /// A suggestion.
    Suggestion,
    /// An informational message.
    Message,
}

/// A compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File the diagnostic points at, as reported by the compiler.
    pub file: Option<String>,
    /// 1-based line.
    pub line: Option<u32>,
    /// 1-based column.
    pub column: Option<u32>,
    /// Severity.
    pub category: DiagnosticCategory,
    /// Numeric `TSxxxx` code.
    pub code: u32,
    /// Message text.
    pub message: String,
}

impl Diagnostic {
    /// Whether this diagnostic prevents trustworthy declaration output.
    ///
    /// Only syntax errors (1xxx), declaration emit errors (4xxx) and
    /// option/emit-blocking errors (5xxx) count. Type errors do not, since
    /// bundling does not type-check.
    #[must_use]
    pub fn blocks_emit(&self) -> bool {
        self.category == DiagnosticCategory::Error
            && matches!(self.code, 1000..=1999 | 4000..=4999 | 5000..=5999)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}")?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, "({line},{column})")?;
            }
            write!(f, ": ")?;
        }
        f.write_str(&self.message)
    }
}

/// Everything the compiler reports for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOutput {
    /// Emitted declaration files.
    pub declarations: Vec<EmittedDeclaration>,
    /// `.d.ts` files that were compiler inputs under the root, relative to it.
    pub input_declarations: Vec<String>,
    /// Diagnostics from the run.
    pub diagnostics: Vec<Diagnostic>,
}

/// Emits declaration files for a TypeScript program.
pub trait Compiler: Send + Sync {
    /// Compiles the request and returns declaration text and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error only when the compiler cannot be run at all;
    /// compilation problems are reported as diagnostics.
    fn emit(
        &self,
        request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(code: u32, category: DiagnosticCategory) -> Diagnostic {
        Diagnostic {
            file: Some("a.ts".into()),
            line: Some(1),
            column: Some(2),
            category,
            code,
            message: "msg".into(),
        }
    }

    #[test]
    fn only_emit_related_errors_block() {
        assert!(diagnostic(1005, DiagnosticCategory::Error).blocks_emit());
        assert!(diagnostic(4025, DiagnosticCategory::Error).blocks_emit());
        assert!(diagnostic(5055, DiagnosticCategory::Error).blocks_emit());
        assert!(!diagnostic(2304, DiagnosticCategory::Error).blocks_emit());
        assert!(!diagnostic(6059, DiagnosticCategory::Error).blocks_emit());
        assert!(!diagnostic(4025, DiagnosticCategory::Warning).blocks_emit());
    }

    #[test]
    fn display_includes_location() {
        assert_eq!(diagnostic(1, DiagnosticCategory::Error).to_string(), "a.ts(1,2): msg");
    }
}
