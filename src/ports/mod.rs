//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the bundler core and an
//! external system (the filesystem and the TypeScript compiler).
//! Implementations live in `src/adapters/`.

pub mod compiler;
pub mod filesystem;

pub use compiler::{
    Compiler, Diagnostic, DiagnosticCategory, EmitOptions, EmitOutput, EmitRequest,
    EmittedDeclaration,
};
pub use filesystem::FileSystem;
