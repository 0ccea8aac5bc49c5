//! Live adapters for real external interactions.

pub mod compiler;
pub mod filesystem;
