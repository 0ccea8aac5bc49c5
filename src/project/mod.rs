//! Project configuration: `tsconfig.json` loading and input file discovery.

pub mod discovery;
pub mod tsconfig;

pub use discovery::{discover_files, option_excludes, resolve_explicit_files};
pub use tsconfig::{load_tsconfig, resolve_tsconfig_path, strip_jsonc, PatternList, TsConfig};
