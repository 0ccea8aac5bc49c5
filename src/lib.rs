//! Bundle TypeScript declaration output into a single ambient `.d.ts` file.
//!
//! Each input file becomes one `declare module 'prefix/relative/path'` block,
//! with import paths rewritten so the modules keep referring to each other
//! inside the bundle. The pipeline lives in [`generate`]; the compiler and the
//! filesystem are reached through the traits in [`ports`].

pub mod adapters;
pub mod bundle;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod generate;
pub mod naming;
pub mod options;
pub mod paths;
pub mod ports;
pub mod project;
pub mod rewrite;
pub mod scanner;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use error::GenerateError;
pub use generate::{generate, generate_with_hooks, list_modules, GenerateSummary, ModuleEntry};
pub use naming::ResolveHooks;
pub use options::GenerateOptions;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    init_tracing(cli.verbose);
    commands::dispatch(&cli)
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed, e.g. when run() is called twice.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["dts-bundle", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_reports_missing_out() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.ts");
        let result = run([OsStr::new("dts-bundle"), OsStr::new("generate"), file.as_os_str()]);
        assert!(result.unwrap_err().contains("output file is required"));
    }
}
