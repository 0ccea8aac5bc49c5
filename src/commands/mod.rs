//! Command dispatch and handlers.

pub mod generate;
pub mod modules;

use std::env;
use std::path::PathBuf;

use crate::cassette::session::RecordingSession;
use crate::cli::{Cli, Command};
use crate::context::ServiceContext;

/// Environment variable that switches on cassette recording.
pub const RECORD_ENV: &str = "DTS_BUNDLE_RECORD";

/// Dispatch a parsed command to its handler.
///
/// When `DTS_BUNDLE_RECORD` is set to a directory path, all port interactions
/// are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let (ctx, session) = if let Ok(path) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(PathBuf::from(path))?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(), None)
    };

    let result = dispatch_with_context(cli, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(cli: &Cli, ctx: &ServiceContext) -> Result<(), String> {
    match &cli.command {
        Command::Generate(args) => generate::run_with_context(ctx, args),
        Command::Modules(args) => modules::run_with_context(ctx, args),
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
