//! `dts-bundle generate` command.

use crate::cli::GenerateArgs;
use crate::context::ServiceContext;
use crate::generate::generate;

/// Execute the `generate` command.
///
/// Writes the bundle and prints where it went and how many modules it holds.
///
/// # Errors
///
/// Returns an error string if the options are invalid or generation fails.
pub fn run_with_context(ctx: &ServiceContext, args: &GenerateArgs) -> Result<(), String> {
    let options = args.to_options().map_err(|e| e.to_string())?;
    let summary = generate(ctx, &options).map_err(|e| e.to_string())?;

    println!("Wrote {} ({} module(s))", summary.out.display(), summary.modules.len());
    if let Some(main) = &summary.main {
        println!("Main module: {main}");
    }
    Ok(())
}
