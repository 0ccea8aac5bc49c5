//! `dts-bundle modules` command.

use crate::cli::GenerateArgs;
use crate::context::ServiceContext;
use crate::generate::{list_modules, ModuleEntry};

/// Execute the `modules` command.
///
/// Displays a table of module names and the source files they come from.
///
/// # Errors
///
/// Returns an error string if the project cannot be loaded.
pub fn run_with_context(ctx: &ServiceContext, args: &GenerateArgs) -> Result<(), String> {
    let options = args.to_options().map_err(|e| e.to_string())?;
    let modules = list_modules(ctx, &options).map_err(|e| e.to_string())?;
    if modules.is_empty() {
        println!("No modules found.");
        return Ok(());
    }
    print!("{}", render_table(&modules));
    println!("\n{} module(s) total.", modules.len());
    Ok(())
}

fn render_table(modules: &[ModuleEntry]) -> String {
    let name_width = modules.iter().map(|m| m.name.len()).max().unwrap_or(6).max(6);
    let source_width = modules.iter().map(|m| m.source.len()).max().unwrap_or(6).max(6);

    let mut out = format!("{:<name_width$}  {:<source_width$}\n", "MODULE", "SOURCE");
    out.push_str(&format!("{:-<name_width$}  {:-<source_width$}\n", "", ""));
    for ModuleEntry { name, source } in modules {
        out.push_str(&format!("{name:<name_width$}  {source:<source_width$}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_columns() {
        let table = render_table(&[
            ModuleEntry { name: "foo/index".into(), source: "index.ts".into() },
            ModuleEntry { name: "foo/Bar".into(), source: "Bar.tsx".into() },
        ]);
        assert_eq!(
            table,
            "MODULE     SOURCE  \n\
             ---------  --------\n\
             foo/index  index.ts\n\
             foo/Bar    Bar.tsx \n"
        );
    }

    #[test]
    fn modules_command_lists_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ServiceContext::live();
        let args = GenerateArgs {
            base_dir: Some(dir.path().to_path_buf()),
            files: vec![dir.path().join("index.ts")],
            ..GenerateArgs::default()
        };
        assert!(run_with_context(&ctx, &args).is_ok());
    }

    #[test]
    fn modules_command_reports_missing_project() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ServiceContext::live();
        let args = GenerateArgs { base_dir: Some(dir.path().to_path_buf()), ..GenerateArgs::default() };
        let err = run_with_context(&ctx, &args).unwrap_err();
        assert!(err.contains("no tsconfig.json found"));
    }
}
