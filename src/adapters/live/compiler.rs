//! Live compiler adapter that runs `tsc` as a child process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::paths;
use crate::ports::compiler::{
    Compiler, Diagnostic, DiagnosticCategory, EmitOutput, EmitRequest, EmittedDeclaration,
};

/// Environment variable naming the `tsc` executable.
pub const TSC_ENV: &str = "DTS_BUNDLE_TSC";

/// Runs the TypeScript compiler with declaration-only emit into a temporary
/// directory and collects what it wrote.
pub struct TscCompiler {
    program: PathBuf,
}

impl TscCompiler {
    /// Uses `$DTS_BUNDLE_TSC`, or `tsc` from `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        let program = std::env::var_os(TSC_ENV).map_or_else(|| PathBuf::from("tsc"), PathBuf::from);
        Self { program }
    }

    /// Uses the given executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for TscCompiler {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builds the `tsc` argument list for a request emitting into `emit_dir`.
pub(crate) fn tsc_args(request: &EmitRequest, emit_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--declaration",
        "--emitDeclarationOnly",
        "--noEmit",
        "false",
        "--pretty",
        "false",
        "--listFiles",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push("--outDir".into());
    args.push(emit_dir.into());
    args.push("--declarationDir".into());
    args.push(emit_dir.into());
    args.push("--rootDir".into());
    args.push(request.root_dir.clone().into());

    let options = &request.options;
    let module = options
        .module_resolution
        .and_then(crate::options::ModuleResolution::required_module)
        .unwrap_or("commonjs");
    args.push("--module".into());
    args.push(module.into());
    args.push("--target".into());
    args.push(options.target.as_str().into());
    if let Some(resolution) = options.module_resolution {
        args.push("--moduleResolution".into());
        args.push(resolution.as_str().into());
    }
    if let Some(types) = &options.types {
        args.push("--types".into());
        args.push(types.join(",").into());
    }
    if let Some(base_url) = &options.base_url {
        args.push("--baseUrl".into());
        args.push(base_url.clone().into());
    }
    if options.allow_js {
        args.push("--allowJs".into());
    }

    if let Some(project) = &request.project {
        args.push("--project".into());
        args.push(project.clone().into());
    } else {
        args.extend(request.files.iter().map(|f| OsString::from(f.clone())));
    }
    args
}

/// Parses one `--pretty false` diagnostic line.
///
/// Accepts `file(line,col): error TS1234: message` and
/// `error TS1234: message`.
pub(crate) fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    let (location, rest) = match line.find("): ") {
        Some(idx) if line[..idx].contains('(') && !line[..idx].contains(": ") => {
            (Some(&line[..=idx]), &line[idx + 3..])
        }
        _ => (None, line),
    };

    let (category, rest) = [
        ("error", DiagnosticCategory::Error),
        ("warning", DiagnosticCategory::Warning),
        ("suggestion", DiagnosticCategory::Suggestion),
        ("message", DiagnosticCategory::Message),
    ]
    .into_iter()
    .find_map(|(word, category)| {
        rest.strip_prefix(word).and_then(|r| r.strip_prefix(" TS")).map(|r| (category, r))
    })?;
    let (code, message) = rest.split_once(": ")?;
    let code = code.trim().parse().ok()?;

    let (file, line_no, column) = match location {
        Some(location) => {
            let open = location.rfind('(')?;
            let (line_no, column) = location[open + 1..location.len() - 1].split_once(',')?;
            (
                Some(location[..open].to_string()),
                Some(line_no.trim().parse().ok()?),
                Some(column.trim().parse().ok()?),
            )
        }
        None => (None, None, None),
    };

    Some(Diagnostic { file, line: line_no, column, category, code, message: message.to_string() })
}

/// Splits `tsc` stdout into diagnostics and `--listFiles` entries.
///
/// Diagnostic messages may continue on indented lines; those are appended to
/// the previous diagnostic.
pub(crate) fn parse_output(stdout: &str) -> (Vec<Diagnostic>, Vec<PathBuf>) {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut listed = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(diagnostic) = parse_diagnostic(line) {
            diagnostics.push(diagnostic);
        } else if line.starts_with(char::is_whitespace) {
            if let Some(last) = diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(line.trim());
            }
        } else {
            listed.push(PathBuf::from(line.trim()));
        }
    }
    (diagnostics, listed)
}

impl Compiler for TscCompiler {
    fn emit(
        &self,
        request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>> {
        let emit_dir = tempfile::Builder::new().prefix("dts-bundle-emit").tempdir()?;
        let args = tsc_args(request, emit_dir.path());
        tracing::debug!(program = %self.program.display(), ?args, "running compiler");

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            format!("failed to run {} (set {TSC_ENV} to override): {e}", self.program.display())
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let (diagnostics, listed) = parse_output(&stdout);

        let mut declarations = Vec::new();
        for entry in WalkDir::new(emit_dir.path()).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !path.to_string_lossy().ends_with(".d.ts") {
                continue;
            }
            let Some(rel) = paths::relative_within(path, emit_dir.path()) else {
                continue;
            };
            declarations.push(EmittedDeclaration {
                path: paths::to_slashes(&rel.to_string_lossy()),
                text: std::fs::read_to_string(path)?,
            });
        }

        if !output.status.success() && declarations.is_empty() && diagnostics.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(format!(
                "{} exited with {}: {detail}",
                self.program.display(),
                output.status.code().unwrap_or(-1)
            )
            .into());
        }

        let input_declarations = listed
            .iter()
            .filter(|p| p.to_string_lossy().ends_with(".d.ts"))
            .filter_map(|p| paths::relative_within(p, &request.root_dir))
            .filter(|rel| !rel.components().any(|c| c.as_os_str() == "node_modules"))
            .map(|rel| paths::to_slashes(&rel.to_string_lossy()))
            .collect();

        Ok(EmitOutput { declarations, input_declarations, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ModuleResolution, Target};
    use crate::ports::compiler::EmitOptions;

    fn request(project: Option<&str>) -> EmitRequest {
        EmitRequest {
            project: project.map(PathBuf::from),
            files: vec![PathBuf::from("/p/index.ts"), PathBuf::from("/p/Bar.ts")],
            root_dir: PathBuf::from("/p"),
            options: EmitOptions {
                target: Target::Es5,
                module_resolution: Some(ModuleResolution::Node10),
                types: Some(vec!["node".into(), "jest".into()]),
                ..EmitOptions::default()
            },
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn explicit_files_are_passed_without_project() {
        let args = strings(&tsc_args(&request(None), Path::new("/tmp/emit")));
        assert!(args.windows(2).any(|w| w == ["--rootDir", "/p"]));
        assert!(args.windows(2).any(|w| w == ["--outDir", "/tmp/emit"]));
        assert!(args.windows(2).any(|w| w == ["--target", "es5"]));
        assert!(args.windows(2).any(|w| w == ["--module", "commonjs"]));
        assert!(args.windows(2).any(|w| w == ["--types", "node,jest"]));
        assert!(!args.contains(&"--project".to_string()));
        assert_eq!(&args[args.len() - 2..], ["/p/index.ts", "/p/Bar.ts"]);
    }

    #[test]
    fn project_replaces_file_list() {
        let args = strings(&tsc_args(&request(Some("/p/tsconfig.json")), Path::new("/tmp/e")));
        assert_eq!(&args[args.len() - 2..], ["--project", "/p/tsconfig.json"]);
        assert!(!args.contains(&"/p/index.ts".to_string()));
    }

    #[test]
    fn nodenext_resolution_sets_module() {
        let mut req = request(None);
        req.options.module_resolution = Some(ModuleResolution::NodeNext);
        let args = strings(&tsc_args(&req, Path::new("/e")));
        assert!(args.windows(2).any(|w| w == ["--module", "nodenext"]));
    }

    #[test]
    fn bundler_resolution_sets_an_es_module() {
        let mut req = request(None);
        req.options.module_resolution = Some(ModuleResolution::Bundler);
        let args = strings(&tsc_args(&req, Path::new("/e")));
        assert!(args.windows(2).any(|w| w == ["--module", "esnext"]));
        assert!(!args.iter().any(|a| a == "commonjs"));
        assert!(args.windows(2).any(|w| w == ["--moduleResolution", "bundler"]));
    }

    #[test]
    fn parses_located_diagnostic() {
        let d = parse_diagnostic(
            "src/a (1).ts(12,5): error TS4025: Exported variable 'x' has or is using private name 'Y'.",
        )
        .unwrap();
        assert_eq!(d.file.as_deref(), Some("src/a (1).ts"));
        assert_eq!((d.line, d.column), (Some(12), Some(5)));
        assert_eq!(d.code, 4025);
        assert_eq!(d.category, DiagnosticCategory::Error);
        assert!(d.message.starts_with("Exported variable"));
    }

    #[test]
    fn parses_global_diagnostic() {
        let d = parse_diagnostic("error TS5023: Unknown compiler option 'foo'.").unwrap();
        assert_eq!(d.file, None);
        assert_eq!(d.code, 5023);
    }

    #[test]
    fn parens_inside_a_global_message_are_not_a_location() {
        let d = parse_diagnostic("error TS5024: Option 'x' requires a value of type '(a): b'.").unwrap();
        assert_eq!(d.file, None);
        assert_eq!(d.code, 5024);
    }

    #[test]
    fn separates_listed_files_from_diagnostics() {
        let stdout = "/usr/lib/node_modules/typescript/lib/lib.d.ts\n\
                      /p/index.ts(1,8): error TS2307: Cannot find module 'x'.\n\
                      \x20\x20Some continuation.\n\
                      /p/types/globals.d.ts\n";
        let (diagnostics, listed) = parse_output(stdout);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.ends_with("Some continuation."));
        assert_eq!(
            listed,
            vec![
                PathBuf::from("/usr/lib/node_modules/typescript/lib/lib.d.ts"),
                PathBuf::from("/p/types/globals.d.ts"),
            ]
        );
    }

    #[test]
    fn missing_executable_is_an_error() {
        let compiler = TscCompiler::new("/nonexistent/dts-bundle/tsc");
        let result = compiler.emit(&request(None));
        assert!(result.unwrap_err().to_string().contains("failed to run"));
    }
}
