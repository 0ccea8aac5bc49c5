//! Shared helpers for the integration tests.
//!
//! `FixtureCompiler` stands in for `tsc`: it walks the requested inputs and
//! their imports and serves the declarations prewritten under
//! `tests/emitted/<fixture>/`, laid out relative to the emit root.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dts_bundle::paths;
use dts_bundle::ports::compiler::{Compiler, EmitOutput, EmitRequest, EmittedDeclaration};
use dts_bundle::rewrite::module_specifiers;

/// Path of a fixture project under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Compiler double serving prewritten declarations.
pub struct FixtureCompiler {
    emitted: PathBuf,
}

impl FixtureCompiler {
    /// Serves the declarations under `tests/emitted/<name>`.
    pub fn new(name: &str) -> Self {
        Self { emitted: Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/emitted").join(name) }
    }
}

impl Compiler for FixtureCompiler {
    fn emit(
        &self,
        request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>> {
        let mut queue = request.files.clone();
        let mut seen = BTreeSet::new();
        let mut output = EmitOutput::default();

        while let Some(file) = queue.pop() {
            if !seen.insert(file.clone()) {
                continue;
            }
            let relative = file.strip_prefix(&request.root_dir)?;
            let relative = paths::to_slashes(&relative.to_string_lossy());
            let source = std::fs::read_to_string(&file)?;

            if relative.ends_with(".d.ts") {
                output.input_declarations.push(relative);
            } else {
                let stem = relative.rsplit_once('.').map_or(relative.as_str(), |(stem, _)| stem);
                let path = format!("{stem}.d.ts");
                let text = std::fs::read_to_string(self.emitted.join(&path))?;
                output.declarations.push(EmittedDeclaration { path, text });
            }

            for specifier in module_specifiers(&source) {
                if let Some(found) =
                    resolve_import(&file, &specifier, request.options.base_url.as_deref())
                {
                    queue.push(found);
                }
            }
        }

        output.declarations.sort_by(|a, b| a.path.cmp(&b.path));
        output.input_declarations.sort();
        Ok(output)
    }
}

fn resolve_import(from: &Path, specifier: &str, base_url: Option<&Path>) -> Option<PathBuf> {
    let base = if paths::is_relative_specifier(specifier) {
        from.parent()?.join(specifier)
    } else {
        base_url?.join(specifier)
    };
    let base = paths::normalize(&base);
    [".ts", ".tsx", ".d.ts", "/index.ts"]
        .iter()
        .map(|suffix| PathBuf::from(format!("{}{suffix}", base.display())))
        .find(|candidate| candidate.is_file())
}

/// Reads a written bundle.
pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
