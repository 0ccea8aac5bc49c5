//! The bundling pipeline: discover inputs, emit declarations, rename
//! modules, and write one ambient bundle.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use globset::GlobSet;

use crate::bundle::{BundleWriter, MainAliasStyle};
use crate::context::ServiceContext;
use crate::error::GenerateError;
use crate::naming::{DefaultHooks, ModuleNamer, ResolveHooks};
use crate::options::{GenerateOptions, Target};
use crate::paths;
use crate::ports::compiler::{EmitOptions, EmitOutput, EmitRequest};
use crate::ports::filesystem::FileSystem;
use crate::project::{self, TsConfig};
use crate::rewrite::{self, Rewritten};

/// One module of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Module name as written in the bundle.
    pub name: String,
    /// Source file, `/`-separated and relative to the base directory.
    pub source: String,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Absolute path of the written bundle.
    pub out: PathBuf,
    /// Bundled modules in output order.
    pub modules: Vec<ModuleEntry>,
    /// Name of the synthesized main module, if one was written.
    pub main: Option<String>,
}

/// Generates a bundle with the built-in module naming.
///
/// # Errors
///
/// See [`generate_with_hooks`].
pub fn generate(
    ctx: &ServiceContext,
    options: &GenerateOptions,
) -> Result<GenerateSummary, GenerateError> {
    generate_with_hooks(ctx, options, &DefaultHooks)
}

/// Generates a bundle, letting `hooks` override module names and imports.
///
/// # Errors
///
/// Returns an error if the options are invalid, the project cannot be
/// loaded, the compiler fails or reports blocking diagnostics, `main` names
/// no bundled module, or the bundle cannot be written.
pub fn generate_with_hooks(
    ctx: &ServiceContext,
    options: &GenerateOptions,
    hooks: &dyn ResolveHooks,
) -> Result<GenerateSummary, GenerateError> {
    let out = options.validate()?;
    let cwd = current_dir()?;
    let out = paths::absolutize(out, &cwd);
    let fs = ctx.fs.as_ref();

    let layout = Layout::resolve(fs, options, &cwd)?;
    let excludes = project::option_excludes(&options.exclude)?;

    let request = EmitRequest {
        project: layout.config.as_ref().map(|c| c.path.clone()),
        files: layout.inputs.clone(),
        root_dir: layout.base_dir.clone(),
        options: layout.emit.clone(),
    };
    tracing::info!(
        files = request.files.len(),
        base_dir = %layout.base_dir.display(),
        target = %request.options.target,
        "emitting declarations"
    );
    let output = ctx.compiler.emit(&request).map_err(GenerateError::Compiler)?;
    check_diagnostics(&output)?;

    let units = collect_units(fs, &layout, output, &excludes, &out)?;
    let externals: BTreeSet<String> =
        units.iter().flat_map(|unit| rewrite::declared_module_names(&unit.text)).collect();
    tracing::debug!(modules = units.len(), externals = externals.len(), "collected modules");

    let mut roots: Vec<PathBuf> = layout.out_dir.iter().cloned().collect();
    roots.push(layout.base_dir.clone());
    let namer = ModuleNamer::new(
        options.module_prefix(),
        units.iter().map(|unit| unit.id.clone()),
        externals,
        roots,
        hooks,
    )
    .with_base_url(layout.emit.base_url.clone());

    let main = match options.main.as_deref() {
        Some(main) => match main_alias_name(options) {
            Some(alias) => Some((alias, namer.resolve_main(main)?)),
            None => {
                tracing::warn!(main, "`main` needs `name` or `prefix` to name the alias; skipping it");
                None
            }
        },
        None => None,
    };

    let rewritten: Vec<Rewritten> = units
        .iter()
        .map(|unit| {
            tracing::debug!(module = %unit.id, source = %unit.source, "rewriting");
            rewrite::rewrite_declaration(&unit.text, |specifier| {
                namer.resolve_import(&unit.id, specifier)
            })
        })
        .collect();

    let mut writer = BundleWriter::new(options.eol(), options.indent());
    for path in &options.externs {
        writer.reference_path(path);
    }
    for name in options.types.iter().flatten() {
        writer.reference_types(name);
    }
    let bundle_dir = out.parent().map_or_else(|| cwd.clone(), Path::to_path_buf);
    for (unit, rewritten) in units.iter().zip(&rewritten) {
        for reference in &rewritten.hoisted_references {
            if reference.attribute != "path" {
                writer.reference(&reference.attribute, &reference.value);
                continue;
            }
            let rebased = rebase_reference_path(
                &layout.base_dir,
                &unit.id,
                &reference.value,
                &namer,
                &bundle_dir,
            );
            match rebased {
                Some(path) => writer.reference_path(&path),
                None => tracing::debug!(
                    module = %unit.id,
                    path = %reference.value,
                    "referenced file is bundled; dropping the reference"
                ),
            }
        }
    }

    let mut modules = Vec::with_capacity(units.len());
    for (unit, rewritten) in units.iter().zip(&rewritten) {
        let name = namer.module_name(&unit.id);
        if rewritten.external_module {
            writer.module_block(&name, &rewritten.text);
        } else {
            tracing::debug!(source = %unit.source, "writing global declarations as-is");
            writer.raw(&rewritten.text);
        }
        modules.push(ModuleEntry { name, source: unit.source.clone() });
    }

    let main = main.map(|(alias, main_id)| {
        let target = namer.module_name(&main_id);
        let style = if layout.emit.target.is_es2015_or_later() {
            let exports = units
                .iter()
                .zip(&rewritten)
                .find(|(unit, _)| unit.id == main_id)
                .map(|(_, r)| r.exports)
                .unwrap_or_default();
            MainAliasStyle::EsModule { default: exports.default, named: exports.named }
        } else {
            MainAliasStyle::ExportAssignment
        };
        writer.main_alias(&alias, &target, style);
        alias
    });

    fs.write(&out, &writer.finish()).map_err(|source| GenerateError::Io {
        action: "failed to write",
        path: out.clone(),
        source,
    })?;
    tracing::info!(out = %out.display(), modules = modules.len(), "wrote bundle");

    Ok(GenerateSummary { out, modules, main })
}

/// Lists the modules a run would bundle without invoking the compiler.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded or an exclude pattern is
/// invalid.
pub fn list_modules(
    ctx: &ServiceContext,
    options: &GenerateOptions,
) -> Result<Vec<ModuleEntry>, GenerateError> {
    let cwd = current_dir()?;
    let layout = Layout::resolve(ctx.fs.as_ref(), options, &cwd)?;
    let excludes = project::option_excludes(&options.exclude)?;

    let mut by_id: BTreeMap<String, String> = BTreeMap::new();
    for input in &layout.inputs {
        let Some(relative) = paths::relative_within(input, &layout.base_dir) else {
            tracing::warn!(file = %input.display(), "input is outside the base directory");
            continue;
        };
        let source = paths::to_slashes(&relative.to_string_lossy());
        let id = module_id(&relative);
        if is_excluded(&excludes, &[source.as_str(), id.as_str()]) {
            continue;
        }
        by_id.entry(id).or_insert(source);
    }

    let namer = ModuleNamer::new(
        options.module_prefix(),
        by_id.keys().cloned(),
        BTreeSet::new(),
        Vec::new(),
        &DefaultHooks,
    );
    Ok(by_id
        .into_iter()
        .map(|(id, source)| ModuleEntry { name: namer.module_name(&id), source })
        .collect())
}

/// Where inputs come from and how the compiler is asked to emit them.
struct Layout {
    config: Option<TsConfig>,
    inputs: Vec<PathBuf>,
    base_dir: PathBuf,
    out_dir: Option<PathBuf>,
    emit: EmitOptions,
}

impl Layout {
    fn resolve(
        fs: &dyn FileSystem,
        options: &GenerateOptions,
        cwd: &Path,
    ) -> Result<Self, GenerateError> {
        let option_base = options
            .base_dir
            .as_deref()
            .map_or_else(|| cwd.to_path_buf(), |dir| paths::absolutize(dir, cwd));

        let (config, inputs, base_dir) = if options.uses_project() {
            let path =
                project::resolve_tsconfig_path(fs, options.project.as_deref(), &option_base, cwd)?;
            tracing::debug!(config = %path.display(), "loading project");
            let config = project::load_tsconfig(fs, &path)?;
            let inputs = project::discover_files(fs, &config)?;
            let base_dir = config.root_dir.clone().unwrap_or_else(|| config.dir().to_path_buf());
            (Some(config), inputs, base_dir)
        } else {
            let inputs = project::resolve_explicit_files(&options.files, &option_base, cwd);
            (None, inputs, option_base)
        };
        tracing::debug!(files = inputs.len(), "found inputs");

        let out_dir = match &options.out_dir {
            Some(dir) => Some(paths::absolutize(dir, cwd)),
            None => config
                .as_ref()
                .and_then(|c| c.declaration_dir.clone().or_else(|| c.out_dir.clone())),
        };

        let target: Target =
            options.target.or_else(|| config.as_ref().and_then(|c| c.target)).unwrap_or_default();
        let emit = EmitOptions {
            target,
            module_resolution: options
                .module_resolution
                .or_else(|| config.as_ref().and_then(|c| c.module_resolution)),
            types: options.types.clone().or_else(|| config.as_ref().and_then(|c| c.types.clone())),
            base_url: config.as_ref().and_then(|c| c.base_url.clone()),
            allow_js: config.as_ref().and_then(|c| c.allow_js).unwrap_or(false),
        };

        Ok(Self { config, inputs, base_dir, out_dir, emit })
    }
}

/// A declaration file headed for the bundle.
struct Unit {
    id: String,
    source: String,
    text: String,
}

fn check_diagnostics(output: &EmitOutput) -> Result<(), GenerateError> {
    let (blocking, other): (Vec<_>, Vec<_>) =
        output.diagnostics.iter().cloned().partition(|d| d.blocks_emit());
    for diagnostic in &other {
        tracing::warn!(code = diagnostic.code, "{diagnostic}");
    }
    if blocking.is_empty() {
        Ok(())
    } else {
        Err(GenerateError::EmitFailed { diagnostics: blocking })
    }
}

fn collect_units(
    fs: &dyn FileSystem,
    layout: &Layout,
    output: EmitOutput,
    excludes: &GlobSet,
    out: &Path,
) -> Result<Vec<Unit>, GenerateError> {
    let sources: BTreeMap<String, String> = layout
        .inputs
        .iter()
        .filter_map(|input| paths::relative_within(input, &layout.base_dir))
        .map(|relative| (module_id(&relative), paths::to_slashes(&relative.to_string_lossy())))
        .collect();

    let mut candidates = Vec::new();
    for declaration in output.declarations {
        let Some(relative) = inside_root(&declaration.path) else {
            tracing::warn!(path = %declaration.path, "declaration is outside the root; skipping");
            continue;
        };
        let id = module_id(&relative);
        let path = paths::to_slashes(&relative.to_string_lossy());
        let source = sources.get(&id).cloned().unwrap_or_else(|| path.clone());
        let (as_ts, as_tsx) = (format!("{id}.ts"), format!("{id}.tsx"));
        let names = [source.as_str(), path.as_str(), id.as_str(), as_ts.as_str(), as_tsx.as_str()];
        if is_excluded(excludes, &names) {
            tracing::debug!(module = %id, "excluded");
            continue;
        }
        candidates.push(Unit { id, source, text: declaration.text });
    }

    for input in output.input_declarations {
        let Some(relative) = inside_root(&input) else {
            tracing::warn!(path = %input, "declaration input is outside the root; skipping");
            continue;
        };
        let path = layout.base_dir.join(&relative);
        if path == out {
            tracing::debug!(path = %path.display(), "skipping the previous bundle");
            continue;
        }
        let id = module_id(&relative);
        let source = paths::to_slashes(&relative.to_string_lossy());
        if is_excluded(excludes, &[source.as_str(), id.as_str()]) {
            tracing::debug!(module = %id, "excluded");
            continue;
        }
        let text = fs.read_to_string(&path).map_err(|source| GenerateError::Io {
            action: "failed to read",
            path: path.clone(),
            source,
        })?;
        candidates.push(Unit { id, source, text });
    }

    let mut units: BTreeMap<String, Unit> = BTreeMap::new();
    for unit in candidates {
        if let Some(existing) = units.get(&unit.id) {
            tracing::warn!(
                module = %unit.id,
                kept = %existing.source,
                dropped = %unit.source,
                "duplicate module; keeping the first"
            );
            continue;
        }
        units.insert(unit.id.clone(), unit);
    }
    Ok(units.into_values().collect())
}

/// The normalized relative path, or `None` if it leaves the root.
fn inside_root(path: &str) -> Option<PathBuf> {
    let normalized = paths::normalize(Path::new(&paths::to_slashes(path)));
    let escapes = normalized
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    (!escapes).then_some(normalized)
}

/// Module id of a relative input or declaration path.
fn module_id(relative: &Path) -> String {
    let id = paths::to_module_id(relative);
    paths::strip_specifier_extension(&id).map_or_else(|| id.clone(), str::to_string)
}

/// Where a hoisted `path` reference of `unit_id` points as seen from the
/// bundle, or `None` when the referenced file is bundled itself.
fn rebase_reference_path(
    base_dir: &Path,
    unit_id: &str,
    value: &str,
    namer: &ModuleNamer<'_>,
    bundle_dir: &Path,
) -> Option<String> {
    let target = paths::normalize(
        &base_dir.join(paths::module_dirname(unit_id)).join(paths::to_slashes(value)),
    );
    let bundled = paths::relative_within(&target, base_dir)
        .and_then(|relative| namer.canonical(&module_id(&relative)))
        .is_some();
    (!bundled).then(|| paths::to_slashes(&paths::relative_to(&target, bundle_dir).to_string_lossy()))
}

fn is_excluded(excludes: &GlobSet, names: &[&str]) -> bool {
    !excludes.is_empty() && names.iter().any(|name| excludes.is_match(name))
}

fn main_alias_name(options: &GenerateOptions) -> Option<String> {
    options
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| options.module_prefix())
        .map(str::to_string)
}

fn current_dir() -> Result<PathBuf, GenerateError> {
    std::env::current_dir().map_err(|e| GenerateError::Io {
        action: "failed to read the current directory",
        path: PathBuf::from("."),
        source: Box::new(e),
    })
}
