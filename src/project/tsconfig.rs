//! `tsconfig.json` lookup and parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GenerateError;
use crate::options::{ModuleResolution, Target};
use crate::paths;
use crate::ports::filesystem::FileSystem;

/// Glob patterns together with the directory they are relative to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternList {
    /// Directory of the config that declared the patterns.
    pub base: PathBuf,
    /// The patterns as written.
    pub patterns: Vec<String>,
}

/// A resolved project configuration with `extends` applied.
///
/// Every path is absolute, resolved against the config file that declared it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsConfig {
    /// The config file itself.
    pub path: PathBuf,
    /// `compilerOptions.rootDir`.
    pub root_dir: Option<PathBuf>,
    /// `compilerOptions.outDir`.
    pub out_dir: Option<PathBuf>,
    /// `compilerOptions.declarationDir`.
    pub declaration_dir: Option<PathBuf>,
    /// `compilerOptions.baseUrl`.
    pub base_url: Option<PathBuf>,
    /// `compilerOptions.target`.
    pub target: Option<Target>,
    /// `compilerOptions.moduleResolution`.
    pub module_resolution: Option<ModuleResolution>,
    /// `compilerOptions.types`.
    pub types: Option<Vec<String>>,
    /// `compilerOptions.allowJs`.
    pub allow_js: Option<bool>,
    /// Top-level `files`.
    pub files: Option<PatternList>,
    /// Top-level `include`.
    pub include: Option<PatternList>,
    /// Top-level `exclude`.
    pub exclude: Option<PatternList>,
}

impl TsConfig {
    /// Directory containing the config file.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Fills every unset value from `base`.
    fn inherit(self, base: Self) -> Self {
        Self {
            path: self.path,
            root_dir: self.root_dir.or(base.root_dir),
            out_dir: self.out_dir.or(base.out_dir),
            declaration_dir: self.declaration_dir.or(base.declaration_dir),
            base_url: self.base_url.or(base.base_url),
            target: self.target.or(base.target),
            module_resolution: self.module_resolution.or(base.module_resolution),
            types: self.types.or(base.types),
            allow_js: self.allow_js.or(base.allow_js),
            files: self.files.or(base.files),
            include: self.include.or(base.include),
            exclude: self.exclude.or(base.exclude),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum RawExtends {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    #[serde(default)]
    extends: RawExtends,
    #[serde(default)]
    compiler_options: RawCompilerOptions,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    root_dir: Option<String>,
    out_dir: Option<String>,
    declaration_dir: Option<String>,
    base_url: Option<String>,
    target: Option<String>,
    module_resolution: Option<String>,
    types: Option<Vec<String>>,
    allow_js: Option<bool>,
}

/// Finds the config file for a project.
///
/// A directory `project` means `<project>/tsconfig.json`, a file is used
/// as-is, and no project means `<base_dir>/tsconfig.json`. Relative paths
/// resolve against `cwd`.
///
/// # Errors
///
/// Returns [`GenerateError::ConfigNotFound`] if the file does not exist.
pub fn resolve_tsconfig_path(
    fs: &dyn FileSystem,
    project: Option<&Path>,
    base_dir: &Path,
    cwd: &Path,
) -> Result<PathBuf, GenerateError> {
    let candidate = match project {
        Some(project) => {
            let project = paths::absolutize(project, cwd);
            if fs.is_dir(&project) {
                project.join("tsconfig.json")
            } else {
                project
            }
        }
        None => paths::absolutize(base_dir, cwd).join("tsconfig.json"),
    };
    if fs.exists(&candidate) && !fs.is_dir(&candidate) {
        Ok(candidate)
    } else {
        Err(GenerateError::ConfigNotFound { path: candidate })
    }
}

/// Loads `path` and everything it extends.
///
/// # Errors
///
/// Returns an error if a config cannot be read or parsed, has an unknown
/// `target`/`moduleResolution`, or extends itself.
pub fn load_tsconfig(fs: &dyn FileSystem, path: &Path) -> Result<TsConfig, GenerateError> {
    let mut chain = Vec::new();
    load_with_chain(fs, &paths::normalize(path), &mut chain)
}

fn load_with_chain(
    fs: &dyn FileSystem,
    path: &Path,
    chain: &mut Vec<PathBuf>,
) -> Result<TsConfig, GenerateError> {
    if chain.iter().any(|seen| seen == path) {
        return Err(GenerateError::InvalidConfig {
            path: path.to_path_buf(),
            message: "circular `extends` chain".to_string(),
        });
    }
    chain.push(path.to_path_buf());

    let text = fs.read_to_string(path).map_err(|source| GenerateError::Io {
        action: "failed to read",
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawTsConfig = serde_json::from_str(&strip_jsonc(&text)).map_err(|e| {
        GenerateError::InvalidConfig { path: path.to_path_buf(), message: e.to_string() }
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();

    let parents = match &raw.extends {
        RawExtends::None => Vec::new(),
        RawExtends::One(one) => vec![one.clone()],
        RawExtends::Many(many) => many.clone(),
    };
    let mut config = from_raw(path, &dir, raw)?;

    // Later entries in an `extends` array take precedence over earlier ones.
    let mut inherited: Option<TsConfig> = None;
    for parent in parents {
        let Some(parent_path) = resolve_extends(fs, &dir, &parent) else {
            tracing::warn!(
                config = %path.display(),
                extends = %parent,
                "ignoring `extends` that is not a relative or absolute path"
            );
            continue;
        };
        let loaded = load_with_chain(fs, &parent_path, chain)?;
        inherited = Some(match inherited {
            Some(earlier) => loaded.inherit(earlier),
            None => loaded,
        });
    }
    chain.pop();

    if let Some(base) = inherited {
        config = config.inherit(base);
    }
    Ok(config)
}

fn resolve_extends(fs: &dyn FileSystem, dir: &Path, extends: &str) -> Option<PathBuf> {
    if !paths::is_relative_specifier(extends) && !paths::is_absolute_specifier(extends) {
        return None;
    }
    let candidate = paths::absolutize(Path::new(extends), dir);
    if candidate.extension().is_none() && !fs.exists(&candidate) {
        return Some(candidate.with_extension("json"));
    }
    Some(candidate)
}

fn from_raw(path: &Path, dir: &Path, raw: RawTsConfig) -> Result<TsConfig, GenerateError> {
    let invalid = |message: String| GenerateError::InvalidConfig { path: path.to_path_buf(), message };
    let resolve = |value: Option<String>| value.map(|v| paths::absolutize(Path::new(&v), dir));
    let patterns = |values: Option<Vec<String>>| {
        values.map(|patterns| PatternList { base: dir.to_path_buf(), patterns })
    };
    let options = raw.compiler_options;

    let target = options
        .target
        .map(|t| t.parse::<Target>().map_err(|e| invalid(format!("compilerOptions.target: {e}"))))
        .transpose()?;
    let module_resolution = options
        .module_resolution
        .map(|m| {
            m.parse::<ModuleResolution>()
                .map_err(|e| invalid(format!("compilerOptions.moduleResolution: {e}")))
        })
        .transpose()?;

    Ok(TsConfig {
        path: path.to_path_buf(),
        root_dir: resolve(options.root_dir),
        out_dir: resolve(options.out_dir),
        declaration_dir: resolve(options.declaration_dir),
        base_url: resolve(options.base_url),
        target,
        module_resolution,
        types: options.types,
        allow_js: options.allow_js,
        files: patterns(raw.files),
        include: patterns(raw.include),
        exclude: patterns(raw.exclude),
    })
}

/// Turns JSON with comments and trailing commas into plain JSON.
///
/// Comments become whitespace so that parser error positions still line up.
#[must_use]
pub fn strip_jsonc(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
        } else if c == '"' {
            in_string = true;
            result.push(c);
        } else if c == '/' && chars.peek() == Some(&'/') {
            while let Some(&ch) = chars.peek() {
                if ch == '\n' {
                    break;
                }
                result.push(' ');
                chars.next();
            }
            result.push(' ');
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            result.push_str("  ");
            let mut prev = '\0';
            for ch in chars.by_ref() {
                result.push(if ch == '\n' { '\n' } else { ' ' });
                if prev == '*' && ch == '/' {
                    break;
                }
                prev = ch;
            }
        } else {
            result.push(c);
        }
    }

    remove_trailing_commas(&result)
}

fn remove_trailing_commas(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = bytes[i + 1..].iter().find(|b| !b.is_ascii_whitespace());
            if matches!(next, Some(b'}' | b']')) {
                out.push(' ');
                continue;
            }
        }
        out.push(c);
    }
    out
}
