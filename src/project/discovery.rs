//! Input file discovery following the compiler's `files`/`include`/`exclude` rules.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::tsconfig::{PatternList, TsConfig};
use crate::error::GenerateError;
use crate::paths;
use crate::ports::filesystem::FileSystem;

/// Supported extensions in the order the compiler prefers them when several
/// files share a stem.
const TS_EXTENSIONS: [&str; 3] = [".ts", ".tsx", ".d.ts"];
const JS_EXTENSIONS: [&str; 2] = [".js", ".jsx"];

const DEFAULT_EXCLUDES: [&str; 3] = ["node_modules", "bower_components", "jspm_packages"];

/// Lists the input files of a project, sorted and deduplicated.
///
/// # Errors
///
/// Returns an error if a pattern is not a valid glob or a directory cannot
/// be walked.
pub fn discover_files(fs: &dyn FileSystem, config: &TsConfig) -> Result<Vec<PathBuf>, GenerateError> {
    let allow_js = config.allow_js.unwrap_or(false);
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();

    if let Some(files) = &config.files {
        for file in &files.patterns {
            found.insert(paths::absolutize(Path::new(file), &files.base));
        }
    }

    let include = match (&config.include, &config.files) {
        (Some(include), _) => Some(include.clone()),
        (None, None) => {
            Some(PatternList { base: config.dir().to_path_buf(), patterns: vec!["**/*".into()] })
        }
        (None, Some(_)) => None,
    };

    if let Some(include) = include {
        let exclude = exclude_matcher(config)?;
        let mut roots: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for pattern in &include.patterns {
            let (root, glob) = absolute_pattern(&include.base, &include_pattern(pattern));
            roots.entry(root).or_default().push(glob);
        }

        for (root, globs) in roots {
            let include_set = build_globset(&globs, &config.path)?;
            if !fs.is_dir(&root) {
                if include_set.is_match(&root) && is_supported(&root, allow_js) {
                    found.insert(root);
                }
                continue;
            }
            let skip_dir = |dir: &Path| is_dot_path(dir) || exclude.is_match(dir);
            let files = fs.walk_files(&root, &skip_dir).map_err(|source| GenerateError::Io {
                action: "failed to list",
                path: root.clone(),
                source,
            })?;
            for file in files {
                let relative_to_root = file.strip_prefix(&root).unwrap_or(&file);
                if relative_to_root.components().any(|c| c.as_os_str().to_string_lossy().starts_with('.')) {
                    continue;
                }
                if is_supported(&file, allow_js)
                    && include_set.is_match(&file)
                    && !exclude.is_match(&file)
                {
                    found.insert(file);
                }
            }
        }
    }

    Ok(prefer_sources(found, allow_js))
}

/// Resolves explicit input files.
///
/// A path that, taken from `cwd`, already lies under `base_dir` is used as
/// is; anything else is taken relative to `base_dir`.
#[must_use]
pub fn resolve_explicit_files(files: &[PathBuf], base_dir: &Path, cwd: &Path) -> Vec<PathBuf> {
    let mut resolved: Vec<PathBuf> = files
        .iter()
        .map(|file| {
            let from_cwd = paths::absolutize(file, cwd);
            if paths::relative_within(&from_cwd, base_dir).is_some() {
                from_cwd
            } else {
                paths::absolutize(file, base_dir)
            }
        })
        .collect();
    resolved.dedup();
    resolved
}

/// Builds a matcher for the option-level `exclude` globs, relative to `base_dir`.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidOption`] for a malformed glob.
pub fn option_excludes(patterns: &[String]) -> Result<GlobSet, GenerateError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .map_err(|e| GenerateError::InvalidOption { option: "exclude", message: e.to_string() })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| GenerateError::InvalidOption { option: "exclude", message: e.to_string() })
}

/// `dir` or `dir/` without a wildcard or extension means everything below it.
fn include_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last.contains(['*', '?']) || (last.contains('.') && last != "." && last != "..") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/**/*")
    }
}

/// Splits a relative pattern into its literal directory prefix, resolved
/// against `base`, and an absolute glob.
fn absolute_pattern(base: &Path, pattern: &str) -> (PathBuf, String) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal_len =
        segments.iter().position(|s| s.contains(['*', '?', '[', '{'])).unwrap_or(segments.len());
    let root = paths::absolutize(Path::new(&segments[..literal_len].join("/")), base);
    let root_glob = globset::escape(&paths::to_slashes(&root.to_string_lossy()));
    let glob = if literal_len == segments.len() {
        root_glob
    } else {
        format!("{}/{}", root_glob.trim_end_matches('/'), segments[literal_len..].join("/"))
    };
    (root, glob)
}

fn exclude_matcher(config: &TsConfig) -> Result<GlobSet, GenerateError> {
    let mut globs = Vec::new();
    match &config.exclude {
        Some(exclude) => {
            for pattern in &exclude.patterns {
                let (_, glob) = absolute_pattern(&exclude.base, pattern.trim_end_matches('/'));
                globs.push(format!("{glob}/**"));
                globs.push(glob);
            }
        }
        None => {
            for name in DEFAULT_EXCLUDES {
                let (_, glob) = absolute_pattern(config.dir(), name);
                globs.push(format!("{glob}/**"));
                globs.push(glob);
            }
            for dir in [&config.out_dir, &config.declaration_dir].into_iter().flatten() {
                let glob = globset::escape(&paths::to_slashes(&dir.to_string_lossy()));
                globs.push(format!("{glob}/**"));
                globs.push(glob);
            }
        }
    }
    build_globset(&globs, &config.path)
}

fn build_globset(globs: &[String], config: &Path) -> Result<GlobSet, GenerateError> {
    let invalid = |message: String| GenerateError::InvalidConfig { path: config.to_path_buf(), message };
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let built = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid(format!("invalid pattern {glob:?}: {e}")))?;
        builder.add(built);
    }
    builder.build().map_err(|e| invalid(e.to_string()))
}

fn is_dot_path(dir: &Path) -> bool {
    dir.file_name().is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

fn extension_of(path: &Path, allow_js: bool) -> Option<&'static str> {
    let name = path.file_name()?.to_string_lossy();
    // `.d.ts` must win over `.ts`.
    let mut candidates: Vec<&'static str> = vec![".d.ts", ".ts", ".tsx"];
    if allow_js {
        candidates.extend(JS_EXTENSIONS);
    }
    candidates.into_iter().find(|ext| name.ends_with(ext))
}

fn is_supported(path: &Path, allow_js: bool) -> bool {
    extension_of(path, allow_js).is_some()
}

/// Keeps one file per stem, preferring `.ts` over `.tsx` over `.d.ts` over scripts.
fn prefer_sources(found: BTreeSet<PathBuf>, allow_js: bool) -> Vec<PathBuf> {
    let priority = |ext: &str| {
        TS_EXTENSIONS
            .iter()
            .chain(JS_EXTENSIONS.iter())
            .position(|candidate| *candidate == ext)
            .unwrap_or(usize::MAX)
    };
    let mut by_stem: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();
    let mut others = Vec::new();
    for path in found {
        let Some(ext) = extension_of(&path, allow_js) else {
            // Explicit `files` entries are kept whatever their extension.
            others.push(path);
            continue;
        };
        let full = path.to_string_lossy();
        let stem = full[..full.len() - ext.len()].to_string();
        let rank = priority(ext);
        match by_stem.get(&stem) {
            Some((existing, _)) if *existing <= rank => {}
            _ => {
                by_stem.insert(stem, (rank, path));
            }
        }
    }
    let mut files: Vec<PathBuf> = by_stem.into_values().map(|(_, path)| path).collect();
    files.extend(others);
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::filesystem::LiveFileSystem;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export {};\n").unwrap();
    }

    fn config(root: &Path) -> TsConfig {
        TsConfig { path: root.join("tsconfig.json"), ..TsConfig::default() }
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| paths::to_slashes(&f.strip_prefix(root).unwrap().to_string_lossy()))
            .collect()
    }

    #[test]
    fn default_include_walks_everything_but_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "index.ts",
            "sub/Bar.tsx",
            "sub/baz.ts",
            "types/globals.d.ts",
            "node_modules/lib/index.d.ts",
            ".cache/x.ts",
            "dist/index.d.ts",
            "readme.md",
            "script.js",
        ] {
            touch(root, rel);
        }
        let mut cfg = config(root);
        cfg.out_dir = Some(root.join("dist"));

        let files = discover_files(&LiveFileSystem, &cfg).unwrap();
        assert_eq!(
            relative(root, &files),
            ["index.ts", "sub/Bar.tsx", "sub/baz.ts", "types/globals.d.ts"]
        );
    }

    #[test]
    fn declaration_next_to_source_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ts");
        touch(dir.path(), "a.d.ts");
        touch(dir.path(), "b.d.ts");
        let files = discover_files(&LiveFileSystem, &config(dir.path())).unwrap();
        assert_eq!(relative(dir.path(), &files), ["a.ts", "b.d.ts"]);
    }

    #[test]
    fn include_patterns_and_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in ["index.ts", "Bar.ts", "baz.ts", "src/deep/x.ts", "src/y.js"] {
            touch(root, rel);
        }
        let mut cfg = config(root);
        cfg.include = Some(PatternList {
            base: root.to_path_buf(),
            patterns: vec!["baz.ts".into(), "src".into()],
        });
        cfg.files = Some(PatternList { base: root.to_path_buf(), patterns: vec!["Bar.ts".into()] });
        let files = discover_files(&LiveFileSystem, &cfg).unwrap();
        assert_eq!(relative(root, &files), ["Bar.ts", "baz.ts", "src/deep/x.ts"]);

        cfg.allow_js = Some(true);
        let files = discover_files(&LiveFileSystem, &cfg).unwrap();
        assert_eq!(relative(root, &files), ["Bar.ts", "baz.ts", "src/deep/x.ts", "src/y.js"]);
    }

    #[test]
    fn explicit_exclude_replaces_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in ["a.ts", "tests/a.test.ts", "node_modules/m/index.d.ts"] {
            touch(root, rel);
        }
        let mut cfg = config(root);
        cfg.exclude = Some(PatternList { base: root.to_path_buf(), patterns: vec!["tests".into()] });
        let files = discover_files(&LiveFileSystem, &cfg).unwrap();
        assert_eq!(relative(root, &files), ["a.ts", "node_modules/m/index.d.ts"]);
    }

    #[test]
    fn explicit_files_prefer_paths_already_under_base() {
        let base = Path::new("/work/pkg");
        let files = resolve_explicit_files(
            &[PathBuf::from("index.ts"), PathBuf::from("pkg/sub/a.ts")],
            base,
            Path::new("/work"),
        );
        assert_eq!(files, [PathBuf::from("/work/pkg/index.ts"), PathBuf::from("/work/pkg/sub/a.ts")]);
    }

    #[test]
    fn include_pattern_expands_directories() {
        assert_eq!(include_pattern("src"), "src/**/*");
        assert_eq!(include_pattern("src/"), "src/**/*");
        assert_eq!(include_pattern("src/*.ts"), "src/*.ts");
        assert_eq!(include_pattern("index.ts"), "index.ts");
        assert_eq!(include_pattern(".."), "../**/*");
    }

    #[test]
    fn option_excludes_match_relative_names() {
        let set = option_excludes(&["sub/**".into(), "./internal.d.ts".into()]).unwrap();
        assert!(set.is_match("sub/Bar.d.ts"));
        assert!(set.is_match("internal.d.ts"));
        assert!(!set.is_match("index.d.ts"));
    }
}
