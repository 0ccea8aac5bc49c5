//! Lexical path and module-id helpers.
//!
//! Nothing here touches the filesystem. Bundles mix four path spaces (the
//! source root, the output root, absolute filesystem paths and the
//! `/`-separated module-id space), so every conversion between them goes
//! through these functions.

use std::path::{Component, Path, PathBuf};

/// Declaration and source extensions stripped when turning a file into a module id.
const MODULE_EXTENSIONS: [&str; 3] = [".d.ts", ".tsx", ".ts"];

/// Extensions a specifier may carry that still refer to a bundled module.
pub const SPECIFIER_EXTENSIONS: [&str; 7] = [".d.ts", ".tsx", ".ts", ".jsx", ".js", ".mjs", ".cjs"];

/// Resolves `.` and `..` components without consulting the filesystem.
///
/// A `..` that would climb above the root of an absolute path is dropped; on a
/// relative path it is kept.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Joins `path` onto `base` (unless already absolute) and normalizes the result.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Returns `path` relative to `base` when `path` lies inside `base`.
///
/// Both paths are normalized first. `None` means the path is outside the base
/// (or equal to it).
#[must_use]
pub fn relative_within(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    let base = normalize(base);
    let rel = path.strip_prefix(&base).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(rel.to_path_buf())
}

/// Returns `path` as seen from the directory `from`, climbing with `..` where
/// the two diverge.
#[must_use]
pub fn relative_to(path: &Path, from: &Path) -> PathBuf {
    let path = normalize(path);
    let from = normalize(from);
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let common = path_parts.iter().zip(&from_parts).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Converts a relative file path into a `/`-separated module id, dropping a
/// `.d.ts`, `.ts` or `.tsx` extension.
#[must_use]
pub fn to_module_id(relative: &Path) -> String {
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    strip_module_extension(&joined).to_string()
}

/// Converts a `\`-separated path string into `/` separators.
#[must_use]
pub fn to_slashes(value: &str) -> String {
    value.replace('\\', "/")
}

/// Strips one `.d.ts`, `.ts` or `.tsx` extension if present.
#[must_use]
pub fn strip_module_extension(id: &str) -> &str {
    for ext in MODULE_EXTENSIONS {
        if let Some(stripped) = id.strip_suffix(ext) {
            return stripped;
        }
    }
    id
}

/// Strips one of [`SPECIFIER_EXTENSIONS`] if present, returning `None` otherwise.
#[must_use]
pub fn strip_specifier_extension(id: &str) -> Option<&str> {
    SPECIFIER_EXTENSIONS.iter().find_map(|ext| id.strip_suffix(ext))
}

/// The directory part of a module id (`"a/b/c"` gives `"a/b"`, `"c"` gives `""`).
#[must_use]
pub fn module_dirname(id: &str) -> &str {
    id.rfind('/').map_or("", |idx| &id[..idx])
}

/// Joins a relative specifier onto a module directory.
///
/// Returns `None` when the result climbs above the bundle root.
#[must_use]
pub fn join_module_id(dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Whether a module specifier is relative (`./x`, `../x`, `.`, `..`).
#[must_use]
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Whether a module specifier is an absolute filesystem path (`/x`, `C:\x`, `C:/x`).
#[must_use]
pub fn is_absolute_specifier(specifier: &str) -> bool {
    if specifier.starts_with('/') {
        return true;
    }
    let bytes = specifier.as_bytes();
    bytes.len() > 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_within_only_accepts_descendants() {
        let base = Path::new("/proj/src");
        assert_eq!(
            relative_within(Path::new("/proj/src/sub/Bar.d.ts"), base),
            Some(PathBuf::from("sub/Bar.d.ts"))
        );
        assert_eq!(relative_within(Path::new("/proj/srcs/x.ts"), base), None);
        assert_eq!(relative_within(Path::new("/proj/src/../lib/x.ts"), base), None);
        assert_eq!(relative_within(Path::new("/proj/src"), base), None);
    }

    #[test]
    fn relative_to_climbs_out_of_the_base() {
        let from = Path::new("/proj/dist");
        assert_eq!(
            relative_to(Path::new("/proj/typings/a.d.ts"), from),
            PathBuf::from("../typings/a.d.ts")
        );
        assert_eq!(relative_to(Path::new("/proj/dist/x/b.d.ts"), from), PathBuf::from("x/b.d.ts"));
        assert_eq!(relative_to(Path::new("/lib/c.d.ts"), from), PathBuf::from("../../lib/c.d.ts"));
    }

    #[test]
    fn module_ids_drop_declaration_extensions() {
        assert_eq!(to_module_id(Path::new("sub/Bar.d.ts")), "sub/Bar");
        assert_eq!(to_module_id(Path::new("sub/view.tsx")), "sub/view");
        assert_eq!(to_module_id(Path::new("index.ts")), "index");
        assert_eq!(to_module_id(Path::new("data.json")), "data.json");
    }

    #[test]
    fn join_module_id_reports_escape() {
        assert_eq!(join_module_id("sub", "./Bar").as_deref(), Some("sub/Bar"));
        assert_eq!(join_module_id("sub/deep", "../baz").as_deref(), Some("sub/baz"));
        assert_eq!(join_module_id("", "./index").as_deref(), Some("index"));
        assert_eq!(join_module_id("sub", "../../outside"), None);
    }

    #[test]
    fn dirname_of_top_level_id_is_empty() {
        assert_eq!(module_dirname("index"), "");
        assert_eq!(module_dirname("a/b/c"), "a/b");
    }

    #[test]
    fn specifier_classification() {
        assert!(is_relative_specifier("./Bar"));
        assert!(is_relative_specifier(".."));
        assert!(!is_relative_specifier(".hidden"));
        assert!(!is_relative_specifier("sub/baz"));
        assert!(is_absolute_specifier("/home/me/proj/sub/baz"));
        assert!(is_absolute_specifier("C:\\proj\\baz"));
        assert!(!is_absolute_specifier("lodash"));
    }

    #[test]
    fn specifier_extension_stripping() {
        assert_eq!(strip_specifier_extension("./Bar.js"), Some("./Bar"));
        assert_eq!(strip_specifier_extension("x.d.ts"), Some("x"));
        assert_eq!(strip_specifier_extension("./Bar"), None);
    }
}
