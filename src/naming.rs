//! Bundle module names and import specifier resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::GenerateError;
use crate::paths;

/// Caller-supplied overrides for module naming.
///
/// Each hook returns `None` to fall back to the built-in behavior. Whatever
/// a hook returns is used verbatim, without prefixing.
pub trait ResolveHooks {
    /// Names the module for the unprefixed id `current_id`.
    fn resolve_module_id(&self, _current_id: &str) -> Option<String> {
        None
    }

    /// Resolves `specifier` as written inside the module `current_id`.
    fn resolve_module_import(&self, _current_id: &str, _specifier: &str) -> Option<String> {
        None
    }
}

/// Hooks that never override anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ResolveHooks for DefaultHooks {}

/// Maps unprefixed module ids and the specifiers inside them onto bundle
/// module names.
pub struct ModuleNamer<'a> {
    prefix: Option<String>,
    bundled: BTreeSet<String>,
    externals: BTreeSet<String>,
    roots: Vec<PathBuf>,
    base_url: Option<PathBuf>,
    hooks: &'a dyn ResolveHooks,
}

impl<'a> ModuleNamer<'a> {
    /// Creates a namer.
    ///
    /// `roots` are the absolute directories module ids are relative to (the
    /// output directory and the base directory), tried in order when an
    /// absolute path is imported.
    #[must_use]
    pub fn new(
        prefix: Option<&str>,
        bundled: impl IntoIterator<Item = String>,
        externals: BTreeSet<String>,
        roots: Vec<PathBuf>,
        hooks: &'a dyn ResolveHooks,
    ) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(|p| p.trim_end_matches('/').to_string()),
            bundled: bundled.into_iter().collect(),
            externals,
            roots,
            base_url: None,
            hooks,
        }
    }

    /// Sets the absolute `baseUrl` that bare specifiers are looked up under.
    /// Without one, bare specifiers always name packages.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<PathBuf>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Applies the prefix to an unprefixed id.
    #[must_use]
    pub fn prefixed(&self, id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{id}"),
            None => id.to_string(),
        }
    }

    /// The bundled id `id` refers to, trying it as written, without a
    /// source or script extension, and as a directory index.
    #[must_use]
    pub fn canonical(&self, id: &str) -> Option<String> {
        let id = id.trim_end_matches('/');
        if self.bundled.contains(id) {
            return Some(id.to_string());
        }
        if let Some(stripped) = paths::strip_specifier_extension(id) {
            if self.bundled.contains(stripped) {
                return Some(stripped.to_string());
            }
        }
        let index = if id.is_empty() { "index".to_string() } else { format!("{id}/index") };
        self.bundled.contains(&index).then_some(index)
    }

    /// The bundle module name for `current_id`.
    #[must_use]
    pub fn module_name(&self, current_id: &str) -> String {
        self.hooks.resolve_module_id(current_id).unwrap_or_else(|| self.prefixed(current_id))
    }

    /// Rewrites `specifier`, written inside `current_id`, for the bundle.
    #[must_use]
    pub fn resolve_import(&self, current_id: &str, specifier: &str) -> String {
        if let Some(resolved) = self.hooks.resolve_module_import(current_id, specifier) {
            return resolved;
        }
        if self.externals.contains(specifier) {
            return specifier.to_string();
        }

        if paths::is_relative_specifier(specifier) {
            return match paths::join_module_id(paths::module_dirname(current_id), specifier) {
                Some(id) => {
                    let id = self.canonical(&id).unwrap_or(id);
                    self.prefixed(&id)
                }
                None => {
                    tracing::warn!(
                        module = current_id,
                        specifier,
                        "import escapes the bundle root; leaving it unchanged"
                    );
                    specifier.to_string()
                }
            };
        }

        if paths::is_absolute_specifier(specifier) {
            return self
                .absolute_module_id(specifier)
                .map_or_else(|| specifier.to_string(), |id| self.prefixed(&id));
        }

        self.base_url_module_id(specifier)
            .map_or_else(|| specifier.to_string(), |id| self.prefixed(&id))
    }

    /// A bare specifier names a bundled module only through `baseUrl`, and
    /// only when the module under it is actually bundled.
    fn base_url_module_id(&self, specifier: &str) -> Option<String> {
        let path = paths::normalize(&self.base_url.as_deref()?.join(specifier));
        self.roots
            .iter()
            .filter_map(|root| paths::relative_within(&path, root))
            .find_map(|relative| self.canonical(&paths::to_module_id(&relative)))
    }

    fn absolute_module_id(&self, specifier: &str) -> Option<String> {
        let path = Path::new(specifier);
        let relative = self.roots.iter().find_map(|root| paths::relative_within(path, root))?;
        let id = paths::to_module_id(&relative);
        Some(self.canonical(&id).unwrap_or(id))
    }

    /// Resolves the `main` option to a bundled, unprefixed module id.
    ///
    /// Accepts `index`, `./index.ts`, `sub\\index` and prefixed forms such as
    /// `foo/index`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::MainNotFound`] when no bundled module matches.
    pub fn resolve_main(&self, main: &str) -> Result<String, GenerateError> {
        let slashed = paths::to_slashes(main);
        let mut id = slashed.as_str();
        while let Some(rest) = id.strip_prefix("./") {
            id = rest;
        }
        let id = paths::strip_specifier_extension(id).unwrap_or(id);

        if let Some(found) = self.canonical(id) {
            return Ok(found);
        }
        self.prefix
            .as_deref()
            .and_then(|prefix| id.strip_prefix(prefix)?.strip_prefix('/'))
            .and_then(|rest| self.canonical(rest))
            .ok_or_else(|| GenerateError::MainNotFound(main.to_string()))
    }
}
