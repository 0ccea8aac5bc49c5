//! Generator options and compiler setting enums.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GenerateError;

/// ECMAScript target level, ordered from oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Target {
    /// ES3.
    Es3,
    /// ES5.
    Es5,
    /// ES2015 (ES6).
    Es2015,
    /// ES2016.
    Es2016,
    /// ES2017.
    Es2017,
    /// ES2018.
    Es2018,
    /// ES2019.
    Es2019,
    /// ES2020.
    Es2020,
    /// ES2021.
    Es2021,
    /// ES2022.
    Es2022,
    /// ES2023.
    Es2023,
    /// ES2024.
    Es2024,
    /// The newest target the compiler knows about.
    #[default]
    EsNext,
}

impl Target {
    /// The spelling `tsc` accepts for `--target`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es3 => "es3",
            Self::Es5 => "es5",
            Self::Es2015 => "es2015",
            Self::Es2016 => "es2016",
            Self::Es2017 => "es2017",
            Self::Es2018 => "es2018",
            Self::Es2019 => "es2019",
            Self::Es2020 => "es2020",
            Self::Es2021 => "es2021",
            Self::Es2022 => "es2022",
            Self::Es2023 => "es2023",
            Self::Es2024 => "es2024",
            Self::EsNext => "esnext",
        }
    }

    /// Whether the target supports ES module syntax natively.
    #[must_use]
    pub fn is_es2015_or_later(self) -> bool {
        self >= Self::Es2015
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "es3" => Ok(Self::Es3),
            "es5" => Ok(Self::Es5),
            "es6" | "es2015" => Ok(Self::Es2015),
            "es2016" => Ok(Self::Es2016),
            "es2017" => Ok(Self::Es2017),
            "es2018" => Ok(Self::Es2018),
            "es2019" => Ok(Self::Es2019),
            "es2020" => Ok(Self::Es2020),
            "es2021" => Ok(Self::Es2021),
            "es2022" => Ok(Self::Es2022),
            "es2023" => Ok(Self::Es2023),
            "es2024" => Ok(Self::Es2024),
            "esnext" | "latest" => Ok(Self::EsNext),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module resolution strategy passed through to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleResolution {
    /// `classic`.
    Classic,
    /// `node` / `node10`.
    Node10,
    /// `node16`.
    Node16,
    /// `nodenext`.
    NodeNext,
    /// `bundler`.
    Bundler,
}

impl ModuleResolution {
    /// The spelling `tsc` accepts for `--moduleResolution`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Node10 => "node10",
            Self::Node16 => "node16",
            Self::NodeNext => "nodenext",
            Self::Bundler => "bundler",
        }
    }

    /// The `--module` value this resolution requires. `node16`/`nodenext`
    /// need the matching module kind and `bundler` needs an ES module kind.
    #[must_use]
    pub fn required_module(self) -> Option<&'static str> {
        match self {
            Self::Node16 => Some("node16"),
            Self::NodeNext => Some("nodenext"),
            Self::Bundler => Some("esnext"),
            Self::Classic | Self::Node10 => None,
        }
    }
}

impl FromStr for ModuleResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "node" | "node10" | "nodejs" => Ok(Self::Node10),
            "node16" => Ok(Self::Node16),
            "nodenext" => Ok(Self::NodeNext),
            "bundler" => Ok(Self::Bundler),
            other => Err(format!("unknown module resolution '{other}'")),
        }
    }
}

impl fmt::Display for ModuleResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(Target);
string_serde!(ModuleResolution);

/// Everything that controls one bundle generation run.
///
/// Field names follow the camelCase keys accepted in options files, so a
/// `dts-bundle.yaml` such as
///
/// ```yaml
/// name: foo
/// project: packages/foo
/// out: dist/foo.d.ts
/// main: index
/// ```
///
/// deserializes directly. Unknown keys are rejected. Log verbosity is not an
/// option; it is set on the subscriber (`--verbose` or `RUST_LOG`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Package name. Names the synthesized main module and, without
    /// `prefix`, prefixes every module id.
    pub name: Option<String>,
    /// Explicit prefix for module ids.
    pub prefix: Option<String>,
    /// Module (relative to the base directory) re-exported as `name`.
    pub main: Option<String>,
    /// Project directory or `tsconfig` file.
    pub project: Option<PathBuf>,
    /// Base directory for explicit files and default config lookup.
    pub base_dir: Option<PathBuf>,
    /// Explicit input files. Empty means "discover from the project".
    pub files: Vec<PathBuf>,
    /// Glob patterns, relative to the base directory, of files left out of the bundle.
    pub exclude: Vec<String>,
    /// Paths written as `/// <reference path>` at the top of the bundle.
    pub externs: Vec<String>,
    /// `@types` packages written as `/// <reference types>` and passed to the compiler.
    pub types: Option<Vec<String>>,
    /// Line ending for the bundle.
    pub eol: Option<String>,
    /// Indentation inside `declare module` blocks.
    pub indent: Option<String>,
    /// Target override.
    pub target: Option<Target>,
    /// Module resolution override.
    pub module_resolution: Option<ModuleResolution>,
    /// Output directory override (used to map emitted files to module ids).
    pub out_dir: Option<PathBuf>,
    /// Bundle output file.
    pub out: Option<PathBuf>,
}

impl GenerateOptions {
    /// Loads options from a YAML (or JSON) options file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path).map_err(|e| GenerateError::Io {
            action: "failed to read options file",
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| GenerateError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlays every value set in `other` on top of `self`.
    ///
    /// Lists replace rather than append, so a flag given on the command line
    /// fully overrides the same list from an options file.
    #[must_use]
    pub fn merged_with(mut self, other: Self) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            name,
            prefix,
            main,
            project,
            base_dir,
            types,
            eol,
            indent,
            target,
            module_resolution,
            out_dir,
            out
        );
        if !other.files.is_empty() {
            self.files = other.files;
        }
        if !other.exclude.is_empty() {
            self.exclude = other.exclude;
        }
        if !other.externs.is_empty() {
            self.externs = other.externs;
        }
        self
    }

    /// The prefix applied to module ids: `prefix`, falling back to `name`.
    #[must_use]
    pub fn module_prefix(&self) -> Option<&str> {
        self.prefix.as_deref().or(self.name.as_deref()).filter(|p| !p.is_empty())
    }

    /// Line ending, defaulting to the platform's.
    #[must_use]
    pub fn eol(&self) -> &str {
        match self.eol.as_deref() {
            Some(eol) => eol,
            None if cfg!(windows) => "\r\n",
            None => "\n",
        }
    }

    /// Indentation, defaulting to a tab.
    #[must_use]
    pub fn indent(&self) -> &str {
        self.indent.as_deref().unwrap_or("\t")
    }

    /// Whether input files come from a project configuration.
    #[must_use]
    pub fn uses_project(&self) -> bool {
        self.project.is_some() || self.files.is_empty()
    }

    /// Checks the options before any work is done.
    ///
    /// Setting exactly one of `name` and `main` is allowed but almost always a
    /// mistake, so it is logged rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if `out` is missing or `eol` is not a line ending.
    pub fn validate(&self) -> Result<&Path, GenerateError> {
        match (&self.name, &self.main) {
            (None, Some(main)) => tracing::warn!(
                main = %main,
                "`main` is set without `name`; the main alias falls back to `prefix` or is skipped"
            ),
            (Some(name), None) => tracing::warn!(
                name = %name,
                "`name` is set without `main`; no main module alias will be written"
            ),
            _ => {}
        }
        if let Some(eol) = &self.eol {
            if eol != "\n" && eol != "\r\n" {
                return Err(GenerateError::InvalidOption {
                    option: "eol",
                    message: format!("expected \"\\n\" or \"\\r\\n\", got {eol:?}"),
                });
            }
        }
        match self.out.as_deref() {
            Some(out) if !out.as_os_str().is_empty() => Ok(out),
            _ => Err(GenerateError::MissingOutput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse_case_insensitively_and_order() {
        assert_eq!("ES5".parse::<Target>().unwrap(), Target::Es5);
        assert_eq!("es6".parse::<Target>().unwrap(), Target::Es2015);
        assert_eq!("Latest".parse::<Target>().unwrap(), Target::EsNext);
        assert!("es1".parse::<Target>().is_err());
        assert!(!Target::Es5.is_es2015_or_later());
        assert!(Target::Es2020.is_es2015_or_later());
    }

    #[test]
    fn module_resolution_aliases() {
        assert_eq!("node".parse::<ModuleResolution>().unwrap(), ModuleResolution::Node10);
        assert_eq!(ModuleResolution::NodeNext.required_module(), Some("nodenext"));
        assert_eq!(ModuleResolution::Bundler.required_module(), Some("esnext"));
        assert_eq!(ModuleResolution::Classic.required_module(), None);
    }

    #[test]
    fn options_file_uses_camel_case_keys() {
        let yaml = "name: foo\nbaseDir: src\nmoduleResolution: node\ntarget: ES5\nout: foo.d.ts\n";
        let options: GenerateOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.name.as_deref(), Some("foo"));
        assert_eq!(options.base_dir, Some(PathBuf::from("src")));
        assert_eq!(options.module_resolution, Some(ModuleResolution::Node10));
        assert_eq!(options.target, Some(Target::Es5));
    }

    #[test]
    fn options_file_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dts-bundle.yaml");
        std::fs::write(&path, "name: foo\nverbose: true\n").unwrap();
        let err = GenerateOptions::from_file(&path).unwrap_err();
        assert!(matches!(&err, GenerateError::InvalidConfig { message, .. } if message.contains("verbose")));
    }

    #[test]
    fn command_line_values_override_file_values() {
        let file = GenerateOptions {
            name: Some("from-file".into()),
            exclude: vec!["a/**".into()],
            out: Some("file.d.ts".into()),
            ..GenerateOptions::default()
        };
        let flags = GenerateOptions { out: Some("flag.d.ts".into()), ..GenerateOptions::default() };
        let merged = file.merged_with(flags);
        assert_eq!(merged.name.as_deref(), Some("from-file"));
        assert_eq!(merged.out, Some(PathBuf::from("flag.d.ts")));
        assert_eq!(merged.exclude, vec!["a/**".to_string()]);
    }

    #[test]
    fn prefix_falls_back_to_name() {
        let mut options = GenerateOptions { name: Some("foo".into()), ..GenerateOptions::default() };
        assert_eq!(options.module_prefix(), Some("foo"));
        options.prefix = Some("bar".into());
        assert_eq!(options.module_prefix(), Some("bar"));
    }

    #[test]
    fn validate_requires_out() {
        let options = GenerateOptions::default();
        assert!(matches!(options.validate(), Err(GenerateError::MissingOutput)));
    }

    #[test]
    fn validate_rejects_odd_line_endings() {
        let options = GenerateOptions {
            eol: Some("\r".into()),
            out: Some("x.d.ts".into()),
            ..GenerateOptions::default()
        };
        assert!(matches!(options.validate(), Err(GenerateError::InvalidOption { option: "eol", .. })));
    }

    #[test]
    fn project_mode_is_the_default_without_files() {
        let options = GenerateOptions::default();
        assert!(options.uses_project());
        let explicit = GenerateOptions { files: vec!["index.ts".into()], ..GenerateOptions::default() };
        assert!(!explicit.uses_project());
    }
}
