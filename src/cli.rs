//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::GenerateError;
use crate::options::{GenerateOptions, ModuleResolution, Target};

/// Top-level CLI parser for `dts-bundle`.
#[derive(Debug, Parser)]
#[command(
    name = "dts-bundle",
    version,
    about = "Bundle TypeScript declarations into a single ambient .d.ts file"
)]
pub struct Cli {
    /// Log debug-level progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile declarations and write the bundle.
    Generate(GenerateArgs),
    /// List the modules a bundle would contain, without compiling.
    Modules(GenerateArgs),
}

/// Line ending written to the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    Crlf,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Flags shared by `generate` and `modules`.
#[derive(Debug, Clone, Default, Args)]
pub struct GenerateArgs {
    /// Package name; names the main module and defaults the prefix.
    #[arg(long)]
    pub name: Option<String>,

    /// Prefix for every module name (defaults to `--name`).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Module re-exported as `--name`, e.g. `index`.
    #[arg(long)]
    pub main: Option<String>,

    /// Project directory or tsconfig file.
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Base directory for input files and tsconfig lookup.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Bundle file to write.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Directory the compiler emits declarations to.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Glob, relative to the base directory, of files to leave out.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Path written as a `/// <reference path>` at the top of the bundle.
    #[arg(long = "extern", value_name = "PATH")]
    pub externs: Vec<String>,

    /// `@types` package to reference and load.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Line ending (defaults to the platform's).
    #[arg(long, value_enum)]
    pub eol: Option<LineEnding>,

    /// Indentation inside module blocks (defaults to a tab).
    #[arg(long)]
    pub indent: Option<String>,

    /// Language target, overriding the project's.
    #[arg(long)]
    pub target: Option<Target>,

    /// Module resolution, overriding the project's.
    #[arg(long)]
    pub module_resolution: Option<ModuleResolution>,

    /// YAML or JSON options file; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input files; without any, files come from the project.
    pub files: Vec<PathBuf>,
}

impl GenerateArgs {
    /// Builds generator options from the options file, if any, overlaid with
    /// the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the options file cannot be loaded.
    pub fn to_options(&self) -> Result<GenerateOptions, GenerateError> {
        let base = match &self.config {
            Some(path) => GenerateOptions::from_file(path)?,
            None => GenerateOptions::default(),
        };
        let flags = GenerateOptions {
            name: self.name.clone(),
            prefix: self.prefix.clone(),
            main: self.main.clone(),
            project: self.project.clone(),
            base_dir: self.base_dir.clone(),
            files: self.files.clone(),
            exclude: self.exclude.clone(),
            externs: self.externs.clone(),
            types: (!self.types.is_empty()).then(|| self.types.clone()),
            eol: self.eol.map(|eol| eol.as_str().to_string()),
            indent: self.indent.clone(),
            target: self.target,
            module_resolution: self.module_resolution,
            out_dir: self.out_dir.clone(),
            out: self.out.clone(),
        };
        Ok(base.merged_with(flags))
    }
}
