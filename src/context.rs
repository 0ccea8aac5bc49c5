//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::live::compiler::TscCompiler;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::recording::{RecordingCompiler, RecordingFileSystem};
use crate::adapters::replaying::{ReplayingCompiler, ReplayingFileSystem};
use crate::cassette::config::CassetteConfig;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::compiler::{Compiler, EmitOutput, EmitRequest};
use crate::ports::filesystem::FileSystem;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Filesystem for configuration, sources and the bundle itself.
    pub fs: Box<dyn FileSystem>,
    /// Declaration emitter.
    pub compiler: Box<dyn Compiler>,
}

impl ServiceContext {
    /// Creates a live context backed by the real disk and `tsc`.
    #[must_use]
    pub fn live() -> Self {
        Self { fs: Box::new(LiveFileSystem), compiler: Box::new(TscCompiler::from_env()) }
    }

    /// Creates a live context that uses the given compiler.
    #[must_use]
    pub fn with_compiler(compiler: Box<dyn Compiler>) -> Self {
        Self { fs: Box::new(LiveFileSystem), compiler }
    }

    /// Creates a recording context around live adapters.
    ///
    /// Cassettes go to a timestamped directory under `dir`; they are written
    /// when the returned session is finished, after this context is dropped.
    /// This is the developer-only mechanism behind `DTS_BUNDLE_RECORD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory cannot be created.
    pub fn recording_at(dir: impl AsRef<Path>) -> Result<(Self, RecordingSession), String> {
        Self::recording_with(dir, Box::new(TscCompiler::from_env()))
    }

    /// Like [`ServiceContext::recording_at`], recording the given compiler.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette directory cannot be created.
    pub fn recording_with(
        dir: impl AsRef<Path>,
        compiler: Box<dyn Compiler>,
    ) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new_in(dir.as_ref())?;
        let ctx = Self {
            fs: Box::new(RecordingFileSystem::new(
                Box::new(LiveFileSystem),
                session.fs.clone(),
            )),
            compiler: Box::new(RecordingCompiler::new(compiler, session.compiler.clone())),
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// Each port gets its own replayer over the same cassette so that
    /// per-port cursors are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = CassetteConfig::load_cassette(path)?;
        Ok(Self {
            fs: Box::new(ReplayingFileSystem::new(CassetteReplayer::new(&cassette))),
            compiler: Box::new(ReplayingCompiler::new(CassetteReplayer::new(&cassette))),
        })
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter that
    /// fails with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            fs: match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(PanickingFileSystem),
            },
            compiler: match replayers.compiler {
                Some(r) => Box::new(ReplayingCompiler::new(r)),
                None => Box::new(PanickingCompiler),
            },
        })
    }
}

// --- Panicking adapters for unspecified ports ---

const FS_UNCONFIGURED: &str =
    "FileSystem port not configured in CassetteConfig: no cassette loaded for fs";

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn read_to_string(
        &self,
        _path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        panic!("{FS_UNCONFIGURED}");
    }
    fn write(
        &self,
        _path: &Path,
        _contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        panic!("{FS_UNCONFIGURED}");
    }
    fn exists(&self, _path: &Path) -> bool {
        panic!("{FS_UNCONFIGURED}");
    }
    fn is_dir(&self, _path: &Path) -> bool {
        panic!("{FS_UNCONFIGURED}");
    }
    fn walk_files(
        &self,
        _root: &Path,
        _skip_dir: &dyn Fn(&Path) -> bool,
    ) -> Result<Vec<std::path::PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        panic!("{FS_UNCONFIGURED}");
    }
}

struct PanickingCompiler;
impl Compiler for PanickingCompiler {
    fn emit(
        &self,
        _request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>> {
        panic!("Compiler port not configured in CassetteConfig: no cassette loaded for compiler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            commit: "abc".into(),
            interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).unwrap();
        std::fs::write(path, yaml).unwrap();
    }

    #[test]
    fn replaying_context_from_monolithic_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.cassette.yaml");

        write_cassette(
            &path,
            vec![
                Interaction {
                    seq: 0,
                    port: "fs".into(),
                    method: "exists".into(),
                    input: json!({"path": "/p/tsconfig.json"}),
                    output: json!(true),
                },
                Interaction {
                    seq: 1,
                    port: "compiler".into(),
                    method: "emit".into(),
                    input: json!({}),
                    output: json!({"ok": {"declarations": [{"path": "index.d.ts", "text": "x"}]}}),
                },
            ],
        );

        let ctx = ServiceContext::replaying(&path).unwrap();
        assert!(ctx.fs.exists(Path::new("/p/tsconfig.json")));
        let request = EmitRequest {
            project: None,
            files: vec![],
            root_dir: "/p".into(),
            options: crate::ports::EmitOptions::default(),
        };
        let output = ctx.compiler.emit(&request).unwrap();
        assert_eq!(output.declarations[0].path, "index.d.ts");
    }

    #[test]
    fn replaying_from_per_port_cassettes() {
        let dir = tempfile::tempdir().unwrap();
        let fs_path = dir.path().join("fs.cassette.yaml");
        write_cassette(
            &fs_path,
            vec![Interaction {
                seq: 0,
                port: "fs".into(),
                method: "read_to_string".into(),
                input: json!({"path": "/p/a.d.ts"}),
                output: json!({"ok": "export {};"}),
            }],
        );

        let config = CassetteConfig { fs: Some(fs_path), ..CassetteConfig::default() };
        let ctx = ServiceContext::replaying_from(&config).unwrap();
        assert_eq!(ctx.fs.read_to_string(Path::new("/p/a.d.ts")).unwrap(), "export {};");
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn unspecified_port_panics_with_clear_message() {
        let config = CassetteConfig::panic_on_unspecified();
        let ctx = ServiceContext::replaying_from(&config).unwrap();
        let _ = ctx.fs.exists(Path::new("/x"));
    }

    #[test]
    fn recording_context_writes_cassettes_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join("probe.txt");
        std::fs::write(&probe, "hi").unwrap();

        let (ctx, session) = ServiceContext::recording_at(dir.path().join("rec")).unwrap();
        assert_eq!(ctx.fs.read_to_string(&probe).unwrap(), "hi");
        drop(ctx);
        let out = session.finish().unwrap();

        let replay = ServiceContext::replaying_from(&CassetteConfig::from_session_dir(&out)).unwrap();
        assert_eq!(replay.fs.read_to_string(&probe).unwrap(), "hi");
    }
}
