//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Manages per-port `CassetteRecorder` instances for a recording session.
///
/// Each port gets its own recorder writing to a separate cassette file.
/// All cassettes are stored in a timestamped directory.
pub struct RecordingSession {
    /// Recorder for filesystem interactions.
    pub fs: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for compiler interactions.
    pub compiler: Arc<Mutex<CassetteRecorder>>,
    /// Output directory containing all cassette files.
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Create a new recording session in `<base>/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The cassette directory already exists
    /// - The directory cannot be created
    pub fn new_in(base: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let output_dir = base.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }

        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let commit = get_commit_hash();

        let make_recorder = |port: &str| -> Arc<Mutex<CassetteRecorder>> {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, &name, &commit)))
        };

        Ok(Self { fs: make_recorder("fs"), compiler: make_recorder("compiler"), output_dir })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Finish all recorders and write cassette files to disk.
    ///
    /// Consumes the session and writes each port's cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if any cassette file cannot be written, or if a
    /// recording adapter is still alive.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.fs, "fs")?;
        finish_one(self.compiler, "compiler")?;

        Ok(self.output_dir)
    }
}

/// Get the current git commit hash, or "unknown" with a warning if unavailable.
fn get_commit_hash() -> String {
    let hash = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string());

    if let Some(h) = hash {
        h
    } else {
        tracing::warn!("could not get git commit hash, using 'unknown'");
        "unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_creates_output_directory_and_finishes() {
        let base = tempfile::tempdir().unwrap();
        let session = RecordingSession::new_in(base.path()).expect("new_in should succeed");
        let dir = session.output_dir().to_path_buf();
        assert!(dir.exists(), "Output directory should exist after new_in()");
        assert!(dir.starts_with(base.path()));

        let result = session.finish().expect("finish should succeed");
        assert_eq!(result, dir);
        assert!(dir.join("fs.cassette.yaml").exists());
        assert!(dir.join("compiler.cassette.yaml").exists());
    }

    #[test]
    fn finish_fails_while_an_adapter_holds_a_recorder() {
        let base = tempfile::tempdir().unwrap();
        let session = RecordingSession::new_in(base.path()).unwrap();
        let _held = Arc::clone(&session.compiler);
        let err = session.finish().unwrap_err();
        assert!(err.contains("still has references"));
    }

    #[test]
    fn get_commit_hash_returns_string() {
        assert!(!get_commit_hash().is_empty());
    }
}
