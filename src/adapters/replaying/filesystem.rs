//! Replaying adapter for the `FileSystem` port.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::filesystem::FileSystem;

/// Replays recorded filesystem operations from a cassette.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a new replaying filesystem from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn next_output(&self, method: &str) -> serde_json::Value {
        let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
        replayer.next_interaction("fs", method).output
    }
}

impl FileSystem for ReplayingFileSystem {
    fn read_to_string(
        &self,
        _path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        extract_result(&self.next_output("read_to_string"), "fs::read_to_string")
    }

    fn write(
        &self,
        _path: &Path,
        _contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let output = self.next_output("write");
        if let Some(err) = output.get("err") {
            let msg = err.as_str().unwrap_or("unknown error").to_string();
            return Err(msg.into());
        }
        Ok(())
    }

    fn exists(&self, _path: &Path) -> bool {
        self.next_output("exists").as_bool().expect("fs::exists: expected boolean output")
    }

    fn is_dir(&self, _path: &Path) -> bool {
        self.next_output("is_dir").as_bool().expect("fs::is_dir: expected boolean output")
    }

    fn walk_files(
        &self,
        _root: &Path,
        _skip_dir: &dyn Fn(&Path) -> bool,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>> {
        extract_result(&self.next_output("walk_files"), "fs::walk_files")
    }
}
