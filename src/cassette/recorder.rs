//! Collects port calls during a run and writes them as a YAML cassette.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Accumulates the calls made to one port. Nothing touches the disk until
/// [`CassetteRecorder::finish`].
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    commit: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder for the cassette at `path`. `commit` identifies the
    /// state of the project being bundled.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self { path: path.into(), name: name.into(), commit: commit.into(), interactions: Vec::new() }
    }

    /// Appends one call. `input` is the request as the port received it and
    /// `output` its `{ok}`/`{err}` result; `seq` is the call's position in
    /// the cassette.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Writes the cassette, creating its directory if needed, and returns
    /// its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be serialized or written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let count = self.interactions.len();
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            commit: self.commit,
            interactions: self.interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, yaml)?;
        tracing::debug!(cassette = %self.path.display(), interactions = count, "wrote cassette");
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "test-recording", "deadbeef");
        recorder.record("fs", "exists", json!({"path": "/p/tsconfig.json"}), json!(true));
        recorder.record(
            "fs",
            "read_to_string",
            json!({"path": "/p/tsconfig.json"}),
            json!({"ok": "{}"}),
        );
        recorder.record("compiler", "emit", json!({"root_dir": "/p"}), json!({"ok": {}}));

        let result_path = recorder.finish().expect("finish should succeed");
        assert_eq!(result_path, path);

        let content = std::fs::read_to_string(&path).unwrap();
        let cassette: Cassette = serde_yaml::from_str(&content).unwrap();

        assert_eq!(cassette.name, "test-recording");
        assert_eq!(cassette.commit, "deadbeef");
        let seqs: Vec<u64> = cassette.interactions.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, [0, 1, 2]);
        assert_eq!(cassette.interactions[0].port, "fs");
        assert_eq!(cassette.interactions[2].port, "compiler");
    }

    #[test]
    fn finish_creates_the_cassette_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session/compiler.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "compiler", "unknown");
        recorder.record("compiler", "emit", json!({"files": []}), json!({"err": "tsc not found"}));
        recorder.finish().unwrap();

        let cassette: Cassette =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cassette.interactions.len(), 1);
        assert_eq!(cassette.interactions[0].output, json!({"err": "tsc not found"}));
    }
}
