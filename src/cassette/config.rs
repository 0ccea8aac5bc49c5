//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Per-port cassette file paths. Each port can optionally have its own
/// cassette file for replay. Ports without a cassette path will panic
/// if called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Path to the filesystem port cassette file.
    pub fs: Option<PathBuf>,
    /// Path to the compiler port cassette file.
    pub compiler: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Replayer for the filesystem port.
    pub fs: Option<CassetteReplayer>,
    /// Replayer for the compiler port.
    pub compiler: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Returns a config where all port paths are `None`. Any port called
    /// during replay will panic because no cassette is loaded.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Points every port at the cassettes a [`RecordingSession`] wrote into `dir`.
    ///
    /// [`RecordingSession`]: super::session::RecordingSession
    #[must_use]
    pub fn from_session_dir(dir: &Path) -> Self {
        Self {
            fs: Some(dir.join("fs.cassette.yaml")),
            compiler: Some(dir.join("compiler.cassette.yaml")),
        }
    }

    /// Load a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cassette(path: &Path) -> Result<Cassette, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }

    /// Load a single cassette file and create a replayer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_port_cassette(path: &Path) -> Result<CassetteReplayer, String> {
        Self::load_cassette(path).map(|cassette| CassetteReplayer::new(&cassette))
    }

    /// Load all configured per-port cassette files and create replayers.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            fs: self.fs.as_deref().map(Self::load_port_cassette).transpose()?,
            compiler: self.compiler.as_deref().map(Self::load_port_cassette).transpose()?,
        })
    }
}
