//! Replaying adapter for the `Compiler` port.

use std::sync::Mutex;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{Compiler, EmitOutput, EmitRequest};

/// Replays recorded compiler output from a cassette.
pub struct ReplayingCompiler {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingCompiler {
    /// Creates a new replaying compiler from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl Compiler for ReplayingCompiler {
    fn emit(
        &self,
        _request: &EmitRequest,
    ) -> Result<EmitOutput, Box<dyn std::error::Error + Send + Sync>> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            replayer.next_interaction("compiler", "emit").output
        };
        extract_result(&output, "compiler::emit")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use crate::ports::EmitOptions;
    use chrono::Utc;
    use serde_json::json;

    fn make_replayer(interactions: Vec<Interaction>) -> CassetteReplayer {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            commit: "abc".into(),
            interactions,
        };
        CassetteReplayer::new(&cassette)
    }

    fn request() -> EmitRequest {
        EmitRequest {
            project: None,
            files: vec![PathBuf::from("/p/index.ts")],
            root_dir: PathBuf::from("/p"),
            options: EmitOptions::default(),
        }
    }

    #[test]
    fn replays_emitted_declarations() {
        let replayer = make_replayer(vec![Interaction {
            seq: 0,
            port: "compiler".into(),
            method: "emit".into(),
            input: json!({}),
            output: json!({"ok": {
                "declarations": [{"path": "index.d.ts", "text": "export {};\n"}],
                "input_declarations": [],
                "diagnostics": [{
                    "file": "index.ts", "line": 1, "column": 1,
                    "category": "error", "code": 2304, "message": "Cannot find name 'x'."
                }]
            }}),
        }]);
        let compiler = ReplayingCompiler::new(replayer);
        let output = compiler.emit(&request()).unwrap();
        assert_eq!(output.declarations[0].path, "index.d.ts");
        assert_eq!(output.diagnostics[0].code, 2304);
    }

    #[test]
    fn replays_spawn_failures() {
        let replayer = make_replayer(vec![Interaction {
            seq: 0,
            port: "compiler".into(),
            method: "emit".into(),
            input: json!({}),
            output: json!({"err": "failed to run tsc"}),
        }]);
        let compiler = ReplayingCompiler::new(replayer);
        assert!(compiler.emit(&request()).unwrap_err().to_string().contains("failed to run tsc"));
    }
}
