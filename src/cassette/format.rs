//! Cassette data structures for recording and replaying interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded interaction with an external port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name ("fs" or "compiler").
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Input data sent to the port.
    pub input: serde_json::Value,
    /// Output data returned from the port.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Git commit hash at recording time.
    pub commit: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_hand_written_cassette() {
        let yaml = r#"
name: foo-project
recorded_at: 2024-06-15T10:30:00Z
commit: abc123
interactions:
  - seq: 0
    port: compiler
    method: emit
    input: {}
    output:
      ok:
        declarations:
          - path: Bar.d.ts
            text: "export default class Bar {}\n"
"#;
        let cassette: Cassette = serde_yaml::from_str(yaml).expect("deserialize");
        assert_eq!(cassette.name, "foo-project");
        assert_eq!(cassette.recorded_at.to_rfc3339(), "2024-06-15T10:30:00+00:00");
        assert_eq!(
            cassette.interactions[0].output["ok"]["declarations"][0]["path"],
            json!("Bar.d.ts")
        );
    }
}
