//! Serves recorded port calls back in the order they were made.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Replays a cassette. Calls to each `port::method` pair are answered in the
/// order they were recorded, independently of calls to other pairs.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Indexes the interactions of `cassette` by port and method.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Takes the next recorded `port::method` call.
    ///
    /// # Panics
    ///
    /// Panics when the run makes a call the cassette has no answer for. The
    /// project or the options changed since recording; record again with
    /// `DTS_BUNDLE_RECORD`.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        let key = (port.to_string(), method.to_string());
        let Some(queue) = self.queues.get_mut(&key) else {
            let mut recorded: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            recorded.sort();
            panic!(
                "Cassette exhausted: no interactions recorded for {port}::{method} \
                 (recorded: [{}]); record again with DTS_BUNDLE_RECORD",
                recorded.join(", ")
            );
        };
        queue.pop_front().unwrap_or_else(|| {
            panic!(
                "Cassette exhausted: every recorded {port}::{method} call was already \
                 replayed; record again with DTS_BUNDLE_RECORD"
            )
        })
    }
}
