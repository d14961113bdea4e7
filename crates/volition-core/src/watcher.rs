//! Recorder for nested action completions.
//!
//! When an action inside a tree terminates, its `(tag, kind, result)`
//! triple is recorded under the tag of every enclosing runner. A retry
//! decorator drains its own scope to build attempt reports; the top-level
//! runner drains its scope into the completion event. Draining is what
//! keeps the map from growing without bound.

use std::collections::BTreeMap;

use volition_types::{ActionTag, SubActionResult};

/// Map from enclosing tag to the nested completions recorded under it.
#[derive(Default)]
pub struct ActionWatcher {
    results: BTreeMap<ActionTag, Vec<SubActionResult>>,
}

impl ActionWatcher {
    /// Create an empty watcher.
    pub const fn new() -> Self {
        Self {
            results: BTreeMap::new(),
        }
    }

    /// Record one nested completion under every ancestor tag.
    pub(crate) fn record(&mut self, ancestors: &[ActionTag], result: SubActionResult) {
        for tag in ancestors {
            self.results.entry(*tag).or_default().push(result);
        }
    }

    /// Nested completions recorded under `tag`, oldest first.
    pub fn results_for(&self, tag: ActionTag) -> &[SubActionResult] {
        self.results.get(&tag).map_or(&[], Vec::as_slice)
    }

    /// Remove and return the completions recorded under `tag`.
    pub fn take_results(&mut self, tag: ActionTag) -> Vec<SubActionResult> {
        self.results.remove(&tag).unwrap_or_default()
    }

    /// How many tags currently have recorded results.
    pub fn tracked_tags(&self) -> usize {
        self.results.len()
    }
}

impl core::fmt::Debug for ActionWatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionWatcher")
            .field("tracked_tags", &self.results.len())
            .finish()
    }
}
