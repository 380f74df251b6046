//! Detection of parameter definitions that changed between LFL edits.

use std::collections::BTreeSet;

use crate::definition::FrameDefinition;

/// Names of parameters whose record in `cur` differs from `prev`.
///
/// A parameter present in `cur` but absent from `prev` counts as changed:
/// a freshly added parameter is exactly what the engineer wants to eyeball.
pub fn diff(prev: &FrameDefinition, cur: &FrameDefinition) -> BTreeSet<String> {
    cur.parameters
        .iter()
        .filter(|(name, record)| prev.parameters.get(*name) != Some(record))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Accumulates changed parameter names across passes.
///
/// The changed set only ever grows; it is cleared on tool restart, not per
/// pass. The comparison baseline is the last definition whose pass fully
/// succeeded — [`commit`](Self::commit) is the caller's acknowledgement that
/// a pass completed, so a failed pass never poisons future diffs.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last_good: Option<FrameDefinition>,
    changed: BTreeSet<String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the diff against the last committed definition into the
    /// accumulated set. On the first pass (no baseline) nothing changes.
    pub fn observe(&mut self, cur: &FrameDefinition) -> &BTreeSet<String> {
        if let Some(prev) = &self.last_good {
            self.changed.extend(diff(prev, cur));
        }
        &self.changed
    }

    /// Record `cur` as the new comparison baseline.
    pub fn commit(&mut self, cur: FrameDefinition) {
        self.last_good = Some(cur);
    }

    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(body: &str) -> FrameDefinition {
        FrameDefinition::parse(body).unwrap()
    }

    const BASE: &str = "Parameters:\n  ALT:\n    words: [0]\n  IAS:\n    words: [1]\n";

    #[test]
    fn identical_definitions_yield_no_changes() {
        let d = def(BASE);
        assert!(diff(&d, &d).is_empty());
    }

    #[test]
    fn edited_record_is_detected() {
        let before = def(BASE);
        let after = def("Parameters:\n  ALT:\n    words: [0, 4]\n  IAS:\n    words: [1]\n");
        let changed = diff(&before, &after);
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["ALT"]);
    }

    #[test]
    fn newly_introduced_parameter_counts_as_changed() {
        let before = def(BASE);
        let after = def(
            "Parameters:\n  ALT:\n    words: [0]\n  IAS:\n    words: [1]\n  VS:\n    words: [2]\n",
        );
        let changed = diff(&before, &after);
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["VS"]);
    }

    #[test]
    fn removed_parameter_is_not_reported() {
        let before = def(BASE);
        let after = def("Parameters:\n  ALT:\n    words: [0]\n");
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn first_observation_changes_nothing() {
        let mut tracker = ChangeTracker::new();
        assert!(tracker.observe(&def(BASE)).is_empty());
    }

    #[test]
    fn changed_set_accumulates_monotonically() {
        let mut tracker = ChangeTracker::new();
        let d1 = def(BASE);
        tracker.observe(&d1);
        tracker.commit(d1);

        let d2 = def("Parameters:\n  ALT:\n    words: [0, 4]\n  IAS:\n    words: [1]\n");
        tracker.observe(&d2);
        tracker.commit(d2);
        assert!(tracker.changed().contains("ALT"));

        // A later edit to IAS grows the set; ALT stays.
        let d3 = def("Parameters:\n  ALT:\n    words: [0, 4]\n  IAS:\n    words: [1, 5]\n");
        tracker.observe(&d3);
        assert!(tracker.changed().contains("ALT"));
        assert!(tracker.changed().contains("IAS"));
    }

    #[test]
    fn uncommitted_definition_does_not_become_the_baseline() {
        let mut tracker = ChangeTracker::new();
        let d1 = def(BASE);
        tracker.observe(&d1);
        tracker.commit(d1);

        // This edit's pass fails, so it is observed but never committed.
        let broken = def("Parameters:\n  ALT:\n    words: [9]\n  IAS:\n    words: [1]\n");
        tracker.observe(&broken);

        // The next diff still runs against the committed baseline.
        let d3 = def("Parameters:\n  ALT:\n    words: [0]\n  IAS:\n    words: [1, 5]\n");
        let changed = tracker.observe(&d3).clone();
        assert!(changed.contains("IAS"));
        // ALT reverted to the committed record, so only the failed edit
        // accounts for its presence in the accumulated set.
        assert!(changed.contains("ALT"));
    }
}
