//! Bookkeeping for solves that fell back to the previous temperature.
//!
//! A fallback is not an error: the solve continues with the last known
//! temperature. Each tally keeps a flag for the latest step and a count that
//! only ever grows, so callers can report how often a cell needed help.
//! Counts are per event: a node caught twice in one step counts twice.

use smallvec::smallvec;

use crate::column::NodeVec;

/// Fallback state of one solved quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallbackTally {
    /// The latest step fell back.
    pub flag: bool,
    /// Fallbacks since the cell was initialized.
    pub count: u64,
}

impl FallbackTally {
    /// Sets the flag for this step and counts it if set.
    pub fn record(&mut self, fell_back: bool) {
        self.record_events(u32::from(fell_back));
    }

    /// Records `events` fallbacks in this step.
    pub fn record_events(&mut self, events: u32) {
        self.flag = events > 0;
        self.count += u64::from(events);
    }
}

/// Fallback tallies for the surface, the snow surface, and every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCounters {
    pub surface: FallbackTally,
    pub snow: FallbackTally,
    pub nodes: NodeVec<FallbackTally>,
}

impl FallbackCounters {
    /// Zeroed counters for a column of `nodes` nodes.
    #[must_use]
    pub fn new(nodes: usize) -> Self {
        Self {
            surface: FallbackTally::default(),
            snow: FallbackTally::default(),
            nodes: smallvec![FallbackTally::default(); nodes],
        }
    }

    /// Records one step's fallback events per node.
    ///
    /// Nodes missing from `events` are recorded as not falling back.
    pub fn record_nodes(&mut self, events: &[u32]) {
        for (j, tally) in self.nodes.iter_mut().enumerate() {
            tally.record_events(events.get(j).copied().unwrap_or(0));
        }
    }

    /// Total fallbacks of every kind since initialization.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.surface.count + self.snow.count + self.nodes.iter().map(|t| t.count).sum::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_grow() {
        let mut tally = FallbackTally::default();
        tally.record(true);
        tally.record(false);
        tally.record(true);

        assert!(tally.flag);
        assert_eq!(tally.count, 2);

        tally.record(false);
        assert!(!tally.flag);
        assert_eq!(tally.count, 2);
    }

    #[test]
    fn node_events_are_recorded_per_node() {
        let mut counters = FallbackCounters::new(4);
        counters.record_nodes(&[0, 1, 0]);
        counters.record_nodes(&[0, 1, 1, 0]);

        assert_eq!(counters.nodes[1].count, 2);
        assert_eq!(counters.nodes[2].count, 1);
        assert!(!counters.nodes[3].flag);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn every_event_in_a_step_is_counted() {
        let mut counters = FallbackCounters::new(3);
        counters.record_nodes(&[0, 2, 0]);

        assert!(counters.nodes[1].flag);
        assert_eq!(counters.nodes[1].count, 2);
        assert_eq!(counters.total(), 2);
    }
}
