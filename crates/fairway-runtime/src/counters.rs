#![forbid(unsafe_code)]

//! Per-session reconciliation counters.

use crate::scheduler::{Completion, Outcome};

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChoreographyCounters {
    pub snapshots_received: u64,
    /// Accepted, by any path.
    pub snapshots_applied: u64,
    pub snapshots_buffered: u64,
    /// Buffered, then overwritten by a later push before it could apply.
    pub snapshots_superseded: u64,
    /// Buffered, then thrown away (rejection, channel loss, resync).
    pub snapshots_discarded: u64,
    pub movements_inferred: u64,
    pub animations_started: u64,
    pub animations_completed: u64,
    pub animations_failed: u64,
    pub animations_cancelled: u64,
    pub animations_dropped: u64,
}

impl ChoreographyCounters {
    /// Fold scheduler completions into the totals.
    pub fn record(&mut self, completions: &[Completion]) {
        for completion in completions {
            match completion.outcome {
                Outcome::Finished => self.animations_completed += 1,
                Outcome::Failed => self.animations_failed += 1,
                Outcome::Cancelled => self.animations_cancelled += 1,
                Outcome::Dropped => self.animations_dropped += 1,
            }
        }
    }

    /// Animations that have ended, however they ended.
    #[must_use]
    pub fn animations_settled(&self) -> u64 {
        self.animations_completed
            + self.animations_failed
            + self.animations_cancelled
            + self.animations_dropped
    }

    /// Format as a JSONL line for structured logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"choreography-counters-v1","snapshots_received":{},"snapshots_applied":{},"snapshots_buffered":{},"snapshots_superseded":{},"snapshots_discarded":{},"movements_inferred":{},"animations_started":{},"animations_completed":{},"animations_failed":{},"animations_cancelled":{},"animations_dropped":{}}}"#,
            self.snapshots_received,
            self.snapshots_applied,
            self.snapshots_buffered,
            self.snapshots_superseded,
            self.snapshots_discarded,
            self.movements_inferred,
            self.animations_started,
            self.animations_completed,
            self.animations_failed,
            self.animations_cancelled,
            self.animations_dropped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{AnimationHandle, Origin};

    fn done(outcome: Outcome) -> Completion {
        Completion {
            handle: AnimationHandle(1),
            origin: Origin::Remote,
            outcome,
            subjects: Vec::new(),
        }
    }

    #[test]
    fn record_sorts_outcomes() {
        let mut counters = ChoreographyCounters::default();
        counters.record(&[
            done(Outcome::Finished),
            done(Outcome::Finished),
            done(Outcome::Failed),
            done(Outcome::Cancelled),
            done(Outcome::Dropped),
        ]);
        assert_eq!(counters.animations_completed, 2);
        assert_eq!(counters.animations_settled(), 5);
    }

    #[test]
    fn jsonl_parses() {
        let counters = ChoreographyCounters {
            snapshots_received: 3,
            snapshots_superseded: 1,
            ..Default::default()
        };
        let value: serde_json::Value = serde_json::from_str(&counters.to_jsonl()).unwrap();
        assert_eq!(value["snapshots_received"], 3);
        assert_eq!(value["snapshots_superseded"], 1);
        assert_eq!(value["schema"], "choreography-counters-v1");
    }
}
