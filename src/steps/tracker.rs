//! Linear step counter with per-step payloads

use std::collections::BTreeMap;

use super::StepStatus;

/// Tracks the active step of a fixed linear sequence `1..=total_steps`
/// together with an opaque payload per step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTracker<P = serde_json::Value> {
    current: u32,
    total: u32,
    data: BTreeMap<u32, P>,
}

impl<P> StepTracker<P> {
    /// Create a tracker positioned on step 1. A zero step count is raised to 1.
    pub fn new(total_steps: u32) -> Self {
        Self {
            current: 1,
            total: total_steps.max(1),
            data: BTreeMap::new(),
        }
    }

    pub fn current_step(&self) -> u32 {
        self.current
    }

    pub fn total_steps(&self) -> u32 {
        self.total
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }

    /// Move forward one step. Returns false (and changes nothing) on the last step.
    pub fn advance(&mut self) -> bool {
        if self.current < self.total {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Move back one step. Returns false (and changes nothing) on step 1.
    pub fn retreat(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Return to step 1 and drop all payloads
    pub fn reset(&mut self) {
        self.current = 1;
        self.data.clear();
    }

    /// Store a payload for `step`, replacing any earlier one
    pub fn record_step_data(&mut self, step: u32, payload: P) {
        self.data.insert(step, payload);
    }

    pub fn read_step_data(&self, step: u32) -> Option<&P> {
        self.data.get(&step)
    }

    /// Indicator status of `step` relative to the current position
    pub fn status_of(&self, step: u32) -> StepStatus {
        match step.cmp(&self.current) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Pending,
        }
    }
}
