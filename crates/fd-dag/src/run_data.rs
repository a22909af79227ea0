//! RunData: the per-invocation mutable state shared by the executor. Exists
//! only for the duration of one `Planner::run` call.

use std::collections::HashMap;

use tracing::instrument;

use crate::step::ProductionsMap;
use crate::value::{Timestamp, Value};

#[derive(Default)]
pub struct RunData {
    /// production name -> produced value, accumulated as steps complete.
    productions: HashMap<String, Value>,
    /// Timestamps observed for completed steps in the current set.
    current_set_times: Vec<Timestamp>,
    /// Set when any step in the current set reported no last-run
    /// timestamp at all.
    current_set_incomplete: bool,
    /// The maximum last-run timestamp observed across all *previous*
    /// sets (not the current one). `None` only while still in the first
    /// set, i.e. before any set boundary has been crossed.
    previous_max: Option<Timestamp>,
    /// Whether every step in every previous set reported a defined
    /// timestamp. Sticky: once tripped false it stays false for the rest
    /// of the run.
    all_prior_defined: bool,
    /// Whether a set boundary has been crossed yet (distinguishes "no
    /// prior sets" from "prior sets recorded no timestamps at all").
    previous_sets_exist: bool,
}

impl RunData {
    pub fn new() -> Self {
        Self {
            all_prior_defined: true,
            ..Default::default()
        }
    }

    /// Fold the now-complete current set's timestamps into
    /// `previous_max`/`all_prior_defined`, then clear per-set state, ready
    /// for the next set.
    pub fn start_step_set(&mut self) {
        if !self.current_set_times.is_empty() || self.current_set_incomplete {
            if let Some(set_max) = self.current_set_times.iter().copied().max() {
                self.previous_max = Some(match self.previous_max {
                    Some(prev) => prev.max(set_max),
                    None => set_max,
                });
            }
            if self.current_set_incomplete {
                self.all_prior_defined = false;
            }
            self.previous_sets_exist = true;
        }

        self.current_set_times.clear();
        self.current_set_incomplete = false;
    }

    /// Record a completed (or skipped) step's timestamp. `None` means the
    /// step reported no last-run time, which marks the current set
    /// incomplete for staleness purposes.
    pub fn record_run_time(&mut self, t: Option<Timestamp>) {
        match t {
            Some(ts) => self.current_set_times.push(ts),
            None => self.current_set_incomplete = true,
        }
    }

    /// Merge a step's productions in. Later calls win on key collision;
    /// a valid plan never produces colliding keys within one run.
    pub fn record_productions(&mut self, map: ProductionsMap) {
        self.productions.extend(map);
    }

    /// A step is up to date if it has its own last-run timestamp and, for
    /// every step set before the current one, every step in it also has a
    /// timestamp and this step's timestamp is strictly newer than the
    /// largest of theirs. Equal timestamps are treated as stale, not
    /// up to date.
    #[instrument(skip(self))]
    pub fn step_is_up_to_date(&self, own_last_run: Option<Timestamp>) -> bool {
        let Some(own) = own_last_run else {
            return false;
        };

        if !self.previous_sets_exist {
            return true;
        }

        if !self.all_prior_defined {
            return false;
        }

        match self.previous_max {
            Some(prev) => own > prev,
            None => true,
        }
    }

    pub fn productions(&self) -> &HashMap<String, Value> {
        &self.productions
    }

    pub fn into_productions(self) -> HashMap<String, Value> {
        self.productions
    }
}
