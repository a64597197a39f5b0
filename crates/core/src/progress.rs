//! The persisted progress record: completion sets and the daily counter.
//!
//! `ProgressState` is owned exclusively by the session sequencer. Every
//! mutation is followed by a [`crate::Command::PersistProgress`] so the host
//! can write the record out before control returns to the user. The serialized
//! field names match the storage schema the record has always used.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_GOAL: u32 = 20;
pub const DEFAULT_ACCURACY_THRESHOLD: u32 = 80;

/// Recommended range for the daily goal tunable.
pub const DAILY_GOAL_RANGE: (u32, u32) = (10, 100);
/// Recommended range for the target accuracy tunable.
pub const TARGET_ACCURACY_RANGE: (u32, u32) = (50, 100);

/// Completion sets and daily counters, persisted after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressState {
    /// Dialogue ids whose learning phase has been completed.
    pub completed_ids: Vec<u32>,
    /// Dialogue ids whose roleplay phase has been completed.
    pub roleplay_completed_ids: Vec<u32>,
    pub completed_turn_ids: Vec<u32>,
    pub completed_word_ids: Vec<u32>,
    pub daily_count: u32,
    pub last_practice_date: NaiveDate,
    pub target_accuracy: u32,
    pub daily_goal: u32,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(NaiveDate::default())
    }
}

impl ProgressState {
    /// A fresh record for a learner who has never practiced.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            completed_ids: Vec::new(),
            roleplay_completed_ids: Vec::new(),
            completed_turn_ids: Vec::new(),
            completed_word_ids: Vec::new(),
            daily_count: 0,
            last_practice_date: today,
            target_accuracy: DEFAULT_ACCURACY_THRESHOLD,
            daily_goal: DEFAULT_DAILY_GOAL,
        }
    }

    /// Resets the daily counter when the stored date is not `today`.
    ///
    /// This is the only scheduled mutation in the system: it runs once, at load
    /// time. Returns `true` if the record changed.
    pub fn apply_daily_reset(&mut self, today: NaiveDate) -> bool {
        if self.last_practice_date != today {
            self.daily_count = 0;
            self.last_practice_date = today;
            true
        } else {
            false
        }
    }

    /// Marks a dialogue turn completed. Increments the daily counter only on
    /// first-time completion. Returns `true` if the turn was newly completed.
    pub fn complete_turn(&mut self, turn_id: u32) -> bool {
        if self.completed_turn_ids.contains(&turn_id) {
            return false;
        }
        self.completed_turn_ids.push(turn_id);
        self.daily_count += 1;
        true
    }

    /// Marks a vocabulary word completed, with the same first-time-only
    /// counting rule as [`complete_turn`](Self::complete_turn).
    pub fn complete_word(&mut self, word_id: u32) -> bool {
        if self.completed_word_ids.contains(&word_id) {
            return false;
        }
        self.completed_word_ids.push(word_id);
        self.daily_count += 1;
        true
    }

    /// Records that a dialogue's learning phase finished. Idempotent; does not
    /// touch the daily counter.
    pub fn complete_dialogue_learning(&mut self, dialogue_id: u32) {
        if !self.completed_ids.contains(&dialogue_id) {
            self.completed_ids.push(dialogue_id);
        }
    }

    /// Records that a dialogue's roleplay phase finished.
    ///
    /// The id is recorded idempotently, but the +5 daily bonus is granted on
    /// every completion, including repeats. The asymmetry with the
    /// first-time-only turn/word counting is intentional: roleplay attempts
    /// are rewarded repeatedly.
    pub fn complete_roleplay(&mut self, dialogue_id: u32) {
        if !self.roleplay_completed_ids.contains(&dialogue_id) {
            self.roleplay_completed_ids.push(dialogue_id);
        }
        self.daily_count += 5;
    }

    pub fn is_turn_completed(&self, turn_id: u32) -> bool {
        self.completed_turn_ids.contains(&turn_id)
    }

    pub fn is_word_completed(&self, word_id: u32) -> bool {
        self.completed_word_ids.contains(&word_id)
    }

    pub fn is_learning_completed(&self, dialogue_id: u32) -> bool {
        self.completed_ids.contains(&dialogue_id)
    }

    pub fn is_roleplay_completed(&self, dialogue_id: u32) -> bool {
        self.roleplay_completed_ids.contains(&dialogue_id)
    }

    pub fn set_daily_goal(&mut self, goal: u32) {
        self.daily_goal = goal.clamp(DAILY_GOAL_RANGE.0, DAILY_GOAL_RANGE.1);
    }

    pub fn set_target_accuracy(&mut self, accuracy: u32) {
        self.target_accuracy =
            accuracy.clamp(TARGET_ACCURACY_RANGE.0, TARGET_ACCURACY_RANGE.1);
    }
}
