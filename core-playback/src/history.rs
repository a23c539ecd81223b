//! # Rolling State History
//!
//! A fixed-capacity ring of the most recent [`CombinedState`] values.
//!
//! ## Design
//!
//! - **Capacity**: always exactly [`HISTORY_LEN`] entries
//! - **Storage**: inline array with a rotating head, no allocation per push
//! - **Overwrite Policy**: the oldest entry is evicted on every push
//!
//! ```rust
//! use core_playback::history::StateHistory;
//! use core_playback::state::{CombinedState, StateCode};
//!
//! let mut history = StateHistory::new();
//! history.push(CombinedState::new(true, StateCode::Buffering));
//! assert_eq!(history.latest().state(), StateCode::Buffering);
//! assert_eq!(history.len(), 4);
//! ```

use crate::state::CombinedState;

/// Number of entries retained by [`StateHistory`].
pub const HISTORY_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHistory {
    entries: [CombinedState; HISTORY_LEN],
    /// Index of the oldest entry.
    head: usize,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            entries: [CombinedState::INITIAL; HISTORY_LEN],
            head: 0,
        }
    }

    /// Append `state`, evicting the oldest entry.
    pub fn push(&mut self, state: CombinedState) {
        self.entries[self.head] = state;
        self.head = (self.head + 1) % HISTORY_LEN;
    }

    /// Restore every slot to the initial idle state.
    pub fn clear(&mut self) {
        self.entries = [CombinedState::INITIAL; HISTORY_LEN];
        self.head = 0;
    }

    /// Most recently pushed entry.
    pub fn latest(&self) -> CombinedState {
        self.get(HISTORY_LEN - 1)
    }

    /// Entry at `index`, counted from the oldest (`0`) to the newest.
    ///
    /// # Panics
    ///
    /// Panics if `index >= HISTORY_LEN`.
    pub fn get(&self, index: usize) -> CombinedState {
        assert!(index < HISTORY_LEN, "history index out of range: {index}");
        self.entries[(self.head + index) % HISTORY_LEN]
    }

    /// Always [`HISTORY_LEN`].
    pub fn len(&self) -> usize {
        HISTORY_LEN
    }

    /// Never empty; slots are pre-filled with the idle state.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Entries ordered from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = CombinedState> + '_ {
        (0..HISTORY_LEN).map(move |i| self.get(i))
    }

    /// The last `n` entries, oldest first. `n` is capped at [`HISTORY_LEN`].
    pub fn tail(&self, n: usize) -> impl Iterator<Item = CombinedState> + '_ {
        let n = n.min(HISTORY_LEN);
        (HISTORY_LEN - n..HISTORY_LEN).map(move |i| self.get(i))
    }

    /// Copy of the entries, oldest first.
    pub fn snapshot(&self) -> [CombinedState; HISTORY_LEN] {
        std::array::from_fn(|i| self.get(i))
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}
