//! # State Reconciler
//!
//! Turns the engine's raw, noisy state callbacks into transitions the rest of
//! the player can act on.
//!
//! ## Overview
//!
//! Every engine callback is recorded as a [`CombinedState`] into a 4-slot
//! [`StateHistory`]. Callbacks that repeat the most recent state are dropped,
//! so a notification derived from the history fires at most once per real
//! transition. Higher-level questions ("did a seek just finish?", "is this a
//! pause?") are answered by matching short patterns against the history tail.
//!
//! ## Seek completion
//!
//! Engines fold seeks into ordinary buffering/ready transitions, so the
//! control layer records a synthetic [`StateCode::Seeking`] when it issues a
//! seek. Devices then report the remainder in different orders; all of the
//! following count as a completed seek (play-when-ready ignored):
//!
//! | Ordering                                |
//! |-----------------------------------------|
//! | `Seeking, Buffering, Ready`             |
//! | `Buffering, Seeking, Ready`             |
//! | `Seeking, Ready, Buffering, Ready`      |
//!
//! Orderings outside this table never report completion.
//!
//! ## Threading Model
//!
//! Single-threaded: the reconciler is mutated only from the engine's
//! playback thread and holds no locks.

use crate::history::{StateHistory, HISTORY_LEN};
use crate::state::{CombinedState, RawStateSample, StateCode, FLAG_PLAY_WHEN_READY};
use tracing::trace;

const SEEK_COMPLETED_PATTERNS: [&[StateCode]; 3] = [
    &[StateCode::Seeking, StateCode::Buffering, StateCode::Ready],
    &[StateCode::Buffering, StateCode::Seeking, StateCode::Ready],
    &[
        StateCode::Seeking,
        StateCode::Ready,
        StateCode::Buffering,
        StateCode::Ready,
    ],
];

#[derive(Debug, Clone, Default)]
pub struct StateReconciler {
    history: StateHistory,
}

impl StateReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the history to four idle entries. Idempotent.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Record an engine callback.
    ///
    /// Returns `false` when the combined state equals the most recent entry;
    /// such calls leave the history untouched.
    pub fn record_state(&mut self, play_when_ready: bool, state: StateCode) -> bool {
        let combined = CombinedState::new(play_when_ready, state);
        if combined == self.history.latest() {
            return false;
        }

        trace!(?combined, previous = ?self.history.latest(), "Recording engine state");
        self.history.push(combined);
        true
    }

    /// Record a raw engine sample. Same contract as [`record_state`].
    ///
    /// [`record_state`]: StateReconciler::record_state
    pub fn record(&mut self, sample: RawStateSample) -> bool {
        self.record_state(sample.play_when_ready, sample.state)
    }

    pub fn most_recent_combined(&self) -> CombinedState {
        self.history.latest()
    }

    /// Play-when-ready bit of the most recent entry.
    pub fn last_play_when_ready(&self) -> bool {
        self.history.latest().play_when_ready()
    }

    /// Whether the history tail shows a finished seek in any known ordering.
    pub fn is_seek_completed(&self) -> bool {
        SEEK_COMPLETED_PATTERNS
            .iter()
            .any(|pattern| self.matches_states(pattern))
    }

    /// A genuine pause: `Ready(true)` immediately followed by `Ready(false)`.
    ///
    /// `Ready(false)` that was never preceded by playback is not a pause.
    pub fn is_paused(&self) -> bool {
        self.history.latest() == CombinedState::new(false, StateCode::Ready)
            && self.history.get(HISTORY_LEN - 2) == CombinedState::new(true, StateCode::Ready)
    }

    /// Compare the last `pattern.len()` entries with `pattern`.
    ///
    /// With `ignore_play_when_ready` the flag bits are masked out of both
    /// sides. Patterns longer than the history never match.
    pub fn matches_history(&self, pattern: &[CombinedState], ignore_play_when_ready: bool) -> bool {
        if pattern.len() > HISTORY_LEN {
            return false;
        }

        let mask = if ignore_play_when_ready {
            !FLAG_PLAY_WHEN_READY
        } else {
            u32::MAX
        };

        self.history
            .tail(pattern.len())
            .zip(pattern)
            .all(|(recorded, expected)| recorded.matches_masked(*expected, mask))
    }

    /// Entries ordered from oldest to newest.
    pub fn history(&self) -> [CombinedState; HISTORY_LEN] {
        self.history.snapshot()
    }

    fn matches_states(&self, states: &[StateCode]) -> bool {
        let mut pattern = [CombinedState::INITIAL; HISTORY_LEN];
        for (slot, state) in pattern.iter_mut().zip(states) {
            *slot = CombinedState::new(false, *state);
        }
        self.matches_history(&pattern[..states.len()], true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(reconciler: &mut StateReconciler, states: &[(bool, StateCode)]) {
        for &(pwr, state) in states {
            reconciler.record_state(pwr, state);
        }
    }

    #[test]
    fn duplicate_state_is_noop() {
        let mut reconciler = StateReconciler::new();
        assert!(reconciler.record_state(true, StateCode::Buffering));
        let before = reconciler.history();

        assert!(!reconciler.record_state(true, StateCode::Buffering));
        assert_eq!(reconciler.history(), before);
    }

    #[test]
    fn flag_change_alone_is_a_transition() {
        let mut reconciler = StateReconciler::new();
        reconciler.record_state(false, StateCode::Ready);
        assert!(reconciler.record_state(true, StateCode::Ready));
        assert!(reconciler.last_play_when_ready());
    }

    #[test]
    fn seek_completion_with_play_when_ready_set() {
        let mut reconciler = StateReconciler::new();
        feed(
            &mut reconciler,
            &[
                (true, StateCode::Ready),
                (true, StateCode::Seeking),
                (true, StateCode::Buffering),
                (true, StateCode::Ready),
            ],
        );
        assert!(reconciler.is_seek_completed());
    }

    #[test]
    fn seek_in_progress_is_not_completed() {
        let mut reconciler = StateReconciler::new();
        feed(
            &mut reconciler,
            &[(true, StateCode::Seeking), (true, StateCode::Buffering)],
        );
        assert!(!reconciler.is_seek_completed());
    }

    #[test]
    fn exact_match_respects_flag() {
        let mut reconciler = StateReconciler::new();
        reconciler.record_state(true, StateCode::Ready);

        let paused = [CombinedState::new(false, StateCode::Ready)];
        assert!(!reconciler.matches_history(&paused, false));
        assert!(reconciler.matches_history(&paused, true));
    }

    #[test]
    fn overlong_pattern_never_matches() {
        let reconciler = StateReconciler::new();
        let pattern = [CombinedState::INITIAL; HISTORY_LEN + 1];
        assert!(!reconciler.matches_history(&pattern, true));
    }

    #[test]
    fn empty_pattern_matches_trivially() {
        let reconciler = StateReconciler::new();
        assert!(reconciler.matches_history(&[], false));
    }

    #[test]
    fn pause_after_initial_ready_is_not_a_pause() {
        let mut reconciler = StateReconciler::new();
        feed(&mut reconciler, &[(false, StateCode::Buffering), (false, StateCode::Ready)]);
        assert!(!reconciler.is_paused());

        feed(&mut reconciler, &[(true, StateCode::Ready), (false, StateCode::Ready)]);
        assert!(reconciler.is_paused());
    }

    #[test]
    fn raw_sample_records_like_pair() {
        let mut reconciler = StateReconciler::new();
        assert!(reconciler.record(RawStateSample::new(true, StateCode::Buffering)));
        assert!(!reconciler.record_state(true, StateCode::Buffering));
        assert_eq!(
            reconciler.most_recent_combined(),
            RawStateSample::new(true, StateCode::Buffering).combined()
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let mut reconciler = StateReconciler::new();
        reconciler.record_state(true, StateCode::Ended);
        reconciler.reset();
        reconciler.reset();
        assert_eq!(reconciler.history(), [CombinedState::INITIAL; HISTORY_LEN]);
    }
}
