//! # Raw Engine State Types
//!
//! The backing engine reports a discrete state code plus a separate
//! play-when-ready flag. The core packs both into a single [`CombinedState`]
//! so short histories can be compared with plain integer masking.

use std::fmt;

/// Reserved high bits marking play-when-ready inside a [`CombinedState`].
///
/// Engine codes must fit below these bits. Any high bits an engine sets are
/// masked off, so `0x1000_0003` reads as [`StateCode::Ready`] and an
/// [`StateCode::Other`] code keeps only its low 28 bits.
pub const FLAG_PLAY_WHEN_READY: u32 = 0xF000_0000;

/// Raw code the engine uses for the idle state.
pub const STATE_IDLE: u32 = 1;
/// Raw code the engine uses while buffering.
pub const STATE_BUFFERING: u32 = 2;
/// Raw code the engine uses once it can play immediately.
pub const STATE_READY: u32 = 3;
/// Raw code the engine uses at end of media.
pub const STATE_ENDED: u32 = 4;
/// Synthetic code injected by the control layer when a seek is requested.
///
/// The engine never reports this; it folds seeks into buffering/ready.
pub const STATE_SEEKING: u32 = 100;

/// Discrete engine state.
///
/// Codes the core does not know are kept as [`StateCode::Other`] and compared
/// structurally, so newer engine versions do not break reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCode {
    Idle,
    Buffering,
    Ready,
    Ended,
    Seeking,
    Other(u32),
}

impl StateCode {
    /// Map a raw engine code. Flag bits are ignored.
    pub fn from_code(code: u32) -> Self {
        match code & !FLAG_PLAY_WHEN_READY {
            STATE_IDLE => StateCode::Idle,
            STATE_BUFFERING => StateCode::Buffering,
            STATE_READY => StateCode::Ready,
            STATE_ENDED => StateCode::Ended,
            STATE_SEEKING => StateCode::Seeking,
            other => StateCode::Other(other),
        }
    }

    /// Raw engine code for this state.
    pub fn code(self) -> u32 {
        match self {
            StateCode::Idle => STATE_IDLE,
            StateCode::Buffering => STATE_BUFFERING,
            StateCode::Ready => STATE_READY,
            StateCode::Ended => STATE_ENDED,
            StateCode::Seeking => STATE_SEEKING,
            StateCode::Other(code) => code & !FLAG_PLAY_WHEN_READY,
        }
    }
}

impl From<u32> for StateCode {
    fn from(code: u32) -> Self {
        StateCode::from_code(code)
    }
}

/// One raw callback from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStateSample {
    pub state: StateCode,
    pub play_when_ready: bool,
}

impl RawStateSample {
    pub fn new(play_when_ready: bool, state: StateCode) -> Self {
        Self {
            state,
            play_when_ready,
        }
    }

    pub fn combined(self) -> CombinedState {
        CombinedState::new(self.play_when_ready, self.state)
    }
}

/// A state code and the play-when-ready flag packed into one integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinedState(u32);

impl CombinedState {
    /// The value every history slot starts with.
    pub const INITIAL: CombinedState = CombinedState(STATE_IDLE);

    pub fn new(play_when_ready: bool, state: StateCode) -> Self {
        let flag = if play_when_ready { FLAG_PLAY_WHEN_READY } else { 0 };
        Self(state.code() | flag)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn state(self) -> StateCode {
        StateCode::from_code(self.0)
    }

    pub fn play_when_ready(self) -> bool {
        self.0 & FLAG_PLAY_WHEN_READY != 0
    }

    /// Compare under `mask`; both sides are masked before comparison.
    pub fn matches_masked(self, other: CombinedState, mask: u32) -> bool {
        self.0 & mask == other.0 & mask
    }
}

impl Default for CombinedState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl From<RawStateSample> for CombinedState {
    fn from(sample: RawStateSample) -> Self {
        sample.combined()
    }
}

impl fmt::Debug for CombinedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.state(), self.play_when_ready())
    }
}
