use marker_ranging_core::{FrameSize, Region};
use marker_ranging_vision::{ContourFilter, MarkerObservation, ProcessingConfig};

use crate::table::SampleTable;

/// Why a flow refused an observation or a round.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    #[error("marker center is too far from the frame center")]
    OffCenter,
    #[error("marker is on the wrong half of the frame")]
    WrongHalf,
    #[error("device yaw drifted {:.2}° since the first capture", .deviation.to_degrees())]
    OrientationDrift { deviation: f64 },
}

/// Why a session dropped back to idle.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ResetReason {
    #[error("no marker found in the search region")]
    NoMarker,
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// A flow's judgement of one observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    Accept,
    /// Try the next observation.
    Skip(Rejection),
    /// Abort the round.
    Reject(Rejection),
}

/// State of the round after recording a sample.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion<T> {
    Continue,
    /// Current phase is done; the next one starts from idle.
    PhaseComplete,
    Finished(T),
}

/// Measurement-specific half of a [`Session`](crate::Session).
///
/// The session owns the state machine and the detector; the flow owns the
/// accumulators and decides what a sample is and when a round is done.
pub trait MeasurementFlow {
    type Output: Clone + std::fmt::Debug;

    /// File name prefix of the sample log.
    const LOG_PREFIX: &'static str;

    fn contour_filter(&self) -> ContourFilter;

    /// Processing defaults for this flow.
    fn processing(&self) -> ProcessingConfig {
        ProcessingConfig::default()
    }

    /// Search region that does not depend on user input.
    fn fixed_region(&self, _frame: FrameSize) -> Option<Region> {
        None
    }

    /// A search region was committed. Clears accumulators and may refuse
    /// to start.
    fn begin_round(&mut self) -> Result<(), Rejection>;

    fn judge(&self, observation: &MarkerObservation, frame: FrameSize) -> Verdict;

    fn record(&mut self, observation: &MarkerObservation, frame: FrameSize);

    /// Fraction of the current phase collected, in `[0, 1]`.
    fn progress(&self) -> f32;

    fn completion(&mut self, frame: FrameSize) -> Completion<Self::Output>;

    /// Back action while idle. Returns `true` if the flow moved to an
    /// earlier phase instead of letting the session exit.
    fn step_back(&mut self) -> bool {
        false
    }

    fn sample_table(&self) -> SampleTable;
}
