use marker_ranging_core::{FrameSize, GrayImageView, Region};
use marker_ranging_vision::{MarkerDetector, MarkerObservation, PreprocessError, ProcessingConfig};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::flow::{Completion, MeasurementFlow, ResetReason, Verdict};
use crate::table::{CsvSampleLog, SampleTable};

/// Rectangle being dragged by the user, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

impl Selection {
    pub fn region(&self) -> Region {
        Region::from_corners(self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing(Selection),
    Sampling(Region),
    Finished,
}

/// Result of a touch event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TouchOutcome {
    Ignored,
    Drawing(Selection),
    /// Zero-area selection; back to idle.
    Discarded,
    Started(Region),
    Reset(ResetReason),
}

/// Result of processing one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Session is not sampling.
    Ignored,
    Sampled { progress: f32 },
    PhaseComplete,
    Finished,
    Reset(ResetReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Dropped the current selection or round.
    BackToIdle,
    /// The flow returned to its previous phase.
    SteppedBack,
    /// Nothing left to undo; the caller should end the session.
    Exit,
}

/// Frame-driven sampling state machine around one measurement flow.
///
/// `&mut self` on every event serializes frame, touch and orientation
/// callbacks.
pub struct Session<F: MeasurementFlow> {
    pub(crate) flow: F,
    frame: FrameSize,
    detector: MarkerDetector,
    pub(crate) state: SessionState,
    progress: f32,
    output: Option<F::Output>,
    last_observation: Option<MarkerObservation>,
    last_reset: Option<ResetReason>,
}

impl<F: MeasurementFlow> Session<F> {
    /// Session with the flow's own processing defaults.
    pub fn new(flow: F, frame: FrameSize) -> Result<Self, PreprocessError> {
        let config = flow.processing();
        Self::with_processing(flow, frame, config)
    }

    pub fn with_processing(
        flow: F,
        frame: FrameSize,
        config: ProcessingConfig,
    ) -> Result<Self, PreprocessError> {
        Ok(Self {
            flow,
            frame,
            detector: MarkerDetector::new(config)?,
            state: SessionState::Idle,
            progress: 0.0,
            output: None,
            last_observation: None,
            last_reset: None,
        })
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn output(&self) -> Option<&F::Output> {
        self.output.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Most recently accepted observation.
    pub fn last_observation(&self) -> Option<&MarkerObservation> {
        self.last_observation.as_ref()
    }

    pub fn last_reset(&self) -> Option<ResetReason> {
        self.last_reset
    }

    /// Region the session searches, or would search once started.
    pub fn search_region(&self) -> Option<Region> {
        match self.state {
            SessionState::Sampling(region) => Some(region),
            _ => self.flow.fixed_region(self.frame),
        }
    }

    pub fn sample_table(&self) -> SampleTable {
        self.flow.sample_table()
    }

    pub fn sample_log(&self, dir: impl Into<std::path::PathBuf>) -> CsvSampleLog {
        CsvSampleLog::new(dir, F::LOG_PREFIX)
    }

    pub fn touch_down(&mut self, x: i32, y: i32) -> TouchOutcome {
        if self.state != SessionState::Idle || self.flow.fixed_region(self.frame).is_some() {
            return TouchOutcome::Ignored;
        }
        let selection = Selection {
            start: (x, y),
            end: (x, y),
        };
        self.state = SessionState::Drawing(selection);
        TouchOutcome::Drawing(selection)
    }

    pub fn touch_move(&mut self, x: i32, y: i32) -> TouchOutcome {
        match &mut self.state {
            SessionState::Drawing(selection) => {
                selection.end = (x, y);
                TouchOutcome::Drawing(*selection)
            }
            _ => TouchOutcome::Ignored,
        }
    }

    /// Commit a selection, or start a fixed-region flow from idle.
    pub fn touch_up(&mut self, x: i32, y: i32) -> TouchOutcome {
        let region = match self.state {
            SessionState::Idle => match self.flow.fixed_region(self.frame) {
                Some(region) => region,
                None => return TouchOutcome::Ignored,
            },
            SessionState::Drawing(mut selection) => {
                selection.end = (x, y);
                let region = selection.region().clamp_to(self.frame);
                if region.is_empty() {
                    self.state = SessionState::Idle;
                    return TouchOutcome::Discarded;
                }
                region
            }
            SessionState::Sampling(_) | SessionState::Finished => return TouchOutcome::Ignored,
        };
        self.start(region)
    }

    fn start(&mut self, region: Region) -> TouchOutcome {
        if let Err(rejection) = self.flow.begin_round() {
            return TouchOutcome::Reset(self.reset(rejection.into()));
        }
        log::debug!("sampling {:?}", region);
        self.progress = self.flow.progress();
        self.last_reset = None;
        self.state = SessionState::Sampling(region);
        TouchOutcome::Started(region)
    }

    fn reset(&mut self, reason: ResetReason) -> ResetReason {
        log::debug!("reset to idle: {}", reason);
        self.state = SessionState::Idle;
        self.last_reset = Some(reason);
        reason
    }

    /// Back action.
    pub fn cancel(&mut self) -> CancelOutcome {
        match self.state {
            SessionState::Drawing(_) | SessionState::Sampling(_) => {
                self.state = SessionState::Idle;
                CancelOutcome::BackToIdle
            }
            SessionState::Idle if self.flow.step_back() => CancelOutcome::SteppedBack,
            SessionState::Idle | SessionState::Finished => CancelOutcome::Exit,
        }
    }

    /// Search the current region of `frame` for the marker and record it.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn process_frame(&mut self, frame: &GrayImageView<'_>) -> FrameOutcome {
        let SessionState::Sampling(region) = self.state else {
            return FrameOutcome::Ignored;
        };

        let observations = self
            .detector
            .observe(frame, region, self.flow.contour_filter());

        let mut skipped = None;
        let mut chosen = None;
        for obs in observations {
            match self.flow.judge(&obs, self.frame) {
                Verdict::Skip(rejection) => skipped = Some(rejection),
                Verdict::Reject(rejection) => {
                    return FrameOutcome::Reset(self.reset(rejection.into()));
                }
                Verdict::Accept => {
                    chosen = Some(obs);
                    break;
                }
            }
        }

        let Some(obs) = chosen else {
            let reason = skipped.map_or(ResetReason::NoMarker, ResetReason::Rejected);
            return FrameOutcome::Reset(self.reset(reason));
        };

        self.flow.record(&obs, self.frame);
        self.last_observation = Some(obs);
        self.progress = self.flow.progress();

        match self.flow.completion(self.frame) {
            Completion::Continue => FrameOutcome::Sampled {
                progress: self.progress,
            },
            Completion::PhaseComplete => {
                log::info!("phase complete");
                self.state = SessionState::Idle;
                self.progress = 0.0;
                FrameOutcome::PhaseComplete
            }
            Completion::Finished(output) => {
                log::info!("finished: {:?}", output);
                self.output = Some(output);
                self.state = SessionState::Finished;
                FrameOutcome::Finished
            }
        }
    }
}
