//! Sampling sessions for circular-marker ranging.
//!
//! A [`Session`] drives one [`MeasurementFlow`] through
//! `Idle → Drawing → Sampling → Finished`: touch events define the search
//! region, every frame contributes at most one sample, and once the flow's
//! accumulators are full it produces its result.
//!
//! Flows:
//! - [`FovFlow`]: horizontal field of view from a centered marker.
//! - [`MonocularFlow`]: marker calibration and single-camera distance.
//! - [`StereoFlow`]: two-capture stereo distance with yaw correction.
//!
//! ```no_run
//! use marker_ranging_core::{FrameSize, GrayImage};
//! use marker_ranging_session::{FovConfig, FovFlow, FrameOutcome, Session};
//!
//! let flow = FovFlow::new(FovConfig { marker_radius: 5.0, marker_distance: 100.0 });
//! let mut session = Session::new(flow, FrameSize::new(640, 480)).unwrap();
//! session.touch_up(0, 0);
//! let frame = GrayImage::new(640, 480, 0);
//! if let FrameOutcome::Finished = session.process_frame(&frame.view()) {
//!     println!("{:?}", session.output());
//! }
//! ```

mod flow;
pub mod fov;
pub mod monocular;
mod session;
pub mod stereo;
mod table;

pub use flow::{Completion, MeasurementFlow, Rejection, ResetReason, Verdict};
pub use fov::{FovConfig, FovFlow, FovResult};
pub use monocular::{MonocularFlow, MonocularMode, MonocularOutput};
pub use session::{CancelOutcome, FrameOutcome, Selection, Session, SessionState, TouchOutcome};
pub use stereo::{StereoConfig, StereoFlow, StereoPhase, StereoResult};
pub use table::{CsvSampleLog, LogError, SampleTable};
