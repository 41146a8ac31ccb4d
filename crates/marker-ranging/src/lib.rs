//! High-level facade for circular-marker ranging.
//!
//! This crate re-exports the building blocks and adds:
//! - `frames`: `image` crate adapters and a one-shot detection helper,
//! - `replay`: scripted sessions driven from a JSON event list,
//! - the `marker-ranging` command line tool (feature `cli`).
//!
//! Crates:
//! - [`core`]: frames, regions, sample accumulation, geometric calculators,
//! - [`vision`]: preprocessing, contour search and ellipse fitting,
//! - [`session`]: the sampling state machine and the three measurement flows.
//!
//! ## Quickstart
//!
//! ```no_run
//! # #[cfg(feature = "image")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = marker_ranging::replay::run_file("session.json", None)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "image"))]
//! # fn main() {}
//! ```

pub use marker_ranging_core as core;
pub use marker_ranging_session as session;
pub use marker_ranging_vision as vision;

pub use marker_ranging_core::{
    CalibratedProfile, CalibrationProfile, FrameSize, GrayImageView, MarkerProfile, Region,
};
pub use marker_ranging_session::{
    FovConfig, FovFlow, FovResult, MeasurementFlow, MonocularFlow, MonocularMode,
    MonocularOutput, Session, StereoConfig, StereoFlow, StereoResult,
};
pub use marker_ranging_vision::{ContourFilter, MarkerObservation, ProcessingConfig};

#[cfg(feature = "image")]
pub mod frames;
#[cfg(feature = "image")]
pub mod replay;
