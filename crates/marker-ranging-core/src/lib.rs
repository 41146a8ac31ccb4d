//! Core types and utilities for circular-marker ranging.
//!
//! This crate is intentionally small and purely numeric. It does *not*
//! depend on any image processing library or concrete image type: frames are
//! borrowed as plain row-major grayscale views.
//!
//! Contents:
//! - [`SampleAccumulator`]: fixed-capacity sample buffer with a running mean.
//! - [`ContinuousAngleWrapper`]: unwraps bounded `[-π, π]` sensor angles.
//! - [`CalibrationProfile`]: per-marker calibration state (write-once pixel radius).
//! - [`geometry`]: field of view, monocular and stereo distance calculators.

mod accumulator;
mod angle;
pub mod geometry;
mod image;
mod logger;
mod profile;

pub use accumulator::{SampleAccumulator, DEFAULT_SAMPLE_SIZE};
pub use angle::{azimuth_from_rotation_vector, ContinuousAngleWrapper, REVOLUTION_THRESHOLD};
pub use image::{FrameError, FrameSize, GrayImage, GrayImageView, Region};
pub use profile::{CalibratedProfile, CalibrationProfile, MarkerProfile, UNDETERMINED};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
