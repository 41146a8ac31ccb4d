//! Scripted sessions.
//!
//! A replay script fixes the frame size and the measurement flow, then lists
//! the events a device would deliver: touches, camera frames (image files)
//! and yaw readings. Running it drives a [`Session`] exactly like a live
//! capture loop and reports what the flow produced.
//!
//! ```json
//! {
//!   "frame_size": { "width": 320, "height": 240 },
//!   "flow": { "kind": "fov", "marker_radius": 5.0, "marker_distance": 100.0 },
//!   "sample_size": 3,
//!   "events": [
//!     { "event": "touch_up", "x": 0, "y": 0 },
//!     { "event": "frame", "path": "centered.png", "repeat": 3 }
//!   ]
//! }
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use marker_ranging_core::{azimuth_from_rotation_vector, FrameSize};
use marker_ranging_session::{
    CancelOutcome, FovConfig, FovFlow, FovResult, FrameOutcome, LogError, MeasurementFlow,
    MonocularFlow, MonocularMode, MonocularOutput, SampleTable, Session, StereoConfig, StereoFlow,
    StereoResult,
};
use marker_ranging_vision::{PreprocessError, ProcessingConfig};
use serde::{Deserialize, Serialize};

use crate::frames::{gray_view, load_gray, FrameLoadError};

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid replay script: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Frame(#[from] FrameLoadError),
    #[error("frame {path} is {width}x{height}, the session expects {}x{}", .expected.width, .expected.height)]
    FrameSize {
        path: PathBuf,
        expected: FrameSize,
        width: u32,
        height: u32,
    },
    #[error("rotation vector needs 3 or 4 components, got {0}")]
    RotationVector(usize),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Measurement flow of a script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowSpec {
    Fov(FovConfig),
    Monocular(MonocularMode),
    Stereo(StereoConfig),
}

impl FlowSpec {
    pub fn name(&self) -> &'static str {
        match self {
            FlowSpec::Fov(_) => "fov",
            FlowSpec::Monocular(_) => "monocular",
            FlowSpec::Stereo(_) => "stereo",
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    TouchDown { x: i32, y: i32 },
    TouchMove { x: i32, y: i32 },
    TouchUp { x: i32, y: i32 },
    /// Camera frame read from an image file, relative to the script.
    Frame {
        path: PathBuf,
        #[serde(default = "one")]
        repeat: u32,
    },
    /// Bounded yaw in radians.
    Orientation { yaw: f64 },
    /// Raw rotation-vector sensor reading, `[x, y, z]` or `[x, y, z, w]`.
    RotationVector { values: Vec<f64> },
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub frame_size: FrameSize,
    pub flow: FlowSpec,
    /// Overrides the flow's own processing defaults.
    #[serde(default)]
    pub processing: Option<ProcessingConfig>,
    /// Samples per accumulator; the library default when absent.
    #[serde(default)]
    pub sample_size: Option<usize>,
    pub events: Vec<ReplayEvent>,
}

/// What the flow produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOutput {
    Fov(FovResult),
    Monocular(MonocularOutput),
    Stereo(StereoResult),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub flow: String,
    pub finished: bool,
    pub output: Option<FlowOutput>,
    pub progress: f32,
    pub frames_processed: usize,
    pub samples_accepted: usize,
    pub phase_completions: usize,
    pub resets: usize,
    pub last_reset: Option<String>,
    /// A cancel event asked to leave the session.
    pub exited: bool,
    pub samples: SampleTable,
    pub log_file: Option<PathBuf>,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Play the events. Frame paths resolve against `base_dir`; with
    /// `log_dir` a finished session writes its sample log there.
    pub fn run(&self, base_dir: &Path, log_dir: Option<&Path>) -> Result<ReplayReport, ReplayError> {
        log::info!(
            "replaying {} events, {} flow, {}x{} frames",
            self.events.len(),
            self.flow.name(),
            self.frame_size.width,
            self.frame_size.height
        );
        let mut player = Player {
            frames: FrameCache::new(base_dir, self.frame_size),
            report: ReplayReport {
                flow: self.flow.name().to_string(),
                ..ReplayReport::default()
            },
        };

        match &self.flow {
            FlowSpec::Fov(config) => {
                let mut flow = FovFlow::new(*config);
                if let Some(n) = self.sample_size {
                    flow = flow.with_sample_size(n);
                }
                let mut session = self.session(flow)?;
                player.play(&mut session, &self.events, |_, _| {})?;
                player.finish(&session, log_dir, |out| FlowOutput::Fov(*out))
            }
            FlowSpec::Monocular(mode) => {
                let mut flow = MonocularFlow::new(mode.clone());
                if let Some(n) = self.sample_size {
                    flow = flow.with_sample_size(n);
                }
                let mut session = self.session(flow)?;
                player.play(&mut session, &self.events, |_, _| {})?;
                player.finish(&session, log_dir, |out| FlowOutput::Monocular(out.clone()))
            }
            FlowSpec::Stereo(config) => {
                let mut flow = StereoFlow::new(*config);
                if let Some(n) = self.sample_size {
                    flow = flow.with_sample_size(n);
                }
                let mut session = self.session(flow)?;
                player.play(&mut session, &self.events, |s, yaw| s.on_orientation(yaw))?;
                player.finish(&session, log_dir, |out| FlowOutput::Stereo(*out))
            }
        }
    }

    fn session<F: MeasurementFlow>(&self, flow: F) -> Result<Session<F>, PreprocessError> {
        match self.processing {
            Some(config) => Session::with_processing(flow, self.frame_size, config),
            None => Session::new(flow, self.frame_size),
        }
    }
}

/// Load a script and run it with frame paths relative to the script file.
pub fn run_file(
    path: impl AsRef<Path>,
    log_dir: Option<&Path>,
) -> Result<ReplayReport, ReplayError> {
    let path = path.as_ref();
    let script = ReplayScript::from_path(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    script.run(base_dir, log_dir)
}

struct FrameCache<'a> {
    base_dir: &'a Path,
    size: FrameSize,
    loaded: HashMap<PathBuf, image::GrayImage>,
}

impl<'a> FrameCache<'a> {
    fn new(base_dir: &'a Path, size: FrameSize) -> Self {
        Self {
            base_dir,
            size,
            loaded: HashMap::new(),
        }
    }

    fn get(&mut self, path: &Path) -> Result<&image::GrayImage, ReplayError> {
        let img = match self.loaded.entry(self.base_dir.join(path)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let img = load_gray(entry.key())?;
                if img.width() != self.size.width || img.height() != self.size.height {
                    return Err(ReplayError::FrameSize {
                        path: entry.key().clone(),
                        expected: self.size,
                        width: img.width(),
                        height: img.height(),
                    });
                }
                log::debug!("loaded {}", entry.key().display());
                entry.insert(img)
            }
        };
        Ok(img)
    }
}

struct Player<'a> {
    frames: FrameCache<'a>,
    report: ReplayReport,
}

impl Player<'_> {
    fn play<F: MeasurementFlow>(
        &mut self,
        session: &mut Session<F>,
        events: &[ReplayEvent],
        mut on_yaw: impl FnMut(&mut Session<F>, f64),
    ) -> Result<(), ReplayError> {
        for event in events {
            match event {
                ReplayEvent::TouchDown { x, y } => {
                    let outcome = session.touch_down(*x, *y);
                    log::trace!("touch down: {:?}", outcome);
                }
                ReplayEvent::TouchMove { x, y } => {
                    let outcome = session.touch_move(*x, *y);
                    log::trace!("touch move: {:?}", outcome);
                }
                ReplayEvent::TouchUp { x, y } => {
                    let outcome = session.touch_up(*x, *y);
                    log::debug!("touch up: {:?}", outcome);
                }
                ReplayEvent::Frame { path, repeat } => {
                    let img = self.frames.get(path)?;
                    for _ in 0..*repeat {
                        let outcome = session.process_frame(&gray_view(img));
                        record(&mut self.report, outcome);
                    }
                }
                ReplayEvent::Orientation { yaw } => on_yaw(session, *yaw),
                ReplayEvent::RotationVector { values } => {
                    let yaw = azimuth_from_rotation_vector(values)
                        .ok_or(ReplayError::RotationVector(values.len()))?;
                    on_yaw(session, yaw);
                }
                ReplayEvent::Cancel => {
                    let outcome = session.cancel();
                    log::debug!("cancel: {:?}", outcome);
                    if outcome == CancelOutcome::Exit {
                        self.report.exited = true;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish<F: MeasurementFlow>(
        mut self,
        session: &Session<F>,
        log_dir: Option<&Path>,
        output: impl Fn(&F::Output) -> FlowOutput,
    ) -> Result<ReplayReport, ReplayError> {
        let report = &mut self.report;
        report.finished = session.is_finished();
        report.output = session.output().map(output);
        report.progress = session.progress();
        report.samples = session.sample_table();
        if let (true, Some(dir)) = (report.finished, log_dir) {
            let path = session.sample_log(dir).write(&report.samples)?;
            report.log_file = Some(path);
        }
        Ok(self.report)
    }
}

fn record(report: &mut ReplayReport, outcome: FrameOutcome) {
    match outcome {
        FrameOutcome::Ignored => return,
        FrameOutcome::Sampled { .. } | FrameOutcome::Finished => report.samples_accepted += 1,
        FrameOutcome::PhaseComplete => {
            report.samples_accepted += 1;
            report.phase_completions += 1;
        }
        FrameOutcome::Reset(reason) => {
            report.resets += 1;
            report.last_reset = Some(reason.to_string());
        }
    }
    report.frames_processed += 1;
}
