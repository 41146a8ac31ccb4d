use serde::{Deserialize, Serialize};

/// Stored pixel radius meaning "not calibrated yet".
pub const UNDETERMINED: f64 = -1.0;

/// Physical description of a marker and the distance it is calibrated at.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerProfile {
    pub name: String,
    /// Distance between camera and marker during calibration.
    pub distance: f64,
    /// Physical marker radius, same unit as `distance`.
    pub radius: f64,
}

impl MarkerProfile {
    pub fn new(name: impl Into<String>, distance: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            distance,
            radius,
        }
    }

    /// Attach the pixel radius observed at the calibration distance.
    pub fn calibrate(self, pixel_radius: f64) -> CalibratedProfile {
        CalibratedProfile {
            marker: self,
            pixel_radius,
        }
    }
}

/// A marker profile with its observed pixel radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibratedProfile {
    #[serde(flatten)]
    pub marker: MarkerProfile,
    /// Mean marker radius in pixels at `marker.distance`.
    pub pixel_radius: f64,
}

impl CalibratedProfile {
    pub fn name(&self) -> &str {
        &self.marker.name
    }

    pub fn distance(&self) -> f64 {
        self.marker.distance
    }

    pub fn radius(&self) -> f64 {
        self.marker.radius
    }
}

/// Calibration state of a marker, handed between measurement rounds.
///
/// The pixel radius can be set exactly once: `set_pixel_radius` on an
/// already calibrated profile is refused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalibrationProfile {
    Uncalibrated(MarkerProfile),
    Calibrated(CalibratedProfile),
}

impl CalibrationProfile {
    pub fn new(name: impl Into<String>, distance: f64, radius: f64) -> Self {
        Self::Uncalibrated(MarkerProfile::new(name, distance, radius))
    }

    /// Rebuild from stored fields where `pixel_radius == UNDETERMINED`
    /// marks an uncalibrated profile.
    pub fn from_persisted(
        name: impl Into<String>,
        distance: f64,
        radius: f64,
        pixel_radius: f64,
    ) -> Self {
        let marker = MarkerProfile::new(name, distance, radius);
        if pixel_radius == UNDETERMINED {
            Self::Uncalibrated(marker)
        } else {
            Self::Calibrated(marker.calibrate(pixel_radius))
        }
    }

    pub fn marker(&self) -> &MarkerProfile {
        match self {
            Self::Uncalibrated(m) => m,
            Self::Calibrated(c) => &c.marker,
        }
    }

    pub fn pixel_radius(&self) -> Option<f64> {
        match self {
            Self::Uncalibrated(_) => None,
            Self::Calibrated(c) => Some(c.pixel_radius),
        }
    }

    pub fn pixel_radius_or_sentinel(&self) -> f64 {
        self.pixel_radius().unwrap_or(UNDETERMINED)
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }

    pub fn as_calibrated(&self) -> Option<&CalibratedProfile> {
        match self {
            Self::Uncalibrated(_) => None,
            Self::Calibrated(c) => Some(c),
        }
    }

    /// Set the pixel radius once. Returns `false` if it was already set.
    pub fn set_pixel_radius(&mut self, pixel_radius: f64) -> bool {
        match self {
            Self::Calibrated(_) => false,
            Self::Uncalibrated(m) => {
                let marker = std::mem::take(m);
                *self = Self::Calibrated(marker.calibrate(pixel_radius));
                true
            }
        }
    }
}

impl std::fmt::Display for CalibrationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.marker().name)
    }
}
