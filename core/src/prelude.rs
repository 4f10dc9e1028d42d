use serde::{Deserialize, Serialize};

use crate::model::shape::PulseShape;

/// Parameters describing a single dispersed pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseParams {
    /// Arrival time at the reference frequency (ms).
    pub t0: f64,
    /// Dispersion measure (pc cm^-3).
    pub dm: f64,
    /// Gaussian sigma, or the boxcar full width (ms).
    pub width: f64,
    pub amplitude: f64,
    pub shape: PulseShape,
    /// Extra DM applied to the injected delays but not to dedispersion.
    pub dm_offset: f64,
    pub drift: f64,
    /// Constant time offset added to every channel (ms).
    pub offset: f64,
    /// Per-channel amplitude weighting, one entry per coarse channel.
    pub band_fraction: Option<Vec<f64>>,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            t0: 100.0,
            dm: 200.0,
            width: 1.0,
            amplitude: 20.0,
            shape: PulseShape::Boxcar,
            dm_offset: 0.0,
            drift: 0.0,
            offset: 0.0,
            band_fraction: None,
        }
    }
}

impl PulseParams {
    pub fn new(t0: f64, dm: f64, width: f64, amplitude: f64) -> Self {
        Self {
            t0,
            dm,
            width,
            amplitude,
            ..Default::default()
        }
    }

    pub fn with_shape(mut self, shape: PulseShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_dm_offset(mut self, dm_offset: f64) -> Self {
        self.dm_offset = dm_offset;
        self
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_band_fraction(mut self, band_fraction: Vec<f64>) -> Self {
        self.band_fraction = Some(band_fraction);
        self
    }
}

/// Common error type for model construction, synthesis and measurement.
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },
    #[error("sink failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

pub(crate) fn ensure_positive(name: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults_only_where_asked() {
        let params = PulseParams::new(50.0, 300.0, 2.0, 5.0).with_drift(1.5);
        assert_eq!(params.dm, 300.0);
        assert_eq!(params.drift, 1.5);
        assert_eq!(params.shape, PulseShape::Boxcar);
        assert!(params.band_fraction.is_none());
    }

    #[test]
    fn ensure_positive_rejects_zero_and_nan() {
        assert!(ensure_positive("width", 1.0).is_ok());
        assert!(matches!(
            ensure_positive("width", 0.0),
            Err(SimError::InvalidParameter(_))
        ));
        assert!(ensure_positive("width", f64::NAN).is_err());
    }
}
