use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

use crate::model::dispersion::{
    scattering_timescale, DEFAULT_SCATTER_INDEX, DEFAULT_SCATTER_REF_MHZ,
};
use crate::prelude::{ensure_positive, SimError, SimResult};

const DEFAULT_SCATTER_TAU_MS: f64 = 0.1;
/// Beyond this many sigma a Gaussian sample is below 1e-14 of its peak.
const PEAK_REACH_SIGMA: f64 = 8.0;

/// Uniformly sampled time axis, `time(k) = start + k * tsamp` (ms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub nsamp: usize,
    pub tsamp: f64,
    pub start: f64,
}

impl TimeAxis {
    pub fn new(nsamp: usize, tsamp: f64) -> Self {
        Self {
            nsamp,
            tsamp,
            start: 0.0,
        }
    }

    #[inline]
    pub fn time(&self, k: usize) -> f64 {
        self.start + k as f64 * self.tsamp
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.nsamp).map(move |k| self.time(k))
    }
}

/// Pulse profile family used for injection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseShape {
    /// Top hat of full width `width`.
    Boxcar,
    /// Unit-area normal profile of sigma `width`, scaled by the amplitude.
    Gaussian,
    /// Gaussian convolved with a one-sided exponential whose timescale is
    /// `tau` at 1 GHz and scales with frequency as `f^-alpha`.
    Scattered { tau: f64, alpha: f64 },
}

impl PulseShape {
    /// Builds a shape from a mode name plus the scattering parameters used by `scat`.
    pub fn from_mode(mode: &str, tau: f64, alpha: f64) -> SimResult<Self> {
        match Self::from_str(mode)? {
            PulseShape::Scattered { .. } => Ok(PulseShape::Scattered { tau, alpha }),
            other => Ok(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PulseShape::Boxcar => "boxcar",
            PulseShape::Gaussian => "single",
            PulseShape::Scattered { .. } => "scat",
        }
    }

    /// Synthesizes the profile on `axis`. `freq` (MHz) only matters for
    /// scattered pulses, whose timescale depends on the channel frequency.
    pub fn synthesize(
        &self,
        axis: &TimeAxis,
        t0: f64,
        width: f64,
        amplitude: f64,
        freq: f64,
    ) -> SimResult<Array1<f64>> {
        match *self {
            PulseShape::Boxcar => boxcar_profile(axis, t0, width, amplitude),
            PulseShape::Gaussian => gaussian_profile(axis.times(), t0, width, amplitude),
            PulseShape::Scattered { tau, alpha } => {
                let tscat = scattering_timescale(tau, freq, alpha, DEFAULT_SCATTER_REF_MHZ);
                scattered_profile(axis, t0, width, amplitude, tscat)
            }
        }
    }
}

impl FromStr for PulseShape {
    type Err = SimError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "boxcar" => Ok(PulseShape::Boxcar),
            "single" | "gaussian" => Ok(PulseShape::Gaussian),
            "scat" | "scattered" => Ok(PulseShape::Scattered {
                tau: DEFAULT_SCATTER_TAU_MS,
                alpha: DEFAULT_SCATTER_INDEX,
            }),
            _ => Err(SimError::InvalidParameter(format!(
                "unsupported pulse mode '{}'",
                mode
            ))),
        }
    }
}

/// Normal probability density with mean `t0` and standard deviation `sigma`.
#[inline]
pub fn gaussian(t: f64, t0: f64, sigma: f64) -> f64 {
    let norm = 1.0 / (2.0 * PI * sigma * sigma).sqrt();
    norm * (-0.5 * (t - t0).powi(2) / (sigma * sigma)).exp()
}

pub fn gaussian_profile(
    times: impl Iterator<Item = f64>,
    t0: f64,
    sigma: f64,
    amplitude: f64,
) -> SimResult<Array1<f64>> {
    ensure_positive("gaussian width", sigma)?;
    Ok(times.map(|t| gaussian(t, t0, sigma) * amplitude).collect())
}

/// Top hat of `trunc(width / tsamp)` samples starting at the sample nearest
/// `t0 - width / 2`. The window is clipped to the axis.
pub fn boxcar_profile(
    axis: &TimeAxis,
    t0: f64,
    width: f64,
    amplitude: f64,
) -> SimResult<Array1<f64>> {
    ensure_positive("boxcar width", width)?;
    let mut out = Array1::zeros(axis.nsamp);

    let nwidth = (width / axis.tsamp).trunc();
    // nearest sample, ties resolve to the earlier one
    let start = ((t0 - width / 2.0 - axis.start) / axis.tsamp - 0.5).ceil();
    let end = start + nwidth;

    let limit = axis.nsamp as f64;
    let lo = start.clamp(0.0, limit) as usize;
    let hi = end.clamp(0.0, limit) as usize;
    if hi > lo {
        out.slice_mut(ndarray::s![lo..hi]).fill(amplitude);
    }
    Ok(out)
}

/// Gaussian convolved with a causal exponential tail, scaled so its largest
/// sample on `axis` is `amplitude` whenever the pulse lies on the axis.
pub fn scattered_profile(
    axis: &TimeAxis,
    t0: f64,
    sigma: f64,
    amplitude: f64,
    tau: f64,
) -> SimResult<Array1<f64>> {
    ensure_positive("gaussian width", sigma)?;
    if !t0.is_finite() {
        return Err(SimError::InvalidParameter(format!(
            "pulse arrival time must be finite, got {}",
            t0
        )));
    }
    if !tau.is_finite() || tau < 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "scattering timescale must be non-negative, got {}",
            tau
        )));
    }

    let gauss: Vec<f64> = axis.times().map(|t| gaussian(t, t0, sigma)).collect();
    let smeared = exponential_tail(&gauss, axis.tsamp, tau);

    let peak = reference_peak(axis, t0, sigma, tau);
    if peak.is_nan() || peak <= 0.0 {
        return Ok(Array1::zeros(axis.nsamp));
    }
    Ok(smeared.into_iter().map(|v| v * amplitude / peak).collect())
}

/// One-pole recursion equivalent to convolving with a unit-area exponential
/// kernel of timescale `tau` sampled every `step`.
fn exponential_tail(input: &[f64], step: f64, tau: f64) -> Vec<f64> {
    if tau == 0.0 {
        return input.to_vec();
    }
    let r = (-step / tau).exp();
    let mut acc = 0.0;
    input
        .iter()
        .map(|&x| {
            acc = (1.0 - r) * x + r * acc;
            acc
        })
        .collect()
}

/// Peak of the unclipped scattered profile sampled on the same grid as `axis`,
/// so the normalisation tracks where `t0` falls between samples.
fn reference_peak(axis: &TimeAxis, t0: f64, sigma: f64, tau: f64) -> f64 {
    let reach = PEAK_REACH_SIGMA * sigma;
    let lo = ((t0 - reach - axis.start) / axis.tsamp).floor() as i64;
    let hi = ((t0 + reach - axis.start) / axis.tsamp).ceil() as i64;
    let local: Vec<f64> = (lo..=hi)
        .map(|k| gaussian(axis.start + k as f64 * axis.tsamp, t0, sigma))
        .collect();
    exponential_tail(&local, axis.tsamp, tau)
        .into_iter()
        .fold(0.0, f64::max)
}

/// Scales `values` so that their maximum equals `a`; a non-positive peak gives zeros.
fn normalise_peak(values: Array1<f64>, a: f64) -> Array1<f64> {
    let peak = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if peak.is_finite() && peak > 0.0 {
        values.mapv(|v| v / peak * a)
    } else {
        Array1::zeros(values.len())
    }
}

/// Oversampled time series: profiles are evaluated `bins` times per sample and
/// averaged back down, which models a pulse that falls between samples.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub tsamp: f64,
    pub nsamp: usize,
    pub bins: usize,
    axis: TimeAxis,
    fine: TimeAxis,
}

impl TimeSeries {
    pub fn new(tsamp: f64, nsamp: usize, bins: usize) -> SimResult<Self> {
        ensure_positive("tsamp", tsamp)?;
        if nsamp == 0 || bins == 0 {
            return Err(SimError::InvalidParameter(format!(
                "time series needs samples and bins, got nsamp={} bins={}",
                nsamp, bins
            )));
        }
        let step = tsamp / bins as f64;
        let fine = TimeAxis {
            nsamp: nsamp * bins,
            tsamp: step,
            start: -0.5 * tsamp + 0.5 * step,
        };
        Ok(Self {
            tsamp,
            nsamp,
            bins,
            axis: TimeAxis::new(nsamp, tsamp),
            fine,
        })
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn grid(&self) -> impl Iterator<Item = f64> + '_ {
        self.fine.times()
    }

    pub fn boxcar(&self, t0: f64, width: f64, a: f64) -> SimResult<Array1<f64>> {
        Ok(normalise_peak(boxcar_profile(&self.axis, t0, width, 1.0)?, a))
    }

    pub fn pulse(&self, t0: f64, width: f64, a: f64) -> SimResult<Array1<f64>> {
        let fine = gaussian_profile(self.fine.times(), t0, width, 1.0)?;
        Ok(normalise_peak(self.rebin(fine), a))
    }

    pub fn scattered(&self, t0: f64, width: f64, a: f64, tau: f64) -> SimResult<Array1<f64>> {
        let fine = scattered_profile(&self.fine, t0, width, 1.0, tau)?;
        Ok(normalise_peak(self.rebin(fine), a))
    }

    fn rebin(&self, fine: Array1<f64>) -> Array1<f64> {
        fine.into_shape((self.nsamp, self.bins))
            .map(|grid| grid.mean_axis(ndarray::Axis(1)))
            .ok()
            .flatten()
            .unwrap_or_else(|| Array1::zeros(self.nsamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn unknown_mode_names_the_mode() {
        let err = PulseShape::from_str("sinc").unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(ref msg) if msg.contains("sinc")));
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in ["boxcar", "single", "scat"] {
            assert_eq!(PulseShape::from_str(mode).unwrap().name(), mode);
        }
        assert_eq!(
            PulseShape::from_mode("scat", 2.0, 4.4).unwrap(),
            PulseShape::Scattered { tau: 2.0, alpha: 4.4 }
        );
    }

    #[test]
    fn boxcar_fills_window_before_centre() {
        let axis = TimeAxis::new(20, 1.0);
        let out = boxcar_profile(&axis, 10.0, 4.0, 3.0).unwrap();
        let hot: Vec<usize> = (0..20).filter(|&k| out[k] != 0.0).collect();
        assert_eq!(hot, vec![8, 9, 10, 11]);
        assert_eq!(out[8], 3.0);
    }

    #[test]
    fn boxcar_clips_at_axis_end() {
        let axis = TimeAxis::new(10, 1.0);
        let out = boxcar_profile(&axis, 10.0, 6.0, 1.0).unwrap();
        assert_eq!(out.sum(), 3.0);
        let beyond = boxcar_profile(&axis, 1_000.0, 6.0, 1.0).unwrap();
        assert_eq!(beyond.sum(), 0.0);
        let before = boxcar_profile(&axis, -50.0, 6.0, 1.0).unwrap();
        assert_eq!(before.sum(), 0.0);
    }

    #[test]
    fn zero_sample_boxcar_injects_nothing() {
        let axis = TimeAxis::new(16, 1.0);
        let out = boxcar_profile(&axis, 8.0, 0.5, 10.0).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn non_positive_width_is_invalid() {
        let axis = TimeAxis::new(16, 1.0);
        assert!(boxcar_profile(&axis, 8.0, 0.0, 1.0).is_err());
        assert!(PulseShape::Gaussian
            .synthesize(&axis, 8.0, -1.0, 1.0, 1000.0)
            .is_err());
    }

    #[test]
    fn gaussian_has_unit_area_times_amplitude() {
        let axis = TimeAxis::new(400, 0.1);
        let out = PulseShape::Gaussian
            .synthesize(&axis, 20.0, 1.5, 7.0, 1000.0)
            .unwrap();
        assert_relative_eq!(out.sum() * axis.tsamp, 7.0, max_relative = 1e-6);
        assert_relative_eq!(out[200], 7.0 / (2.0 * PI * 2.25).sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn scattered_peak_matches_amplitude_and_trails() {
        let axis = TimeAxis::new(2000, 0.05);
        let out = scattered_profile(&axis, 30.0, 1.0, 5.0, 4.0).unwrap();
        let (argmax, peak) = out
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (k, &v)| if v > best.1 { (k, v) } else { best });
        assert_relative_eq!(peak, 5.0, max_relative = 1e-9);
        assert!(axis.time(argmax) > 30.0);
        let lead = out[(25.0 / 0.05) as usize];
        let tail = out[(35.0 / 0.05) as usize];
        assert!(tail > lead);
    }

    #[test]
    fn coarse_scattered_peak_never_overshoots() {
        let axis = TimeAxis::new(200, 1.0);
        for (sigma, tau) in [(1.0, 1.0), (0.5, 2.0), (1.0, 0.1), (0.3, 5.0)] {
            for phase in 0..20 {
                let t0 = 100.0 + phase as f64 / 20.0;
                let out = scattered_profile(&axis, t0, sigma, 10.0, tau).unwrap();
                let peak = out.iter().cloned().fold(f64::MIN, f64::max);
                assert_relative_eq!(peak, 10.0, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn scattered_without_tau_is_peak_normalised_gaussian() {
        let axis = TimeAxis::new(200, 0.1);
        let out = scattered_profile(&axis, 10.0, 0.5, 2.0, 0.0).unwrap();
        assert_relative_eq!(out[100], 2.0, max_relative = 1e-9);
        assert!(scattered_profile(&axis, 10.0, 0.5, 2.0, -1.0).is_err());
    }

    #[test]
    fn scattered_timescale_grows_at_low_frequency() {
        let axis = TimeAxis::new(4000, 0.05);
        let shape = PulseShape::Scattered { tau: 1.0, alpha: 4.0 };
        let high = shape.synthesize(&axis, 20.0, 0.5, 1.0, 1400.0).unwrap();
        let low = shape.synthesize(&axis, 20.0, 0.5, 1.0, 700.0).unwrap();
        assert!(low.sum() > high.sum());
    }

    #[test]
    fn oversampled_pulse_normalises_peak() {
        let series = TimeSeries::new(1.0, 100, 10).unwrap();
        let out = series.pulse(40.3, 2.0, 6.0).unwrap();
        assert_eq!(out.len(), 100);
        assert_abs_diff_eq!(out.iter().cloned().fold(0.0, f64::max), 6.0, epsilon = 1e-12);
        assert_eq!(series.grid().count(), 1000);

        let boxed = series.boxcar(50.0, 4.0, 2.0).unwrap();
        assert_eq!(boxed.sum(), 8.0);
    }

    #[test]
    fn oversampled_pulse_off_axis_is_zero() {
        let series = TimeSeries::new(1.0, 50, 4).unwrap();
        let out = series.scattered(1.0e6, 1.0, 3.0, 0.5).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
