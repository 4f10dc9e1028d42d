//! SNR and flux estimators over dedispersed `(time, channel)` arrays.
//!
//! Every estimator first reduces across channels ("fscrunch") to a time
//! series. All of them are pure except [`l2_snr`], which adds fresh noise on
//! each call and therefore returns a different value every time.

use ndarray::{ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::math::StatsHelper;
use crate::measurement::noise::{add_noise, NoiseLevel};
use crate::prelude::{SimError, SimResult};

const CLIP_THRESHOLD: f64 = 5.0;

pub fn fscrunch_mean(array: ArrayView2<f64>) -> Vec<f64> {
    array
        .mean_axis(Axis(1))
        .map(|series| series.to_vec())
        .unwrap_or_default()
}

pub fn fscrunch_sum(array: ArrayView2<f64>) -> Vec<f64> {
    array.sum_axis(Axis(1)).to_vec()
}

/// L2 norm of the positive part of the channel-mean series; assumes unit noise.
pub fn l2_clean(array: ArrayView2<f64>) -> f64 {
    let positive: Vec<f64> = fscrunch_mean(array).into_iter().filter(|&v| v > 0.0).collect();
    StatsHelper::l2_norm(&positive)
}

/// Total flux: the linear sum of the positive part of the channel-mean series.
pub fn l2_flux(array: ArrayView2<f64>) -> f64 {
    fscrunch_mean(array).into_iter().filter(|&v| v > 0.0).sum()
}

/// L2 SNR measured after adding a noise realisation drawn from `rng`.
///
/// Samples are kept where the clean channel sum exceeds one MAD of the noisy
/// series; the kept samples are median-subtracted and MAD-normalised.
pub fn l2_snr<R: Rng + ?Sized>(
    array: ArrayView2<f64>,
    noise: NoiseLevel,
    rng: &mut R,
) -> SimResult<f64> {
    let noisy = add_noise(array, noise, rng)?;
    let series = fscrunch_sum(noisy.view());
    let clean = fscrunch_sum(array);

    let mean = StatsHelper::mean(&series);
    let median = StatsHelper::median(&series);
    let mad = StatsHelper::mad(&series, mean);
    if !(mad.is_finite() && mad > 0.0) {
        return Err(SimError::DegenerateSignal(format!(
            "noisy series has MAD {}",
            mad
        )));
    }

    let kept: Vec<f64> = series
        .iter()
        .zip(clean.iter())
        .filter(|&(_, &c)| c / mad > 1.0)
        .map(|(&s, _)| (s - median) / mad)
        .collect();
    Ok(StatsHelper::l2_norm(&kept))
}

/// Single-band SNR: L2 norm over the positive samples of `series`.
pub fn quick_snr(series: &[f64]) -> f64 {
    series
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| v * v)
        .sum::<f64>()
        .sqrt()
}

/// Multi-band SNR: L2 norm over every sample of `series`.
pub fn quad_sum(series: &[f64]) -> f64 {
    StatsHelper::l2_norm(series)
}

/// Exhaustive window search over the channel-sum series.
pub fn triangle_snr(array: ArrayView2<f64>) -> f64 {
    best_window(&fscrunch_sum(array))
}

/// Exhaustive window search over the channel-mean series.
pub fn triangle_clean(array: ArrayView2<f64>) -> f64 {
    best_window(&fscrunch_mean(array))
}

/// Maximum of `sum(|x[i..j]|) / sqrt(j - i)` over every window, visited with
/// `i` outermost. Only a strictly larger value replaces the current best, so
/// ties keep the first window found.
pub fn best_window(series: &[f64]) -> f64 {
    let mut best: Option<f64> = None;
    for i in 0..series.len() {
        let mut running = 0.0;
        for (len, value) in series[i..].iter().enumerate() {
            running += value.abs();
            let score = running / ((len + 1) as f64).sqrt();
            if best.map_or(true, |b| score > b) {
                best = Some(score);
            }
        }
    }
    best.unwrap_or(0.0)
}

/// Peak of centred moving averages of the channel-sum series over widths `1..n`.
pub fn rolling_box(array: ArrayView2<f64>) -> f64 {
    let series = fscrunch_sum(array);
    let n = series.len();

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for value in &series {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + value);
    }

    let mut best = 0.0;
    for width in 1..n {
        let lead = (width - 1) / 2;
        for out in 0..n {
            // same-mode convolution: output `out` sums inputs (k - width, k]
            let k = out + lead;
            let hi = k.min(n - 1) + 1;
            let lo = (k + 1).saturating_sub(width);
            let value = (prefix[hi] - prefix[lo]) / width as f64;
            if value > best {
                best = value;
            }
        }
    }
    best
}

/// Channel-mean series with outliers (at least five MADs above the median) zeroed.
pub fn clipped_fscrunch(array: ArrayView2<f64>) -> Vec<f64> {
    let series = fscrunch_mean(array);
    let median = StatsHelper::median(&series);
    let mad = StatsHelper::mad(&series, median);
    if mad.is_nan() || mad <= 0.0 {
        return series;
    }
    series
        .into_iter()
        .map(|v| if (v - median) / mad < CLIP_THRESHOLD { v } else { 0.0 })
        .collect()
}

/// Names one of the estimators so callers can pick it at run time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    L2Clean,
    L2Snr(NoiseLevel),
    L2Flux,
    Quick,
    Quad,
    Triangle,
    TriangleClean,
    RollingBox,
}

impl Estimator {
    /// Runs the estimator. `rng` is only drawn from by [`Estimator::L2Snr`];
    /// the quick and quad variants reduce with the channel mean.
    pub fn measure<R: Rng + ?Sized>(&self, array: ArrayView2<f64>, rng: &mut R) -> SimResult<f64> {
        let value = match *self {
            Estimator::L2Clean => l2_clean(array),
            Estimator::L2Snr(noise) => l2_snr(array, noise, rng)?,
            Estimator::L2Flux => l2_flux(array),
            Estimator::Quick => quick_snr(&fscrunch_mean(array)),
            Estimator::Quad => quad_sum(&fscrunch_mean(array)),
            Estimator::Triangle => triangle_snr(array),
            Estimator::TriangleClean => triangle_clean(array),
            Estimator::RollingBox => rolling_box(array),
        };
        Ok(value)
    }

    pub fn is_stochastic(&self) -> bool {
        matches!(self, Estimator::L2Snr(_))
    }
}

impl FromStr for Estimator {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "l2_clean" => Ok(Estimator::L2Clean),
            "l2_snr" => Ok(Estimator::L2Snr(NoiseLevel::default())),
            "l2_flux" => Ok(Estimator::L2Flux),
            "quick" => Ok(Estimator::Quick),
            "quad" => Ok(Estimator::Quad),
            "triangle" => Ok(Estimator::Triangle),
            "triangle_clean" => Ok(Estimator::TriangleClean),
            "rolling_box" | "rollingbox" => Ok(Estimator::RollingBox),
            _ => Err(SimError::InvalidParameter(format!(
                "unknown estimator '{}'",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Array2;
    use rand::{rngs::StdRng, SeedableRng};

    fn rectangle(nsamp: usize, nchan: usize, start: usize, width: usize, height: f64) -> Array2<f64> {
        let mut array = Array2::zeros((nsamp, nchan));
        array
            .slice_mut(ndarray::s![start..start + width, ..])
            .fill(height);
        array
    }

    #[test]
    fn l2_clean_ignores_negative_samples() {
        let mut array = rectangle(20, 4, 5, 4, 2.0);
        array[[0, 0]] = -100.0;
        assert_relative_eq!(l2_clean(array.view()), 4.0);
        assert_relative_eq!(l2_flux(array.view()), 8.0);
    }

    #[test]
    fn clean_estimators_are_deterministic() {
        let array = rectangle(64, 8, 10, 6, 1.5);
        assert_eq!(l2_clean(array.view()), l2_clean(array.view()));
        assert_eq!(l2_flux(array.view()), l2_flux(array.view()));
    }

    #[test]
    fn noisy_snr_varies_between_calls() {
        let array = rectangle(256, 16, 100, 8, 40.0);
        let mut rng = StdRng::from_entropy();
        let first = l2_snr(array.view(), NoiseLevel::default(), &mut rng).unwrap();
        let second = l2_snr(array.view(), NoiseLevel::default(), &mut rng).unwrap();
        assert!(first.is_finite() && first >= 0.0);
        assert!(second.is_finite() && second >= 0.0);
        assert_ne!(first, second);
    }

    #[test]
    fn noisy_snr_is_reproducible_with_a_seed() {
        let array = rectangle(128, 8, 40, 4, 30.0);
        let a = l2_snr(array.view(), NoiseLevel::default(), &mut StdRng::seed_from_u64(11)).unwrap();
        let b = l2_snr(array.view(), NoiseLevel::default(), &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0);
    }

    #[test]
    fn noisy_snr_without_noise_is_degenerate() {
        let array = Array2::<f64>::zeros((32, 2));
        let mut rng = StdRng::seed_from_u64(1);
        let result = l2_snr(array.view(), NoiseLevel::new(0.0, 0.0), &mut rng);
        assert!(matches!(result, Err(SimError::DegenerateSignal(_))));
    }

    #[test]
    fn quick_and_quad_differ_on_negative_samples() {
        let series = [3.0, -4.0, 0.0];
        assert_eq!(quick_snr(&series), 3.0);
        assert_eq!(quad_sum(&series), 5.0);
    }

    #[test]
    fn triangle_recovers_rectangle_height_times_root_width() {
        let (h, w) = (3.0, 9);
        let array = rectangle(60, 1, 20, w, h);
        assert_abs_diff_eq!(triangle_snr(array.view()), h * (w as f64).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(triangle_clean(array.view()), h * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn triangle_sums_channels_but_clean_averages() {
        let array = rectangle(30, 4, 10, 4, 1.0);
        assert_abs_diff_eq!(triangle_snr(array.view()), 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(triangle_clean(array.view()), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn triangle_reaches_the_final_sample() {
        assert_eq!(best_window(&[0.0, 0.0, 5.0]), 5.0);
        assert_eq!(best_window(&[]), 0.0);
    }

    #[test]
    fn rolling_box_matches_single_sample_peak() {
        let array = rectangle(16, 2, 6, 3, 2.0);
        // width 1 keeps the raw channel sum
        assert_abs_diff_eq!(rolling_box(array.view()), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn rolling_box_centres_even_widths_like_same_mode() {
        let series = Array2::from_shape_vec((4, 1), vec![0.0, 4.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(rolling_box(series.view()), 4.0, epsilon = 1e-12);
        let flat = Array2::from_shape_vec((3, 1), vec![-1.0, -1.0, -1.0]).unwrap();
        assert_eq!(rolling_box(flat.view()), 0.0);
    }

    #[test]
    fn clipped_fscrunch_zeroes_outliers() {
        let mut values = vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0];
        values.push(50.0);
        let array = Array2::from_shape_vec((8, 1), values).unwrap();
        let clipped = clipped_fscrunch(array.view());
        assert_eq!(clipped[7], 0.0);
        assert_eq!(clipped[1], 2.0);
    }

    #[test]
    fn estimator_names_parse_and_dispatch() {
        let array = rectangle(40, 2, 10, 4, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let flux = Estimator::from_str("l2_flux").unwrap();
        assert_eq!(flux.measure(array.view(), &mut rng).unwrap(), 4.0);
        assert!(Estimator::from_str("l2_snr").unwrap().is_stochastic());
        assert!(Estimator::from_str("median").is_err());
    }
}
