use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::prelude::{SimError, SimResult};

/// White-noise background level of a digitised dynamic spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLevel {
    pub std: f64,
    pub base: f64,
}

impl Default for NoiseLevel {
    fn default() -> Self {
        Self {
            std: 18.0,
            base: 127.0,
        }
    }
}

impl NoiseLevel {
    pub fn new(std: f64, base: f64) -> Self {
        Self { std, base }
    }

    /// Per-channel std that gives unit-variance noise after summing `nchan` channels.
    pub fn normalised(nchan: usize, base: f64) -> Self {
        Self {
            std: (nchan as f64).sqrt(),
            base,
        }
    }

    fn distribution(&self) -> SimResult<Normal<f64>> {
        Normal::new(self.base, self.std).map_err(|err| {
            SimError::InvalidParameter(format!("noise std {} rejected: {}", self.std, err))
        })
    }
}

/// Gaussian background of the given `(nsamp, nchan)` shape.
pub fn gaussian_background<R: Rng + ?Sized>(
    shape: (usize, usize),
    noise: NoiseLevel,
    rng: &mut R,
) -> SimResult<Array2<f64>> {
    let dist = noise.distribution()?;
    Ok(Array2::from_shape_simple_fn(shape, || dist.sample(rng)))
}

/// Returns `array` plus a fresh Gaussian background.
pub fn add_noise<R: Rng + ?Sized>(
    array: ArrayView2<f64>,
    noise: NoiseLevel,
    rng: &mut R,
) -> SimResult<Array2<f64>> {
    let mut out = gaussian_background(array.dim(), noise, rng)?;
    out += &array;
    Ok(out)
}

/// Converts intensities to 8-bit counts, saturating at the ends of the range.
pub fn digitise(array: ArrayView2<f64>) -> Array2<u8> {
    // `as` saturates and maps NaN to zero
    array.mapv(|v| v as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::StatsHelper;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn background_matches_requested_level() {
        let mut rng = StdRng::seed_from_u64(7);
        let bkg = gaussian_background((400, 50), NoiseLevel::default(), &mut rng).unwrap();
        let samples: Vec<f64> = bkg.iter().cloned().collect();
        let mean = StatsHelper::mean(&samples);
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert_abs_diff_eq!(mean, 127.0, epsilon = 0.2);
        assert_abs_diff_eq!(var.sqrt(), 18.0, epsilon = 0.3);
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let signal = Array2::<f64>::ones((8, 4));
        let a = add_noise(signal.view(), NoiseLevel::default(), &mut StdRng::seed_from_u64(3)).unwrap();
        let b = add_noise(signal.view(), NoiseLevel::default(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_std_is_invalid() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = gaussian_background((2, 2), NoiseLevel::new(-1.0, 0.0), &mut rng);
        assert!(matches!(result, Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn digitise_saturates() {
        let values = Array2::from_shape_vec((1, 4), vec![-5.0, 12.7, 300.0, f64::NAN]).unwrap();
        assert_eq!(digitise(values.view()).into_raw_vec(), vec![0, 12, 255, 0]);
    }

    #[test]
    fn normalised_noise_uses_sqrt_nchan() {
        assert_eq!(NoiseLevel::normalised(336, 127.0).std, 336f64.sqrt());
    }
}
