use ndarray::{Array2, ArrayView2, Axis};

use crate::model::dispersion::dispersion_delay;
use crate::prelude::{ensure_positive, SimError, SimResult};

/// Whole-sample shift that undoes the delay of `freq` at `dm`.
#[inline]
pub fn channel_shift(dm: f64, freq: f64, fch1: f64, tsamp: f64) -> i64 {
    (dispersion_delay(dm, freq, fch1) / tsamp).round() as i64
}

/// Brute-force dedispersion of a `(time, channel)` array.
///
/// Each channel is rolled circularly, so a sweep longer than the array wraps
/// around into the start of the channel. Sub-sample delays are rounded to the
/// nearest sample.
pub fn dedisperse(
    array: ArrayView2<f64>,
    dm: f64,
    freqs: &[f64],
    fch1: f64,
    tsamp: f64,
) -> SimResult<Array2<f64>> {
    ensure_positive("tsamp", tsamp)?;
    if freqs.len() != array.ncols() {
        return Err(SimError::ShapeMismatch {
            expected: format!("{} channels", freqs.len()),
            found: format!("{} channels", array.ncols()),
        });
    }

    let nsamp = array.nrows();
    let mut out = Array2::zeros(array.raw_dim());
    if nsamp == 0 {
        return Ok(out);
    }

    for ((&freq, input), mut output) in freqs
        .iter()
        .zip(array.axis_iter(Axis(1)))
        .zip(out.axis_iter_mut(Axis(1)))
    {
        let shift = channel_shift(dm, freq, fch1, tsamp).rem_euclid(nsamp as i64) as usize;
        for (k, value) in output.iter_mut().enumerate() {
            *value = input[(k + shift) % nsamp];
        }
    }
    Ok(out)
}
