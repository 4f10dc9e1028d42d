//! Per-channel delay and broadening terms.
//!
//! Frequencies are in MHz and are scaled to GHz internally; delays come back
//! in ms.

/// Dispersion constant (ms GHz^2 pc^-1 cm^3 scaled as used by the delay model).
pub const DISPERSION_CONSTANT: f64 = 4148.808;

/// Reference frequency (MHz) for scattering timescales.
pub const DEFAULT_SCATTER_REF_MHZ: f64 = 1000.0;

/// Kolmogorov scattering index.
pub const DEFAULT_SCATTER_INDEX: f64 = 4.0;

/// Dispersive delay of `freq` relative to `freq_ref`.
///
/// Lower frequencies arrive later for positive DM.
#[inline]
pub fn dispersion_delay(dm: f64, freq: f64, freq_ref: f64) -> f64 {
    debug_assert!(freq_ref != 0.0, "reference frequency must be non-zero");
    let v = freq / 1000.0;
    let top = freq_ref / 1000.0;
    DISPERSION_CONSTANT * dm * (v.powi(-2) - top.powi(-2))
}

/// Linear frequency drift; a zero rate is the identity.
#[inline]
pub fn drift_delay(rate: f64, freq: f64, freq_ref: f64) -> f64 {
    rate * (freq - freq_ref) / 1000.0
}

/// Dispersion smearing across a single channel of width `channel_width` (MHz).
pub fn intra_channel_smear(dm: f64, freq: f64, channel_width: f64) -> f64 {
    let v = freq / 1000.0;
    2.0 * DISPERSION_CONSTANT * dm * (channel_width.abs() / 1000.0) / v.powi(3)
}

/// Quadrature sum of the intrinsic width and a smearing term.
#[inline]
pub fn smeared_width(width: f64, smear: f64) -> f64 {
    (smear * smear + width * width).sqrt()
}

pub fn scattering_timescale(tau_ref: f64, freq: f64, alpha: f64, freq_ref: f64) -> f64 {
    tau_ref * (freq / freq_ref).powf(-alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn zero_dm_has_no_delay() {
        for freq in [150.0, 800.0, 1100.0, 1500.0] {
            assert_eq!(dispersion_delay(0.0, freq, 1100.0), 0.0);
        }
    }

    #[test]
    fn reference_frequency_has_no_delay() {
        assert_eq!(dispersion_delay(500.0, 1100.0, 1100.0), 0.0);
        assert_eq!(drift_delay(3.0, 1100.0, 1100.0), 0.0);
    }

    #[test]
    fn delay_matches_closed_form() {
        let expected = 4148.808 * 100.0 * (1.0f64.powi(-2) - 1.1f64.powi(-2));
        assert_abs_diff_eq!(dispersion_delay(100.0, 1000.0, 1100.0), expected, epsilon = 1e-9);
        assert!(dispersion_delay(100.0, 1000.0, 1100.0) > 0.0);
        assert!(dispersion_delay(100.0, 1200.0, 1100.0) < 0.0);
    }

    #[test]
    fn drift_is_linear_in_offset() {
        assert_abs_diff_eq!(drift_delay(2.0, 900.0, 1100.0), -0.4, epsilon = 1e-12);
        assert_eq!(drift_delay(0.0, 900.0, 1100.0), 0.0);
    }

    #[test]
    fn smear_scales_with_dm_and_width() {
        let one = intra_channel_smear(100.0, 1000.0, 1.0);
        assert_relative_eq!(intra_channel_smear(200.0, 1000.0, 1.0), 2.0 * one, max_relative = 1e-12);
        assert_relative_eq!(intra_channel_smear(100.0, 1000.0, -0.5), 0.5 * one, max_relative = 1e-12);
        assert_abs_diff_eq!(smeared_width(4.0, 3.0), 5.0);
    }

    #[test]
    fn scattering_follows_power_law() {
        assert_relative_eq!(scattering_timescale(0.1, 1000.0, 4.0, 1000.0), 0.1, max_relative = 1e-12);
        assert_relative_eq!(scattering_timescale(0.1, 500.0, 4.0, 1000.0), 1.6, max_relative = 1e-12);
    }
}
