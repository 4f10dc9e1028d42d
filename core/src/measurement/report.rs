use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratio between a Gaussian's FWHM and its sigma.
pub fn fwhm_factor() -> f64 {
    (8.0 * 2f64.ln()).sqrt()
}

/// One measured injection, written as `dm;width;fwhm;snr`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrReport {
    pub dm: f64,
    pub width: f64,
    pub fwhm: f64,
    pub snr: f64,
}

impl SnrReport {
    pub fn new(dm: f64, width: f64, snr: f64) -> Self {
        Self {
            dm,
            width,
            fwhm: fwhm_factor() * width,
            snr,
        }
    }
}

impl fmt::Display for SnrReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{};{}", self.dm, self.width, self.fwhm, self.snr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn report_line_is_semicolon_separated() {
        let report = SnrReport::new(100.0, 2.0, 12.5);
        assert_abs_diff_eq!(report.fwhm, 4.709640090061899, epsilon = 1e-12);
        let line = report.to_string();
        assert!(line.starts_with("100;2;4.7096"));
        assert!(line.ends_with(";12.5"));
        assert_eq!(line.split(';').count(), 4);
    }
}
