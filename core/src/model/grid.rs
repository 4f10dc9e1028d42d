use serde::{Deserialize, Serialize};

use crate::prelude::{SimError, SimResult};

/// Channel centre frequencies (MHz) and the channel-index boundaries of each entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    freqs: Vec<f64>,
    chan_idx: Vec<i64>,
}

impl FrequencyGrid {
    /// Splits channels `skip..end` of a band starting at `fch1` into `n` equal subbands.
    pub fn split(n: usize, skip: f64, end: f64, bwchan: f64, fch1: f64) -> SimResult<Self> {
        if n == 0 {
            return Err(SimError::InvalidParameter(
                "frequency grid needs at least one channel".into(),
            ));
        }
        if bwchan == 0.0 || !bwchan.is_finite() {
            return Err(SimError::InvalidParameter(format!(
                "channel bandwidth must be non-zero, got {}",
                bwchan
            )));
        }
        if !fch1.is_finite() || fch1 <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "first channel frequency must be positive, got {} MHz",
                fch1
            )));
        }
        if end <= skip {
            return Err(SimError::InvalidParameter(format!(
                "channel range {}..{} is empty",
                skip, end
            )));
        }

        let dw = (end - skip) / n as f64;
        let base = fch1 + skip * bwchan;
        let freqs: Vec<f64> = (0..n)
            .map(|k| base + (k as f64 + 0.5) * dw * bwchan)
            .collect();
        if let Some(bad) = freqs.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(SimError::InvalidParameter(format!(
                "frequency grid reaches non-positive frequency {} MHz",
                bad
            )));
        }

        let mut chan_idx: Vec<i64> = (0..n).map(|k| (k as f64 * dw + skip) as i64).collect();
        chan_idx.push(end as i64);

        Ok(Self { freqs, chan_idx })
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn chan_idx(&self) -> &[i64] {
        &self.chan_idx
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Every frequency repeated `fbin` times, for sub-channel synthesis.
    pub fn repeat(&self, fbin: usize) -> Vec<f64> {
        self.freqs
            .iter()
            .flat_map(|&f| std::iter::repeat(f).take(fbin))
            .collect()
    }
}
