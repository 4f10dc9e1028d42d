use serde::{Deserialize, Serialize};

/// Telescope identifier written into every simulated header.
pub const SIMULATED_TELESCOPE_ID: i32 = 6;

/// Named header parameters handed to a filterbank writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterbankHeader {
    pub telescope_id: i32,
    /// First channel frequency (MHz).
    pub fch1: f64,
    /// Channel offset (MHz), negative for a descending band.
    pub foff: f64,
    pub nchans: usize,
    /// Sample time (s).
    pub tsamp: f64,
    pub nbits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsamples: Option<usize>,
}

impl FilterbankHeader {
    /// Header for a band of `nchans` channels of width `bwchan` MHz sampled every `tsamp_ms`.
    pub fn new(fch1: f64, bwchan: f64, nchans: usize, tsamp_ms: f64, nbits: u32) -> Self {
        Self {
            telescope_id: SIMULATED_TELESCOPE_ID,
            fch1,
            foff: -bwchan,
            nchans,
            tsamp: tsamp_ms / 1000.0,
            nbits,
            nsamples: None,
        }
    }

    pub fn with_nsamples(mut self, nsamples: usize) -> Self {
        self.nsamples = Some(nsamples);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_converts_units_and_flips_offset() {
        let header = FilterbankHeader::new(1100.0, 1.0, 336, 1.0, 8).with_nsamples(500);
        assert_eq!(header.telescope_id, 6);
        assert_eq!(header.foff, -1.0);
        assert_eq!(header.tsamp, 0.001);
        assert_eq!(header.nsamples, Some(500));
    }
}
