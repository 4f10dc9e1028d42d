use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::dispersion::{
    dispersion_delay, drift_delay, intra_channel_smear, scattering_timescale, smeared_width,
    DEFAULT_SCATTER_REF_MHZ,
};
use crate::model::grid::FrequencyGrid;
use crate::model::shape::{PulseShape, TimeSeries};
use crate::prelude::{ensure_positive, SimError, SimResult};
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineGridConfig {
    pub fch1: f64,
    pub bwchan: f64,
    pub nchan: usize,
    pub tsamp: f64,
    pub nsamp: usize,
    /// Time oversampling factor.
    pub tbin: usize,
    /// Sub-channels per output channel.
    pub fbin: usize,
}

impl Default for FineGridConfig {
    fn default() -> Self {
        Self {
            fch1: 1000.0,
            bwchan: 1.0,
            nchan: 336,
            tsamp: 1.0,
            nsamp: 1000,
            tbin: 10,
            fbin: 10,
        }
    }
}

/// Parameters of one pulse on the fine grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinePulse {
    pub t0: f64,
    pub width: f64,
    pub amplitude: f64,
    pub dm: f64,
    /// DM mismatch, applied across the whole band from `fch1`.
    pub dm_error: f64,
    pub drift: f64,
    pub shape: PulseShape,
}

impl Default for FinePulse {
    fn default() -> Self {
        Self {
            t0: 100.0,
            width: 1.0,
            amplitude: 1.0,
            dm: 0.0,
            dm_error: 0.0,
            drift: 0.0,
            shape: PulseShape::Gaussian,
        }
    }
}

/// High resolution model: every output sample is averaged from `tbin` time
/// bins and every output channel from `fbin` sub-channels at their true
/// frequencies. The DM term is applied within each channel only, so the
/// result is the residual smearing left after ideal channel-level
/// dedispersion, plus whatever `dm_error` and drift add across the band.
#[derive(Debug, Clone)]
pub struct FineGrid {
    config: FineGridConfig,
    series: TimeSeries,
    coarse: FrequencyGrid,
    fine: FrequencyGrid,
    logger: LogManager,
}

impl FineGrid {
    pub fn new(config: FineGridConfig) -> SimResult<Self> {
        if config.nchan == 0 || config.fbin == 0 {
            return Err(SimError::InvalidParameter(format!(
                "fine grid needs channels and sub-channels, got nchan={} fbin={}",
                config.nchan, config.fbin
            )));
        }
        let series = TimeSeries::new(config.tsamp, config.nsamp, config.tbin)?;
        let n = config.nchan as f64;
        let coarse = FrequencyGrid::split(config.nchan, 0.0, n, config.bwchan, config.fch1)?;
        let nfine = config.nchan * config.fbin;
        let fine = FrequencyGrid::split(
            nfine,
            0.0,
            nfine as f64,
            config.bwchan / config.fbin as f64,
            config.fch1 - config.bwchan * 0.5,
        )?;

        Ok(Self {
            config,
            series,
            coarse,
            fine,
            logger: LogManager::new("pulsecore::fine_grid"),
        })
    }

    pub fn config(&self) -> &FineGridConfig {
        &self.config
    }

    pub fn coarse_freqs(&self) -> &[f64] {
        self.coarse.freqs()
    }

    pub fn fine_freqs(&self) -> &[f64] {
        self.fine.freqs()
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Synthesizes `pulse` into an `(nsamp, nchan)` array.
    pub fn pulse(&self, pulse: &FinePulse) -> SimResult<Array2<f64>> {
        ensure_positive("pulse width", pulse.width)?;
        if matches!(pulse.shape, PulseShape::Boxcar) {
            return Err(SimError::InvalidParameter(
                "boxcar pulses are not supported on the fine grid".into(),
            ));
        }

        let FineGridConfig {
            fch1,
            bwchan,
            nchan,
            nsamp,
            fbin,
            ..
        } = self.config;
        let sub_width = bwchan / fbin as f64;
        let mut fine = Array2::zeros((nsamp, nchan * fbin));

        for (group, mut block) in self
            .fine
            .freqs()
            .chunks(fbin)
            .zip(fine.axis_chunks_iter_mut(Axis(1), fbin))
        {
            let top = group[0];
            for (&freq, mut column) in group.iter().zip(block.axis_iter_mut(Axis(1))) {
                let tstart = pulse.t0
                    + dispersion_delay(pulse.dm, freq, top)
                    + dispersion_delay(pulse.dm_error, freq, fch1)
                    + drift_delay(pulse.drift, freq, fch1);
                let smear = intra_channel_smear(pulse.dm + pulse.dm_error, freq, sub_width);
                let width = smeared_width(pulse.width, smear);

                let profile = match pulse.shape {
                    PulseShape::Scattered { tau, alpha } => {
                        let tscat = scattering_timescale(tau, freq, alpha, DEFAULT_SCATTER_REF_MHZ);
                        self.series.scattered(tstart, width, pulse.amplitude, tscat)?
                    }
                    _ => self.series.pulse(tstart, width, pulse.amplitude)?,
                };
                column.assign(&profile);
            }
        }

        let out = fine
            .into_shape((nsamp, nchan, fbin))
            .map_err(|err| SimError::ShapeMismatch {
                expected: format!("({}, {}, {})", nsamp, nchan, fbin),
                found: err.to_string(),
            })?
            .mean_axis(Axis(2))
            .ok_or_else(|| SimError::InvalidParameter("no sub-channels to average".into()))?;

        self.logger.record(&format!(
            "{} pulse t0={:.3} width={:.3} dm={:.3} dm_error={:.3} on {}x{} fine grid",
            pulse.shape.name(),
            pulse.t0,
            pulse.width,
            pulse.dm,
            pulse.dm_error,
            nsamp,
            nchan * fbin
        ));
        Ok(out)
    }
}
