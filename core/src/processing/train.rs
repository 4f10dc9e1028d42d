use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::measurement::estimators::l2_clean;
use crate::model::dispersion::dispersion_delay;
use crate::model::shape::gaussian;
use crate::prelude::{ensure_positive, SimError, SimResult};
use crate::processing::spectra::Spectra;
use crate::telemetry::log::LogManager;

/// `exp(-z^2 / 2)` underflows to exactly zero beyond this many sigma.
const GAUSSIAN_REACH_SIGMA: f64 = 40.0;

const LOGGER: LogManager = LogManager::new("pulsecore::train");

/// Periodic pulse train with a constant period derivative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseTrain {
    /// Spin period (s).
    pub period: f64,
    /// Period derivative (s/s).
    pub pdot: f64,
    pub npulses: usize,
    /// Gaussian sigma (ms).
    pub width: f64,
    pub amplitude: f64,
    pub dm: f64,
    /// Arrival time of the first pulse at the reference frequency (ms).
    pub t0: f64,
}

impl Default for PulseTrain {
    fn default() -> Self {
        Self {
            period: 1.0,
            pdot: 0.0,
            npulses: 100,
            width: 1.0,
            amplitude: 1.0,
            dm: 0.0,
            t0: 0.0,
        }
    }
}

/// Train array after scaling to a target SNR.
#[derive(Debug, Clone)]
pub struct TrainProducts {
    pub burst: Array2<f64>,
    pub baseline_snr: f64,
    pub scale: f64,
}

impl PulseTrain {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive("period", self.period)?;
        ensure_positive("pulse width", self.width)?;
        if self.npulses == 0 {
            return Err(SimError::InvalidParameter(
                "pulse train needs at least one pulse".into(),
            ));
        }
        Ok(())
    }

    /// Emission times (ms): `t_n = n P + n (n - 1) Pdot / 2`, evaluated in seconds.
    pub fn emission_times(&self) -> Vec<f64> {
        (0..self.npulses)
            .map(|n| {
                let n = n as f64;
                (n * self.period + 0.5 * n * (n - 1.0) * self.pdot) * 1000.0
            })
            .collect()
    }

    /// Samples needed to hold every pulse plus two periods of padding.
    pub fn required_samples(&self, tsamp: f64) -> usize {
        let last = self.emission_times().last().copied().unwrap_or(0.0);
        let total_ms = last + 2.0 * self.period * 1000.0;
        (total_ms / tsamp) as usize + 1
    }

    /// Noiseless `(nsamp, nchan)` array with every pulse added in place.
    pub fn accumulate(&self, spectra: &Spectra, nsamp: usize) -> SimResult<Array2<f64>> {
        self.validate()?;
        let axis = spectra.time_axis(nsamp);
        let fch1 = spectra.fch1();
        let reach = GAUSSIAN_REACH_SIGMA * self.width;

        let mut out = Array2::zeros((nsamp, spectra.nchan()));
        for (n, t_emit) in self.emission_times().into_iter().enumerate() {
            for (chan, &freq) in spectra.freqs().iter().enumerate() {
                let arrival = self.t0 + t_emit + dispersion_delay(self.dm, freq, fch1);
                let first = ((arrival - reach) / axis.tsamp).ceil().max(0.0) as usize;
                let last = (((arrival + reach) / axis.tsamp).floor() + 1.0)
                    .clamp(0.0, nsamp as f64) as usize;
                let mut column = out.column_mut(chan);
                for k in first..last {
                    column[k] += gaussian(axis.time(k), arrival, self.width) * self.amplitude;
                }
            }
            LOGGER.detail(&format!("injected pulse {} at {:.3} ms", n, t_emit));
        }
        Ok(out)
    }

    /// Multiplies `burst` so that its L2 clean SNR equals `target`; returns the factor.
    pub fn scale_to_snr(burst: &mut Array2<f64>, target: f64) -> SimResult<f64> {
        let measured = l2_clean(burst.view());
        if measured == 0.0 {
            return Err(SimError::DegenerateSignal(
                "clean S/N is zero; check amplitude, width and DM".into(),
            ));
        }
        let factor = target / measured;
        burst.mapv_inplace(|v| v * factor);
        Ok(factor)
    }

    pub fn generate(&self, spectra: &Spectra, nsamp: usize, target_snr: f64) -> SimResult<TrainProducts> {
        let mut burst = self.accumulate(spectra, nsamp)?;
        let baseline_snr = l2_clean(burst.view());
        let scale = Self::scale_to_snr(&mut burst, target_snr)?;
        LOGGER.record(&format!(
            "train of {} pulses: clean S/N {:.2}, scaled by {:.3}",
            self.npulses, baseline_snr, scale
        ));
        Ok(TrainProducts {
            burst,
            baseline_snr,
            scale,
        })
    }
}
