use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::io_interface::header::FilterbankHeader;
use crate::measurement::estimators::{l2_clean, l2_flux};
use crate::measurement::noise::{digitise, gaussian_background, NoiseLevel};
use crate::measurement::report::SnrReport;
use crate::model::dispersion::{dispersion_delay, drift_delay};
use crate::model::grid::FrequencyGrid;
use crate::model::shape::TimeAxis;
use crate::prelude::{ensure_positive, PulseParams, SimError, SimResult};
use crate::processing::dedisperse::dedisperse;
use crate::telemetry::log::LogManager;

/// Observation setup shared by every burst generated from one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectraConfig {
    /// First channel frequency (MHz).
    pub fch1: f64,
    pub nchan: usize,
    /// Channel bandwidth (MHz); negative for a descending band.
    pub bwchan: f64,
    /// Sample time (ms).
    pub tsamp: f64,
    pub nbits: u32,
    /// Sub-channels synthesized per output channel.
    pub fbin: usize,
    /// Time oversampling used by fine-grid models.
    pub tbin: usize,
}

impl Default for SpectraConfig {
    fn default() -> Self {
        Self {
            fch1: 1100.0,
            nchan: 336,
            bwchan: 1.0,
            tsamp: 1.0,
            nbits: 8,
            fbin: 10,
            tbin: 10,
        }
    }
}

/// A burst before and after dedispersion at its own DM.
#[derive(Debug, Clone)]
pub struct BurstProducts {
    pub original: Array2<f64>,
    pub dedispersed: Array2<f64>,
    pub params: PulseParams,
}

/// Dynamic-spectrum model: owns the frequency grid and header, and builds
/// dispersed bursts on it.
pub struct Spectra {
    config: SpectraConfig,
    grid: FrequencyGrid,
    header: FilterbankHeader,
    logger: LogManager,
}

impl Spectra {
    pub fn new(config: SpectraConfig) -> SimResult<Self> {
        ensure_positive("tsamp", config.tsamp)?;
        if config.fbin == 0 || config.tbin == 0 {
            return Err(SimError::InvalidParameter(format!(
                "grid resolution must be at least 1, got fbin={} tbin={}",
                config.fbin, config.tbin
            )));
        }
        let grid = FrequencyGrid::split(
            config.nchan,
            0.0,
            config.nchan as f64,
            config.bwchan,
            config.fch1,
        )?;
        let header = FilterbankHeader::new(
            config.fch1,
            config.bwchan,
            config.nchan,
            config.tsamp,
            config.nbits,
        );

        Ok(Self {
            config,
            grid,
            header,
            logger: LogManager::new("pulsecore::spectra"),
        })
    }

    pub fn config(&self) -> &SpectraConfig {
        &self.config
    }

    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn freqs(&self) -> &[f64] {
        self.grid.freqs()
    }

    pub fn header(&self) -> &FilterbankHeader {
        &self.header
    }

    pub fn nchan(&self) -> usize {
        self.config.nchan
    }

    pub fn tsamp(&self) -> f64 {
        self.config.tsamp
    }

    pub fn fch1(&self) -> f64 {
        self.config.fch1
    }

    pub fn time_axis(&self, nsamp: usize) -> TimeAxis {
        TimeAxis::new(nsamp, self.config.tsamp)
    }

    /// Builds the dispersed burst and its dedispersed counterpart.
    pub fn burst(&self, params: &PulseParams, nsamp: usize) -> SimResult<BurstProducts> {
        let original = self.synthesize(params, nsamp)?;
        let dedispersed = self.dedisperse(original.view(), params.dm)?;
        self.logger.record(&format!(
            "burst dm={} width={} mode={} nsamp={} nchan={}",
            params.dm,
            params.width,
            params.shape.name(),
            nsamp,
            self.config.nchan
        ));
        Ok(BurstProducts {
            original,
            dedispersed,
            params: params.clone(),
        })
    }

    /// Dispersed `(nsamp, nchan)` array for `params`, averaged over `fbin`
    /// sub-channels per output channel.
    pub fn synthesize(&self, params: &PulseParams, nsamp: usize) -> SimResult<Array2<f64>> {
        if nsamp == 0 {
            return Err(SimError::InvalidParameter(
                "burst needs at least one sample".into(),
            ));
        }
        let nchan = self.config.nchan;
        let weights = match &params.band_fraction {
            Some(fraction) if fraction.len() == nchan => fraction.clone(),
            Some(fraction) => {
                return Err(SimError::ShapeMismatch {
                    expected: format!("{} band fractions", nchan),
                    found: format!("{} band fractions", fraction.len()),
                })
            }
            None => vec![1.0; nchan],
        };

        let fbin = self.config.fbin;
        let fch1 = self.config.fch1;
        let axis = self.time_axis(nsamp);
        let dm = params.dm + params.dm_offset;
        let fine = self.grid.repeat(fbin);

        let mut out = Array2::zeros((nsamp, nchan));
        for (chan, subbands) in fine.chunks(fbin).enumerate() {
            let profile = |freq: f64| {
                let tstart = params.t0
                    + dispersion_delay(dm, freq, fch1)
                    + drift_delay(params.drift, freq, fch1)
                    + params.offset;
                params
                    .shape
                    .synthesize(&axis, tstart, params.width, params.amplitude, freq)
            };
            let weight = weights[chan];
            // identical sub-channels average to their shared profile
            let column = if subbands.iter().all(|&f| f == subbands[0]) {
                profile(subbands[0])?.mapv(|v| v * weight)
            } else {
                let mut acc = Array1::<f64>::zeros(nsamp);
                for &freq in subbands {
                    acc += &profile(freq)?;
                }
                let scale = weight / fbin as f64;
                acc.mapv(|v| v * scale)
            };
            out.column_mut(chan).assign(&column);
        }

        self.logger.detail(&format!(
            "synthesized {} sub-channels over {} samples",
            fine.len(),
            nsamp
        ));
        Ok(out)
    }

    pub fn dedisperse(&self, array: ArrayView2<f64>, dm: f64) -> SimResult<Array2<f64>> {
        dedisperse(
            array,
            dm,
            self.grid.freqs(),
            self.config.fch1,
            self.config.tsamp,
        )
    }

    /// `dm;width;fwhm;snr` summary of the dedispersed burst (L2 clean SNR).
    pub fn snr_report(&self, products: &BurstProducts) -> SnrReport {
        SnrReport::new(
            products.params.dm,
            products.params.width,
            l2_clean(products.dedispersed.view()),
        )
    }

    pub fn flux(&self, products: &BurstProducts) -> f64 {
        l2_flux(products.dedispersed.view())
    }

    /// Scales `array` to the noise level, adds background and digitises it.
    pub fn inject<R: Rng + ?Sized>(
        &self,
        array: ArrayView2<f64>,
        noise: NoiseLevel,
        rng: &mut R,
    ) -> SimResult<Array2<u8>> {
        if array.ncols() != self.config.nchan {
            return Err(SimError::ShapeMismatch {
                expected: format!("{} channels", self.config.nchan),
                found: format!("{} channels", array.ncols()),
            });
        }
        let scale = noise.std / (array.nrows() as f64).sqrt();
        let mut imprint = gaussian_background(array.dim(), noise, rng)?;
        imprint.zip_mut_with(&array, |bkg, &signal| *bkg += signal * scale);
        Ok(digitise(imprint.view()))
    }
}
