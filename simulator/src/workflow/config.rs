use anyhow::Context;
use clap::{Args, ValueEnum};
use pulsecore::measurement::NoiseLevel;
use pulsecore::model::PulseShape;
use pulsecore::processing::{PulseTrain, SpectraConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How injected bursts are normalised before scaling by the amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnMode {
    /// Divide by the L2 flux, so the amplitude sets the fluence.
    Fluence,
    /// Divide by the clean L2 S/N, so the amplitude sets the S/N.
    Snr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct PeriodicConfig {
    /// Dispersion measure (pc cm^-3)
    #[arg(long)]
    pub dm: f64,
    /// Spin period (s)
    #[arg(long)]
    pub period: f64,
    /// Period derivative (s/s)
    #[arg(long, default_value_t = 0.0)]
    pub pdot: f64,
    /// Intrinsic pulse width sigma (ms)
    #[arg(long)]
    pub width: f64,
    /// Target integrated S/N (clean L2)
    #[arg(long)]
    pub snr: f64,
    #[arg(long, default_value_t = 100)]
    pub npulses: usize,
    /// Top-of-band channel centre frequency (MHz)
    #[arg(long, default_value_t = 190.0)]
    pub fch1: f64,
    /// Channel bandwidth (MHz)
    #[arg(long, default_value_t = -0.02435, allow_hyphen_values = true)]
    pub bwchan: f64,
    #[arg(long, default_value_t = 3296)]
    pub nchan: usize,
    /// Time resolution (ms)
    #[arg(long, default_value_t = 0.655)]
    pub tsamp: f64,
    #[arg(long, default_value_t = 10)]
    pub tbin: usize,
    #[arg(long, default_value_t = 10)]
    pub fbin: usize,
    #[arg(long, default_value_t = 18.0)]
    pub noise_std: f64,
    #[arg(long, default_value_t = 127.0)]
    pub noise_base: f64,
    /// Output basename, `.fil` is appended
    #[arg(short, long, default_value = "simperiodic")]
    pub output: PathBuf,
    /// Seed for the noise generator; random when absent
    #[arg(long)]
    pub seed: Option<u64>,
    /// Append a one-line summary of the run to this file
    #[arg(long)]
    pub log: Option<PathBuf>,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            dm: 0.0,
            period: 1.0,
            pdot: 0.0,
            width: 1.0,
            snr: 10.0,
            npulses: 100,
            fch1: 190.0,
            bwchan: -0.02435,
            nchan: 3296,
            tsamp: 0.655,
            tbin: 10,
            fbin: 10,
            noise_std: 18.0,
            noise_base: 127.0,
            output: PathBuf::from("simperiodic"),
            seed: None,
            log: None,
        }
    }
}

impl PeriodicConfig {
    pub fn spectra_config(&self) -> SpectraConfig {
        SpectraConfig {
            fch1: self.fch1,
            nchan: self.nchan,
            bwchan: self.bwchan,
            tsamp: self.tsamp,
            tbin: self.tbin,
            fbin: self.fbin,
            ..Default::default()
        }
    }

    pub fn train(&self) -> PulseTrain {
        PulseTrain {
            period: self.period,
            pdot: self.pdot,
            npulses: self.npulses,
            width: self.width,
            amplitude: 1.0,
            dm: self.dm,
            t0: 0.0,
        }
    }

    pub fn noise(&self) -> NoiseLevel {
        NoiseLevel::new(self.noise_std, self.noise_base)
    }

    pub fn filterbank_path(&self) -> PathBuf {
        with_suffix(&self.output, ".fil")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct BurstConfig {
    /// Output file label, no suffix
    #[arg(short, long, default_value = "test")]
    pub label: String,
    /// Directory the files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
    /// Injection mode: single, scat or boxcar
    #[arg(short, long, default_value = "single")]
    pub mode: String,
    /// Scattering timescale at 1 GHz (ms), used by `scat`
    #[arg(long, default_value_t = 0.1)]
    pub tau: f64,
    /// Scattering index, used by `scat`
    #[arg(long, default_value_t = 4.0)]
    pub alpha: f64,
    #[arg(long, value_enum, default_value_t = SnMode::Fluence)]
    pub snmode: SnMode,
    /// Fluence or S/N of each injection, depending on `snmode`
    #[arg(short = 'A', long, default_value_t = 50.0)]
    pub amplitude: f64,
    /// Dispersion measure (pc cm^-3)
    #[arg(long, default_value_t = 100.0)]
    pub dm: f64,
    /// Pulse width sigma (ms)
    #[arg(long, default_value_t = 0.5)]
    pub width: f64,
    /// Samples per injection block
    #[arg(short = 's', long, default_value_t = 20000)]
    pub nsamp: usize,
    /// Number of pulses to inject
    #[arg(short = 'N', long, default_value_t = 50)]
    pub npulse: usize,
    #[arg(long, default_value_t = 1100.0)]
    pub fch1: f64,
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub bwchan: f64,
    #[arg(long, default_value_t = 336)]
    pub nchan: usize,
    /// Time resolution (ms)
    #[arg(long, default_value_t = 1.0)]
    pub tsamp: f64,
    #[arg(short = 't', long, default_value_t = 10)]
    pub tbin: usize,
    #[arg(short = 'f', long, default_value_t = 10)]
    pub fbin: usize,
    #[arg(long, default_value_t = 18.0)]
    pub noise_std: f64,
    #[arg(long, default_value_t = 127.0)]
    pub noise_base: f64,
    /// Seed for noise and offsets; random when absent
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            label: "test".into(),
            out_dir: PathBuf::from("."),
            mode: "single".into(),
            tau: 0.1,
            alpha: 4.0,
            snmode: SnMode::Fluence,
            amplitude: 50.0,
            dm: 100.0,
            width: 0.5,
            nsamp: 20000,
            npulse: 50,
            fch1: 1100.0,
            bwchan: 1.0,
            nchan: 336,
            tsamp: 1.0,
            tbin: 10,
            fbin: 10,
            noise_std: 18.0,
            noise_base: 127.0,
            seed: None,
        }
    }
}

impl BurstConfig {
    pub fn spectra_config(&self) -> SpectraConfig {
        SpectraConfig {
            fch1: self.fch1,
            nchan: self.nchan,
            bwchan: self.bwchan,
            tsamp: self.tsamp,
            tbin: self.tbin,
            fbin: self.fbin,
            ..Default::default()
        }
    }

    pub fn shape(&self) -> anyhow::Result<PulseShape> {
        PulseShape::from_mode(&self.mode, self.tau, self.alpha)
            .with_context(|| format!("parsing injection mode '{}'", self.mode))
    }

    pub fn noise(&self) -> NoiseLevel {
        NoiseLevel::new(self.noise_std, self.noise_base)
    }

    /// `<out_dir>/<label>_<mode>`, the stem shared by the filterbank and the log.
    pub fn stem(&self) -> PathBuf {
        self.out_dir.join(format!("{}_{}", self.label, self.mode))
    }

    /// Arrival time at `fch1` that keeps the sweep inside the block.
    pub fn arrival_time(&self) -> f64 {
        let fraction = if self.bwchan > 0.0 { 0.75 } else { 0.25 };
        self.nsamp as f64 * fraction * self.tsamp
    }
}

/// A workflow file names the driver with `command` and carries its settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorkflowConfig {
    Periodic(PeriodicConfig),
    Burst(BurstConfig),
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }
}

/// Appends `suffix` to the last component of `base`.
pub(crate) fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn periodic_config_maps_onto_core_types() {
        let cfg = PeriodicConfig {
            dm: 30.0,
            period: 0.5,
            output: PathBuf::from("out/psr"),
            ..Default::default()
        };
        let train = cfg.train();
        assert_eq!(train.period, 0.5);
        assert_eq!(train.dm, 30.0);
        assert_eq!(cfg.spectra_config().nchan, 3296);
        assert_eq!(cfg.filterbank_path(), PathBuf::from("out/psr.fil"));
    }

    #[test]
    fn burst_stem_and_arrival_follow_band_sense() {
        let mut cfg = BurstConfig {
            nsamp: 1000,
            out_dir: PathBuf::from("runs"),
            ..Default::default()
        };
        assert_eq!(cfg.stem(), PathBuf::from("runs/test_single"));
        assert_eq!(cfg.arrival_time(), 750.0);
        cfg.bwchan = -1.0;
        assert_eq!(cfg.arrival_time(), 250.0);
        assert_eq!(cfg.shape().unwrap(), PulseShape::Gaussian);
        cfg.mode = "sinc".into();
        assert!(cfg.shape().is_err());
    }

    #[test]
    fn config_load_reads_periodic_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"command: periodic\ndm: 56.7\nperiod: 0.714\nwidth: 2.0\nsnr: 15.0\n")
            .unwrap();
        let path = temp.into_temp_path();
        match WorkflowConfig::load(&path).unwrap() {
            WorkflowConfig::Periodic(cfg) => {
                assert_eq!(cfg.dm, 56.7);
                assert_eq!(cfg.snr, 15.0);
                assert_eq!(cfg.nchan, 3296);
            }
            other => panic!("unexpected workflow {:?}", other),
        }
    }

    #[test]
    fn config_load_reads_burst_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"command: burst\nmode: scat\nsnmode: snr\nnpulse: 3\nbwchan: -1.0\n")
            .unwrap();
        let path = temp.into_temp_path();
        match WorkflowConfig::load(&path).unwrap() {
            WorkflowConfig::Burst(cfg) => {
                assert_eq!(cfg.snmode, SnMode::Snr);
                assert_eq!(cfg.npulse, 3);
                assert_eq!(cfg.bwchan, -1.0);
                assert!(matches!(cfg.shape().unwrap(), PulseShape::Scattered { .. }));
            }
            other => panic!("unexpected workflow {:?}", other),
        }
    }

    #[test]
    fn config_load_reports_the_path() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/workflow.yaml"));
    }
}
