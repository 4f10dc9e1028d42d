use crate::output::FilterbankWriter;
use crate::workflow::config::{with_suffix, BurstConfig, PeriodicConfig, SnMode, WorkflowConfig};
use anyhow::Context;
use log::info;
use pulsecore::io_interface::BlockSink;
use pulsecore::measurement::{add_noise, digitise, l2_snr, NoiseLevel, SnrReport};
use pulsecore::prelude::{PulseParams, SimError};
use pulsecore::processing::Spectra;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Channel amplitude the template burst is built with before normalisation.
const TEMPLATE_AMPLITUDE: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct PeriodicSummary {
    pub filterbank: PathBuf,
    pub nsamp: usize,
    pub baseline_snr: f64,
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct BurstSummary {
    pub filterbank: PathBuf,
    pub report: PathBuf,
    pub template: SnrReport,
    pub offset: f64,
    pub injections: usize,
    pub samples_written: usize,
}

#[derive(Debug, Clone)]
pub enum WorkflowResult {
    Periodic(PeriodicSummary),
    Burst(BurstSummary),
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        match &self.config {
            WorkflowConfig::Periodic(cfg) => run_periodic(cfg).map(WorkflowResult::Periodic),
            WorkflowConfig::Burst(cfg) => run_burst(cfg).map(WorkflowResult::Burst),
        }
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Writes one filterbank holding a pulse train scaled to the target S/N.
pub fn run_periodic(cfg: &PeriodicConfig) -> anyhow::Result<PeriodicSummary> {
    let spectra = Spectra::new(cfg.spectra_config()).context("building the frequency grid")?;
    let train = cfg.train();
    train.validate().context("validating the pulse train")?;
    let nsamp = train.required_samples(cfg.tsamp);
    info!(
        "periodic: dm={} P={} s Pdot={} width={} ms npulses={} target S/N={}",
        cfg.dm, cfg.period, cfg.pdot, cfg.width, cfg.npulses, cfg.snr
    );
    info!(
        "periodic: {:.2} s over {} samples at {} ms",
        nsamp as f64 * cfg.tsamp / 1000.0,
        nsamp,
        cfg.tsamp
    );

    let products = train
        .generate(&spectra, nsamp, cfg.snr)
        .context("injecting the pulse train")?;
    let mut rng = rng_from(cfg.seed);
    let noisy = add_noise(products.burst.view(), cfg.noise(), &mut rng)
        .context("adding background noise")?;

    let filterbank = cfg.filterbank_path();
    let header = spectra.header().clone().with_nsamples(nsamp);
    let mut writer = FilterbankWriter::open(&filterbank, &header)
        .with_context(|| format!("creating {}", filterbank.display()))?;
    writer
        .write_block(digitise(noisy.view()).view())
        .with_context(|| format!("writing {}", filterbank.display()))?;
    writer.close()?;
    info!("periodic: wrote {}", filterbank.display());

    if let Some(log_path) = &cfg.log {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("opening run log {}", log_path.display()))?;
        writeln!(
            file,
            "{};{};{};{};{};{};{};{};{}",
            filterbank.display(),
            cfg.dm,
            cfg.period,
            cfg.pdot,
            cfg.width,
            cfg.snr,
            cfg.npulses,
            products.baseline_snr,
            products.scale
        )?;
    }

    Ok(PeriodicSummary {
        filterbank,
        nsamp,
        baseline_snr: products.baseline_snr,
        scale: products.scale,
    })
}

/// Writes `npulse` injections of one burst between blocks of noise, logging
/// `dm;width;fwhm;snr;noisy_snr;offset` per injection.
pub fn run_burst(cfg: &BurstConfig) -> anyhow::Result<BurstSummary> {
    let spectra = Spectra::new(cfg.spectra_config()).context("building the frequency grid")?;
    let shape = cfg.shape()?;
    let noise = cfg.noise();
    let mut rng = rng_from(cfg.seed);

    let tstart = cfg.arrival_time();
    let offset = rng.gen::<f64>() - 0.5;
    info!(
        "burst: tstart={} ms bwchan={} mode={} snmode={:?}",
        tstart, cfg.bwchan, cfg.mode, cfg.snmode
    );

    let params = PulseParams::new(tstart, cfg.dm, cfg.width, TEMPLATE_AMPLITUDE)
        .with_shape(shape)
        .with_offset(offset);
    let products = spectra
        .burst(&params, cfg.nsamp)
        .context("synthesizing the burst template")?;
    let template = spectra.snr_report(&products);
    let norm = match cfg.snmode {
        SnMode::Fluence => spectra.flux(&products),
        SnMode::Snr => template.snr,
    };
    if norm == 0.0 || template.snr == 0.0 {
        return Err(SimError::DegenerateSignal(format!(
            "burst at dm={} width={} has no signal inside {} samples",
            cfg.dm, cfg.width, cfg.nsamp
        ))
        .into());
    }
    let scaled = products.original.mapv(|v| v / norm * cfg.amplitude);
    let reference = products
        .dedispersed
        .mapv(|v| v / template.snr * TEMPLATE_AMPLITUDE);

    let stem = cfg.stem();
    let filterbank = with_suffix(&stem, ".fil");
    let report = with_suffix(&stem, ".txt");
    let mut lines = BufWriter::new(
        File::create(&report).with_context(|| format!("creating {}", report.display()))?,
    );
    let mut writer = FilterbankWriter::open(&filterbank, spectra.header())
        .with_context(|| format!("creating {}", filterbank.display()))?;
    writer.write_noise(2 * cfg.nsamp, noise, &mut rng)?;

    for n in 0..cfg.npulse {
        writer.write_noise(cfg.nsamp, noise, &mut rng)?;
        let block = spectra
            .inject(scaled.view(), noise, &mut rng)
            .with_context(|| format!("injecting pulse {}", n))?;
        writer.write_block(block.view())?;
        let noisy_snr = l2_snr(reference.view(), NoiseLevel::default(), &mut rng)?;
        writeln!(lines, "{};{};{}", template, noisy_snr, offset)?;
        writer.write_noise(cfg.nsamp, noise, &mut rng)?;
    }
    writer.write_noise(cfg.nsamp, noise, &mut rng)?;
    writer.close()?;
    lines.flush()?;
    info!(
        "burst: wrote {} injections to {}",
        cfg.npulse,
        writer.path().display()
    );

    Ok(BurstSummary {
        filterbank,
        report,
        template,
        offset,
        injections: cfg.npulse,
        samples_written: writer.samples_written(),
    })
}
