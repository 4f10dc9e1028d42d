//! Dispersed radio-transient simulation for exercising pulsar and FRB search
//! pipelines.
//!
//! `model` holds the per-channel physics (dispersion, drift, scattering and
//! the pulse profiles), `processing` builds dynamic spectra and pulse trains
//! and undoes dispersion, and `measurement` turns a dedispersed array into an
//! SNR or flux figure. Serialisation is left to a [`io_interface::BlockSink`].

pub mod io_interface;
pub mod math;
pub mod measurement;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{PulseParams, SimError, SimResult};
pub use processing::{BurstProducts, FineGrid, PulseTrain, Spectra, SpectraConfig};
