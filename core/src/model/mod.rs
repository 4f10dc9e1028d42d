pub mod dispersion;
pub mod grid;
pub mod shape;

pub use dispersion::{
    dispersion_delay, drift_delay, intra_channel_smear, scattering_timescale, smeared_width,
};
pub use grid::FrequencyGrid;
pub use shape::{PulseShape, TimeAxis, TimeSeries};
