pub mod dedisperse;
pub mod fine_grid;
pub mod spectra;
pub mod train;

pub use dedisperse::{channel_shift, dedisperse};
pub use fine_grid::{FineGrid, FineGridConfig, FinePulse};
pub use spectra::{BurstProducts, Spectra, SpectraConfig};
pub use train::{PulseTrain, TrainProducts};
