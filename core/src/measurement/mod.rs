pub mod estimators;
pub mod noise;
pub mod report;

pub use estimators::{
    clipped_fscrunch, l2_clean, l2_flux, l2_snr, quad_sum, quick_snr, rolling_box, triangle_clean,
    triangle_snr, Estimator,
};
pub use noise::{add_noise, digitise, gaussian_background, NoiseLevel};
pub use report::SnrReport;
