//! Impulse-noise denoising benchmark
//!
//! Loads plain-text PGM images, corrupts copies with salt-and-pepper noise,
//! restores them with a median filter and scores each restoration against
//! the original with MSE, PSNR and SSIM over a grid of noise levels and
//! filter sizes.

pub mod config;
pub mod error;
pub mod metrics;
pub mod processing;
pub mod raster;
pub mod report;
pub mod sweep;

pub use error::DenoiseError;
pub use raster::Raster;
