//! Fidelity metrics between a reference raster and a restored one
//!
//! SSIM here is the whole-image variant: one window spanning the full
//! raster, with unbiased (N-1) variance and covariance.

use crate::error::DenoiseError;
use crate::raster::Raster;
use serde::Serialize;

/// Peak sample value assumed by PSNR
pub const PEAK: f64 = 255.0;

/// SSIM stabilizers for an 8-bit dynamic range: (0.01 * 255)^2 and (0.03 * 255)^2
pub const SSIM_C1: f64 = 6.5025;
pub const SSIM_C2: f64 = 58.5225;

/// MSE at or below this is treated as a perfect reconstruction
const MSE_EPSILON: f64 = 1e-10;

/// All three scores for one reference/test pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fidelity {
    pub mse: f64,
    pub psnr: f64,
    pub ssim: f64,
}

/// Score `test` against `reference`, computing MSE only once
pub fn evaluate(reference: &Raster, test: &Raster) -> Result<Fidelity, DenoiseError> {
    let mse = mse(reference, test)?;
    Ok(Fidelity {
        mse,
        psnr: psnr_from_mse(mse),
        ssim: ssim(reference, test)?,
    })
}

/// Mean squared error over all pixels
pub fn mse(a: &Raster, b: &Raster) -> Result<f64, DenoiseError> {
    ensure_comparable(a, b)?;

    let sum: f64 = samples(a)
        .zip(samples(b))
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum();

    Ok(sum / pixel_count(a))
}

/// Peak signal-to-noise ratio in dB; identical rasters give `+inf`
pub fn psnr(a: &Raster, b: &Raster) -> Result<f64, DenoiseError> {
    mse(a, b).map(psnr_from_mse)
}

pub fn psnr_from_mse(mse: f64) -> f64 {
    if mse <= MSE_EPSILON {
        return f64::INFINITY;
    }
    10.0 * (PEAK * PEAK / mse).log10()
}

/// Global structural similarity
pub fn ssim(a: &Raster, b: &Raster) -> Result<f64, DenoiseError> {
    ensure_comparable(a, b)?;

    let n = pixel_count(a);
    let mu1 = samples(a).sum::<f64>() / n;
    let mu2 = samples(b).sum::<f64>() / n;

    let (mut var1, mut var2, mut cov) = (0.0, 0.0, 0.0);
    for (x, y) in samples(a).zip(samples(b)) {
        let d1 = x - mu1;
        let d2 = y - mu2;
        var1 += d1 * d1;
        var2 += d2 * d2;
        cov += d1 * d2;
    }

    // A single pixel has no spread; keep the divisor at least 1
    let divisor = (n - 1.0).max(1.0);
    var1 /= divisor;
    var2 /= divisor;
    cov /= divisor;

    let numerator = (2.0 * mu1 * mu2 + SSIM_C1) * (2.0 * cov + SSIM_C2);
    let denominator = (mu1 * mu1 + mu2 * mu2 + SSIM_C1) * (var1 + var2 + SSIM_C2);

    if denominator == 0.0 {
        return Ok(1.0);
    }
    Ok(numerator / denominator)
}

fn ensure_comparable(a: &Raster, b: &Raster) -> Result<(), DenoiseError> {
    if !a.is_valid() || !b.is_valid() {
        return Err(DenoiseError::InvalidRaster);
    }
    if a.dimensions() != b.dimensions() {
        return Err(DenoiseError::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }
    Ok(())
}

fn samples(raster: &Raster) -> impl Iterator<Item = f64> + '_ {
    raster.samples().as_raw().iter().map(|&v| f64::from(v))
}

fn pixel_count(raster: &Raster) -> f64 {
    raster.width() as f64 * raster.height() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::stats::{peak_signal_to_noise_ratio, root_mean_squared_error};

    fn gradient(width: u32, height: u32) -> Raster {
        Raster::from_fn(width, height, 255, |x, y| ((x * 37 + y * 11) % 256) as u16)
    }

    fn to_gray8(raster: &Raster) -> GrayImage {
        GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
            Luma([raster.get_pixel(x as i64, y as i64) as u8])
        })
    }

    #[test]
    fn test_mse_of_identical_rasters_is_zero() {
        let a = gradient(9, 7);
        assert_eq!(mse(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_mse_is_symmetric() {
        let a = gradient(9, 7);
        let b = Raster::from_fn(9, 7, 255, |x, y| ((x * 5 + y * 3) % 256) as u16);
        assert_eq!(mse(&a, &b).unwrap(), mse(&b, &a).unwrap());
    }

    #[test]
    fn test_constant_offset_of_ten() {
        let a = Raster::from_fn(4, 4, 255, |x, y| (x * 20 + y * 3) as u16);
        let b = Raster::from_fn(4, 4, 255, |x, y| (x * 20 + y * 3 + 10) as u16);

        assert!((mse(&a, &b).unwrap() - 100.0).abs() < 1e-12);

        let expected = 10.0 * (65025.0f64 / 100.0).log10();
        let got = psnr(&a, &b).unwrap();
        assert!((got - expected).abs() < 1e-9);
        assert!((got - 28.13).abs() < 0.01);
    }

    #[test]
    fn test_psnr_of_identical_rasters_is_infinite() {
        // A zero MSE is a perfect match, not an error
        let a = gradient(6, 6);
        let value = psnr(&a, &a).unwrap();
        assert!(value.is_infinite() && value.is_sign_positive());
        assert_eq!(psnr_from_mse(0.0), f64::INFINITY);
    }

    #[test]
    fn test_psnr_decreases_as_mse_grows() {
        let mut previous = f64::INFINITY;
        for mse in [0.5, 1.0, 10.0, 100.0, 1000.0, 65025.0] {
            let value = psnr_from_mse(mse);
            assert!(value < previous, "psnr({mse}) = {value} not below {previous}");
            previous = value;
        }
        assert!(psnr_from_mse(65025.0).abs() < 1e-12);
    }

    #[test]
    fn test_ssim_of_identical_rasters_is_one() {
        let a = gradient(16, 12);
        assert!((ssim(&a, &a).unwrap() - 1.0).abs() < 1e-12);

        let flat = Raster::filled(5, 5, 255, 77);
        assert!((ssim(&flat, &flat).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ssim_drops_for_inverted_image() {
        let a = gradient(16, 12);
        let inverted = Raster::from_fn(16, 12, 255, |x, y| {
            255 - a.get_pixel(x as i64, y as i64)
        });
        assert!(ssim(&a, &inverted).unwrap() < 0.0);
    }

    #[test]
    fn test_ssim_single_pixel_is_finite() {
        let a = Raster::filled(1, 1, 255, 10);
        let b = Raster::filled(1, 1, 255, 20);
        let value = ssim(&a, &b).unwrap();
        assert!(value.is_finite());
        assert!(value > 0.0 && value < 1.0);
    }

    #[test]
    fn test_ssim_of_black_rasters_reduces_to_stabilizers() {
        let black = Raster::new(3, 3, 255);
        assert_eq!(ssim(&black, &black).unwrap(), 1.0);
    }

    #[test]
    fn test_mismatched_dimensions_are_errors() {
        let a = gradient(4, 4);
        let b = gradient(4, 5);
        for result in [mse(&a, &b), psnr(&a, &b), ssim(&a, &b)] {
            assert!(matches!(
                result,
                Err(DenoiseError::DimensionMismatch {
                    left: (4, 4),
                    right: (4, 5)
                })
            ));
        }
        assert!(evaluate(&a, &b).is_err());
    }

    #[test]
    fn test_empty_rasters_are_rejected() {
        let empty = Raster::new(0, 0, 255);
        assert!(matches!(mse(&empty, &empty), Err(DenoiseError::InvalidRaster)));
        assert!(matches!(psnr(&empty, &empty), Err(DenoiseError::InvalidRaster)));
        assert!(matches!(ssim(&empty, &empty), Err(DenoiseError::InvalidRaster)));
    }

    #[test]
    fn test_evaluate_matches_individual_metrics() {
        let a = gradient(10, 10);
        let b = Raster::from_fn(10, 10, 255, |x, y| ((x * 37 + y * 11 + 3) % 256) as u16);
        let scores = evaluate(&a, &b).unwrap();
        assert_eq!(scores.mse, mse(&a, &b).unwrap());
        assert_eq!(scores.psnr, psnr(&a, &b).unwrap());
        assert_eq!(scores.ssim, ssim(&a, &b).unwrap());
    }

    #[test]
    fn test_agrees_with_imageproc_on_8bit_images() {
        let a = gradient(20, 15);
        let b = Raster::from_fn(20, 15, 255, |x, y| ((x * 13 + y * 29) % 256) as u16);

        let rmse = root_mean_squared_error(&to_gray8(&a), &to_gray8(&b));
        assert!((mse(&a, &b).unwrap() - rmse * rmse).abs() < 1e-6);

        let reference = peak_signal_to_noise_ratio(&to_gray8(&a), &to_gray8(&b));
        assert!((psnr(&a, &b).unwrap() - reference).abs() < 1e-6);
    }
}
