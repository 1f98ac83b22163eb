use crate::raster::Raster;
use rand::Rng;

/// Apply salt-and-pepper noise in place
///
/// Every pixel is independently corrupted with probability `level`; a corrupted
/// pixel becomes 0 or the raster's max value with equal odds. The caller owns the
/// random source, so a seeded `StdRng` makes the result reproducible.
/// Returns the number of corrupted pixels.
pub fn apply<R: Rng + ?Sized>(raster: &mut Raster, level: f64, rng: &mut R) -> usize {
    let max_val = raster.max_val();
    let mut corrupted = 0;

    for sample in raster.samples_mut().iter_mut() {
        if rng.gen::<f64>() >= level {
            continue;
        }
        *sample = if rng.gen::<f64>() < 0.5 { 0 } else { max_val };
        corrupted += 1;
    }

    tracing::debug!(
        "Added impulse noise to {} pixels ({:.1}%)",
        corrupted,
        level * 100.0
    );
    corrupted
}
