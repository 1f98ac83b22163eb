use crate::error::DenoiseError;
use crate::raster::Raster;

/// Apply a `kernel_size` x `kernel_size` median filter
///
/// Only pixels whose whole window fits inside the raster are filtered. The
/// band of `kernel_size / 2` pixels along every edge is copied unchanged.
/// Median filter removes isolated impulse noise while keeping edges sharp.
pub fn apply(raster: &Raster, kernel_size: u32) -> Result<Raster, DenoiseError> {
    if kernel_size < 3 || kernel_size % 2 == 0 {
        tracing::warn!("Rejected median kernel size {}", kernel_size);
        return Err(DenoiseError::InvalidKernel(kernel_size));
    }

    let (width, height) = raster.dimensions();
    let offset = kernel_size / 2;
    let mut filtered = raster.clone();

    if width < kernel_size || height < kernel_size {
        tracing::debug!(
            "Raster {}x{} smaller than {}x{} window, nothing to filter",
            width,
            height,
            kernel_size,
            kernel_size
        );
        return Ok(filtered);
    }

    let source = raster.samples();
    let out = filtered.samples_mut();
    let mut window = Vec::with_capacity((kernel_size * kernel_size) as usize);
    let mut processed = 0usize;

    for y in offset..height - offset {
        for x in offset..width - offset {
            window.clear();
            for wy in y - offset..=y + offset {
                for wx in x - offset..=x + offset {
                    window.push(source.get_pixel(wx, wy).0[0]);
                }
            }

            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable(mid);
            out.get_pixel_mut(x, y).0[0] = *median;
            processed += 1;
        }
    }

    tracing::debug!(
        "Applied median filter {}x{} ({} pixels processed)",
        kernel_size,
        kernel_size,
        processed
    );
    Ok(filtered)
}
