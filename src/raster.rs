//! Grayscale raster with plain-text PGM (`P2`) load and save

use crate::error::DenoiseError;
use image::{ImageBuffer, Luma};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Magic tag of the plain-text graymap format
pub const PGM_TAG: &str = "P2";

/// Sample value ceiling used when nothing else is declared
pub const DEFAULT_MAX_VAL: u16 = 255;

/// Pixel grid storage, row-major
pub type Samples = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Grayscale raster whose samples are always within `[0, max_val]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    max_val: u16,
    samples: Samples,
}

impl Raster {
    /// Zero-filled raster
    pub fn new(width: u32, height: u32, max_val: u16) -> Self {
        Self {
            max_val,
            samples: ImageBuffer::new(width, height),
        }
    }

    /// Raster where every sample is `value` (clamped to `max_val`)
    pub fn filled(width: u32, height: u32, max_val: u16, value: u16) -> Self {
        let value = value.min(max_val);
        Self {
            max_val,
            samples: ImageBuffer::from_pixel(width, height, Luma([value])),
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, max_val: u16, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u16,
    {
        Self {
            max_val,
            samples: ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y).min(max_val)])),
        }
    }

    /// Demo image: background 128 with a 200-valued block over the central half
    pub fn test_pattern(width: u32, height: u32) -> Self {
        let (x0, x1) = (width / 4, width * 3 / 4);
        let (y0, y1) = (height / 4, height * 3 / 4);
        Self::from_fn(width, height, DEFAULT_MAX_VAL, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                200
            } else {
                128
            }
        })
    }

    /// Load a `P2` graymap from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DenoiseError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DenoiseError::io(path, e))?;
        let raster: Raster = text.parse()?;
        tracing::debug!(
            "Loaded {} ({}x{}, max {})",
            path.display(),
            raster.width(),
            raster.height(),
            raster.max_val
        );
        Ok(raster)
    }

    /// Write the raster as a `P2` graymap, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DenoiseError> {
        let path = path.as_ref();
        let file = fs::File::create(path).map_err(|e| DenoiseError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        write!(writer, "{self}")
            .and_then(|_| writer.flush())
            .map_err(|e| DenoiseError::io(path, e))?;
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.samples.width()
    }

    pub fn height(&self) -> u32 {
        self.samples.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.samples.dimensions()
    }

    pub fn max_val(&self) -> u16 {
        self.max_val
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Raw write access; callers must keep samples within `[0, max_val]`
    pub(crate) fn samples_mut(&mut self) -> &mut Samples {
        &mut self.samples
    }

    /// Sample at `(x, y)`, or 0 when the coordinate lies outside the grid
    pub fn get_pixel(&self, x: i64, y: i64) -> u16 {
        match self.index(x, y) {
            Some((x, y)) => self.samples.get_pixel(x, y).0[0],
            None => 0,
        }
    }

    /// Store `value` clamped to `[0, max_val]`; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: i64, y: i64, value: i64) {
        if let Some((x, y)) = self.index(x, y) {
            let value = value.clamp(0, i64::from(self.max_val)) as u16;
            self.samples.put_pixel(x, y, Luma([value]));
        }
    }

    /// True when the raster has a non-empty, fully populated grid
    pub fn is_valid(&self) -> bool {
        let (width, height) = self.dimensions();
        width > 0
            && height > 0
            && self.samples.as_raw().len() == width as usize * height as usize
    }

    fn index(&self, x: i64, y: i64) -> Option<(u32, u32)> {
        let (width, height) = self.dimensions();
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return None;
        }
        Some((x as u32, y as u32))
    }
}

impl FromStr for Raster {
    type Err = DenoiseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .flat_map(str::split_whitespace);

        match tokens.next() {
            Some(PGM_TAG) => {}
            Some(tag) => {
                return Err(DenoiseError::Format(format!(
                    "unexpected tag {tag:?}, expected {PGM_TAG}"
                )))
            }
            None => return Err(DenoiseError::Format("empty file".to_string())),
        }

        let width: u32 = header_field(tokens.next(), "width")?;
        let height: u32 = header_field(tokens.next(), "height")?;
        let max_val: u16 = header_field(tokens.next(), "max value")?;

        if width == 0 || height == 0 {
            return Err(DenoiseError::Format(format!(
                "empty dimensions {width}x{height}"
            )));
        }
        if max_val == 0 {
            return Err(DenoiseError::Format("max value must be positive".to_string()));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| DenoiseError::Format(format!("dimensions {width}x{height} too large")))?;

        // The header is untrusted; size the buffer by what the text can hold
        let mut data = Vec::with_capacity(expected.min(text.len() / 2 + 1));
        for token in tokens.take(expected) {
            let value: i64 = token
                .parse()
                .map_err(|_| DenoiseError::Format(format!("invalid sample {token:?}")))?;
            data.push(value.clamp(0, i64::from(max_val)) as u16);
        }

        if data.len() < expected {
            return Err(DenoiseError::TruncatedData {
                expected,
                found: data.len(),
            });
        }

        let samples = ImageBuffer::from_raw(width, height, data).ok_or(DenoiseError::InvalidRaster)?;
        Ok(Self { max_val, samples })
    }
}

fn header_field<T: FromStr>(token: Option<&str>, name: &str) -> Result<T, DenoiseError> {
    let token =
        token.ok_or_else(|| DenoiseError::Format(format!("missing {name} in header")))?;
    token
        .parse()
        .map_err(|_| DenoiseError::Format(format!("invalid {name} {token:?}")))
}

/// Serializes in the exact form `save` writes
impl fmt::Display for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{PGM_TAG}")?;
        writeln!(f, "{} {}", self.width(), self.height())?;
        writeln!(f, "{}", self.max_val)?;

        let width = self.width() as usize;
        if width == 0 {
            return Ok(());
        }
        for row in self.samples.as_raw().chunks(width) {
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
