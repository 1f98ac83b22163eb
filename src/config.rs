use crate::error::DenoiseError;
use crate::processing::Cell;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "denoise-sweep")]
#[command(about = "Benchmark median filtering of salt-and-pepper noise on PGM images")]
#[command(version)]
pub struct Args {
    /// Directory scanned (non-recursively) for .pgm images
    #[arg(long, env = "DENOISE_INPUT_DIR", default_value = "images")]
    pub input_dir: PathBuf,

    /// Directory receiving the noisy and filtered images
    #[arg(long, env = "DENOISE_OUTPUT_DIR", default_value = "processed")]
    pub output_dir: PathBuf,

    /// CSV report path
    #[arg(long, env = "DENOISE_REPORT", default_value = "denoising_results.csv")]
    pub report: PathBuf,

    /// Noise levels to sweep, as fractions in (0, 1]
    #[arg(
        long,
        env = "DENOISE_NOISE_LEVELS",
        value_delimiter = ',',
        default_value = "0.01,0.05,0.1"
    )]
    pub noise_levels: Vec<f64>,

    /// Median filter sizes to sweep (odd, at least 3)
    #[arg(
        long,
        env = "DENOISE_FILTER_SIZES",
        value_delimiter = ',',
        default_value = "3,5,7"
    )]
    pub filter_sizes: Vec<u32>,

    /// Seed for the noise generator (random if not set)
    #[arg(long, env = "DENOISE_SEED")]
    pub seed: Option<u64>,

    /// Write a JSON run summary to this path
    #[arg(long, env = "DENOISE_SUMMARY")]
    pub summary: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Noise levels and filter sizes swept for every image
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    noise_levels: Vec<f64>,
    filter_sizes: Vec<u32>,
}

impl ParameterGrid {
    /// Validate and deduplicate the grid, keeping first-seen order
    pub fn new(noise_levels: &[f64], filter_sizes: &[u32]) -> Result<Self, DenoiseError> {
        if noise_levels.is_empty() {
            return Err(DenoiseError::InvalidParameter(
                "at least one noise level is required".to_string(),
            ));
        }
        if filter_sizes.is_empty() {
            return Err(DenoiseError::InvalidParameter(
                "at least one filter size is required".to_string(),
            ));
        }

        let mut levels: Vec<f64> = Vec::with_capacity(noise_levels.len());
        for &level in noise_levels {
            if !(level > 0.0 && level <= 1.0) {
                return Err(DenoiseError::InvalidParameter(format!(
                    "noise level {level} is outside (0, 1]"
                )));
            }
            if !levels.contains(&level) {
                levels.push(level);
            }
        }

        let mut sizes: Vec<u32> = Vec::with_capacity(filter_sizes.len());
        for &size in filter_sizes {
            if size < 3 || size % 2 == 0 {
                return Err(DenoiseError::InvalidKernel(size));
            }
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }

        Ok(Self {
            noise_levels: levels,
            filter_sizes: sizes,
        })
    }

    pub fn noise_levels(&self) -> &[f64] {
        &self.noise_levels
    }

    pub fn filter_sizes(&self) -> &[u32] {
        &self.filter_sizes
    }

    /// Cartesian product, noise level outermost
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.noise_levels.iter().flat_map(move |&noise_level| {
            self.filter_sizes.iter().map(move |&filter_size| Cell {
                noise_level,
                filter_size,
            })
        })
    }

    pub fn cell_count(&self) -> usize {
        self.noise_levels.len() * self.filter_sizes.len()
    }
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            noise_levels: vec![0.01, 0.05, 0.1],
            filter_sizes: vec![3, 5, 7],
        }
    }
}

/// Sweep configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub report_path: PathBuf,
    pub grid: ParameterGrid,
    /// Fixed RNG seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
    pub summary_path: Option<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = DenoiseError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        Ok(Self {
            grid: ParameterGrid::new(&args.noise_levels, &args.filter_sizes)?,
            input_dir: args.input_dir,
            output_dir: args.output_dir,
            report_path: args.report,
            seed: args.seed,
            summary_path: args.summary,
        })
    }
}
