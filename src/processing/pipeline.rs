use crate::error::DenoiseError;
use crate::metrics::{self, Fidelity};
use crate::raster::Raster;
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::steps;

/// One point of the parameter grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub noise_level: f64,
    pub filter_size: u32,
}

impl Cell {
    /// Exact noise level for output file names, `.` written as `p` (0.05 -> "0p05")
    pub fn noise_tag(&self) -> String {
        self.noise_level.to_string().replace('.', "p")
    }
}

/// Timing information for a single step of a cell
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_us: u64,
}

/// Result of running one cell
#[derive(Debug, Clone)]
pub struct CellOutcome {
    pub cell: Cell,
    pub corrupted_pixels: usize,
    pub noisy_path: PathBuf,
    pub filtered_path: PathBuf,
    pub fidelity: Fidelity,
    pub steps: Vec<StepTiming>,
}

/// Runs noise -> persist -> median -> persist -> score for one source image
pub struct CellPipeline<'a> {
    output_dir: &'a Path,
    stem: &'a str,
}

impl<'a> CellPipeline<'a> {
    /// `stem` is the source file name without extension
    pub fn new(output_dir: &'a Path, stem: &'a str) -> Self {
        Self { output_dir, stem }
    }

    pub fn noisy_path(&self, cell: Cell) -> PathBuf {
        self.output_dir.join(format!(
            "{}_noisy_n{}_f{}.pgm",
            self.stem,
            cell.noise_tag(),
            cell.filter_size
        ))
    }

    pub fn filtered_path(&self, cell: Cell) -> PathBuf {
        self.output_dir.join(format!(
            "{}_filtered_n{}_f{}.pgm",
            self.stem,
            cell.noise_tag(),
            cell.filter_size
        ))
    }

    /// Process one cell; `original` is only read
    pub fn process<R: Rng + ?Sized>(
        &self,
        original: &Raster,
        cell: Cell,
        rng: &mut R,
    ) -> Result<CellOutcome, DenoiseError> {
        let mut timings = Vec::new();

        let mut noisy = original.clone();
        let corrupted_pixels = self.run_step("noise", &mut timings, || {
            Ok(steps::noise::apply(&mut noisy, cell.noise_level, rng))
        })?;

        let noisy_path = self.noisy_path(cell);
        self.persist("save_noisy", &noisy, &noisy_path, &mut timings);

        let filtered = self.run_step("median", &mut timings, || {
            steps::median::apply(&noisy, cell.filter_size)
        })?;

        let filtered_path = self.filtered_path(cell);
        self.persist("save_filtered", &filtered, &filtered_path, &mut timings);

        let fidelity = self.run_step("metrics", &mut timings, || {
            metrics::evaluate(original, &filtered)
        })?;

        for step in &timings {
            tracing::debug!("  {} took {}us", step.name, step.time_us);
        }

        Ok(CellOutcome {
            cell,
            corrupted_pixels,
            noisy_path,
            filtered_path,
            fidelity,
            steps: timings,
        })
    }

    /// Intermediate rasters are best-effort; a failed save never sinks the cell
    fn persist(&self, name: &str, raster: &Raster, path: &Path, timings: &mut Vec<StepTiming>) {
        let result = self.run_step(name, timings, || raster.save(path));
        if let Err(e) = result {
            tracing::warn!("Could not save {}: {}", path.display(), e);
        }
    }

    fn run_step<T, F>(
        &self,
        name: &str,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, DenoiseError>
    where
        F: FnOnce() -> Result<T, DenoiseError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_us: step_start.elapsed().as_micros() as u64,
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_cell_produces_files_and_scores() {
        let dir = tempfile::tempdir().unwrap();
        let original = Raster::test_pattern(24, 24);
        let pipeline = CellPipeline::new(dir.path(), "pattern");
        let cell = Cell {
            noise_level: 0.05,
            filter_size: 3,
        };

        let outcome = pipeline
            .process(&original, cell, &mut StdRng::seed_from_u64(11))
            .unwrap();

        assert_eq!(
            outcome.noisy_path,
            dir.path().join("pattern_noisy_n0p05_f3.pgm")
        );
        assert_eq!(
            outcome.filtered_path,
            dir.path().join("pattern_filtered_n0p05_f3.pgm")
        );

        let noisy = Raster::load(&outcome.noisy_path).unwrap();
        let filtered = Raster::load(&outcome.filtered_path).unwrap();
        assert_eq!(noisy.dimensions(), (24, 24));
        assert_eq!(
            outcome.fidelity,
            metrics::evaluate(&original, &filtered).unwrap()
        );

        let names: Vec<_> = outcome.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["noise", "save_noisy", "median", "save_filtered", "metrics"]
        );
    }

    #[test]
    fn test_original_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = Raster::test_pattern(16, 16);
        let snapshot = original.clone();
        let pipeline = CellPipeline::new(dir.path(), "p");

        pipeline
            .process(
                &original,
                Cell {
                    noise_level: 1.0,
                    filter_size: 5,
                },
                &mut StdRng::seed_from_u64(5),
            )
            .unwrap();

        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_filtered_is_scored_against_original_not_noisy() {
        let dir = tempfile::tempdir().unwrap();
        let original = Raster::filled(12, 12, 255, 128);
        let pipeline = CellPipeline::new(dir.path(), "flat");

        let outcome = pipeline
            .process(
                &original,
                Cell {
                    noise_level: 0.01,
                    filter_size: 3,
                },
                &mut StdRng::seed_from_u64(17),
            )
            .unwrap();

        let noisy = Raster::load(&outcome.noisy_path).unwrap();
        let filtered = Raster::load(&outcome.filtered_path).unwrap();
        assert_eq!(
            outcome.fidelity.mse,
            metrics::mse(&original, &filtered).unwrap()
        );
        if outcome.corrupted_pixels > 0 {
            assert_ne!(noisy, original);
        }
    }

    #[test]
    fn test_invalid_kernel_fails_the_cell() {
        let dir = tempfile::tempdir().unwrap();
        let original = Raster::test_pattern(8, 8);
        let pipeline = CellPipeline::new(dir.path(), "p");

        let err = pipeline
            .process(
                &original,
                Cell {
                    noise_level: 0.1,
                    filter_size: 4,
                },
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidKernel(4)));
    }

    #[test]
    fn test_unwritable_output_still_scores() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does").join("not").join("exist");
        let original = Raster::test_pattern(10, 10);
        let pipeline = CellPipeline::new(&missing, "p");

        let outcome = pipeline
            .process(
                &original,
                Cell {
                    noise_level: 0.1,
                    filter_size: 3,
                },
                &mut StdRng::seed_from_u64(8),
            )
            .unwrap();

        assert!(!outcome.noisy_path.exists());
        assert!(outcome.fidelity.ssim.is_finite());
        let names: Vec<_> = outcome.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["noise", "median", "metrics"]);
    }

    #[test]
    fn test_noise_tag_keeps_exact_level() {
        let tag = |noise_level| {
            Cell {
                noise_level,
                filter_size: 3,
            }
            .noise_tag()
        };
        assert_eq!(tag(0.05), "0p05");
        assert_eq!(tag(0.1), "0p1");
        assert_eq!(tag(1.0), "1");
        assert_eq!(tag(0.015), "0p015");
    }

    #[test]
    fn test_distinct_cells_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CellPipeline::new(dir.path(), "img");
        let levels = [0.001, 0.004, 0.01, 0.015, 0.02];
        let sizes = [3u32, 5];

        let mut paths = Vec::new();
        for &noise_level in &levels {
            for &filter_size in &sizes {
                let cell = Cell {
                    noise_level,
                    filter_size,
                };
                paths.push(pipeline.noisy_path(cell));
                paths.push(pipeline.filtered_path(cell));
            }
        }

        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
        assert_ne!(
            pipeline.noisy_path(Cell {
                noise_level: 0.015,
                filter_size: 3
            }),
            pipeline.noisy_path(Cell {
                noise_level: 0.02,
                filter_size: 3
            })
        );
    }
}
