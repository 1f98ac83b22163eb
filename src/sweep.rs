//! Batch sweep over every input image and every grid cell

use crate::config::{Config, ParameterGrid};
use crate::error::DenoiseError;
use crate::processing::CellPipeline;
use crate::raster::Raster;
use crate::report::{ReportWriter, ResultRow};
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File extension of input rasters (matched case-insensitively)
pub const RASTER_EXTENSION: &str = "pgm";

/// Identifier of the generated image used when no input could be loaded
pub const FALLBACK_IMAGE_NAME: &str = "synthetic_test_pattern.pgm";
pub const FALLBACK_IMAGE_SIZE: u32 = 64;

/// Input file that was not processed
#[derive(Debug, Clone, Serialize)]
pub struct SkippedInput {
    pub image: String,
    pub code: &'static str,
    pub reason: String,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub images_processed: usize,
    pub skipped: Vec<SkippedInput>,
    pub rows_written: usize,
    pub cells_failed: usize,
    pub fallback: bool,
    pub report: PathBuf,
    pub total_time_ms: u64,
}

/// Raster files directly inside `dir`, sorted by file name
///
/// A missing or unreadable directory yields no inputs.
pub fn discover_inputs(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read input directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut inputs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(RASTER_EXTENSION))
        })
        .collect();
    inputs.sort();
    inputs
}

/// Sweeps the grid over each input and appends results to a report
pub struct Sweep<'a, R: Rng> {
    config: &'a Config,
    rng: R,
}

impl<'a, R: Rng> Sweep<'a, R> {
    pub fn new(config: &'a Config, rng: R) -> Self {
        Self { config, rng }
    }

    /// Run the whole sweep
    ///
    /// Only failing to create the report or the output directory is fatal;
    /// bad inputs are skipped and a failed cell drops just its row.
    pub fn run(&mut self) -> Result<SweepSummary, DenoiseError> {
        let start = Instant::now();
        let config = self.config;

        fs::create_dir_all(&config.output_dir)
            .map_err(|e| DenoiseError::io(&config.output_dir, e))?;
        let mut report = ReportWriter::create(&config.report_path)?;

        let mut summary = SweepSummary {
            report: config.report_path.clone(),
            ..Default::default()
        };

        let inputs = discover_inputs(&config.input_dir);
        tracing::info!(
            "Found {} input image(s) in {}",
            inputs.len(),
            config.input_dir.display()
        );

        let mut prefixes = HashSet::new();
        for path in &inputs {
            let name = file_name(path);
            let original = match Raster::load(path) {
                Ok(raster) => raster,
                Err(e) => {
                    tracing::warn!("Skipping {} [{}]: {}", name, e.code(), e);
                    summary.skipped.push(SkippedInput {
                        image: name,
                        code: e.code(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            tracing::info!(
                "Processing {} ({}x{})",
                name,
                original.width(),
                original.height()
            );
            let prefix = output_prefix(path, &mut prefixes);
            self.sweep_image(&name, &prefix, &original, &mut report, &mut summary)?;
            summary.images_processed += 1;
        }

        if summary.images_processed == 0 {
            self.run_fallback(&mut report, &mut summary)?;
        }

        summary.rows_written = report.rows();
        summary.total_time_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Keeps the report non-empty when there was nothing real to measure
    fn run_fallback(
        &mut self,
        report: &mut ReportWriter,
        summary: &mut SweepSummary,
    ) -> Result<(), DenoiseError> {
        tracing::warn!(
            "No usable {} images in {}, sweeping a generated {}x{} test pattern instead",
            RASTER_EXTENSION,
            self.config.input_dir.display(),
            FALLBACK_IMAGE_SIZE,
            FALLBACK_IMAGE_SIZE
        );
        summary.fallback = true;

        let pattern = Raster::test_pattern(FALLBACK_IMAGE_SIZE, FALLBACK_IMAGE_SIZE);
        let stem = FALLBACK_IMAGE_NAME
            .strip_suffix(".pgm")
            .unwrap_or(FALLBACK_IMAGE_NAME);
        self.sweep_image(FALLBACK_IMAGE_NAME, stem, &pattern, report, summary)
    }

    fn sweep_image(
        &mut self,
        name: &str,
        stem: &str,
        original: &Raster,
        report: &mut ReportWriter,
        summary: &mut SweepSummary,
    ) -> Result<(), DenoiseError> {
        let grid: &ParameterGrid = &self.config.grid;
        let pipeline = CellPipeline::new(&self.config.output_dir, stem);

        for cell in grid.cells() {
            let outcome = match pipeline.process(original, cell, &mut self.rng) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        "Cell noise={} filter={} failed for {} [{}]: {}",
                        cell.noise_level,
                        cell.filter_size,
                        name,
                        e.code(),
                        e
                    );
                    summary.cells_failed += 1;
                    continue;
                }
            };

            tracing::info!(
                "{} noise={} filter={}x{}: {} pixels corrupted, MSE {:.4}, PSNR {:.4} dB, SSIM {:.4}",
                name,
                cell.noise_level,
                cell.filter_size,
                cell.filter_size,
                outcome.corrupted_pixels,
                outcome.fidelity.mse,
                outcome.fidelity.psnr,
                outcome.fidelity.ssim
            );

            report.append(&ResultRow::new(
                name,
                cell.noise_level,
                cell.filter_size,
                outcome.fidelity,
            ))?;
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name prefix for an input's output files, unique across the run
///
/// Normally the file stem. Inputs sharing a stem (`img.pgm` and `img.PGM`)
/// fall back to the full file name, then to a numbered name. Comparison
/// ignores case so case-insensitive file systems cannot merge them either.
fn output_prefix(path: &Path, used: &mut HashSet<String>) -> String {
    let stem = file_stem(path);
    let name = file_name(path);
    let prefix = [stem.clone(), name.clone()]
        .into_iter()
        .chain((2..).map(|n| format!("{name}_{n}")))
        .find(|candidate| !used.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| stem.clone());

    if prefix != stem {
        tracing::warn!(
            "Output name {} is already taken, writing {} results as {}",
            stem,
            name,
            prefix
        );
    }
    used.insert(prefix.to_lowercase());
    prefix
}
