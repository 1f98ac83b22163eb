//! CSV report of sweep results, written one flushed row at a time

use crate::error::DenoiseError;
use crate::metrics::Fidelity;
use serde::{Serialize, Serializer};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const REPORT_HEADER: [&str; 6] = ["Image", "NoiseLevel", "FilterSize", "MSE", "PSNR", "SSIM"];

/// One line of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub image: String,
    #[serde(serialize_with = "shortest")]
    pub noise_level: f64,
    pub filter_size: u32,
    #[serde(serialize_with = "six_places")]
    pub mse: f64,
    #[serde(serialize_with = "six_places")]
    pub psnr: f64,
    #[serde(serialize_with = "six_places")]
    pub ssim: f64,
}

impl ResultRow {
    pub fn new(image: &str, noise_level: f64, filter_size: u32, fidelity: Fidelity) -> Self {
        Self {
            image: image.to_string(),
            noise_level,
            filter_size,
            mse: fidelity.mse,
            psnr: fidelity.psnr,
            ssim: fidelity.ssim,
        }
    }
}

/// `0.05` stays `0.05` and `1.0` becomes `1`, matching the CLI spelling
fn shortest<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Fixed six decimals; infinite PSNR is written as `inf`
fn six_places<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:.6}"))
}

/// Append-only report file
pub struct ReportWriter {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
    rows: usize,
}

impl ReportWriter {
    /// Create (or truncate) the report and write its header
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DenoiseError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DenoiseError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| DenoiseError::io(&path, e))?;

        // The header goes out up front so an empty sweep still leaves a valid report
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        let mut report = Self {
            path,
            writer,
            rows: 0,
        };
        report
            .writer
            .write_record(REPORT_HEADER)
            .map_err(|e| DenoiseError::csv(&report.path, e))?;
        report.flush()?;
        Ok(report)
    }

    /// Append a row and flush it to disk
    pub fn append(&mut self, row: &ResultRow) -> Result<(), DenoiseError> {
        self.writer
            .serialize(row)
            .map_err(|e| DenoiseError::csv(&self.path, e))?;
        self.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&mut self) -> Result<(), DenoiseError> {
        self.writer
            .flush()
            .map_err(|e| DenoiseError::io(&self.path, e))
    }
}
