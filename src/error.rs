use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DenoiseError {
    #[error("Unsupported raster format: {0}")]
    Format(String),

    #[error("Truncated pixel data: expected {expected} samples, found {found}")]
    TruncatedData { expected: usize, found: usize },

    #[error(
        "Image dimensions differ: {}x{} vs {}x{}",
        .left.0,
        .left.1,
        .right.0,
        .right.1
    )]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("Raster is empty")]
    InvalidRaster,

    #[error("Invalid kernel size {0}: must be odd and at least 3")]
    InvalidKernel(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report error on {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl DenoiseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Report {
            path: path.into(),
            source,
        }
    }

    /// Stable code used in log lines and the run summary
    pub fn code(&self) -> &'static str {
        match self {
            DenoiseError::Format(_) => "FORMAT_ERROR",
            DenoiseError::TruncatedData { .. } => "TRUNCATED_DATA",
            DenoiseError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            DenoiseError::InvalidRaster => "INVALID_RASTER",
            DenoiseError::InvalidKernel(_) => "INVALID_KERNEL",
            DenoiseError::InvalidParameter(_) => "INVALID_PARAMETER",
            DenoiseError::Io { .. } => "IO_ERROR",
            DenoiseError::Report { .. } => "REPORT_ERROR",
        }
    }
}
