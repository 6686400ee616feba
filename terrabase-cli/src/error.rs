//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and a single exit path.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process;

use terrabase::checksum::ChecksumError;
use terrabase::coord::CoordError;
use terrabase::gshhg::GshhgError;
use terrabase::mosaic::MosaicError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging.
    LoggingInit(String),
    /// Invalid cell bounds on the command line.
    Bounds(CoordError),
    /// Failed to open the coastline file.
    CoastlineRead { path: PathBuf, error: io::Error },
    /// Failed to decode the coastline stream.
    Coastline(GshhgError),
    /// Mosaic configuration, assembly, or output failure.
    Mosaic(MosaicError),
    /// Checksum verification failure.
    Integrity(ChecksumError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Mosaic(MosaicError::Config(_)) => {
                eprintln!();
                eprintln!("The resolution must divide (raw tile size - 1) exactly.");
                eprintln!("For SRTM3 tiles (1201 samples): 120, 100, 60, 40, ... work.");
            }
            CliError::Integrity(ChecksumError::Mismatch { .. }) => {
                eprintln!();
                eprintln!("The file no longer matches its recorded checksum.");
                eprintln!("Re-download or regenerate it before use.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Bounds(e) => write!(f, "Invalid bounds: {}", e),
            CliError::CoastlineRead { path, error } => {
                write!(f, "Failed to open coastline file {}: {}", path.display(), error)
            }
            CliError::Coastline(e) => write!(f, "Failed to decode coastline data: {}", e),
            CliError::Mosaic(e) => write!(f, "{}", e),
            CliError::Integrity(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_error_display() {
        let err = CliError::Bounds(CoordError::InvalidLatitude(95));
        assert!(err.to_string().contains("Invalid bounds"));
        assert!(err.to_string().contains("95"));
    }

    #[test]
    fn test_coastline_read_error_display() {
        let err = CliError::CoastlineRead {
            path: PathBuf::from("gshhs_i.b"),
            error: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("gshhs_i.b"));
        assert!(err.to_string().contains("no such file"));
    }
}
