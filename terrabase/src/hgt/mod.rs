//! Elevation tile storage.
//!
//! One-degree tiles in the SRTM `.hgt` layout: N×N big-endian 16-bit
//! signed samples, row-major, with row 0 at the northern edge on disk
//! (SRTM3 ships N=1201). The store flips the row order exactly once at
//! load so the in-memory row index ascends with latitude (row 0 = southern
//! edge), which is the orientation the downsampler and mosaic work in; the
//! assembler flips the finished buffer back to north-up before serializing.
//!
//! An absent tile file is an expected outcome (ocean or unsurveyed cell),
//! reported as `Ok(None)` and never as an error.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::checksum::{self, ChecksumError};
use crate::coord::CellCoord;

/// Samples per axis in an SRTM3 tile.
pub const SRTM3_GRID_SIZE: usize = 1201;

/// Sentinel sample marking the absence of valid elevation.
pub const VOID: i16 = -32768;

/// Result type for tile storage operations.
pub type HgtResult<T> = Result<T, HgtError>;

/// Errors raised while reading elevation tiles.
#[derive(Debug)]
pub enum HgtError {
    /// Failed to read the tile file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Tile file length disagrees with the configured grid size.
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Sidecar checksum verification failed.
    Integrity(ChecksumError),
}

impl fmt::Display for HgtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::SizeMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "tile {} must be {} bytes, got {}",
                    path.display(),
                    expected,
                    actual
                )
            }
            Self::Integrity(e) => write!(f, "tile integrity check failed: {}", e),
        }
    }
}

impl std::error::Error for HgtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::Integrity(e) => Some(e),
            _ => None,
        }
    }
}

/// Byte or sample count disagreed with the expected grid size.
///
/// Produced by the [`ElevationTile`] constructors, which have no file
/// context; [`TileStore`] attaches the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSizeMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for TileSizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile payload must be {} units, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for TileSizeMismatch {}

/// A decoded N×N elevation grid for one cell.
///
/// Row index 0 is the southern edge; the row index ascends with latitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationTile {
    size: usize,
    samples: Vec<i16>,
}

impl ElevationTile {
    /// Decode a tile from its on-disk byte layout (big-endian, row 0 =
    /// northern edge), inverting the row order once.
    ///
    /// The payload must be exactly `size × size × 2` bytes.
    pub fn from_bytes(bytes: &[u8], size: usize) -> Result<Self, TileSizeMismatch> {
        let expected = size * size * 2;
        if bytes.len() != expected {
            return Err(TileSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let mut samples = Vec::with_capacity(size * size);
        for row in (0..size).rev() {
            let start = row * size * 2;
            for pair in bytes[start..start + size * 2].chunks_exact(2) {
                samples.push(i16::from_be_bytes([pair[0], pair[1]]));
            }
        }

        Ok(Self { size, samples })
    }

    /// Build a tile from samples already in south-up row order (row 0 =
    /// southern edge). Sample count must be exactly `size × size`.
    pub fn from_samples(samples: Vec<i16>, size: usize) -> Result<Self, TileSizeMismatch> {
        let expected = size * size;
        if samples.len() != expected {
            return Err(TileSizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { size, samples })
    }

    /// Samples per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sample at (row, col), row 0 being the southern edge.
    ///
    /// # Panics
    ///
    /// Panics if either index is outside the grid.
    pub fn sample(&self, row: usize, col: usize) -> i16 {
        assert!(row < self.size && col < self.size, "sample index out of grid");
        self.samples[row * self.size + col]
    }
}

/// Reads elevation tiles for one-degree cells from a directory.
///
/// Filenames follow the `{N|S}{lat:02}{E|W}{lon:03}.hgt` convention. Tiles
/// are produced per request and not cached.
#[derive(Debug, Clone)]
pub struct TileStore {
    directory: PathBuf,
    grid_size: usize,
    verify_checksums: bool,
}

impl TileStore {
    /// Create a store over a tile directory with the SRTM3 grid size.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            grid_size: SRTM3_GRID_SIZE,
            verify_checksums: false,
        }
    }

    /// Set the samples-per-axis of the stored tiles (e.g. 3601 for SRTM1).
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Enable verification against `.sha256` sidecars before decoding.
    ///
    /// Tiles without a sidecar are decoded without verification; a sidecar
    /// that disagrees with the file is an integrity error.
    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Samples per axis of the stored tiles.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Path the tile for a cell would live at.
    pub fn tile_path(&self, cell: CellCoord) -> PathBuf {
        self.directory.join(cell.hgt_filename())
    }

    /// Read the elevation tile for a cell.
    ///
    /// Returns `Ok(None)` when no tile file exists — the expected outcome
    /// for ocean or unsurveyed cells, distinct from every error case.
    pub fn get(&self, cell: CellCoord) -> HgtResult<Option<ElevationTile>> {
        let path = self.tile_path(cell);

        if !path.exists() {
            debug!(cell = %cell, "no elevation tile on disk");
            return Ok(None);
        }

        if self.verify_checksums {
            match checksum::verify_sidecar(&path) {
                Ok(()) => {}
                Err(ChecksumError::MissingSidecar { .. }) => {
                    debug!(path = %path.display(), "no checksum sidecar, skipping verification");
                }
                Err(e) => return Err(HgtError::Integrity(e)),
            }
        }

        let bytes = fs::read(&path).map_err(|source| HgtError::ReadFailed {
            path: path.clone(),
            source,
        })?;

        let tile = ElevationTile::from_bytes(&bytes, self.grid_size).map_err(|e| {
            HgtError::SizeMismatch {
                path,
                expected: e.expected,
                actual: e.actual,
            }
        })?;

        Ok(Some(tile))
    }

    /// Write a `.sha256` sidecar for every tile present in the directory.
    ///
    /// Returns the number of sidecars written. Files not matching the tile
    /// filename pattern are ignored.
    pub fn write_sidecars(&self) -> HgtResult<usize> {
        let entries = fs::read_dir(&self.directory).map_err(|source| HgtError::ReadFailed {
            path: self.directory.clone(),
            source,
        })?;

        let mut written = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if CellCoord::from_hgt_filename(&name).is_err() {
                continue;
            }
            checksum::write_sidecar(&path).map_err(HgtError::Integrity)?;
            written += 1;
        }

        debug!(written, directory = %self.directory.display(), "wrote tile sidecars");
        Ok(written)
    }
}

impl From<ChecksumError> for HgtError {
    fn from(e: ChecksumError) -> Self {
        HgtError::Integrity(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Serialize south-up rows into the on-disk layout (north-first,
    /// big-endian).
    fn tile_bytes(rows_south_up: &[Vec<i16>]) -> Vec<u8> {
        rows_south_up
            .iter()
            .rev()
            .flat_map(|row| row.iter().flat_map(|s| s.to_be_bytes()))
            .collect()
    }

    fn write_tile(dir: &TempDir, cell: CellCoord, rows_south_up: &[Vec<i16>]) -> PathBuf {
        let path = dir.path().join(cell.hgt_filename());
        fs::write(&path, tile_bytes(rows_south_up)).unwrap();
        path
    }

    #[test]
    fn test_absent_tile_is_none_not_error() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path()).with_grid_size(3);

        let result = store.get(CellCoord { lat: 44, lon: -111 }).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_tile_rows_are_flipped_to_south_up() {
        let temp = TempDir::new().unwrap();
        let cell = CellCoord { lat: 10, lon: 20 };
        // South-up rows: southern edge holds 1s, northern edge holds 3s.
        write_tile(
            &temp,
            cell,
            &[vec![1, 1, 1], vec![2, 2, 2], vec![3, 3, 3]],
        );

        let store = TileStore::new(temp.path()).with_grid_size(3);
        let tile = store.get(cell).unwrap().unwrap();

        assert_eq!(tile.sample(0, 0), 1, "row 0 must be the southern edge");
        assert_eq!(tile.sample(1, 1), 2);
        assert_eq!(tile.sample(2, 2), 3, "last row must be the northern edge");
    }

    #[test]
    fn test_big_endian_decoding() {
        let tile = ElevationTile::from_bytes(&[0x01, 0x02], 1).unwrap();
        assert_eq!(tile.sample(0, 0), 0x0102);

        let tile = ElevationTile::from_bytes(&[0x80, 0x00], 1).unwrap();
        assert_eq!(tile.sample(0, 0), VOID);
    }

    #[test]
    fn test_wrong_size_is_an_error() {
        let temp = TempDir::new().unwrap();
        let cell = CellCoord { lat: 10, lon: 20 };
        let path = temp.path().join(cell.hgt_filename());
        fs::write(&path, [0u8; 10]).unwrap();

        let store = TileStore::new(temp.path()).with_grid_size(3);
        match store.get(cell) {
            Err(HgtError::SizeMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 18);
                assert_eq!(actual, 10);
            }
            other => panic!("expected SizeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_from_samples_validates_count() {
        assert!(ElevationTile::from_samples(vec![0; 9], 3).is_ok());
        assert!(matches!(
            ElevationTile::from_samples(vec![0; 8], 3),
            Err(TileSizeMismatch {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_checksum_verification_passes() {
        let temp = TempDir::new().unwrap();
        let cell = CellCoord { lat: 0, lon: 0 };
        let path = write_tile(&temp, cell, &[vec![5]]);
        checksum::write_sidecar(&path).unwrap();

        let store = TileStore::new(temp.path())
            .with_grid_size(1)
            .with_checksum_verification(true);
        assert!(store.get(cell).unwrap().is_some());
    }

    #[test]
    fn test_checksum_mismatch_is_an_error() {
        let temp = TempDir::new().unwrap();
        let cell = CellCoord { lat: 0, lon: 0 };
        let path = write_tile(&temp, cell, &[vec![5]]);
        checksum::write_sidecar(&path).unwrap();
        fs::write(&path, [0x00, 0x07]).unwrap();

        let store = TileStore::new(temp.path())
            .with_grid_size(1)
            .with_checksum_verification(true);
        assert!(matches!(store.get(cell), Err(HgtError::Integrity(_))));
    }

    #[test]
    fn test_missing_sidecar_does_not_block_decode() {
        let temp = TempDir::new().unwrap();
        let cell = CellCoord { lat: 0, lon: 0 };
        write_tile(&temp, cell, &[vec![5]]);

        let store = TileStore::new(temp.path())
            .with_grid_size(1)
            .with_checksum_verification(true);
        assert!(store.get(cell).unwrap().is_some());
    }

    #[test]
    fn test_write_sidecars_covers_tiles_only() {
        let temp = TempDir::new().unwrap();
        write_tile(&temp, CellCoord { lat: 0, lon: 0 }, &[vec![1]]);
        write_tile(&temp, CellCoord { lat: 1, lon: 0 }, &[vec![2]]);
        fs::write(temp.path().join("README.txt"), "not a tile").unwrap();

        let store = TileStore::new(temp.path()).with_grid_size(1);
        assert_eq!(store.write_sidecars().unwrap(), 2);
        assert!(temp.path().join("N00E000.hgt.sha256").exists());
        assert!(!temp.path().join("README.txt.sha256").exists());
    }
}
