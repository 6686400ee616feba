//! Mosaic assembly: parallel fan-out, deterministic merge, serialization.
//!
//! The assembler enumerates every one-degree cell of the requested
//! rectangle, downsamples each cell independently (sequentially or on a
//! fixed-size rayon pool), and places the results into one raster buffer
//! keyed by cell coordinates — never by completion order. Re-running with a
//! different parallelism setting yields a byte-identical mosaic.
//!
//! The assembled buffer is built south-up (row index ascends with latitude,
//! matching the tile and coarse-cell orientation), flipped vertically once
//! at the end for north-up output, and serialized as row-major big-endian
//! 16-bit samples with a SHA-256 sidecar.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::checksum::{self, ChecksumError};
use crate::coord::{CellCoord, GridBounds};
use crate::downsample::{CoarseCell, DownsampleConfig, DownsampleError, TileDownsampler};
use crate::hgt::{HgtError, TileStore, SRTM3_GRID_SIZE, VOID};
use crate::landmask::LandMask;

/// Cells between progress log lines.
const PROGRESS_INTERVAL: usize = 10;

/// Result type for mosaic operations.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Errors raised while assembling or writing a mosaic.
#[derive(Debug)]
pub enum MosaicError {
    /// Invalid configuration, raised before any cell is scheduled.
    Config(DownsampleError),

    /// A tile read failed (absent tiles are not errors).
    Tile(HgtError),

    /// The worker pool could not be built.
    ThreadPool(String),

    /// Failed to write the output raster.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to produce or verify a checksum sidecar.
    Integrity(ChecksumError),
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid mosaic configuration: {}", e),
            Self::Tile(e) => write!(f, "tile read failed: {}", e),
            Self::ThreadPool(msg) => write!(f, "failed to build worker pool: {}", msg),
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::Integrity(e) => write!(f, "checksum sidecar failed: {}", e),
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Tile(e) => Some(e),
            Self::WriteFailed { source, .. } => Some(source),
            Self::Integrity(e) => Some(e),
            Self::ThreadPool(_) => None,
        }
    }
}

impl From<DownsampleError> for MosaicError {
    fn from(e: DownsampleError) -> Self {
        MosaicError::Config(e)
    }
}

impl From<HgtError> for MosaicError {
    fn from(e: HgtError) -> Self {
        MosaicError::Tile(e)
    }
}

/// Explicit assembly configuration; there is no ambient/global state.
#[derive(Debug, Clone)]
pub struct MosaicConfig {
    /// Inclusive cell rectangle to cover.
    pub bounds: GridBounds,
    /// Output pixels per degree.
    pub resolution: usize,
    /// Raw samples per tile axis.
    pub raw_size: usize,
    /// Worker threads; 0 means strictly sequential.
    pub parallelism: usize,
}

impl MosaicConfig {
    /// Create a config with the SRTM3 raw grid size.
    pub fn new(bounds: GridBounds, resolution: usize, parallelism: usize) -> Self {
        Self {
            bounds,
            resolution,
            raw_size: SRTM3_GRID_SIZE,
            parallelism,
        }
    }

    /// Override the raw samples per tile axis.
    pub fn with_raw_size(mut self, raw_size: usize) -> Self {
        self.raw_size = raw_size;
        self
    }
}

/// The assembled raster plus its dimensions, north-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mosaic {
    rows: usize,
    cols: usize,
    data: Vec<i16>,
}

impl Mosaic {
    /// Number of rows (latitude cells × resolution).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (longitude cells × resolution).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major samples, row 0 at the northern edge.
    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    /// Sample at (row, col), row 0 being the northern edge.
    pub fn get(&self, row: usize, col: usize) -> i16 {
        self.data[row * self.cols + col]
    }

    /// Serialize row-major as big-endian 16-bit samples.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 2);
        for sample in &self.data {
            out.extend_from_slice(&sample.to_be_bytes());
        }
        out
    }

    /// SHA-256 digest of the serialized raster.
    pub fn checksum(&self) -> String {
        checksum::digest_bytes(&self.to_be_bytes())
    }

    /// Write the raster and its `.sha256` sidecar.
    ///
    /// Returns the sidecar path.
    pub fn write(&self, path: &Path) -> MosaicResult<PathBuf> {
        fs::write(path, self.to_be_bytes()).map_err(|source| MosaicError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let sidecar = checksum::write_sidecar(path).map_err(MosaicError::Integrity)?;
        info!(
            path = %path.display(),
            rows = self.rows,
            cols = self.cols,
            "wrote mosaic"
        );
        Ok(sidecar)
    }
}

/// Drives the downsampler across a cell rectangle and merges the results.
pub struct MosaicAssembler {
    config: MosaicConfig,
    store: TileStore,
    downsampler: TileDownsampler,
}

impl MosaicAssembler {
    /// Build an assembler, validating the resolution against the raw grid
    /// size before any work is scheduled.
    ///
    /// The store's grid size is forced to the config's `raw_size` so the
    /// two can never disagree.
    pub fn new(config: MosaicConfig, store: TileStore, mask: LandMask) -> MosaicResult<Self> {
        let downsample_config = DownsampleConfig::new(config.raw_size, config.resolution)?;
        let store = store.with_grid_size(config.raw_size);
        Ok(Self {
            config,
            store,
            downsampler: TileDownsampler::new(downsample_config, mask),
        })
    }

    /// The assembly configuration.
    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Downsample every cell and assemble the mosaic.
    ///
    /// With `parallelism == 0` cells run strictly sequentially on the
    /// calling thread; otherwise a dedicated pool of exactly that many
    /// workers fans out over the cells. Each task owns its tile read and
    /// shares only the read-only mask and an atomic progress counter, so
    /// completion order cannot influence the output.
    pub fn run(&self) -> MosaicResult<Mosaic> {
        let cells = self.config.bounds.cells();
        let total = cells.len();
        info!(
            cells = total,
            resolution = self.config.resolution,
            parallelism = self.config.parallelism,
            "assembling mosaic"
        );

        let completed = AtomicUsize::new(0);
        let worker = |cell: CellCoord| -> MosaicResult<CoarseCell> {
            let tile = self.store.get(cell)?;
            let coarse = self.downsampler.downsample(cell, tile.as_ref());

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 || done == total {
                debug!(done, total, "downsampled cells");
            }
            Ok(coarse)
        };

        let results: Vec<CoarseCell> = if self.config.parallelism == 0 {
            cells.into_iter().map(worker).collect::<MosaicResult<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .build()
                .map_err(|e| MosaicError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                cells
                    .into_par_iter()
                    .map(worker)
                    .collect::<MosaicResult<_>>()
            })?
        };

        Ok(self.assemble(results))
    }

    /// Place coarse cells into the output buffer and flip it north-up.
    ///
    /// Placement is keyed by each result's cell coordinates; the order of
    /// `results` is irrelevant.
    pub fn assemble(&self, results: Vec<CoarseCell>) -> Mosaic {
        let r = self.config.resolution;
        let bounds = &self.config.bounds;
        let rows = bounds.lat_count() * r;
        let cols = bounds.lon_count() * r;
        let mut data = vec![VOID; rows * cols];

        for coarse in &results {
            let cell = coarse.cell();
            let row_offset = (cell.lat - bounds.lat_min()) as usize * r;
            let col_offset = (cell.lon - bounds.lon_min()) as usize * r;

            for j in 0..r {
                let src = &coarse.samples()[j * r..(j + 1) * r];
                let dst = (row_offset + j) * cols + col_offset;
                data[dst..dst + r].copy_from_slice(src);
            }
        }

        // South-up to north-up: swap rows around the horizontal midline.
        for row in 0..rows / 2 {
            let top = row * cols;
            let bottom = (rows - 1 - row) * cols;
            for col in 0..cols {
                data.swap(top + col, bottom + col);
            }
        }

        Mosaic { rows, cols, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmask::Polygon;
    use tempfile::TempDir;

    /// Assembler over a 2×2-cell region at toy resolution 2, raw size 5,
    /// with an empty tile directory.
    fn toy_assembler(temp: &TempDir, parallelism: usize) -> MosaicAssembler {
        let bounds = GridBounds::new(20, 21, 10, 11).unwrap();
        let config = MosaicConfig::new(bounds, 2, parallelism).with_raw_size(5);
        let mask = LandMask::new(vec![Polygon::new(vec![
            (19.5, 9.5),
            (22.5, 9.5),
            (22.5, 12.5),
            (19.5, 12.5),
        ])]);
        MosaicAssembler::new(config, TileStore::new(temp.path()), mask).unwrap()
    }

    fn constant_cell(lat: i32, lon: i32, value: i16) -> CoarseCell {
        CoarseCell::new(CellCoord { lat, lon }, 2, vec![value; 4])
    }

    #[test]
    fn test_new_rejects_bad_resolution_before_scheduling() {
        let temp = TempDir::new().unwrap();
        let bounds = GridBounds::new(0, 0, 0, 0).unwrap();
        let config = MosaicConfig::new(bounds, 7, 0); // (1201 - 1) % 7 != 0

        let result = MosaicAssembler::new(config, TileStore::new(temp.path()), LandMask::default());
        assert!(matches!(result, Err(MosaicError::Config(_))));
    }

    #[test]
    fn test_assemble_places_cells_at_keyed_offsets() {
        let temp = TempDir::new().unwrap();
        let assembler = toy_assembler(&temp, 0);

        // Two cells on the diagonal; the off-diagonal cells are missing.
        let mosaic = assembler.assemble(vec![
            constant_cell(10, 20, 100),
            constant_cell(11, 21, 200),
        ]);

        assert_eq!(mosaic.rows(), 4);
        assert_eq!(mosaic.cols(), 4);

        // North-up: cell (11, 21) lands in the top-right quadrant, cell
        // (10, 20) in the bottom-left; the rest stays void.
        assert_eq!(mosaic.get(0, 2), 200);
        assert_eq!(mosaic.get(1, 3), 200);
        assert_eq!(mosaic.get(2, 0), 100);
        assert_eq!(mosaic.get(3, 1), 100);
        assert_eq!(mosaic.get(0, 0), VOID);
        assert_eq!(mosaic.get(3, 3), VOID);
    }

    #[test]
    fn test_assemble_order_is_irrelevant() {
        let temp = TempDir::new().unwrap();
        let assembler = toy_assembler(&temp, 0);

        let forward = vec![
            constant_cell(10, 20, 1),
            constant_cell(10, 21, 2),
            constant_cell(11, 20, 3),
            constant_cell(11, 21, 4),
        ];
        let mut reverse = forward.clone();
        reverse.reverse();

        let a = assembler.assemble(forward);
        let b = assembler.assemble(reverse);
        assert_eq!(a.to_be_bytes(), b.to_be_bytes());
    }

    #[test]
    fn test_run_with_no_tiles_is_all_void() {
        let temp = TempDir::new().unwrap();
        let assembler = toy_assembler(&temp, 0);

        let mosaic = assembler.run().unwrap();
        assert_eq!(mosaic.rows() * mosaic.cols(), 16);
        assert!(mosaic.samples().iter().all(|&s| s == VOID));
    }

    #[test]
    fn test_flip_produces_north_up_rows() {
        let temp = TempDir::new().unwrap();
        let bounds = GridBounds::new(0, 0, 0, 0).unwrap();
        let config = MosaicConfig::new(bounds, 2, 0).with_raw_size(5);
        let assembler =
            MosaicAssembler::new(config, TileStore::new(temp.path()), LandMask::default()).unwrap();

        // South row [1, 2], north row [3, 4] in cell orientation.
        let coarse = CoarseCell::new(CellCoord { lat: 0, lon: 0 }, 2, vec![1, 2, 3, 4]);
        let mosaic = assembler.assemble(vec![coarse]);

        // Serialized output starts with the northern row.
        assert_eq!(mosaic.samples(), &[3, 4, 1, 2]);
        assert_eq!(
            mosaic.to_be_bytes(),
            &[0x00, 0x03, 0x00, 0x04, 0x00, 0x01, 0x00, 0x02]
        );
    }

    #[test]
    fn test_checksum_matches_serialized_bytes() {
        let temp = TempDir::new().unwrap();
        let assembler = toy_assembler(&temp, 0);
        let mosaic = assembler.assemble(vec![constant_cell(10, 20, 7)]);

        assert_eq!(
            mosaic.checksum(),
            checksum::digest_bytes(&mosaic.to_be_bytes())
        );
    }

    #[test]
    fn test_write_emits_raster_and_sidecar() {
        let temp = TempDir::new().unwrap();
        let assembler = toy_assembler(&temp, 0);
        let mosaic = assembler.assemble(vec![constant_cell(10, 20, 7)]);

        let out = temp.path().join("basemap.hgt");
        let sidecar = mosaic.write(&out).unwrap();

        assert_eq!(fs::read(&out).unwrap(), mosaic.to_be_bytes());
        assert_eq!(fs::read_to_string(sidecar).unwrap(), mosaic.checksum());
        assert!(checksum::verify_sidecar(&out).is_ok());
    }
}
