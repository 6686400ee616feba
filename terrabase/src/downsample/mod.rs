//! Per-cell reduction of raw elevation grids to the basemap resolution.
//!
//! Each one-degree cell shrinks from its raw N×N grid to an R×R coarse grid
//! by max-pooling F×F sample blocks, where F = (N−1)/R must divide exactly.
//! Max-pooling is deliberate: the basemap represents the worst-case
//! (highest) terrain within each coarse pixel. Output pixels whose sample
//! point falls outside the land polygon set are void, as is the whole cell
//! when no raw tile exists.
//!
//! The reduction is a pure function of (raw tile, polygon set, cell,
//! resolution) — no hidden state — so re-running any cell reproduces its
//! coarse grid bit for bit.

use thiserror::Error;

use crate::coord::CellCoord;
use crate::hgt::{ElevationTile, VOID};
use crate::landmask::LandMask;

/// Result type for downsampling configuration.
pub type DownsampleResult<T> = Result<T, DownsampleError>;

/// Fatal configuration errors, raised before any work is scheduled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DownsampleError {
    /// Resolution of zero output pixels per degree.
    #[error("resolution must be greater than zero")]
    ZeroResolution,

    /// Raw grids need at least two samples per axis.
    #[error("raw grid size must be at least 2, got {0}")]
    RawSizeTooSmall(usize),

    /// `(raw_size − 1) / resolution` is not an integer; never silently
    /// truncated or rounded.
    #[error(
        "raw grid size {raw_size} is incompatible with resolution {resolution}: \
         ({raw_size} - 1) is not divisible by {resolution}"
    )]
    ResolutionMismatch { raw_size: usize, resolution: usize },
}

/// Validated downsampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownsampleConfig {
    raw_size: usize,
    resolution: usize,
    factor: usize,
}

impl DownsampleConfig {
    /// Validate a (raw grid size, output resolution) pair.
    pub fn new(raw_size: usize, resolution: usize) -> DownsampleResult<Self> {
        if resolution == 0 {
            return Err(DownsampleError::ZeroResolution);
        }
        if raw_size < 2 {
            return Err(DownsampleError::RawSizeTooSmall(raw_size));
        }
        if (raw_size - 1) % resolution != 0 {
            return Err(DownsampleError::ResolutionMismatch {
                raw_size,
                resolution,
            });
        }

        Ok(Self {
            raw_size,
            resolution,
            factor: (raw_size - 1) / resolution,
        })
    }

    /// Raw samples per tile axis.
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Output pixels per degree.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Raw samples pooled per output pixel axis.
    pub fn factor(&self) -> usize {
        self.factor
    }
}

/// One cell's downsampled R×R grid.
///
/// Row index 0 is the southern edge, matching [`ElevationTile`]; the mosaic
/// assembler flips the assembled buffer to north-up at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseCell {
    cell: CellCoord,
    resolution: usize,
    samples: Vec<i16>,
}

impl CoarseCell {
    /// Build a coarse cell from raw samples in south-up row order.
    ///
    /// # Panics
    ///
    /// Panics unless `samples.len() == resolution²`.
    pub fn new(cell: CellCoord, resolution: usize, samples: Vec<i16>) -> Self {
        assert_eq!(
            samples.len(),
            resolution * resolution,
            "coarse cell sample count must be resolution squared"
        );
        Self {
            cell,
            resolution,
            samples,
        }
    }

    /// The cell this grid covers.
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Output pixels per axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Row-major samples, row 0 at the southern edge.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample at (row, col), row 0 being the southern edge.
    pub fn get(&self, row: usize, col: usize) -> i16 {
        self.samples[row * self.resolution + col]
    }
}

/// Reduces one cell's raw grid to the coarse basemap grid.
///
/// Holds the validated configuration and the shared land mask; safe to use
/// from many worker threads at once since nothing here mutates.
#[derive(Debug)]
pub struct TileDownsampler {
    config: DownsampleConfig,
    mask: LandMask,
}

impl TileDownsampler {
    /// Create a downsampler over a validated config and a loaded mask.
    pub fn new(config: DownsampleConfig, mask: LandMask) -> Self {
        Self { config, mask }
    }

    /// The validated configuration.
    pub fn config(&self) -> &DownsampleConfig {
        &self.config
    }

    /// The shared land mask.
    pub fn mask(&self) -> &LandMask {
        &self.mask
    }

    /// Downsample one cell.
    ///
    /// For each output pixel (j = latitude row, i = longitude column):
    /// the pixel's sample point `(lon + i/R, lat + j/R)` is classified
    /// against the land mask; water pixels and pixels without a raw tile are
    /// void, land pixels take the maximum raw sample of their F×F block.
    pub fn downsample(&self, cell: CellCoord, tile: Option<&ElevationTile>) -> CoarseCell {
        let r = self.config.resolution;
        let f = self.config.factor;
        let mut samples = vec![VOID; r * r];

        for j in 0..r {
            let lat = cell.lat as f64 + j as f64 / r as f64;
            for i in 0..r {
                let lon = cell.lon as f64 + i as f64 / r as f64;

                if !self.mask.contains(lon, lat) {
                    continue;
                }
                let Some(tile) = tile else {
                    continue;
                };

                let mut max = i16::MIN;
                for dj in 0..f {
                    for di in 0..f {
                        max = max.max(tile.sample(j * f + dj, i * f + di));
                    }
                }
                samples[j * r + i] = max;
            }
        }

        CoarseCell {
            cell,
            resolution: r,
            samples,
        }
    }
}
