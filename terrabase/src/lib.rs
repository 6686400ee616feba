//! TerraBase - coarse land-only terrain basemaps from high-resolution
//! elevation tiles.
//!
//! The library assembles a compact flight/visualization basemap from
//! one-degree SRTM-style elevation tiles: each tile is max-pool downsampled
//! to the target resolution, masked against a land polygon set decoded from
//! GSHHG shoreline data, and merged into one big-endian raster mosaic with
//! a SHA-256 checksum sidecar.
//!
//! # Example
//!
//! ```no_run
//! use terrabase::coord::GridBounds;
//! use terrabase::hgt::TileStore;
//! use terrabase::landmask::LandMask;
//! use terrabase::mosaic::{MosaicAssembler, MosaicConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bounds = GridBounds::new(-130, -53, 23, 50)?;
//! let config = MosaicConfig::new(bounds, 120, 4);
//! let store = TileStore::new("srtm3");
//! let mask = LandMask::new(land_polygons());
//!
//! let assembler = MosaicAssembler::new(config, store, mask)?;
//! let mosaic = assembler.run()?;
//! mosaic.write("basemap_terrain.hgt".as_ref())?;
//! # Ok(())
//! # }
//! # fn land_polygons() -> Vec<terrabase::landmask::Polygon> { Vec::new() }
//! ```

pub mod checksum;
pub mod coord;
pub mod downsample;
pub mod gshhg;
pub mod hgt;
pub mod landmask;
pub mod logging;
pub mod mosaic;

/// Version of the TerraBase library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
