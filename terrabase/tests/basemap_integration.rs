//! End-to-end basemap assembly over a synthetic tile set.
//!
//! These tests drive the full pipeline — tile store, land mask,
//! downsampler, assembler, serialization — with toy-sized grids:
//! 5×5 raw tiles reduced at resolution 2 (factor 2) over a 2×2-cell
//! region at (lat 10..11, lon 20..21).
//!
//! Run with: `cargo test --test basemap_integration`

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use terrabase::checksum::{verify_sidecar, ChecksumError};
use terrabase::coord::{CellCoord, GridBounds};
use terrabase::hgt::{TileStore, VOID};
use terrabase::landmask::{LandMask, Polygon};
use terrabase::mosaic::{MosaicAssembler, MosaicConfig, MosaicError};

const RAW_SIZE: usize = 5;
const RESOLUTION: usize = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Write a 5×5 tile for a cell holding 0..25 in on-disk row-major order
/// (row 0 = northern edge, big-endian).
fn write_indexed_tile(dir: &Path, cell: CellCoord) {
    let bytes: Vec<u8> = (0..(RAW_SIZE * RAW_SIZE) as i16)
        .flat_map(|v| v.to_be_bytes())
        .collect();
    fs::write(dir.join(cell.hgt_filename()), bytes).unwrap();
}

/// Write a 5×5 tile filled with one constant value.
fn write_constant_tile(dir: &Path, cell: CellCoord, value: i16) {
    let bytes: Vec<u8> = std::iter::repeat(value)
        .take(RAW_SIZE * RAW_SIZE)
        .flat_map(|v| v.to_be_bytes())
        .collect();
    fs::write(dir.join(cell.hgt_filename()), bytes).unwrap();
}

/// Mask covering the whole test region with margin.
fn region_mask() -> LandMask {
    LandMask::new(vec![Polygon::new(vec![
        (19.5, 9.5),
        (22.5, 9.5),
        (22.5, 12.5),
        (19.5, 12.5),
    ])])
}

fn assembler(dir: &Path, bounds: GridBounds, mask: LandMask, parallelism: usize) -> MosaicAssembler {
    let config = MosaicConfig::new(bounds, RESOLUTION, parallelism).with_raw_size(RAW_SIZE);
    MosaicAssembler::new(config, TileStore::new(dir), mask).unwrap()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// With no tile files at all, every mosaic sample is the void sentinel,
/// regardless of the polygon set.
#[test]
fn test_missing_tiles_produce_void_mosaic() {
    let temp = TempDir::new().unwrap();
    let bounds = GridBounds::new(20, 21, 10, 11).unwrap();
    let assembler = assembler(temp.path(), bounds, region_mask(), 0);

    let mosaic = assembler.run().unwrap();
    assert_eq!(mosaic.rows(), 4);
    assert_eq!(mosaic.cols(), 4);
    assert!(mosaic.samples().iter().all(|&s| s == VOID));
}

/// A single fully-land cell: block maxima land in the right output pixels
/// and the serialized raster is north-up big-endian.
#[test]
fn test_single_cell_values_and_orientation() {
    let temp = TempDir::new().unwrap();
    let cell = CellCoord { lat: 10, lon: 20 };
    write_indexed_tile(temp.path(), cell);

    let bounds = GridBounds::new(20, 20, 10, 10).unwrap();
    let assembler = assembler(temp.path(), bounds, region_mask(), 0);
    let mosaic = assembler.run().unwrap();

    // On-disk value at (row r, col c) is r*5 + c with row 0 northernmost.
    // After the load flip, the southern coarse row pools disk rows 4..2 and
    // the northern coarse row pools disk rows 2..0; the final output flip
    // puts the northern row first again.
    assert_eq!(mosaic.get(0, 0), 11);
    assert_eq!(mosaic.get(0, 1), 13);
    assert_eq!(mosaic.get(1, 0), 21);
    assert_eq!(mosaic.get(1, 1), 23);

    assert_eq!(
        mosaic.to_be_bytes(),
        &[0x00, 0x0B, 0x00, 0x0D, 0x00, 0x15, 0x00, 0x17]
    );
}

/// Output pixels whose sample point is water stay void even though the raw
/// elevation there is defined and non-sentinel.
#[test]
fn test_water_pixels_are_void_over_valid_samples() {
    let temp = TempDir::new().unwrap();
    let cell = CellCoord { lat: 10, lon: 20 };
    write_constant_tile(temp.path(), cell, 500);

    // Land covers only longitudes west of 20.25: sample points at lon 20.0
    // are land, at lon 20.5 water.
    let west_half = LandMask::new(vec![Polygon::new(vec![
        (19.5, 9.5),
        (20.25, 9.5),
        (20.25, 12.5),
        (19.5, 12.5),
    ])]);

    let bounds = GridBounds::new(20, 20, 10, 10).unwrap();
    let assembler = assembler(temp.path(), bounds, west_half, 0);
    let mosaic = assembler.run().unwrap();

    assert_eq!(mosaic.get(0, 0), 500);
    assert_eq!(mosaic.get(1, 0), 500);
    assert_eq!(mosaic.get(0, 1), VOID);
    assert_eq!(mosaic.get(1, 1), VOID);
}

/// Sequential and concurrent runs over a mixed present/absent tile set
/// produce byte-identical mosaics.
#[test]
fn test_parallelism_does_not_change_output() {
    let temp = TempDir::new().unwrap();
    write_indexed_tile(temp.path(), CellCoord { lat: 10, lon: 20 });
    write_constant_tile(temp.path(), CellCoord { lat: 11, lon: 21 }, 1234);
    // (10, 21) and (11, 20) stay absent.

    let bounds = GridBounds::new(20, 21, 10, 11).unwrap();

    let sequential = assembler(temp.path(), bounds, region_mask(), 0)
        .run()
        .unwrap();
    let concurrent = assembler(temp.path(), bounds, region_mask(), 3)
        .run()
        .unwrap();

    assert_eq!(sequential.to_be_bytes(), concurrent.to_be_bytes());
    assert_eq!(sequential.checksum(), concurrent.checksum());

    // Present cells hold data, absent cells hold void.
    assert_eq!(sequential.get(0, 2), 1234, "north-east cell present");
    assert_eq!(sequential.get(2, 0), 11, "south-west cell present");
    assert_eq!(sequential.get(0, 0), VOID, "north-west cell absent");
    assert_eq!(sequential.get(2, 2), VOID, "south-east cell absent");
}

/// The written raster verifies against its sidecar, and tampering with the
/// raster afterwards surfaces a checksum mismatch.
#[test]
fn test_output_checksum_roundtrip() {
    let temp = TempDir::new().unwrap();
    write_indexed_tile(temp.path(), CellCoord { lat: 10, lon: 20 });

    let bounds = GridBounds::new(20, 20, 10, 10).unwrap();
    let mosaic = assembler(temp.path(), bounds, region_mask(), 0)
        .run()
        .unwrap();

    let out = temp.path().join("basemap_terrain.hgt");
    mosaic.write(&out).unwrap();
    assert!(verify_sidecar(&out).is_ok());

    let mut bytes = fs::read(&out).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&out, bytes).unwrap();
    assert!(matches!(
        verify_sidecar(&out),
        Err(ChecksumError::Mismatch { .. })
    ));
}

/// An unreadable-size tile fails the whole batch with a typed error rather
/// than being silently treated as absent.
#[test]
fn test_corrupt_tile_fails_the_batch() {
    let temp = TempDir::new().unwrap();
    let cell = CellCoord { lat: 10, lon: 20 };
    fs::write(temp.path().join(cell.hgt_filename()), [0u8; 7]).unwrap();

    let bounds = GridBounds::new(20, 20, 10, 10).unwrap();
    let result = assembler(temp.path(), bounds, region_mask(), 0).run();
    assert!(matches!(result, Err(MosaicError::Tile(_))));
}
