//! TerraBase CLI - build coarse terrain basemaps from elevation tile sets.
//!
//! This binary provides a command-line interface to the TerraBase library:
//! `generate` assembles a basemap mosaic from a directory of `.hgt` tiles
//! and a GSHHG coastline file, `verify` checks any file against its
//! `.sha256` sidecar, and `hash` writes sidecars for a tile directory.

mod error;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use error::CliError;
use terrabase::checksum;
use terrabase::coord::GridBounds;
use terrabase::gshhg;
use terrabase::hgt::TileStore;
use terrabase::landmask::LandMask;
use terrabase::mosaic::{MosaicAssembler, MosaicConfig};

#[derive(Parser)]
#[command(name = "terrabase")]
#[command(version = terrabase::VERSION)]
#[command(about = "Assemble coarse land-only terrain basemaps from elevation tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a basemap mosaic for a lat/lon cell rectangle
    Generate(GenerateArgs),
    /// Verify a file against its .sha256 sidecar
    Verify(VerifyArgs),
    /// Write .sha256 sidecars for every tile in a directory
    Hash(HashArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Directory containing {N|S}xx{E|W}yyy.hgt elevation tiles
    #[arg(long)]
    tiles: PathBuf,

    /// GSHHG binary coastline file supplying the land polygons
    #[arg(long)]
    coastline: PathBuf,

    /// Output raster file (a .sha256 sidecar is written next to it)
    #[arg(long)]
    output: PathBuf,

    /// Westernmost cell longitude, inclusive
    #[arg(long, allow_negative_numbers = true)]
    lon_min: i32,

    /// Easternmost cell longitude, inclusive
    #[arg(long, allow_negative_numbers = true)]
    lon_max: i32,

    /// Southernmost cell latitude, inclusive
    #[arg(long, allow_negative_numbers = true)]
    lat_min: i32,

    /// Northernmost cell latitude, inclusive
    #[arg(long, allow_negative_numbers = true)]
    lat_max: i32,

    /// Output pixels per degree
    #[arg(long, default_value = "120")]
    resolution: usize,

    /// Worker threads (0 = sequential)
    #[arg(long, short = 'j', default_value = "0")]
    jobs: usize,

    /// Raw samples per tile axis (1201 for SRTM3, 3601 for SRTM1)
    #[arg(long, default_value = "1201")]
    raw_size: usize,

    /// Verify tiles against their .sha256 sidecars while reading
    #[arg(long)]
    verify_tiles: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// File to verify against its sidecar
    file: PathBuf,
}

#[derive(Args)]
struct HashArgs {
    /// Directory of .hgt tiles to write sidecars for
    tiles: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let _guard = match terrabase::logging::init_logging("logs", "terrabase.log") {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
        Command::Hash(args) => hash(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}

fn generate(args: GenerateArgs) -> Result<(), CliError> {
    let bounds = GridBounds::new(args.lon_min, args.lon_max, args.lat_min, args.lat_max)
        .map_err(CliError::Bounds)?;

    let file = File::open(&args.coastline).map_err(|error| CliError::CoastlineRead {
        path: args.coastline.clone(),
        error,
    })?;
    let shapes = gshhg::read_shapes(&mut BufReader::new(file)).map_err(CliError::Coastline)?;
    let mask = LandMask::from_shapes(&shapes);
    info!(
        shapes = shapes.len(),
        polygons = mask.polygon_count(),
        "loaded coastline data"
    );
    if mask.is_empty() {
        warn!("coastline data contains no land polygons; the basemap will be all void");
    }

    let store = TileStore::new(&args.tiles).with_checksum_verification(args.verify_tiles);
    let config = MosaicConfig::new(bounds, args.resolution, args.jobs).with_raw_size(args.raw_size);
    let assembler = MosaicAssembler::new(config, store, mask).map_err(CliError::Mosaic)?;

    let mosaic = assembler.run().map_err(CliError::Mosaic)?;
    mosaic.write(&args.output).map_err(CliError::Mosaic)?;

    println!(
        "Wrote {} ({} x {} samples, sha256 {})",
        args.output.display(),
        mosaic.rows(),
        mosaic.cols(),
        mosaic.checksum()
    );
    Ok(())
}

fn verify(args: VerifyArgs) -> Result<(), CliError> {
    checksum::verify_sidecar(&args.file).map_err(CliError::Integrity)?;
    println!("OK {}", args.file.display());
    Ok(())
}

fn hash(args: HashArgs) -> Result<(), CliError> {
    let store = TileStore::new(&args.tiles);
    let written = store
        .write_sidecars()
        .map_err(|e| CliError::Mosaic(e.into()))?;
    println!("Wrote {} sidecar(s) in {}", written, args.tiles.display());
    Ok(())
}
