//! One-degree cell coordinates and grid bounds.
//!
//! Elevation tiles are keyed by the integer latitude/longitude of their
//! southwest corner. This module provides the cell type, the SRTM-style
//! filename convention (`{N|S}{lat:02}{E|W}{lon:03}.hgt`), and the inclusive
//! rectangular bounds enumeration that drives mosaic assembly.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Southernmost valid cell latitude (southwest corner).
pub const MIN_CELL_LAT: i32 = -90;
/// Northernmost valid cell latitude (southwest corner).
pub const MAX_CELL_LAT: i32 = 89;
/// Westernmost valid cell longitude (southwest corner).
pub const MIN_CELL_LON: i32 = -180;
/// Easternmost valid cell longitude (southwest corner).
pub const MAX_CELL_LON: i32 = 179;

/// Result type for coordinate operations.
pub type CoordResult<T> = Result<T, CoordError>;

/// Errors for cell coordinates and grid bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordError {
    /// Cell latitude outside the valid southwest-corner range.
    InvalidLatitude(i32),

    /// Cell longitude outside the valid southwest-corner range.
    InvalidLongitude(i32),

    /// A bounds axis has min greater than max.
    EmptyRange {
        axis: &'static str,
        min: i32,
        max: i32,
    },

    /// Filename does not match the `{N|S}xx{E|W}yyy.hgt` pattern.
    InvalidFilename(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "cell latitude {} outside [{}, {}]",
                    lat, MIN_CELL_LAT, MAX_CELL_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "cell longitude {} outside [{}, {}]",
                    lon, MIN_CELL_LON, MAX_CELL_LON
                )
            }
            CoordError::EmptyRange { axis, min, max } => {
                write!(f, "{} range is empty: {} > {}", axis, min, max)
            }
            CoordError::InvalidFilename(name) => {
                write!(f, "filename doesn't match tile pattern: {}", name)
            }
        }
    }
}

impl std::error::Error for CoordError {}

/// A one-degree cell, identified by the integer latitude/longitude of its
/// southwest corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    /// Latitude of the southwest corner in whole degrees.
    pub lat: i32,
    /// Longitude of the southwest corner in whole degrees.
    pub lon: i32,
}

impl CellCoord {
    /// Create a cell coordinate, validating the southwest-corner ranges.
    pub fn new(lat: i32, lon: i32) -> CoordResult<Self> {
        if !(MIN_CELL_LAT..=MAX_CELL_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_CELL_LON..=MAX_CELL_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Tile filename for this cell, e.g. `N44W111.hgt`.
    ///
    /// Hemisphere letters follow the SRTM convention: `S` only for negative
    /// latitudes, `W` only for negative longitudes.
    pub fn hgt_filename(&self) -> String {
        format!("{}.hgt", self)
    }

    /// Parse a tile filename (optionally with a path prefix) back into the
    /// cell it covers.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::InvalidFilename` when the name does not match the
    /// `{N|S}xx{E|W}yyy.hgt` pattern, and a range error when the embedded
    /// coordinates are outside the valid cell ranges.
    pub fn from_hgt_filename(filename: &str) -> CoordResult<Self> {
        let captures = hgt_pattern()
            .captures(filename)
            .ok_or_else(|| CoordError::InvalidFilename(filename.to_string()))?;

        // The pattern guarantees two- and three-digit numeric groups, so the
        // parses cannot fail.
        let lat: i32 = captures[2].parse().unwrap_or_default();
        let lon: i32 = captures[4].parse().unwrap_or_default();

        let lat = if &captures[1] == "S" { -lat } else { lat };
        let lon = if &captures[3] == "W" { -lon } else { lon };

        Self::new(lat, lon)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat < 0 { 'S' } else { 'N' };
        let ew = if self.lon < 0 { 'W' } else { 'E' };
        write!(
            f,
            "{}{:02}{}{:03}",
            ns,
            self.lat.abs(),
            ew,
            self.lon.abs()
        )
    }
}

/// Tile filename pattern: `N44W111.hgt`, case sensitive, path prefix allowed.
fn hgt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([NS])(\d{2})([EW])(\d{3})\.hgt$").expect("tile filename pattern is valid")
    })
}

/// An inclusive rectangular set of one-degree cells.
///
/// Both corner cells are validated on construction, so every enumerated cell
/// is a valid `CellCoord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    lon_min: i32,
    lon_max: i32,
    lat_min: i32,
    lat_max: i32,
}

impl GridBounds {
    /// Create bounds from inclusive cell ranges.
    pub fn new(lon_min: i32, lon_max: i32, lat_min: i32, lat_max: i32) -> CoordResult<Self> {
        if lon_min > lon_max {
            return Err(CoordError::EmptyRange {
                axis: "longitude",
                min: lon_min,
                max: lon_max,
            });
        }
        if lat_min > lat_max {
            return Err(CoordError::EmptyRange {
                axis: "latitude",
                min: lat_min,
                max: lat_max,
            });
        }
        CellCoord::new(lat_min, lon_min)?;
        CellCoord::new(lat_max, lon_max)?;
        Ok(Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        })
    }

    /// Westernmost cell longitude (inclusive).
    pub fn lon_min(&self) -> i32 {
        self.lon_min
    }

    /// Easternmost cell longitude (inclusive).
    pub fn lon_max(&self) -> i32 {
        self.lon_max
    }

    /// Southernmost cell latitude (inclusive).
    pub fn lat_min(&self) -> i32 {
        self.lat_min
    }

    /// Northernmost cell latitude (inclusive).
    pub fn lat_max(&self) -> i32 {
        self.lat_max
    }

    /// Number of cells along the longitude axis.
    pub fn lon_count(&self) -> usize {
        (self.lon_max - self.lon_min + 1) as usize
    }

    /// Number of cells along the latitude axis.
    pub fn lat_count(&self) -> usize {
        (self.lat_max - self.lat_min + 1) as usize
    }

    /// Enumerate every cell in the rectangle.
    ///
    /// The order is longitude-major, but callers must not depend on it: the
    /// mosaic places results keyed by cell, never by position in this list.
    pub fn cells(&self) -> Vec<CellCoord> {
        let mut cells = Vec::with_capacity(self.lon_count() * self.lat_count());
        for lon in self.lon_min..=self.lon_max {
            for lat in self.lat_min..=self.lat_max {
                cells.push(CellCoord { lat, lon });
            }
        }
        cells
    }
}
