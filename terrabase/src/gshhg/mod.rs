//! GSHHG binary shoreline codec.
//!
//! Decodes shape records in the Global Self-consistent, Hierarchical,
//! High-resolution Geography binary layout (version 2.3.x): a 44-byte header
//! of 11 big-endian 32-bit integers followed by `8 × point count` bytes of
//! (lon, lat) micro-degree pairs. Streams carry no record count; a whole
//! file is decoded by repeating until end of stream.
//!
//! # Record Header
//!
//! ```text
//! id  npoints  flag  west  east  south  north  area  area_full  container  ancestor
//! ```
//!
//! Bounding box fields are micro-degrees (degrees × 1e6), areas are tenths
//! of km², and container/ancestor use −1 as the "none" sentinel. The low
//! byte of `flag` carries the shape level (land, lake, ...).
//!
//! All multi-byte fields are big-endian regardless of host byte order.

use std::fmt;
use std::io::{self, Read};

use tracing::warn;

/// Number of 32-bit integers in a record header.
pub const HEADER_INTS: usize = 11;

/// Size of an encoded record header in bytes.
pub const HEADER_BYTES: usize = HEADER_INTS * 4;

/// Adjacent-longitude jump, in degrees, beyond which a ring is assumed to
/// wrap around a seam of the 360° encoding. Tuned for the source dataset;
/// not claimed to be topologically correct for arbitrary shapes.
const SEAM_JUMP_DEGREES: f64 = 170.0;

/// Result type for codec operations.
pub type GshhgResult<T> = Result<T, GshhgError>;

/// Errors produced while decoding shape records.
#[derive(Debug)]
pub enum GshhgError {
    /// Header slice was not exactly [`HEADER_BYTES`] long.
    HeaderSize { actual: usize },

    /// Header declares a negative point count.
    NegativePointCount { id: i32, count: i32 },

    /// Point payload length disagrees with the header's point count.
    PointBytesMismatch { expected: usize, actual: usize },

    /// The stream ended inside a record.
    TruncatedRecord {
        context: &'static str,
        source: io::Error,
    },

    /// Other I/O failure while reading the stream.
    Io(io::Error),
}

impl fmt::Display for GshhgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderSize { actual } => {
                write!(
                    f,
                    "header must be {} bytes (11 big-endian 32-bit integers), got {}",
                    HEADER_BYTES, actual
                )
            }
            Self::NegativePointCount { id, count } => {
                write!(f, "shape {} declares a negative point count ({})", id, count)
            }
            Self::PointBytesMismatch { expected, actual } => {
                write!(f, "point data must be {} bytes, got {}", expected, actual)
            }
            Self::TruncatedRecord { context, source } => {
                write!(f, "stream truncated reading {}: {}", context, source)
            }
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GshhgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TruncatedRecord { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Shape level, decoded from the low byte of the header flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Land,
    Lake,
    IslandInLake,
    PondInIslandInLake,
    /// Unrecognized level code. Non-fatal; callers decide how to treat it.
    Invalid,
}

impl Level {
    /// Map a raw level code to its variant.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Level::Land,
            2 => Level::Lake,
            3 => Level::IslandInLake,
            4 => Level::PondInIslandInLake,
            _ => Level::Invalid,
        }
    }
}

/// Decoded record header. Immutable once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeHeader {
    id: i32,
    num_points: i32,
    flag: i32,
    west: i32,
    east: i32,
    south: i32,
    north: i32,
    area: i32,
    area_full: i32,
    container: i32,
    ancestor: i32,
}

impl ShapeHeader {
    /// Decode a header from exactly [`HEADER_BYTES`] big-endian bytes.
    pub fn decode(bytes: &[u8]) -> GshhgResult<Self> {
        if bytes.len() != HEADER_BYTES {
            return Err(GshhgError::HeaderSize {
                actual: bytes.len(),
            });
        }

        let field = |i: usize| -> i32 {
            let o = i * 4;
            i32::from_be_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
        };

        Ok(Self {
            id: field(0),
            num_points: field(1),
            flag: field(2),
            west: field(3),
            east: field(4),
            south: field(5),
            north: field(6),
            area: field(7),
            area_full: field(8),
            container: field(9),
            ancestor: field(10),
        })
    }

    /// Re-encode the header as big-endian bytes.
    ///
    /// Decode → encode → decode is the identity.
    pub fn encode(&self) -> [u8; HEADER_BYTES] {
        let fields = [
            self.id,
            self.num_points,
            self.flag,
            self.west,
            self.east,
            self.south,
            self.north,
            self.area,
            self.area_full,
            self.container,
            self.ancestor,
        ];

        let mut out = [0u8; HEADER_BYTES];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    /// Unique shape id.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Declared number of points, as stored (may be negative in a corrupt
    /// stream; [`Shape`] construction rejects that case).
    pub fn point_count(&self) -> i32 {
        self.num_points
    }

    /// Raw flag word.
    pub fn flag(&self) -> i32 {
        self.flag
    }

    /// Shape level from the flag's low byte.
    ///
    /// Unrecognized codes are reported once through the diagnostic log and
    /// classified [`Level::Invalid`], never fatal.
    pub fn level(&self) -> Level {
        let code = (self.flag & 0xFF) as u8;
        let level = Level::from_code(code);
        if level == Level::Invalid {
            warn!(shape_id = self.id, code, "unrecognized shape level code");
        }
        level
    }

    /// Westernmost bounding-box longitude in degrees.
    pub fn west(&self) -> f64 {
        self.west as f64 / 1e6
    }

    /// Easternmost bounding-box longitude in degrees.
    pub fn east(&self) -> f64 {
        self.east as f64 / 1e6
    }

    /// Southernmost bounding-box latitude in degrees.
    pub fn south(&self) -> f64 {
        self.south as f64 / 1e6
    }

    /// Northernmost bounding-box latitude in degrees.
    pub fn north(&self) -> f64 {
        self.north as f64 / 1e6
    }

    /// Polygon area in km².
    pub fn area(&self) -> f64 {
        self.area as f64 / 10.0
    }

    /// Area of the full-resolution ancestor polygon in km².
    pub fn area_full(&self) -> f64 {
        self.area_full as f64 / 10.0
    }

    /// Id of the polygon containing this one, if any.
    pub fn container(&self) -> Option<i32> {
        (self.container != -1).then_some(self.container)
    }

    /// Id of the ancestor polygon in the full-resolution set, if any.
    pub fn ancestor(&self) -> Option<i32> {
        (self.ancestor != -1).then_some(self.ancestor)
    }
}

/// A decoded shape: header plus its ordered (lon, lat) micro-degree points.
///
/// Points are set exactly once at construction and never mutated.
#[derive(Debug, Clone)]
pub struct Shape {
    header: ShapeHeader,
    points_x: Vec<i32>,
    points_y: Vec<i32>,
}

impl Shape {
    /// Build a shape from a decoded header and its raw point payload.
    ///
    /// The payload must be exactly `8 × point count` bytes of alternating
    /// big-endian (lon, lat) integers.
    pub fn new(header: ShapeHeader, points: &[u8]) -> GshhgResult<Self> {
        if header.num_points < 0 {
            return Err(GshhgError::NegativePointCount {
                id: header.id,
                count: header.num_points,
            });
        }

        let count = header.num_points as usize;
        let expected = count * 8;
        if points.len() != expected {
            return Err(GshhgError::PointBytesMismatch {
                expected,
                actual: points.len(),
            });
        }

        let mut points_x = Vec::with_capacity(count);
        let mut points_y = Vec::with_capacity(count);
        for pair in points.chunks_exact(8) {
            points_x.push(i32::from_be_bytes([pair[0], pair[1], pair[2], pair[3]]));
            points_y.push(i32::from_be_bytes([pair[4], pair[5], pair[6], pair[7]]));
        }

        Ok(Self {
            header,
            points_x,
            points_y,
        })
    }

    /// Read one shape (header plus points) from a stream.
    ///
    /// # Errors
    ///
    /// Fails with `TruncatedRecord` if the stream ends before the record is
    /// complete, including at the very start.
    pub fn read_from<R: Read>(reader: &mut R) -> GshhgResult<Self> {
        let mut header_bytes = [0u8; HEADER_BYTES];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|source| GshhgError::TruncatedRecord {
                context: "header",
                source,
            })?;
        let header = ShapeHeader::decode(&header_bytes)?;
        Self::read_points(header, reader)
    }

    fn read_points<R: Read>(header: ShapeHeader, reader: &mut R) -> GshhgResult<Self> {
        if header.num_points < 0 {
            return Err(GshhgError::NegativePointCount {
                id: header.id,
                count: header.num_points,
            });
        }

        let mut points = vec![0u8; header.num_points as usize * 8];
        reader
            .read_exact(&mut points)
            .map_err(|source| GshhgError::TruncatedRecord {
                context: "point data",
                source,
            })?;
        Self::new(header, &points)
    }

    /// The decoded header.
    pub fn header(&self) -> &ShapeHeader {
        &self.header
    }

    /// Number of points in the shape.
    pub fn point_count(&self) -> usize {
        self.points_x.len()
    }

    /// Shape level from the header flag.
    pub fn level(&self) -> Level {
        self.header.level()
    }

    /// Longitudes in degrees, with seam wraparound repaired.
    ///
    /// Raw values are divided by 1e6. If any adjacent pair differs by more
    /// than 170°, the ring is assumed to wrap a seam of the 360° longitude
    /// encoding and every value greater than 180° is shifted by −360° to
    /// make the ring geometrically contiguous. The adjacency scan (rather
    /// than global extrema) is deliberate and must be preserved.
    pub fn longitudes(&self) -> Vec<f64> {
        let mut lons: Vec<f64> = self.points_x.iter().map(|&x| x as f64 / 1e6).collect();

        let wraps = lons
            .windows(2)
            .any(|pair| (pair[1] - pair[0]).abs() > SEAM_JUMP_DEGREES);

        if wraps {
            for lon in &mut lons {
                if *lon > 180.0 {
                    *lon -= 360.0;
                }
            }
        }

        lons
    }

    /// Latitudes in degrees.
    pub fn latitudes(&self) -> Vec<f64> {
        self.points_y.iter().map(|&y| y as f64 / 1e6).collect()
    }
}

/// Decode shapes until the stream is exhausted.
///
/// End of stream exactly at a record boundary terminates normally; end of
/// stream inside a record is a `TruncatedRecord` error. One malformed record
/// fails the whole call — callers wanting isolation should read records one
/// at a time with [`Shape::read_from`].
pub fn read_shapes<R: Read>(reader: &mut R) -> GshhgResult<Vec<Shape>> {
    let mut shapes = Vec::new();
    while let Some(header_bytes) = read_header_or_eof(reader)? {
        let header = ShapeHeader::decode(&header_bytes)?;
        shapes.push(Shape::read_points(header, reader)?);
    }
    Ok(shapes)
}

/// Read a header-sized chunk, distinguishing clean EOF (no bytes at all)
/// from truncation inside the header.
fn read_header_or_eof<R: Read>(reader: &mut R) -> GshhgResult<Option<[u8; HEADER_BYTES]>> {
    let mut buf = [0u8; HEADER_BYTES];
    let mut filled = 0;

    while filled < HEADER_BYTES {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(GshhgError::TruncatedRecord {
                    context: "header",
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("got {} of {} header bytes", filled, HEADER_BYTES),
                    ),
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(GshhgError::Io(e)),
        }
    }

    Ok(Some(buf))
}
