use chrono::{DateTime, Utc};
use ndarray::{ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Moment index of radar reflectivity
pub const REFLECTIVITY: usize = 0;
/// Moment index of radial velocity
pub const VELOCITY: usize = 1;
/// Moment index of spectrum width
pub const SPECTRUM_WIDTH: usize = 2;

/// Earth location of the radar antenna
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EarthLocation {
    pub latitude: f64,   // degrees
    pub longitude: f64,  // degrees
    pub altitude: f64,   // meters above MSL
}

impl EarthLocation {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self { latitude, longitude, altitude }
    }

    /// A (0, 0) lat/lon pair is how readers report a missing station position
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// Geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Scan geometry of an opened dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Gridded product stored on an (x, y) raster
    Raster,
    /// Fixed-azimuth scans swept in elevation
    Rhi,
    /// Plan position sweeps stacked into a volume
    Volume,
}

/// Domain of a resampled grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridDomain {
    /// (range, azimuth)
    RangeAzimuth,
    /// (range, azimuth, elevation)
    RangeAzimuthElevation,
    /// (latitude, longitude, altitude)
    LatLonAltitude,
    /// (x, y) raster cells
    Raster,
}

/// Radar-centric coordinate system attached to a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarCoordinateSystem {
    pub origin: EarthLocation,
    pub cell_spacing: f64,       // meters
    pub first_cell_offset: f64,  // meters
}

/// Regular grid produced by the resampler.
///
/// `shape` lists the dimensions fastest-varying first, so for a sweep it is
/// `[gates, rays]` and `values[ray * gates + gate]` addresses one cell.
/// `coordinates[d]` holds the coordinate of dimension `d` for every cell,
/// matching `values` in length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledGrid {
    pub domain: GridDomain,
    pub shape: Vec<usize>,
    pub coordinate_names: Vec<String>,
    pub coordinates: Vec<Vec<f32>>,
    pub values: Vec<f32>,
    pub unit: String,
    pub coordinate_system: RadarCoordinateSystem,
    /// Elevation or azimuth the grid was requested at
    pub fixed_angle: Option<f64>,
    /// Altitude of a constant-altitude product, meters above MSL
    pub level: Option<f64>,
}

impl ResampledGrid {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn nan_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Row-major view with the slowest dimension first
    pub fn view(&self) -> RadarResult<ArrayViewD<'_, f32>> {
        let dims: Vec<usize> = self.shape.iter().rev().copied().collect();
        ArrayViewD::from_shape(IxDyn(&dims), &self.values)
            .map_err(|e| RadarError::Processing(format!("Shape error: {}", e)))
    }

    /// Value at a fastest-first index
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        let mut stride = 1;
        for (i, (&idx, &dim)) in index.iter().zip(&self.shape).enumerate() {
            if idx >= dim {
                return None;
            }
            if i > 0 {
                stride *= self.shape[i - 1];
            }
            flat += idx * stride;
        }
        self.values.get(flat).copied()
    }
}

/// Float usable inside a hashed key; compares by bit pattern
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyFloat(pub f64);

impl KeyFloat {
    fn bits(&self) -> u64 {
        // -0.0 and 0.0 must share a key
        if self.0 == 0.0 {
            0
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for KeyFloat {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for KeyFloat {}

impl Hash for KeyFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl From<f64> for KeyFloat {
    fn from(v: f64) -> Self {
        KeyFloat(v)
    }
}

/// Request-specific part of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKey {
    Sweep { elevation: KeyFloat, index: usize, want_3d: bool },
    Volume,
    RhiVolume,
    GridVolume {
        dims: [usize; 3],
        extent_km: [KeyFloat; 2],
        first_level_m: KeyFloat,
        level_spacing_m: KeyFloat,
    },
    Cappi { level: KeyFloat },
    Rhi { azimuth: KeyFloat },
    RhiSweep { azimuth: KeyFloat, index: usize },
    CrossSection { start: [KeyFloat; 2], end: [KeyFloat; 2] },
    Raster,
}

/// Composite key into the grid cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub location: [KeyFloat; 3],
    pub base_time: DateTime<Utc>,
    pub moment: usize,
    pub variable: String,
    pub product: ProductKey,
}

impl CacheKey {
    pub fn new(
        location: &EarthLocation,
        base_time: DateTime<Utc>,
        moment: usize,
        variable: &str,
        product: ProductKey,
    ) -> Self {
        Self {
            location: [
                location.latitude.into(),
                location.longitude.into(),
                location.altitude.into(),
            ],
            base_time,
            moment,
            variable: variable.to_string(),
            product,
        }
    }
}

/// Error types for radar resampling
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data read error: {0}")]
    DataRead(String),

    #[error("Unsupported data: {0}")]
    Unsupported(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Dataset closed: {0}")]
    Closed(String),

    #[error("Failed to open {} of {total} sources: {}", .failed.len(), .failed.join(", "))]
    Batch { failed: Vec<String>, total: usize },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for radar operations
pub type RadarResult<T> = Result<T, RadarError>;
