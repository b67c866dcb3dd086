use crate::types::{EarthLocation, RadarCoordinateSystem};
use serde::{Deserialize, Serialize};

/// Resampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    /// Minimum separation between distinct cuts (degrees)
    pub cut_threshold: f64,
    /// Azimuth coverage above which sweep rays are sorted (degrees)
    pub sort_span_threshold: f64,
    /// Azimuth bins of volume, CAPPI and RHI ray tables
    pub azimuth_bins: usize,
    /// Beam width assumed for RHI products (degrees)
    pub rhi_beam_width: f64,
    /// One-degree elevation bins of an RHI volume
    pub rhi_elevation_bins: usize,
    /// Range bins of an RHI slice for non-reflectivity moments
    pub rhi_bin_count: usize,
    /// Minimum range bins of a reflectivity RHI slice
    pub rhi_reflectivity_min_bins: usize,
    /// Elevation step used to fill missing RHI ray elevations (degrees)
    pub missing_elevation_step: f64,
    /// Distance of the default cross-section endpoints from the radar (km)
    pub cross_section_half_length_km: f64,
    /// Gridded volume dimensions (x, y, z)
    pub grid_dims: (usize, usize, usize),
    /// Horizontal extent of the gridded volume relative to the radar (km)
    pub grid_extent_km: (f64, f64),
    /// Altitude of the lowest gridded level above the radar (m)
    pub grid_first_level_m: f64,
    /// Vertical spacing of gridded levels (m)
    pub grid_level_spacing_m: f64,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            cut_threshold: 0.2,
            sort_span_threshold: 300.0,
            azimuth_bins: 360,            // one-degree bins
            rhi_beam_width: 0.95,
            rhi_elevation_bins: 91,       // 0..=90 degrees
            rhi_bin_count: 1200,
            rhi_reflectivity_min_bins: 500,
            missing_elevation_step: 0.2,
            cross_section_half_length_km: 150.0,
            grid_dims: (100, 100, 14),
            grid_extent_km: (-180.0, 280.0),
            grid_first_level_m: 500.0,
            grid_level_spacing_m: 1000.0,
        }
    }
}

/// What every product needs to know about its source
#[derive(Debug, Clone)]
pub struct ProductContext {
    pub origin: EarthLocation,
    pub moment: usize,
    pub unit: String,
}

impl ProductContext {
    pub fn new(origin: EarthLocation, moment: usize, unit: &str) -> Self {
        Self {
            origin,
            moment,
            unit: unit.to_string(),
        }
    }

    pub fn coordinate_system(&self, cell_spacing: f64, first_cell_offset: f64) -> RadarCoordinateSystem {
        RadarCoordinateSystem {
            origin: self.origin,
            cell_spacing,
            first_cell_offset,
        }
    }

    /// Reflectivity moments get a deeper RHI slice
    pub fn is_reflectivity(&self) -> bool {
        self.moment == crate::types::REFLECTIVITY || self.unit.eq_ignore_ascii_case("dbz")
    }
}
