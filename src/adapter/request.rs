use crate::types::{KeyFloat, LatLon, ProductKey};
use serde::{Deserialize, Serialize};

/// Endpoints of a vertical cross-section; either missing selects the
/// default south-north line through the radar
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CrossSectionLine {
    pub start: Option<LatLon>,
    pub end: Option<LatLon>,
}

impl CrossSectionLine {
    pub fn new(start: LatLon, end: LatLon) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub(crate) fn key(&self) -> ProductKey {
        let pair = |p: Option<LatLon>| match p {
            Some(p) => [KeyFloat(p.lat), KeyFloat(p.lon)],
            None => [KeyFloat(f64::NAN), KeyFloat(f64::NAN)],
        };
        ProductKey::CrossSection {
            start: pair(self.start),
            end: pair(self.end),
        }
    }
}

/// What to resample.
///
/// A volume request with 3-D values is served, in order of precedence, as a
/// CAPPI, a cross-section, an RHI slice, a radar-space volume or a gridded
/// volume. Anything else is a single sweep (or an RHI sweep for RHI
/// datasets, or the raster of a raster dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Moment index, part of the cache key
    pub moment: usize,
    /// Dataset variable holding the moment
    pub variable: String,
    pub volume: bool,
    pub values_3d: bool,
    /// Sweeps come back as (range, azimuth) instead of (range, azimuth, elevation)
    pub in_2d: bool,
    /// Meters above the radar
    pub cappi_level: Option<f64>,
    pub cross_section: Option<CrossSectionLine>,
    /// RHI slice azimuth
    pub azimuth: Option<f64>,
    /// Sweep elevation, or sweep azimuth for RHI datasets
    pub angle: Option<f64>,
    pub sweep_index: Option<usize>,
    /// Volume in radar coordinates instead of lat/lon/altitude
    pub radar_volume: bool,
}

impl DataRequest {
    pub fn new(moment: usize, variable: &str) -> Self {
        Self {
            moment,
            variable: variable.to_string(),
            volume: false,
            values_3d: true,
            in_2d: false,
            cappi_level: None,
            cross_section: None,
            azimuth: None,
            angle: None,
            sweep_index: None,
            radar_volume: false,
        }
    }

    /// Single sweep at `angle`; the index is looked up when not given
    pub fn sweep(mut self, angle: f64, index: Option<usize>) -> Self {
        self.volume = false;
        self.angle = Some(angle);
        self.sweep_index = index;
        self
    }

    pub fn in_2d(mut self) -> Self {
        self.in_2d = true;
        self
    }

    /// Gridded lat/lon/altitude volume
    pub fn volume(mut self) -> Self {
        self.volume = true;
        self.values_3d = true;
        self
    }

    /// Volume in (range, azimuth, elevation) space
    pub fn radar_volume(mut self) -> Self {
        self.radar_volume = true;
        self.volume()
    }

    pub fn cappi(mut self, level_m: f64) -> Self {
        self.cappi_level = Some(level_m);
        self.volume()
    }

    pub fn rhi(mut self, azimuth: f64) -> Self {
        self.azimuth = Some(azimuth);
        self.volume()
    }

    pub fn cross_section(mut self, line: CrossSectionLine) -> Self {
        self.cross_section = Some(line);
        self.volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_volume_flags() {
        let r = DataRequest::new(0, "Reflectivity").cappi(2000.0);
        assert!(r.volume && r.values_3d);
        assert_eq!(r.cappi_level, Some(2000.0));

        let r = DataRequest::new(1, "Velocity").sweep(0.5, Some(0)).in_2d();
        assert!(!r.volume && r.in_2d);
        assert_eq!(r.sweep_index, Some(0));
    }

    #[test]
    fn test_default_cross_section_key_is_stable() {
        let a = CrossSectionLine::default().key();
        let b = CrossSectionLine::default().key();
        assert_eq!(a, b);
        assert_ne!(a, CrossSectionLine::new(LatLon::new(1.0, 2.0), LatLon::new(3.0, 4.0)).key());
    }
}
