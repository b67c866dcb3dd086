use crate::types::{RadarError, RadarResult};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Global attribute value of a radial dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::Number(v) => v.to_string(),
            AttributeValue::Text(s) => s.clone(),
        }
    }
}

/// Dataset-wide metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub data_format: String,
    pub base_time: DateTime<Utc>,
    pub attributes: HashMap<String, AttributeValue>,
}

impl DatasetMetadata {
    pub fn new(data_format: &str, base_time: DateTime<Utc>) -> Self {
        Self {
            station_id: None,
            station_name: None,
            data_format: data_format.to_string(),
            base_time,
            attributes: HashMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// First numeric attribute found among `names`
    pub fn number(&self, names: &[&str]) -> Option<f64> {
        names
            .iter()
            .find_map(|name| self.attributes.get(*name).and_then(AttributeValue::as_f64))
    }
}

/// A data variable (moment) of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub units: String,
    pub sweep_count: usize,
}

/// Ray geometry and scalar metadata of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepInfo {
    pub azimuths: Vec<f32>,        // degrees, NaN for missing rays
    pub elevations: Vec<f32>,      // degrees
    pub mean_elevation: f32,       // degrees
    pub beam_width: f32,           // degrees
    pub gate_size: f32,            // meters
    pub range_to_first_gate: f32,  // meters
    pub radial_count: usize,
    pub gate_count: usize,
}

impl SweepInfo {
    /// Circular mean of the valid ray azimuths, in [0, 360)
    pub fn mean_azimuth(&self) -> f32 {
        let (sin, cos, n) = self
            .azimuths
            .iter()
            .filter(|a| a.is_finite())
            .map(|&a| (a as f64).to_radians())
            .fold((0.0_f64, 0.0_f64, 0usize), |(s, c, n), a| (s + a.sin(), c + a.cos(), n + 1));
        if n == 0 || (sin == 0.0 && cos == 0.0) {
            return f32::NAN;
        }
        let mean = sin.atan2(cos).to_degrees().rem_euclid(360.0) as f32;
        if mean >= 360.0 {
            0.0
        } else {
            mean
        }
    }
}

/// Gridded product carried by a raster dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterData {
    pub nx: usize,
    pub ny: usize,
    pub resolution: f64,  // meters
    /// Row-major, `ny` rows of `nx` values
    pub values: Vec<f32>,
    pub units: String,
    /// Rows run south to north
    pub y_ascending: bool,
}

/// An opened radial dataset
pub trait RadialDataset: Send {
    fn metadata(&self) -> &DatasetMetadata;

    fn variables(&self) -> Vec<VariableInfo>;

    fn sweep(&self, variable: &str, sweep: usize) -> RadarResult<SweepInfo>;

    fn read_ray(&self, variable: &str, sweep: usize, ray: usize) -> RadarResult<Vec<f32>>;

    /// All rays of a sweep as a (ray, gate) matrix
    fn read_sweep(&self, variable: &str, sweep: usize) -> RadarResult<Array2<f32>> {
        let info = self.sweep(variable, sweep)?;
        let mut data = Array2::from_elem((info.radial_count, info.gate_count), f32::NAN);
        for ray in 0..info.radial_count {
            let values = self.read_ray(variable, sweep, ray)?;
            for (gate, v) in values.into_iter().take(info.gate_count).enumerate() {
                data[[ray, gate]] = v;
            }
        }
        Ok(data)
    }

    /// Gridded product of a raster dataset
    fn raster(&self, variable: &str) -> RadarResult<Option<RasterData>> {
        let _ = variable;
        Ok(None)
    }

    /// Release memory held by the reader
    fn clear_memory(&mut self) {}

    fn close(&mut self) -> RadarResult<()>;
}

/// Opens radial datasets by source name
pub trait DatasetOpener: Send + Sync {
    fn open(&self, source: &str) -> RadarResult<Box<dyn RadialDataset>>;
}

pub(crate) fn missing_variable(variable: &str) -> RadarError {
    RadarError::DataRead(format!("No variable named {}", variable))
}
