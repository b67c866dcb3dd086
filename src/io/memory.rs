//! In-memory radial datasets, for synthetic volumes and tests

use crate::io::dataset::{
    missing_variable, DatasetMetadata, DatasetOpener, RadialDataset, RasterData, SweepInfo, VariableInfo,
};
use crate::types::{RadarError, RadarResult};
use ndarray::Array2;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One sweep held in memory
#[derive(Debug, Clone)]
pub struct MemorySweep {
    pub info: SweepInfo,
    /// (ray, gate) samples
    pub data: Array2<f32>,
}

impl MemorySweep {
    /// Evenly spaced rays starting at north, every sample set to `value`
    pub fn uniform(elevation: f32, rays: usize, gates: usize, value: f32) -> Self {
        Self::from_fn(elevation, rays, gates, |_, _| value)
    }

    /// Evenly spaced rays starting at north, samples from `f(ray, gate)`
    pub fn from_fn<F>(elevation: f32, rays: usize, gates: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f32,
    {
        let step = 360.0 / rays.max(1) as f32;
        let info = SweepInfo {
            azimuths: (0..rays).map(|r| r as f32 * step).collect(),
            elevations: vec![elevation; rays],
            mean_elevation: elevation,
            beam_width: 0.95,
            gate_size: 250.0,
            range_to_first_gate: 0.0,
            radial_count: rays,
            gate_count: gates,
        };
        let data = Array2::from_shape_fn((rays, gates), |(r, g)| f(r, g));
        Self { info, data }
    }

    /// Fixed-azimuth scan climbing `step` degrees per ray from `start`
    pub fn rhi(azimuth: f32, start: f32, step: f32, rays: usize, gates: usize, value: f32) -> Self {
        let mut sweep = Self::uniform(start, rays, gates, value);
        sweep.info.azimuths = vec![azimuth; rays];
        sweep.info.elevations = (0..rays).map(|r| start + r as f32 * step).collect();
        sweep.info.mean_elevation = start + step * (rays.saturating_sub(1)) as f32 / 2.0;
        sweep
    }

    pub fn with_gates(mut self, gate_size: f32, range_to_first_gate: f32) -> Self {
        self.info.gate_size = gate_size;
        self.info.range_to_first_gate = range_to_first_gate;
        self
    }

    pub fn with_beam_width(mut self, beam_width: f32) -> Self {
        self.info.beam_width = beam_width;
        self
    }
}

/// A data variable held in memory
#[derive(Debug, Clone)]
pub struct MemoryVariable {
    pub name: String,
    pub units: String,
    pub sweeps: Vec<MemorySweep>,
}

impl MemoryVariable {
    pub fn new(name: &str, units: &str, sweeps: Vec<MemorySweep>) -> Self {
        Self {
            name: name.to_string(),
            units: units.to_string(),
            sweeps,
        }
    }
}

/// Radial dataset backed by in-memory arrays.
///
/// Clones share their read and close counters, so a handle kept by the
/// caller observes every access made through the adapter's copy.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    metadata: DatasetMetadata,
    variables: Vec<MemoryVariable>,
    rasters: HashMap<String, RasterData>,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MemoryDataset {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            metadata,
            variables: Vec::new(),
            rasters: HashMap::new(),
            reads: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_variable(mut self, variable: MemoryVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_raster(mut self, variable: &str, raster: RasterData) -> Self {
        self.rasters.insert(variable.to_string(), raster);
        self
    }

    pub fn metadata_mut(&mut self) -> &mut DatasetMetadata {
        &mut self.metadata
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut MemoryVariable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Number of data reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of times the dataset was closed
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn find(&self, variable: &str) -> RadarResult<&MemoryVariable> {
        self.variables
            .iter()
            .find(|v| v.name == variable)
            .ok_or_else(|| missing_variable(variable))
    }

    fn find_sweep(&self, variable: &str, sweep: usize) -> RadarResult<&MemorySweep> {
        self.find(variable)?.sweeps.get(sweep).ok_or_else(|| {
            RadarError::DataRead(format!("Sweep {} out of range for {}", sweep, variable))
        })
    }
}

impl RadialDataset for MemoryDataset {
    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    fn variables(&self) -> Vec<VariableInfo> {
        self.variables
            .iter()
            .map(|v| VariableInfo {
                name: v.name.clone(),
                units: v.units.clone(),
                sweep_count: v.sweeps.len(),
            })
            .chain(self.rasters.iter().map(|(name, r)| VariableInfo {
                name: name.clone(),
                units: r.units.clone(),
                sweep_count: 0,
            }))
            .collect()
    }

    fn sweep(&self, variable: &str, sweep: usize) -> RadarResult<SweepInfo> {
        Ok(self.find_sweep(variable, sweep)?.info.clone())
    }

    fn read_ray(&self, variable: &str, sweep: usize, ray: usize) -> RadarResult<Vec<f32>> {
        let s = self.find_sweep(variable, sweep)?;
        if ray >= s.data.nrows() {
            return Err(RadarError::DataRead(format!("Ray {} out of range", ray)));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(s.data.row(ray).to_vec())
    }

    fn read_sweep(&self, variable: &str, sweep: usize) -> RadarResult<Array2<f32>> {
        let s = self.find_sweep(variable, sweep)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(s.data.clone())
    }

    fn raster(&self, variable: &str) -> RadarResult<Option<RasterData>> {
        let raster = self.rasters.get(variable).cloned();
        if raster.is_some() {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(raster)
    }

    fn close(&mut self) -> RadarResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opener serving a fixed set of in-memory datasets by name
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    datasets: HashMap<String, MemoryDataset>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, dataset: MemoryDataset) {
        self.datasets.insert(source.to_string(), dataset);
    }
}

impl DatasetOpener for MemoryOpener {
    fn open(&self, source: &str) -> RadarResult<Box<dyn RadialDataset>> {
        self.datasets
            .get(source)
            .map(|d| Box::new(d.clone()) as Box<dyn RadialDataset>)
            .ok_or_else(|| RadarError::DataRead(format!("Cannot open {}", source)))
    }
}
