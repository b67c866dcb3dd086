//! Range-height indicator products

use crate::core::cuts::CutMode;
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{clean, data_or_none, VolumeTables};
use crate::io::dataset::RadialDataset;
use crate::types::{GridDomain, RadarError, RadarResult, ResampledGrid};

/// RHI processor
pub struct RhiProcessor<'a> {
    params: &'a ResampleParams,
}

/// Rows of a wedge grid before flattening
struct Wedges {
    bins: usize,
    ranges: Vec<f32>,
    azimuth: f32,
    half_beam: f32,
    columns: Vec<(f32, Vec<f32>)>,
}

impl Wedges {
    /// Each column becomes two rows, at elevation minus and plus half a beam
    fn into_grid(self, ctx: &ProductContext, step: f64, first: f64, fixed_angle: f64) -> ResampledGrid {
        let cells = self.bins * 2 * self.columns.len();
        let mut values = Vec::with_capacity(cells);
        let mut ranges = Vec::with_capacity(cells);
        let mut azimuths = Vec::with_capacity(cells);
        let mut elevations = Vec::with_capacity(cells);

        for (elevation, column) in &self.columns {
            for edge in [elevation - self.half_beam, elevation + self.half_beam] {
                for i in 0..self.bins {
                    values.push(column.get(i).copied().unwrap_or(f32::NAN));
                    ranges.push(self.ranges[i]);
                    azimuths.push(self.azimuth);
                    elevations.push(edge);
                }
            }
        }

        ResampledGrid {
            domain: GridDomain::RangeAzimuthElevation,
            shape: vec![self.bins, 2, self.columns.len()],
            coordinate_names: vec!["range".to_string(), "azimuth".to_string(), "elevation".to_string()],
            coordinates: vec![ranges, azimuths, elevations],
            values,
            unit: ctx.unit.clone(),
            coordinate_system: ctx.coordinate_system(step, first + step / 2.0),
            fixed_angle: Some(fixed_angle),
            level: None,
        }
    }
}

fn range_axis(bins: usize, step: f64, first: f64) -> Vec<f32> {
    (0..bins).map(|i| (first + step / 2.0 + i as f64 * step) as f32).collect()
}

impl<'a> RhiProcessor<'a> {
    pub fn new(params: &'a ResampleParams) -> Self {
        Self { params }
    }

    /// Vertical slice through a plan-position volume at `azimuth`
    pub fn rhi(&self, tables: &VolumeTables, ctx: &ProductContext, azimuth: f64) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Elevation {
            return Err(RadarError::Unsupported("RHI slice needs elevation cuts".to_string()));
        }
        if !azimuth.is_finite() {
            return Err(RadarError::InvalidRange(format!("RHI azimuth {}", azimuth)));
        }
        let Some(first_cut) = tables.cuts.first() else {
            log::warn!("No cuts available for RHI");
            return Ok(None);
        };

        let azimuth = if azimuth > 359.5 { 0.0 } else { azimuth.rem_euclid(360.0) };
        let bins_per_turn = self.params.azimuth_bins.max(1);
        let res = 360.0 / bins_per_turn as f64;
        let mut bin = ((azimuth + res / 2.0) / res) as usize;
        if bin >= bins_per_turn {
            bin = 0;
        }

        let gates = tables.gates;
        let bins = if ctx.is_reflectivity() {
            gates.max(self.params.rhi_reflectivity_min_bins)
        } else {
            self.params.rhi_bin_count
        };
        log::info!("Building RHI at {:.1} deg (bin {}) with {} range bins", azimuth, bin, bins);

        let columns: Vec<(f32, Vec<f32>)> = tables
            .cuts
            .iter()
            .filter(|cut| cut.info.mean_elevation.is_finite())
            .map(|cut| {
                let column = (0..gates.min(bins)).map(|g| cut.binned_sample(bin, g)).collect();
                (cut.info.mean_elevation, column)
            })
            .collect();

        let step = first_cut.info.gate_size as f64;
        let first = first_cut.info.range_to_first_gate as f64;
        let wedges = Wedges {
            bins,
            ranges: range_axis(bins, step, first),
            azimuth: azimuth as f32,
            half_beam: (self.params.rhi_beam_width / 2.0) as f32,
            columns,
        };

        Ok(Some(wedges.into_grid(ctx, step, first, azimuth)))
    }

    /// One sweep of an RHI dataset, rays ordered by elevation
    pub fn rhi_sweep(
        &self,
        dataset: &dyn RadialDataset,
        variable: &str,
        sweep: usize,
        azimuth: f64,
        ctx: &ProductContext,
    ) -> RadarResult<Option<ResampledGrid>> {
        log::info!("Building RHI sweep {} of {} at {:.1} deg", sweep, variable, azimuth);

        let Some(info) = data_or_none(dataset.sweep(variable, sweep), "RHI sweep")? else {
            return Ok(None);
        };
        let Some(data) = data_or_none(dataset.read_sweep(variable, sweep), "RHI sweep")? else {
            return Ok(None);
        };

        let n = info.elevations.len().min(data.nrows());
        let gates = info.gate_count.min(data.ncols());
        if n == 0 || gates == 0 {
            log::warn!("RHI sweep {} of {} is empty", sweep, variable);
            return Ok(None);
        }

        let elevations = fill_missing_elevations(&info.elevations[..n], self.params.missing_elevation_step as f32);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| elevations[a].total_cmp(&elevations[b]));

        let columns = order
            .iter()
            .map(|&ray| {
                let column = (0..gates).map(|g| clean(data[[ray, g]])).collect();
                (elevations[ray], column)
            })
            .collect();

        let step = info.gate_size as f64;
        let first = info.range_to_first_gate as f64;
        let wedges = Wedges {
            bins: gates,
            ranges: range_axis(gates, step, first),
            azimuth: azimuth as f32,
            half_beam: (self.params.rhi_beam_width / 2.0) as f32,
            columns,
        };

        Ok(Some(wedges.into_grid(ctx, step, first, azimuth)))
    }
}

/// The first missing elevation becomes 0, later ones climb `step` above the
/// previous ray
pub fn fill_missing_elevations(elevations: &[f32], step: f32) -> Vec<f32> {
    let mut filled: Vec<f32> = Vec::with_capacity(elevations.len());
    for (i, &e) in elevations.iter().enumerate() {
        let value = if e.is_finite() {
            e
        } else if i == 0 {
            0.0
        } else {
            filled[i - 1] + step
        };
        filled.push(value);
    }
    filled
}
