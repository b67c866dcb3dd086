use crate::core::cuts::CutMode;
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::VolumeTables;
use crate::types::{GridDomain, RadarError, RadarResult, ResampledGrid};

/// Volume processor: stacks every cut of a variable into one 3-D grid
pub struct VolumeProcessor<'a> {
    params: &'a ResampleParams,
}

impl<'a> VolumeProcessor<'a> {
    pub fn new(params: &'a ResampleParams) -> Self {
        Self { params }
    }

    /// (range, azimuth, elevation) grid over all plan-position cuts, one
    /// column per whole-degree azimuth
    pub fn volume(&self, tables: &VolumeTables, ctx: &ProductContext) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Elevation {
            return Err(RadarError::Unsupported("volume needs elevation cuts".to_string()));
        }
        if tables.is_empty() {
            log::warn!("No cuts available for volume");
            return Ok(None);
        }
        log::info!("Building volume from {} cuts", tables.cuts.len());

        let bins = self.params.azimuth_bins;
        let step = 360.0 / bins as f32;
        self.stack(tables, ctx, bins, |b| b as f32 * step, ["range", "azimuth", "elevation"])
    }

    /// (range, elevation, azimuth) grid over all fixed-azimuth cuts of an RHI
    /// dataset, one column per whole-degree elevation
    pub fn rhi_volume(&self, tables: &VolumeTables, ctx: &ProductContext) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Azimuth {
            return Err(RadarError::Unsupported("RHI volume needs azimuth cuts".to_string()));
        }
        if tables.is_empty() {
            log::warn!("No cuts available for RHI volume");
            return Ok(None);
        }
        log::info!("Building RHI volume from {} cuts", tables.cuts.len());

        let bins = self.params.rhi_elevation_bins;
        self.stack(tables, ctx, bins, |b| b as f32, ["range", "elevation", "azimuth"])
    }

    fn stack<F>(
        &self,
        tables: &VolumeTables,
        ctx: &ProductContext,
        bins: usize,
        bin_angle: F,
        names: [&str; 3],
    ) -> RadarResult<Option<ResampledGrid>>
    where
        F: Fn(usize) -> f32,
    {
        let gates = tables.gates;
        let Some(last) = tables.cuts.last() else {
            return Ok(None);
        };
        let step = last.info.gate_size as f64;
        let first = last.info.range_to_first_gate as f64;

        let cells = gates * bins * tables.cuts.len();
        let mut values = Vec::with_capacity(cells);
        let mut ranges = Vec::with_capacity(cells);
        let mut angles = Vec::with_capacity(cells);
        let mut fixed = Vec::with_capacity(cells);

        for cut in &tables.cuts {
            let cut_angle = cut.fixed_angle(tables.mode) as f32;
            for bin in 0..bins {
                let angle = bin_angle(bin);
                for gate in 0..gates {
                    values.push(cut.binned_sample(bin, gate));
                    ranges.push((first + step / 2.0 + gate as f64 * step) as f32);
                    angles.push(angle);
                    fixed.push(cut_angle);
                }
            }
        }

        Ok(Some(ResampledGrid {
            domain: GridDomain::RangeAzimuthElevation,
            shape: vec![gates, bins, tables.cuts.len()],
            coordinate_names: names.iter().map(|s| s.to_string()).collect(),
            coordinates: vec![ranges, angles, fixed],
            values,
            unit: ctx.unit.clone(),
            coordinate_system: ctx.coordinate_system(step, first + step / 2.0),
            fixed_angle: None,
            level: None,
        }))
    }
}
