//! Lat/lon/altitude gridding of a plan-position volume
//!
//! Every grid point is traced back to the radar, the two cuts bracketing its
//! elevation and the two rays bracketing its azimuth in each cut. Up to four
//! range-interpolated ray samples are then blended.

use crate::core::cuts::CutMode;
use crate::core::geometry::{angle_diff, elevation_deg, find_point, lat_lon_to_range_azimuth};
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{CutTable, VolumeTables};
use crate::types::{GridDomain, LatLon, RadarError, RadarResult, ResampledGrid};

/// Horizontal position of one grid column
#[derive(Debug, Clone, Copy)]
struct Column {
    point: LatLon,
    ground_km: f64,
    azimuth: f64,
}

/// One ray sample contributing to a grid point
#[derive(Debug, Clone, Copy)]
struct Neighbour {
    value: f32,
    bilinear: f64,
    azimuth_offset: f64,
    elevation_offset: f64,
}

/// Gridded volume processor
pub struct GridVolumeProcessor<'a> {
    params: &'a ResampleParams,
}

impl<'a> GridVolumeProcessor<'a> {
    pub fn new(params: &'a ResampleParams) -> Self {
        Self { params }
    }

    /// (longitude, latitude, altitude) grid around the radar
    pub fn grid_volume(&self, tables: &VolumeTables, ctx: &ProductContext) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Elevation {
            return Err(RadarError::Unsupported("gridded volume needs elevation cuts".to_string()));
        }
        if tables.is_empty() {
            log::warn!("No cuts available for gridded volume");
            return Ok(None);
        }

        let (nx, ny, nz) = self.params.grid_dims;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(RadarError::InvalidRange(format!("grid dimensions {}x{}x{}", nx, ny, nz)));
        }
        let (min_km, max_km) = self.params.grid_extent_km;
        let step_km = axis_step(min_km, max_km, nx.max(ny));
        log::info!(
            "Building {}x{}x{} gridded volume from {} cuts",
            nx,
            ny,
            nz,
            tables.cuts.len()
        );

        let radar = ctx.origin.lat_lon();
        let columns: Vec<Column> = (0..ny)
            .flat_map(|iy| (0..nx).map(move |ix| (ix, iy)))
            .map(|(ix, iy)| {
                let x = min_km + axis_step(min_km, max_km, nx) * ix as f64;
                let y = min_km + axis_step(min_km, max_km, ny) * iy as f64;
                let point = find_point(radar, x.atan2(y).to_degrees().rem_euclid(360.0), x.hypot(y));
                let (ground_km, azimuth) = lat_lon_to_range_azimuth(radar, point);
                Column { point, ground_km, azimuth }
            })
            .collect();

        let levels: Vec<f64> = (0..nz)
            .map(|iz| self.params.grid_first_level_m + iz as f64 * self.params.grid_level_spacing_m)
            .collect();

        let level_values = |level_m: &f64| -> Vec<f32> {
            columns
                .iter()
                .map(|column| self.point_value(tables, column, level_m / 1000.0))
                .collect()
        };

        #[cfg(feature = "parallel")]
        let planes: Vec<Vec<f32>> = {
            use rayon::prelude::*;
            levels.par_iter().map(level_values).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let planes: Vec<Vec<f32>> = levels.iter().map(level_values).collect();

        let cells = nx * ny * nz;
        let mut lons = Vec::with_capacity(cells);
        let mut lats = Vec::with_capacity(cells);
        let mut alts = Vec::with_capacity(cells);
        for level_m in &levels {
            for column in &columns {
                lons.push(column.point.lon as f32);
                lats.push(column.point.lat as f32);
                alts.push((ctx.origin.altitude + level_m) as f32);
            }
        }
        let values: Vec<f32> = planes.into_iter().flatten().collect();
        log::debug!(
            "Gridded volume has {} of {} valid cells",
            values.iter().filter(|v| v.is_finite()).count(),
            cells
        );

        Ok(Some(ResampledGrid {
            domain: GridDomain::LatLonAltitude,
            shape: vec![nx, ny, nz],
            coordinate_names: vec!["longitude".to_string(), "latitude".to_string(), "altitude".to_string()],
            coordinates: vec![lons, lats, alts],
            values,
            unit: ctx.unit.clone(),
            coordinate_system: ctx.coordinate_system(step_km * 1000.0, min_km * 1000.0),
            fixed_angle: None,
            level: None,
        }))
    }

    fn point_value(&self, tables: &VolumeTables, column: &Column, height_km: f64) -> f32 {
        let elevation = elevation_deg(height_km, column.ground_km);
        let slant_km = height_km.hypot(column.ground_km);

        let Some((lower, upper)) = bracket_cuts(tables, elevation) else {
            return f32::NAN;
        };

        let mut neighbours: Vec<Neighbour> = Vec::with_capacity(4);
        let elevation_weights = if lower == upper {
            vec![(lower, 1.0)]
        } else {
            let e0 = tables.cuts[lower].fixed_angle(CutMode::Elevation);
            let e1 = tables.cuts[upper].fixed_angle(CutMode::Elevation);
            let w = ((elevation - e0) / (e1 - e0)).clamp(0.0, 1.0);
            vec![(lower, 1.0 - w), (upper, w)]
        };

        for (c, ew) in elevation_weights {
            let cut = &tables.cuts[c];
            let cut_elevation = cut.fixed_angle(CutMode::Elevation);
            for (ray, ray_azimuth, aw) in bracket_rays(cut, column.azimuth) {
                let value = range_sample(cut, ray, slant_km * 1000.0);
                if value.is_finite() {
                    neighbours.push(Neighbour {
                        value,
                        bilinear: ew * aw,
                        azimuth_offset: angle_diff(ray_azimuth, column.azimuth),
                        elevation_offset: (cut_elevation - elevation).abs(),
                    });
                }
            }
        }

        blend(&neighbours)
    }
}

fn axis_step(min: f64, max: f64, n: usize) -> f64 {
    if n > 1 {
        (max - min) / (n - 1) as f64
    } else {
        0.0
    }
}

/// Cuts below and above `elevation`; the same cut twice at the edges of the
/// volume. `None` more than half a beam outside the volume.
fn bracket_cuts(tables: &VolumeTables, elevation: f64) -> Option<(usize, usize)> {
    if !elevation.is_finite() {
        return None;
    }
    let first = tables.cuts.first()?;
    let last = tables.cuts.last()?;
    let n = tables.cuts.len();
    let angle = |i: usize| tables.cuts[i].fixed_angle(CutMode::Elevation);

    if elevation < angle(0) {
        return (angle(0) - elevation <= first.half_beam_width()).then_some((0, 0));
    }
    if elevation >= angle(n - 1) {
        return (elevation - angle(n - 1) <= last.half_beam_width()).then_some((n - 1, n - 1));
    }
    let upper = tables.cuts.partition_point(|cut| cut.fixed_angle(CutMode::Elevation) <= elevation);
    Some((upper - 1, upper))
}

/// Rays on either side of `azimuth` with their linear azimuth weights
fn bracket_rays(cut: &CutTable, azimuth: f64) -> Vec<(usize, f64, f64)> {
    let sorted = cut.index.sorted();
    match sorted.len() {
        0 => Vec::new(),
        1 => vec![(sorted[0].ray, sorted[0].angle, 1.0)],
        len => {
            let after = sorted.partition_point(|e| e.angle <= azimuth) % len;
            let before = (after + len - 1) % len;
            let (a, b) = (sorted[before], sorted[after]);

            let da = angle_diff(a.angle, azimuth);
            let db = angle_diff(b.angle, azimuth);
            let span = da + db;
            if span <= 0.0 {
                return vec![(a.ray, a.angle, 1.0)];
            }
            vec![(a.ray, a.angle, db / span), (b.ray, b.angle, da / span)]
        }
    }
}

/// Linear interpolation between the two gates around `range_m`
fn range_sample(cut: &CutTable, ray: usize, range_m: f64) -> f32 {
    let gate = cut.info.gate_size as f64;
    if gate <= 0.0 {
        return f32::NAN;
    }
    let pos = (range_m - cut.info.range_to_first_gate as f64) / gate;
    if pos < 0.0 {
        return f32::NAN;
    }
    let inner = pos.floor() as usize;
    let w = (pos - pos.floor()) as f32;
    let v0 = cut.sample(ray, inner);
    let v1 = cut.sample(ray, inner + 1);

    match (v0.is_finite(), v1.is_finite()) {
        (true, true) => v0 * (1.0 - w) + v1 * w,
        (true, false) => v0,
        (false, true) if w >= 0.5 => v1,
        _ => f32::NAN,
    }
}

fn blend(neighbours: &[Neighbour]) -> f32 {
    let weights: Vec<f64> = match neighbours.len() {
        0 | 1 => return f32::NAN,
        2 => neighbours
            .iter()
            .map(|n| 1.0 / n.azimuth_offset.hypot(n.elevation_offset).max(1e-6))
            .collect(),
        _ => neighbours.iter().map(|n| n.bilinear).collect(),
    };

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return f32::NAN;
    }
    let sum: f64 = neighbours
        .iter()
        .zip(&weights)
        .map(|(n, w)| n.value as f64 * w)
        .sum();
    (sum / total) as f32
}
