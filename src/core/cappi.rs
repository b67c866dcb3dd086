use crate::core::cuts::CutMode;
use crate::core::geometry::{calc_range_bin, slant_range_and_elevation, value_from_ray};
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{clean, VolumeTables};
use crate::types::{GridDomain, RadarError, RadarResult, ResampledGrid};
use ndarray::Array2;

/// Constant-altitude PPI processor
pub struct CappiProcessor<'a> {
    params: &'a ResampleParams,
}

impl<'a> CappiProcessor<'a> {
    pub fn new(params: &'a ResampleParams) -> Self {
        Self { params }
    }

    /// Horizontal (range, azimuth) slice `level_m` meters above the antenna.
    ///
    /// Each range ring is served by the cut whose beam passes through the
    /// level at that ground distance; rings no cut reaches within half a beam
    /// width are NaN.
    pub fn cappi(&self, tables: &VolumeTables, ctx: &ProductContext, level_m: f64) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Elevation {
            return Err(RadarError::Unsupported("CAPPI needs elevation cuts".to_string()));
        }
        if !level_m.is_finite() {
            return Err(RadarError::InvalidRange(format!("CAPPI level {}", level_m)));
        }
        let Some(last) = tables.cuts.last() else {
            log::warn!("No cuts available for CAPPI");
            return Ok(None);
        };
        if tables.gates == 0 {
            return Ok(None);
        }
        log::info!("Building CAPPI at {:.0} m from {} cuts", level_m, tables.cuts.len());

        let step = last.info.gate_size as f64;
        let first = last.info.range_to_first_gate as f64;
        let half_beam = last.half_beam_width();
        let gates = tables.gates;
        let bins = self.params.azimuth_bins;
        let reach = ring_limit(tables, half_beam, level_m, step, gates);

        // cut and slant range serving each range ring
        let rings: Vec<Option<(usize, f64)>> = (0..gates)
            .map(|b| {
                if b >= reach {
                    return None;
                }
                let ground_km = (first + b as f64 * step) / 1000.0;
                let (slant_km, elevation) = slant_range_and_elevation(ground_km, level_m / 1000.0);
                tables.closest_cut(elevation, half_beam).map(|c| (c, slant_km))
            })
            .collect();
        log::debug!(
            "CAPPI rings served: {} of {} ({} within reach of the lowest beam)",
            rings.iter().filter(|r| r.is_some()).count(),
            gates,
            reach
        );

        let mut values = Array2::from_elem((bins, gates), f32::NAN);
        for (b, ring) in rings.iter().enumerate() {
            let Some((c, slant_km)) = *ring else {
                continue;
            };
            let cut = &tables.cuts[c];
            for az in 0..bins {
                let Some(ray) = cut.rays.get(az).copied().flatten().and_then(|r| cut.ray(r)) else {
                    continue;
                };
                let v = match ray.as_slice() {
                    Some(samples) => value_from_ray(
                        samples,
                        slant_km,
                        cut.info.gate_size as f64,
                        cut.info.range_to_first_gate as f64,
                    ),
                    None => f32::NAN,
                };
                values[[az, b]] = clean(v);
            }
        }

        let az_step = 360.0 / bins as f32;
        let ranges: Vec<f32> = (0..bins)
            .flat_map(|_| (0..gates).map(move |b| (first + step / 2.0 + b as f64 * step) as f32))
            .collect();
        let azimuths: Vec<f32> = (0..bins)
            .flat_map(|az| std::iter::repeat(az as f32 * az_step).take(gates))
            .collect();

        Ok(Some(ResampledGrid {
            domain: GridDomain::RangeAzimuth,
            shape: vec![gates, bins],
            coordinate_names: vec!["range".to_string(), "azimuth".to_string()],
            coordinates: vec![ranges, azimuths],
            values: values.into_raw_vec(),
            unit: ctx.unit.clone(),
            coordinate_system: ctx.coordinate_system(step, first + step / 2.0),
            fixed_angle: None,
            level: Some(ctx.origin.altitude + level_m),
        }))
    }
}

/// First range ring past the point where the lower edge of the lowest beam
/// climbs through `level_m`. Farther rings need a lower elevation than any cut
/// offers.
fn ring_limit(tables: &VolumeTables, half_beam: f64, level_m: f64, step_m: f64, gates: usize) -> usize {
    let lowest = tables
        .cuts
        .iter()
        .map(|cut| cut.fixed_angle(tables.mode))
        .filter(|e| e.is_finite())
        .fold(f64::INFINITY, f64::min);
    if !lowest.is_finite() {
        return gates;
    }
    // one spare ring for rounding between the beam models
    calc_range_bin(lowest - half_beam, level_m, step_m / 1000.0).map_or(gates, |bin| (bin + 2).min(gates))
}
