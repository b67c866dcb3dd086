//! Single-sweep (PPI) product

use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{clean, data_or_none};
use crate::io::dataset::RadialDataset;
use crate::types::{GridDomain, RadarResult, ResampledGrid};

/// Azimuth given to rays without one, so they sort behind every real ray
const MISSING_AZIMUTH: f32 = 361.0;

/// Ray of the output grid: source ray and the azimuth it is drawn at
#[derive(Debug, Clone, Copy, PartialEq)]
struct OutputRay {
    source: usize,
    azimuth: f32,
}

/// Resample one sweep onto a (gate, azimuth) grid, or a (gate, azimuth,
/// elevation) grid when `want_3d` is set.
///
/// Returns `Ok(None)` when the sweep cannot be read or holds no valid ray.
pub fn resample_sweep(
    dataset: &dyn RadialDataset,
    variable: &str,
    sweep: usize,
    elevation: f64,
    want_3d: bool,
    ctx: &ProductContext,
    params: &ResampleParams,
) -> RadarResult<Option<ResampledGrid>> {
    log::info!("Resampling sweep {} of {} at {:.2} deg", sweep, variable, elevation);

    let Some(info) = data_or_none(dataset.sweep(variable, sweep), "sweep")? else {
        return Ok(None);
    };
    let Some(data) = data_or_none(dataset.read_sweep(variable, sweep), "sweep")? else {
        return Ok(None);
    };

    let gates = info.gate_count.min(data.ncols());
    let n = info.azimuths.len().min(data.nrows());
    if gates == 0 || n == 0 {
        log::warn!("Sweep {} of {} is empty", sweep, variable);
        return Ok(None);
    }

    let azimuths: Vec<f32> = info.azimuths[..n]
        .iter()
        .map(|&a| if a.is_nan() { MISSING_AZIMUTH } else { a })
        .collect();

    let rays = output_rays(&azimuths, params.sort_span_threshold);
    if rays.is_empty() {
        log::warn!("Sweep {} of {} has no valid rays", sweep, variable);
        return Ok(None);
    }
    log::debug!("Sweep {} resampled onto {} rays x {} gates", sweep, rays.len(), gates);

    let cells = rays.len() * gates;
    let mut values = Vec::with_capacity(cells);
    let mut gate_coord = Vec::with_capacity(cells);
    let mut az_coord = Vec::with_capacity(cells);
    let mut elev_coord = Vec::with_capacity(if want_3d { cells } else { 0 });

    for ray in &rays {
        let missing = azimuths[ray.source] >= MISSING_AZIMUTH;
        let ray_elevation = info
            .elevations
            .get(ray.source)
            .copied()
            .filter(|e| e.is_finite())
            .unwrap_or(info.mean_elevation);

        for gate in 0..gates {
            values.push(if missing { f32::NAN } else { clean(data[[ray.source, gate]]) });
            gate_coord.push(gate as f32);
            az_coord.push(ray.azimuth);
            if want_3d {
                elev_coord.push(ray_elevation);
            }
        }
    }

    let gate_size = info.gate_size as f64;
    let mut coordinate_names = vec!["range_gate".to_string(), "azimuth".to_string()];
    let mut coordinates = vec![gate_coord, az_coord];
    let domain = if want_3d {
        coordinate_names.push("elevation".to_string());
        coordinates.push(elev_coord);
        GridDomain::RangeAzimuthElevation
    } else {
        GridDomain::RangeAzimuth
    };

    Ok(Some(ResampledGrid {
        domain,
        shape: vec![gates, rays.len()],
        coordinate_names,
        coordinates,
        values,
        unit: ctx.unit.clone(),
        coordinate_system: ctx.coordinate_system(gate_size, info.range_to_first_gate as f64 + 0.5 * gate_size),
        fixed_angle: Some(elevation),
        level: None,
    }))
}

/// Output ray order for a sweep.
///
/// Sweeps covering at least `sort_span` degrees are sorted by azimuth and get
/// a synthetic ray at each end, so the grid closes at north. Trailing rays
/// without an azimuth are dropped. Interior missing rays of an unsorted sweep
/// stay in place and carry the placeholder azimuth 361, which is not a real
/// pointing angle.
fn output_rays(azimuths: &[f32], sort_span: f64) -> Vec<OutputRay> {
    let span: f64 = azimuths
        .windows(2)
        .map(|w| (w[1] - w[0]).abs() as f64)
        .filter(|d| *d < 1.5)
        .sum();
    let sorted = span >= sort_span;

    let mut order: Vec<usize> = (0..azimuths.len()).collect();
    if sorted {
        order.sort_by(|&a, &b| azimuths[a].total_cmp(&azimuths[b]));
    }
    while order.last().map_or(false, |&r| azimuths[r] >= MISSING_AZIMUTH) {
        order.pop();
    }

    let (Some(&first), Some(&last)) = (order.first(), order.last()) else {
        return Vec::new();
    };

    let mut rays: Vec<OutputRay> = order
        .iter()
        .map(|&source| OutputRay { source, azimuth: azimuths[source] })
        .collect();

    if sorted {
        let a0 = azimuths[first];
        let an = azimuths[last];

        let head = if (0.0..=1.0).contains(&a0) {
            OutputRay { source: first, azimuth: 0.0 }
        } else if (360.0..=361.0).contains(&an) {
            OutputRay { source: last, azimuth: (an - 360.0 - 0.5).max(0.0) }
        } else {
            OutputRay { source: first, azimuth: a0 - 0.5 }
        };

        let tail = if an >= 359.0 {
            OutputRay { source: last, azimuth: 360.0 }
        } else {
            OutputRay { source: last, azimuth: an + 0.5 }
        };

        rays.insert(0, head);
        rays.push(tail);
    }

    rays
}
