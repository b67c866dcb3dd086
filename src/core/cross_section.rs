//! Vertical cross-section between two surface points

use crate::core::cuts::CutMode;
use crate::core::geometry::{
    angle_diff, bearing_and_distance, clockwise_diff, find_point, intersection_of_ray_and_line,
};
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{CutTable, VolumeTables};
use crate::types::{GridDomain, LatLon, RadarError, RadarResult, ResampledGrid};

/// How the section line sits relative to the radar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    /// Endpoints on opposite sides; the line passes over the radar
    ThroughRadar,
    /// Endpoints on nearly the same bearing
    Radial,
    /// General case, crossing many rays
    Oblique,
}

/// One end of the section as seen from the radar
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    point: LatLon,
    azimuth: f64,
    distance_km: f64,
}

/// Cross-section processor
pub struct CrossSectionProcessor<'a> {
    params: &'a ResampleParams,
}

/// Samples of one cut along the section
struct Column {
    values: Vec<f32>,
    ranges_km: Vec<f32>,
    azimuths: Vec<f32>,
}

impl Column {
    fn empty(bins: usize) -> Self {
        Self {
            values: vec![f32::NAN; bins],
            ranges_km: vec![f32::NAN; bins],
            azimuths: vec![f32::NAN; bins],
        }
    }

    fn set(&mut self, i: usize, value: f32, range_km: f64, azimuth: f64) {
        self.values[i] = value;
        self.ranges_km[i] = range_km as f32;
        self.azimuths[i] = azimuth as f32;
    }
}

impl<'a> CrossSectionProcessor<'a> {
    pub fn new(params: &'a ResampleParams) -> Self {
        Self { params }
    }

    /// Section from `start` to `end`; missing endpoints default to points
    /// south and north of the radar
    pub fn cross_section(
        &self,
        tables: &VolumeTables,
        ctx: &ProductContext,
        start: Option<LatLon>,
        end: Option<LatLon>,
    ) -> RadarResult<Option<ResampledGrid>> {
        if tables.mode != CutMode::Elevation {
            return Err(RadarError::Unsupported("cross-section needs elevation cuts".to_string()));
        }
        let Some(last) = tables.cuts.last() else {
            log::warn!("No cuts available for cross-section");
            return Ok(None);
        };

        let radar = ctx.origin.lat_lon();
        let half = self.params.cross_section_half_length_km;
        let (p1, p2) = match (start, end) {
            (Some(a), Some(b)) => (a, b),
            _ => (find_point(radar, 180.0, half), find_point(radar, 0.0, half)),
        };
        let e1 = endpoint(radar, p1);
        let e2 = endpoint(radar, p2);
        if !(e1.distance_km.is_finite() && e2.distance_km.is_finite()) {
            return Err(RadarError::InvalidRange("cross-section endpoints".to_string()));
        }

        let step_km = last.info.gate_size as f64 / 1000.0;
        let first_km = last.info.range_to_first_gate as f64 / 1000.0;
        if step_km <= 0.0 {
            return Err(RadarError::InvalidRange(format!("gate size {}", last.info.gate_size)));
        }

        let delta = angle_diff(e1.azimuth, e2.azimuth);
        let kind = if (179.0..=181.0).contains(&delta) {
            SectionKind::ThroughRadar
        } else if delta <= 5.0 {
            SectionKind::Radial
        } else {
            SectionKind::Oblique
        };

        let min_rays = tables.cuts.iter().map(|c| c.index.len()).min().unwrap_or(0);
        let bins = match kind {
            SectionKind::ThroughRadar => ((e1.distance_km + e2.distance_km) / step_km).round() as usize + 1,
            SectionKind::Radial => (((e1.distance_km - e2.distance_km).abs()) / step_km).round().max(1.0) as usize,
            SectionKind::Oblique => {
                let turn = delta.round() as usize;
                if min_rays > 361 {
                    (turn as f64 * min_rays as f64 / 360.0) as usize
                } else {
                    turn
                }
            }
        };
        log::info!(
            "Cross-section {:?}: az {:.1} -> {:.1}, {} bins over {} cuts",
            kind, e1.azimuth, e2.azimuth, bins, tables.cuts.len()
        );

        let geometry = Geometry {
            radar,
            e1,
            e2,
            delta,
            step_km,
            first_km,
            gates: tables.gates,
        };

        let columns: Vec<Column> = tables
            .cuts
            .iter()
            .map(|cut| {
                let mut column = Column::empty(bins);
                let beam = cut.index.match_limit();
                match kind {
                    SectionKind::ThroughRadar => geometry.through_radar(cut, beam, &mut column),
                    SectionKind::Radial => geometry.radial(cut, beam, &mut column),
                    SectionKind::Oblique => geometry.oblique(cut, beam, &mut column),
                }
                column
            })
            .collect();

        let cells = bins * columns.len();
        let mut values = Vec::with_capacity(cells);
        let mut ranges = Vec::with_capacity(cells);
        let mut azimuths = Vec::with_capacity(cells);
        let mut elevations = Vec::with_capacity(cells);
        for (cut, column) in tables.cuts.iter().zip(columns) {
            values.extend(column.values);
            ranges.extend(column.ranges_km.iter().map(|r| r * 1000.0));
            azimuths.extend(column.azimuths);
            elevations.extend(std::iter::repeat(cut.info.mean_elevation).take(bins));
        }

        Ok(Some(ResampledGrid {
            domain: GridDomain::RangeAzimuthElevation,
            shape: vec![bins, tables.cuts.len()],
            coordinate_names: vec!["range".to_string(), "azimuth".to_string(), "elevation".to_string()],
            coordinates: vec![ranges, azimuths, elevations],
            values,
            unit: ctx.unit.clone(),
            coordinate_system: ctx.coordinate_system(step_km * 1000.0, first_km * 1000.0),
            fixed_angle: None,
            level: None,
        }))
    }
}

fn endpoint(radar: LatLon, point: LatLon) -> Endpoint {
    let (azimuth, distance_km) = bearing_and_distance(radar, point);
    Endpoint { point, azimuth, distance_km }
}

struct Geometry {
    radar: LatLon,
    e1: Endpoint,
    e2: Endpoint,
    delta: f64,
    step_km: f64,
    first_km: f64,
    gates: usize,
}

impl Geometry {
    /// Gate reached by the beam of `cut` above ground distance `distance_km`
    fn gate_at(&self, cut: &CutTable, distance_km: f64) -> i64 {
        let cos = (cut.info.mean_elevation as f64).to_radians().cos();
        ((distance_km / cos - self.first_km) / self.step_km).floor() as i64
    }

    fn value(&self, cut: &CutTable, ray: usize, gate: i64) -> f32 {
        if gate < 0 || gate as usize >= self.gates {
            f32::NAN
        } else {
            cut.sample(ray, gate as usize)
        }
    }

    /// Inward along the first bearing, then outward along the second
    fn through_radar(&self, cut: &CutTable, beam: f64, column: &mut Column) {
        let (Some(ray0), Some(ray1)) = (
            cut.index.closest_ray(self.e1.azimuth, beam),
            cut.index.closest_ray(self.e2.azimuth, beam),
        ) else {
            return;
        };

        let bins = column.values.len();
        let mut gate = self.gate_at(cut, self.e1.distance_km);
        let inbound = (gate + 1).clamp(0, bins as i64) as usize;
        for i in 0..inbound {
            let range = self.first_km + gate as f64 * self.step_km;
            column.set(i, self.value(cut, ray0, gate), range, self.e1.azimuth);
            gate -= 1;
        }

        let mut gate = 0;
        for i in inbound..bins {
            let range = self.first_km + gate as f64 * self.step_km;
            column.set(i, self.value(cut, ray1, gate), range, self.e2.azimuth);
            gate += 1;
        }
    }

    /// Both ends on nearly the same bearing: walk the gates between them,
    /// averaging the rays spanned by the two bearings
    fn radial(&self, cut: &CutTable, beam: f64, column: &mut Column) {
        let Some(pos0) = cut
            .index
            .closest_position(self.e1.azimuth)
            .filter(|&p| angle_diff(cut.index.sorted()[p].angle, self.e1.azimuth) <= beam)
        else {
            return;
        };

        let sorted = cut.index.sorted();
        let clockwise = clockwise_diff(self.e1.azimuth, self.e2.azimuth) <= 180.0;
        let span = (self.delta as usize).max(1);
        let outward = self.e1.distance_km <= self.e2.distance_km;

        let mut gate = self.gate_at(cut, self.e1.distance_km);
        for i in 0..column.values.len() {
            let mut sum = 0.0;
            let mut count = 0;
            for j in 0..span.min(sorted.len()) {
                let pos = step_position(pos0, j, clockwise, sorted.len());
                let v = self.value(cut, sorted[pos].ray, gate);
                if v.is_finite() {
                    sum += v;
                    count += 1;
                }
            }
            let value = if count > 0 { sum / count as f32 } else { f32::NAN };
            column.set(i, value, self.first_km + gate as f64 * self.step_km, self.e1.azimuth);
            gate += if outward { 1 } else { -1 };
        }
    }

    /// Step across the rays between the two bearings, sampling each where
    /// it crosses the section line
    fn oblique(&self, cut: &CutTable, beam: f64, column: &mut Column) {
        let Some(pos0) = cut.index.closest_position(self.e1.azimuth) else {
            return;
        };
        let sorted = cut.index.sorted();
        if angle_diff(sorted[pos0].angle, self.e1.azimuth) > beam {
            return;
        }
        let clockwise = clockwise_diff(self.e1.azimuth, self.e2.azimuth) <= 180.0;

        for i in 0..column.values.len() {
            let entry = sorted[step_position(pos0, i, clockwise, sorted.len())];
            let Some(hit) = intersection_of_ray_and_line(self.radar, entry.angle, self.e1.point, self.e2.point) else {
                continue;
            };
            let (_, distance_km) = bearing_and_distance(self.radar, hit);
            let gate = self.gate_at(cut, distance_km).max(0);
            column.set(i, self.value(cut, entry.ray, gate), distance_km, entry.angle);
        }
    }
}

fn step_position(start: usize, offset: usize, clockwise: bool, len: usize) -> usize {
    let offset = offset % len;
    if clockwise {
        (start + offset) % len
    } else {
        (start + len - offset) % len
    }
}
