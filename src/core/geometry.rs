//! Angle arithmetic and radar/earth geometry

use crate::types::LatLon;

/// Effective earth radius for the 4/3 refraction model (km)
pub const EFFECTIVE_EARTH_RADIUS_KM: f64 = 6374.0 * 4.0 / 3.0;

/// Mean earth radius used for great-circle work (km)
pub const EARTH_RADIUS_KM: f64 = 6375.636;

/// Curvature term of the beam height equation, about 1 / (2 * Re) (1/km)
pub const BEAM_CURVATURE: f64 = 0.000058869;

/// Clockwise angular distance from `x` to `y`, in [0, 360)
pub fn clockwise_diff(x: f64, y: f64) -> f64 {
    let d = y - x;
    if d < 0.0 {
        d + 360.0
    } else {
        d
    }
}

/// Counterclockwise angular distance from `x` to `y`, in [0, 360)
pub fn counterclockwise_diff(x: f64, y: f64) -> f64 {
    let d = x - y;
    if d < 0.0 {
        d + 360.0
    } else {
        d
    }
}

/// Minimal separation between two angles, in [0, 180]
pub fn angle_diff(x: f64, y: f64) -> f64 {
    let d = (x - y).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Slant range (km) and elevation (deg) of the beam that reaches height
/// `height_km` above the antenna at ground distance `ground_range_km`.
pub fn slant_range_and_elevation(ground_range_km: f64, height_km: f64) -> (f64, f64) {
    if ground_range_km == 0.0 {
        return (height_km, 90.0);
    }

    let re = EFFECTIVE_EARTH_RADIUS_KM;
    let h = height_km + re;
    let slant = (re * re + h * h - 2.0 * re * h * (ground_range_km / re).cos()).sqrt();
    let cos_elev = ((re * re + slant * slant - h * h) / (2.0 * re * slant)).clamp(-1.0, 1.0);
    let elevation = cos_elev.acos().to_degrees() - 90.0;

    (slant, elevation)
}

/// Beam height (km) above the antenna at slant range `slant_km`
pub fn beam_height(elevation_deg: f64, slant_km: f64) -> f64 {
    let e = elevation_deg.to_radians();
    slant_km * e.sin() + BEAM_CURVATURE * (e.cos() * slant_km).powi(2)
}

/// Gate index at which a beam at `elevation_deg` reaches `level_m` above the
/// antenna, for gates `range_step_km` apart. Returns `None` when the level is
/// unreachable.
pub fn calc_range_bin(elevation_deg: f64, level_m: f64, range_step_km: f64) -> Option<usize> {
    if range_step_km <= 0.0 {
        return None;
    }
    let e = elevation_deg.to_radians();
    let a = BEAM_CURVATURE * e.cos() * e.cos();
    let b = e.sin();
    let c = b * b + 4.0 * a * level_m / 1000.0;
    if c < 0.0 {
        return None;
    }

    let range_km = if a.abs() < 1e-12 {
        // vertical beam
        level_m / 1000.0 / b
    } else {
        (-b + c.sqrt()) / (2.0 * a)
    };

    if !range_km.is_finite() || range_km < 0.0 {
        return None;
    }
    Some((range_km / range_step_km).floor() as usize)
}

/// Nearest-gate sample of `ray` at slant range `slant_km`; NaN outside the ray
pub fn value_from_ray(ray: &[f32], slant_km: f64, gate_size_m: f64, first_gate_m: f64) -> f32 {
    if gate_size_m <= 0.0 || !slant_km.is_finite() {
        return f32::NAN;
    }
    let pos = ((slant_km * 1000.0 - first_gate_m) / gate_size_m + 0.5).floor();
    if pos < 0.0 || pos >= ray.len() as f64 {
        return f32::NAN;
    }
    ray[pos as usize]
}

/// Initial great-circle bearing (deg, [0, 360)) and distance (km) between two points
pub fn bearing_and_distance(from: LatLon, to: LatLon) -> (f64, f64) {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let mut azimuth = y.atan2(x).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }

    let dlat = lat2 - lat1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let distance = 2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin();

    (azimuth, distance)
}

/// Destination reached from `from` along `azimuth_deg` after `distance_km`
pub fn find_point(from: LatLon, azimuth_deg: f64, distance_km: f64) -> LatLon {
    let lat1 = from.lat.to_radians();
    let lon1 = from.lon.to_radians();
    let az = azimuth_deg.to_radians();
    let d = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * az.cos()).asin();
    let lon2 = lon1 + (az.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    let mut lon = lon2.to_degrees();
    if lon > 180.0 {
        lon -= 360.0;
    } else if lon < -180.0 {
        lon += 360.0;
    }
    LatLon::new(lat2.to_degrees(), lon)
}

/// Intersection of the line through `p1`,`p2` with the line through `p3`,`p4`,
/// treating lat/lon as planar. `None` for parallel or degenerate lines.
pub fn intersection_of_two_lines(p1: LatLon, p2: LatLon, p3: LatLon, p4: LatLon) -> Option<LatLon> {
    let vertical1 = p1.lon == p2.lon;
    let vertical2 = p3.lon == p4.lon;

    match (vertical1, vertical2) {
        (true, true) => None,
        (true, false) => {
            let (c, d) = slope_intercept(p3, p4);
            Some(LatLon::new(c * p1.lon + d, p1.lon))
        }
        (false, true) => {
            let (a, b) = slope_intercept(p1, p2);
            Some(LatLon::new(a * p3.lon + b, p3.lon))
        }
        (false, false) => {
            let (a, b) = slope_intercept(p1, p2);
            let (c, d) = slope_intercept(p3, p4);
            if (a - c).abs() < 1e-12 {
                return None;
            }
            let lon = (d - b) / (a - c);
            let point = LatLon::new(a * lon + b, lon);
            (point.lat.is_finite() && point.lon.is_finite()).then_some(point)
        }
    }
}

fn slope_intercept(p: LatLon, q: LatLon) -> (f64, f64) {
    let slope = (q.lat - p.lat) / (q.lon - p.lon);
    (slope, p.lat - slope * p.lon)
}

/// Intersection of the radar ray leaving `origin` along `azimuth_deg` with the
/// line through `p1`,`p2`.
///
/// The ray is drawn only about twice as far as the farther endpoint, keeping
/// both lines short enough to treat as straight in lat/lon.
pub fn intersection_of_ray_and_line(origin: LatLon, azimuth_deg: f64, p1: LatLon, p2: LatLon) -> Option<LatLon> {
    let reach = 2.0 * bearing_and_distance(origin, p1).1.max(bearing_and_distance(origin, p2).1);
    let far = find_point(origin, azimuth_deg, reach.max(1.0));
    intersection_of_two_lines(origin, far, p1, p2)
}

/// Great-circle ground range (km) and azimuth (deg) of `point` seen from `radar`
pub fn lat_lon_to_range_azimuth(radar: LatLon, point: LatLon) -> (f64, f64) {
    let (azimuth, distance) = bearing_and_distance(radar, point);
    (distance, azimuth)
}

/// Elevation angle (deg) of a point `height` above and `ground_range` away
pub fn elevation_deg(height: f64, ground_range: f64) -> f64 {
    height.atan2(ground_range).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_angle_diff_symmetric_and_bounded() {
        let mut x = -30.0;
        while x < 400.0 {
            let mut y = 0.0;
            while y < 360.0 {
                let d = angle_diff(x, y);
                assert_abs_diff_eq!(d, angle_diff(y, x), epsilon = 1e-9);
                assert!((0.0..=180.0).contains(&d), "angle_diff({}, {}) = {}", x, y, d);
                y += 7.5;
            }
            x += 11.25;
        }
        assert_abs_diff_eq!(angle_diff(359.0, 1.0), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_counterclockwise_complement() {
        for x in [0.0, 0.5, 45.0, 179.0, 270.25, 359.5] {
            for y in [0.25, 10.0, 90.0, 180.0, 300.0, 359.75] {
                if x == y {
                    continue;
                }
                assert_abs_diff_eq!(clockwise_diff(x, y) + counterclockwise_diff(x, y), 360.0, epsilon = 1e-9);
                assert_abs_diff_eq!(clockwise_diff(x, y), counterclockwise_diff(y, x), epsilon = 1e-9);
                assert!(clockwise_diff(x, y) < 360.0);
            }
        }
        assert_abs_diff_eq!(clockwise_diff(350.0, 10.0), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(counterclockwise_diff(10.0, 350.0), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slant_range_degenerate_ground_range() {
        let (slant, elev) = slant_range_and_elevation(0.0, 3.0);
        assert_eq!(slant, 3.0);
        assert_eq!(elev, 90.0);
    }

    #[test]
    fn test_slant_range_matches_beam_height() {
        for &(gr, h) in &[(20.0, 1.0), (50.0, 2.0), (120.0, 3.5)] {
            let (slant, elev) = slant_range_and_elevation(gr, h);
            assert!(slant >= gr);
            assert!(elev > -2.0 && elev < 90.0);
            assert_abs_diff_eq!(beam_height(elev, slant), h, epsilon = 0.05);
        }
    }

    #[test]
    fn test_range_bin_round_trip() {
        let step_km = 0.25;
        for &elev in &[0.5, 1.5, 4.3, 10.0, 45.0] {
            for &level_m in &[500.0, 2000.0, 5000.0] {
                let bin = calc_range_bin(elev, level_m, step_km).unwrap();
                let lower = beam_height(elev, bin as f64 * step_km) * 1000.0;
                let upper = beam_height(elev, (bin + 1) as f64 * step_km) * 1000.0;
                assert!(lower <= level_m + 1e-6 && level_m <= upper + 1e-6,
                    "elev {} level {} bin {} spans {}..{}", elev, level_m, bin, lower, upper);
            }
        }
    }

    #[test]
    fn test_value_from_ray_nearest_gate() {
        let ray = [1.0, 2.0, 3.0, 4.0];
        // gate 2 center sits at 100 + 2 * 250 = 600 m
        assert_eq!(value_from_ray(&ray, 0.61, 250.0, 100.0), 3.0);
        assert_eq!(value_from_ray(&ray, 0.1, 250.0, 100.0), 1.0);
        assert!(value_from_ray(&ray, 5.0, 250.0, 100.0).is_nan());
        assert!(value_from_ray(&ray, f64::NAN, 250.0, 100.0).is_nan());
    }

    #[test]
    fn test_find_point_and_bearing_agree() {
        let origin = LatLon::new(40.0, -105.0);
        for az in [0.0, 45.0, 135.0, 270.0] {
            let p = find_point(origin, az, 150.0);
            let (back_az, dist) = bearing_and_distance(origin, p);
            assert_abs_diff_eq!(dist, 150.0, epsilon = 1e-6);
            assert!(angle_diff(back_az, az) < 1e-6);
        }
    }

    #[test]
    fn test_intersection_equal_longitudes() {
        let p1 = LatLon::new(0.0, 1.0);
        let p2 = LatLon::new(5.0, 1.0);
        let p3 = LatLon::new(2.0, 0.0);
        let p4 = LatLon::new(2.0, 4.0);
        let hit = intersection_of_two_lines(p1, p2, p3, p4).unwrap();
        assert_abs_diff_eq!(hit.lat, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hit.lon, 1.0, epsilon = 1e-12);

        // both vertical
        assert!(intersection_of_two_lines(p1, p2, LatLon::new(0.0, 3.0), LatLon::new(1.0, 3.0)).is_none());
        // parallel
        assert!(intersection_of_two_lines(p3, p4, LatLon::new(3.0, 0.0), LatLon::new(3.0, 4.0)).is_none());
    }
}
