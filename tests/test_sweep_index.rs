use radar_resample::core::cuts::{select_cuts, CutMode};
use radar_resample::core::geometry::{
    angle_diff, beam_height, calc_range_bin, clockwise_diff, counterclockwise_diff,
};
use radar_resample::SweepIndex;

fn uniform_azimuths(n: usize, offset: f32) -> Vec<f32> {
    let step = 360.0 / n as f32;
    (0..n).map(|i| offset + i as f32 * step).collect()
}

#[test]
fn test_nearest_ray_minimizes_angle_diff() {
    for &(n, offset, beam) in &[(360, 0.0, 0.95), (720, 0.25, 0.95), (100, 1.7, 0.0), (37, 5.0, 2.0)] {
        let azimuths = uniform_azimuths(n, offset);
        let index = SweepIndex::new(&azimuths, beam);

        let mut query = 0.0;
        while query < 360.0 {
            let ray = index.nearest_ray(query).expect("sweep has rays");
            let best = azimuths
                .iter()
                .map(|&a| angle_diff(a as f64, query))
                .fold(f64::INFINITY, f64::min);
            let got = angle_diff(azimuths[ray] as f64, query);
            assert!(
                (got - best).abs() < 1e-9,
                "n={} query={} got ray {} ({}) but best diff is {}",
                n, query, ray, got, best
            );
            query += 0.13;
        }
    }
}

#[test]
fn test_closest_ray_respects_beam_width() {
    let mut azimuths = uniform_azimuths(360, 0.0);
    for a in azimuths.iter_mut().skip(100).take(5) {
        *a = f32::NAN;
    }
    let index = SweepIndex::new(&azimuths, 0.95);

    assert_eq!(index.closest_ray(99.2, 0.95), Some(99));
    assert_eq!(index.closest_ray(102.0, 0.95), None);
    // the unlimited lookup still finds a neighbour across the gap
    let far = index.nearest_ray(102.0).expect("rays remain");
    assert!(far == 99 || far == 105);
}

#[test]
fn test_angle_helpers() {
    let samples = [0.0, 0.5, 45.0, 179.9, 180.0, 270.0, 359.5, 720.25, -30.0];
    for &x in &samples {
        for &y in &samples {
            let d = angle_diff(x, y);
            assert_eq!(d, angle_diff(y, x));
            assert!((0.0..=180.0).contains(&d), "angle_diff({}, {}) = {}", x, y, d);

            let xr = x.rem_euclid(360.0);
            let yr = y.rem_euclid(360.0);
            if xr != yr {
                // the two ways round make up a full turn
                let total = clockwise_diff(xr, yr) + counterclockwise_diff(xr, yr);
                assert!((total - 360.0).abs() < 1e-9, "{} {} -> {}", xr, yr, total);
                assert!((clockwise_diff(xr, yr) - counterclockwise_diff(yr, xr)).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn test_range_bin_recovers_level() {
    let step_km = 0.25;
    for &elevation in &[0.5, 1.5, 4.3, 19.5, 45.0, 89.0] {
        for &level in &[100.0, 1000.0, 3500.0, 12000.0] {
            let bin = calc_range_bin(elevation, level, step_km).expect("level reachable");
            let below = beam_height(elevation, bin as f64 * step_km);
            let above = beam_height(elevation, (bin + 1) as f64 * step_km);
            let target = level / 1000.0;
            assert!(below <= target + 1e-9, "e={} level={} below={}", elevation, level, below);
            assert!(above >= target - 1e-9, "e={} level={} above={}", elevation, level, above);
        }
    }
}

#[test]
fn test_cut_selection_is_idempotent() {
    let angles = [0.5_f32, 0.9, 1.3, 1.8, 2.4, 3.1, 4.0, 5.1];
    let cuts = select_cuts(&angles, CutMode::Elevation, 0.2);
    assert_eq!(cuts, (0..angles.len()).collect::<Vec<_>>());

    let kept: Vec<f32> = cuts.iter().map(|&i| angles[i]).collect();
    assert_eq!(select_cuts(&kept, CutMode::Elevation, 0.2), cuts);

    // split cuts repeat the lowest elevations
    let split = [0.5_f32, 0.52, 1.45, 1.47, 2.4];
    assert_eq!(select_cuts(&split, CutMode::Elevation, 0.2), vec![0, 2, 4]);
}
