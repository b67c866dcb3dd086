//! Angle to ray lookup table for a single sweep
//!
//! Rays are hashed into fixed-width angle bins. A query lands on its bin and
//! probes forward until it meets a populated one, then walks the
//! angle-sorted rays in both directions to settle on the true nearest ray.

use crate::core::geometry::angle_diff;

/// One valid ray of the sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayEntry {
    /// Index of the ray in the sweep as read from the dataset
    pub ray: usize,
    /// Ray angle normalized to [0, 360)
    pub angle: f64,
}

/// Hash-binned lookup table over the ray angles of one sweep
#[derive(Debug, Clone)]
pub struct SweepIndex {
    resolution: f64,
    beam_width: f64,
    bins: Vec<Option<usize>>,
    sorted: Vec<RayEntry>,
}

impl SweepIndex {
    /// Build the table from raw ray angles; NaN angles are skipped
    pub fn new(angles: &[f32], beam_width: f64) -> Self {
        let num_rays = angles.len();
        if num_rays == 0 {
            return Self {
                resolution: 360.0,
                beam_width,
                bins: Vec::new(),
                sorted: Vec::new(),
            };
        }

        let mut resolution = 360.0 / num_rays as f64;
        let mut size = num_rays;
        if beam_width > 0.0 && resolution > 2.0 * beam_width {
            resolution = beam_width;
            size = (360.0 / resolution).ceil() as usize;
        }

        let mut sorted: Vec<RayEntry> = angles
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_finite())
            .map(|(ray, &a)| RayEntry {
                ray,
                angle: (a as f64).rem_euclid(360.0),
            })
            .collect();
        sorted.sort_by(|a, b| a.angle.total_cmp(&b.angle));

        let mut bins: Vec<Option<usize>> = vec![None; size];
        for (pos, entry) in sorted.iter().enumerate() {
            let bin = bin_of(entry.angle, resolution, size);
            let center = bin as f64 * resolution;
            match bins[bin] {
                Some(held) if angle_diff(sorted[held].angle, center) <= angle_diff(entry.angle, center) => {}
                _ => bins[bin] = Some(pos),
            }
        }

        if sorted.len() < num_rays {
            log::debug!(
                "Sweep index skipped {} rays without a valid angle",
                num_rays - sorted.len()
            );
        }

        Self {
            resolution,
            beam_width,
            bins,
            sorted,
        }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn beam_width(&self) -> f64 {
        self.beam_width
    }

    /// Number of rays with a valid angle
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Valid rays ordered by angle
    pub fn sorted(&self) -> &[RayEntry] {
        &self.sorted
    }

    /// Raw hash lookup with forward probing. The hit may be far from `angle`
    /// when the sweep is sparse.
    pub fn hash_bin(&self, angle: f64) -> Option<RayEntry> {
        self.hash_position(angle).map(|pos| self.sorted[pos])
    }

    fn hash_position(&self, angle: f64) -> Option<usize> {
        if !angle.is_finite() || self.bins.is_empty() {
            return None;
        }
        let size = self.bins.len();
        let start = bin_of(angle.rem_euclid(360.0), self.resolution, size);
        (0..size).find_map(|k| self.bins[(start + k) % size])
    }

    /// Sorted position of the ray nearest to `angle`
    pub fn closest_position(&self, angle: f64) -> Option<usize> {
        let start = self.hash_position(angle)?;
        let len = self.sorted.len();
        let target = angle.rem_euclid(360.0);
        let dist = |pos: usize| angle_diff(self.sorted[pos].angle, target);

        let mut best = start;
        let mut best_d = dist(start);

        for step in [1, len - 1] {
            let mut pos = start;
            let mut current = dist(start);
            for _ in 1..len {
                let next = (pos + step) % len;
                let d = dist(next);
                if d > current {
                    break;
                }
                if d < best_d {
                    best = next;
                    best_d = d;
                }
                pos = next;
                current = d;
            }
        }

        Some(best)
    }

    /// Ray nearest to `angle`, regardless of distance
    pub fn nearest_ray(&self, angle: f64) -> Option<usize> {
        self.closest_position(angle).map(|pos| self.sorted[pos].ray)
    }

    /// Ray nearest to `angle` when it lies within `limit` degrees
    pub fn closest_ray(&self, angle: f64, limit: f64) -> Option<usize> {
        let pos = self.closest_position(angle)?;
        let entry = self.sorted[pos];
        if angle_diff(entry.angle, angle) > limit {
            None
        } else {
            Some(entry.ray)
        }
    }

    /// Tolerance used for whole-sweep ray tables: the beam width, or the bin
    /// resolution when the dataset reports no beam width
    pub fn match_limit(&self) -> f64 {
        if self.beam_width > 0.0 {
            self.beam_width
        } else {
            self.resolution
        }
    }

    /// Ray for each of `bins` equally spaced angles starting at 0
    pub fn ray_table(&self, bins: usize, limit: f64) -> Vec<Option<usize>> {
        let step = 360.0 / bins.max(1) as f64;
        (0..bins)
            .map(|k| self.closest_ray(k as f64 * step, limit))
            .collect()
    }
}

fn bin_of(angle: f64, resolution: f64, size: usize) -> usize {
    ((angle / resolution).round() as i64).rem_euclid(size as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize, offset: f32) -> Vec<f32> {
        let step = 360.0 / n as f32;
        (0..n).map(|i| offset + i as f32 * step).collect()
    }

    #[test]
    fn test_nearest_ray_minimizes_angle_diff() {
        for &(n, offset) in &[(360, 0.0), (360, 0.5), (720, 0.25), (100, 1.3)] {
            let azimuths = uniform(n, offset);
            let index = SweepIndex::new(&azimuths, 1.0);

            let mut a = 0.0;
            while a < 360.0 {
                let ray = index.nearest_ray(a).unwrap();
                let got = angle_diff(azimuths[ray] as f64, a);
                let best = azimuths
                    .iter()
                    .map(|&az| angle_diff(az as f64, a))
                    .fold(f64::INFINITY, f64::min);
                assert!(got <= best + 1e-9, "n={} a={} got {} best {}", n, a, got, best);
                a += 0.1;
            }
        }
    }

    #[test]
    fn test_nan_rays_are_skipped() {
        let mut azimuths = uniform(360, 0.0);
        azimuths[10] = f32::NAN;
        let index = SweepIndex::new(&azimuths, 0.95);

        assert_eq!(index.len(), 359);
        assert_eq!(index.closest_ray(10.0, 0.95), None);
        let nearest = index.nearest_ray(10.0).unwrap();
        assert!(nearest == 9 || nearest == 11);
        assert_eq!(index.closest_ray(11.0, 0.95), Some(11));
    }

    #[test]
    fn test_unsorted_input_keeps_original_ray_numbers() {
        let azimuths = vec![180.0, 0.0, 90.0, 270.0];
        let index = SweepIndex::new(&azimuths, 0.0);
        assert_eq!(index.nearest_ray(85.0), Some(2));
        assert_eq!(index.nearest_ray(350.0), Some(1));
        assert_eq!(index.nearest_ray(200.0), Some(0));
        assert_eq!(index.sorted()[0].ray, 1);
    }

    #[test]
    fn test_sparse_sweep_probes_forward() {
        let mut azimuths = vec![f32::NAN; 36];
        azimuths[20] = 200.0;
        let index = SweepIndex::new(&azimuths, 0.0);
        // bin for 10 degrees is empty; the probe wraps round to the only ray
        assert_eq!(index.hash_bin(10.0).map(|e| e.ray), Some(20));
        assert_eq!(index.nearest_ray(10.0), Some(20));
        assert_eq!(index.closest_ray(10.0, 5.0), None);
    }

    #[test]
    fn test_all_empty_table() {
        let index = SweepIndex::new(&[f32::NAN, f32::NAN, f32::NAN], 1.0);
        assert!(index.is_empty());
        assert_eq!(index.hash_bin(12.0), None);
        assert_eq!(index.nearest_ray(12.0), None);

        let none = SweepIndex::new(&[], 1.0);
        assert_eq!(none.nearest_ray(0.0), None);
    }

    #[test]
    fn test_resolution_clamps_to_beam_width() {
        let azimuths = uniform(36, 0.0);
        let index = SweepIndex::new(&azimuths, 1.0);
        assert_eq!(index.resolution(), 1.0);
        assert_eq!(index.nearest_ray(44.0), Some(4));

        let wide = SweepIndex::new(&azimuths, 8.0);
        assert_eq!(wide.resolution(), 10.0);
    }

    #[test]
    fn test_wraparound_at_north() {
        let azimuths = vec![0.25, 120.0, 240.0, 359.5];
        let index = SweepIndex::new(&azimuths, 1.0);
        // query just west of north, nearest ray just east of it
        assert_eq!(index.nearest_ray(359.9), Some(0));
        // query lands on the bin at 0 but the winner sits below 360
        assert_eq!(index.nearest_ray(359.8), Some(3));
        assert_eq!(index.closest_ray(359.8, 0.5), Some(3));
        assert_eq!(index.nearest_ray(0.1), Some(0));
        assert_eq!(index.closest_ray(0.0, 1.0), Some(0));
        assert_eq!(index.closest_ray(358.0, 1.0), None);
    }

    #[test]
    fn test_ray_table_one_degree() {
        let azimuths = uniform(360, 0.0);
        let index = SweepIndex::new(&azimuths, 0.95);
        let table = index.ray_table(360, index.match_limit());
        assert_eq!(table.len(), 360);
        assert!(table.iter().enumerate().all(|(k, r)| *r == Some(k)));
    }
}
