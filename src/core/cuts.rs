//! Selection of distinct elevation (or azimuth) cuts from a volume scan

use crate::core::geometry::angle_diff;

/// Angle a cut is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutMode {
    /// Plan position sweeps, keyed on mean elevation
    Elevation,
    /// RHI scans, keyed on mean azimuth
    Azimuth,
}

/// Indices of the sweeps that start a new cut.
///
/// The first sweep with a finite angle is always kept. In elevation mode a
/// later sweep is kept when it climbs more than `threshold` above the last
/// kept cut; in azimuth mode when it sits more than `threshold` away from it.
pub fn select_cuts(angles: &[f32], mode: CutMode, threshold: f64) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut last: Option<f64> = None;

    for (i, &angle) in angles.iter().enumerate() {
        if !angle.is_finite() {
            log::warn!("Skipping sweep {} with no valid mean angle", i);
            continue;
        }
        let angle = angle as f64;
        let keep = match (last, mode) {
            (None, _) => true,
            (Some(prev), CutMode::Elevation) => angle - prev > threshold,
            (Some(prev), CutMode::Azimuth) => angle_diff(angle, prev) > threshold,
        };
        if keep {
            cuts.push(i);
            last = Some(angle);
        }
    }

    log::debug!("Selected {} cuts from {} sweeps", cuts.len(), angles.len());
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_sweeps_removed() {
        // split-cut VCP: surveillance and Doppler sweeps share the low tilts
        let elevations = [0.48, 0.5, 1.45, 1.47, 2.4, 3.35, 3.3];
        let cuts = select_cuts(&elevations, CutMode::Elevation, 0.2);
        assert_eq!(cuts, vec![0, 2, 4, 5]);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let elevations = [0.5_f32, 0.9, 1.3, 1.8, 2.4, 3.1, 4.0];
        let cuts = select_cuts(&elevations, CutMode::Elevation, 0.2);
        assert_eq!(cuts, (0..elevations.len()).collect::<Vec<_>>());

        let kept: Vec<f32> = cuts.iter().map(|&i| elevations[i]).collect();
        assert_eq!(select_cuts(&kept, CutMode::Elevation, 0.2), cuts);
    }

    #[test]
    fn test_azimuth_mode_uses_absolute_difference() {
        let azimuths = [90.0, 45.0, 45.1, 359.9, 0.05, 180.0];
        let cuts = select_cuts(&azimuths, CutMode::Azimuth, 0.2);
        assert_eq!(cuts, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_nan_angles_skipped() {
        let elevations = [f32::NAN, 0.5, f32::NAN, 1.5];
        assert_eq!(select_cuts(&elevations, CutMode::Elevation, 0.2), vec![1, 3]);
        assert!(select_cuts(&[], CutMode::Elevation, 0.2).is_empty());
    }
}
