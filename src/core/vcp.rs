//! Canonical WSR-88D volume coverage pattern elevation tables

use regex::Regex;

const VCP_11: &[f64] = &[0.5, 1.45, 2.4, 3.35, 4.3, 5.25, 6.2, 7.5, 8.7, 10.0, 12.0, 14.0, 16.7, 19.5];
const VCP_12: &[f64] = &[0.5, 0.9, 1.3, 1.8, 2.4, 3.1, 4.0, 5.1, 6.4, 8.0, 10.0, 12.5, 15.6, 19.5];
const VCP_21: &[f64] = &[0.5, 1.45, 2.4, 3.35, 4.3, 6.0, 9.9, 14.6, 19.5];
const VCP_31: &[f64] = &[0.5, 1.5, 2.5, 3.5, 4.5];

/// VCP number for a pattern name such as "9 elevation scans"; 0 when unknown
pub fn vcp_id_from_name(name: &str) -> u16 {
    let count = Regex::new(r"^\s*(\d+)\s+elevation")
        .ok()
        .and_then(|re| re.captures(name).and_then(|c| c.get(1)))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    match count {
        Some(9) => 121,
        Some(7) => 32,
        Some(8) => 31,
        Some(11) => 21,
        Some(14) => 12,
        Some(16) => 11,
        _ => 0,
    }
}

/// Elevation table of a known VCP
pub fn vcp_angles(id: u16) -> Option<&'static [f64]> {
    match id {
        11 => Some(VCP_11),
        12 => Some(VCP_12),
        21 | 121 => Some(VCP_21),
        31 | 32 => Some(VCP_31),
        _ => None,
    }
}

/// Replace each angle with the nearest angle of the VCP table.
/// Angles pass through untouched when the VCP is unknown.
pub fn remap_angles(angles: &[f64], id: u16) -> Vec<f64> {
    let Some(table) = vcp_angles(id) else {
        return angles.to_vec();
    };

    angles
        .iter()
        .map(|&angle| {
            if !angle.is_finite() {
                return angle;
            }
            table
                .iter()
                .copied()
                .min_by(|a, b| (angle - a).abs().total_cmp(&(angle - b).abs()))
                .unwrap_or(angle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcp_id_from_name() {
        assert_eq!(vcp_id_from_name("9 elevation scans in 5 mins"), 121);
        assert_eq!(vcp_id_from_name("14 elevation scans in 4 1/2 mins"), 12);
        assert_eq!(vcp_id_from_name("16 elevation scans in 5 mins"), 11);
        assert_eq!(vcp_id_from_name("8 elevation scans in 10 mins"), 31);
        assert_eq!(vcp_id_from_name("RHI"), 0);
        assert_eq!(vcp_id_from_name(""), 0);
    }

    #[test]
    fn test_remap_to_nearest_vcp_angle() {
        let remapped = remap_angles(&[0.48, 1.43, 2.46, 19.2], 21);
        assert_eq!(remapped, vec![0.5, 1.45, 2.4, 19.5]);
    }

    #[test]
    fn test_unknown_vcp_passes_through() {
        let angles = [0.48, 1.43];
        assert_eq!(remap_angles(&angles, 0), angles.to_vec());
        assert!(vcp_angles(99).is_none());
    }
}
