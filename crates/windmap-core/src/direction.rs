//! Wind direction averaging and labelling

use serde::{Deserialize, Serialize};

const ARROWS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];
const CARDINALS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// How a direction is rendered in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionFormat {
    #[default]
    Arrow,
    Cardinal,
    Degrees,
}

/// Normalize an angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let n = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if 360.0 - n < 1e-9 {
        0.0
    } else {
        n
    }
}

/// Circular mean of angles in degrees.
///
/// Averages unit vectors rather than raw angles, so 350° and 10° average to
/// 0° rather than 180°. Returns `None` for an empty slice.
pub fn circular_mean(angles: &[f64]) -> Option<f64> {
    if angles.is_empty() {
        return None;
    }

    let (sum_sin, sum_cos) = angles.iter().fold((0.0, 0.0), |(s, c), deg| {
        let rad = deg.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    let n = angles.len() as f64;
    let mean = (sum_sin / n).atan2(sum_cos / n).to_degrees();

    Some(normalize_degrees(mean))
}

fn sector(degrees: f64) -> usize {
    (normalize_degrees(degrees) / 45.0).round() as usize % 8
}

/// Arrow pointing where the wind blows to (reported direction + 180°)
pub fn degrees_to_arrow(degrees: f64) -> char {
    ARROWS[sector(degrees + 180.0)]
}

/// Compass point the wind blows from
pub fn degrees_to_cardinal(degrees: f64) -> &'static str {
    CARDINALS[sector(degrees)]
}

pub fn format_direction(degrees: Option<f64>, format: DirectionFormat) -> String {
    let Some(degrees) = degrees else {
        return String::new();
    };
    match format {
        DirectionFormat::Arrow => degrees_to_arrow(degrees).to_string(),
        DirectionFormat::Cardinal => degrees_to_cardinal(degrees).to_string(),
        DirectionFormat::Degrees => format!("{}°", degrees.round() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_circular_mean_wraps_through_north() {
        assert_close(circular_mean(&[350.0, 10.0]).unwrap(), 0.0);
        assert_close(circular_mean(&[340.0, 10.0]).unwrap(), 355.0);
    }

    #[test]
    fn test_circular_mean_opposite_angles() {
        // Degenerate input: vectors cancel on the north-south axis
        assert_close(circular_mean(&[0.0, 180.0]).unwrap(), 90.0);
    }

    #[test]
    fn test_circular_mean_simple() {
        assert_close(circular_mean(&[90.0]).unwrap(), 90.0);
        assert_close(circular_mean(&[80.0, 100.0]).unwrap(), 90.0);
        assert_close(circular_mean(&[270.0, 270.0, 270.0]).unwrap(), 270.0);
    }

    #[test]
    fn test_circular_mean_empty() {
        assert_eq!(circular_mean(&[]), None);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(-1e-15), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn test_arrow_points_downwind() {
        // Northerly wind blows south
        assert_eq!(degrees_to_arrow(0.0), '↓');
        assert_eq!(degrees_to_arrow(90.0), '←');
        assert_eq!(degrees_to_arrow(180.0), '↑');
        assert_eq!(degrees_to_arrow(225.0), '↗');
        assert_eq!(degrees_to_arrow(350.0), '↓');
    }

    #[test]
    fn test_cardinal_sectors() {
        assert_eq!(degrees_to_cardinal(0.0), "N");
        assert_eq!(degrees_to_cardinal(22.0), "N");
        assert_eq!(degrees_to_cardinal(23.0), "NE");
        assert_eq!(degrees_to_cardinal(135.0), "SE");
        assert_eq!(degrees_to_cardinal(270.0), "W");
        assert_eq!(degrees_to_cardinal(338.0), "N");
        assert_eq!(degrees_to_cardinal(360.0), "N");
    }

    #[test]
    fn test_format_direction() {
        assert_eq!(format_direction(None, DirectionFormat::Arrow), "");
        assert_eq!(format_direction(Some(45.0), DirectionFormat::Cardinal), "NE");
        assert_eq!(format_direction(Some(44.6), DirectionFormat::Degrees), "45°");
        assert_eq!(format_direction(Some(0.0), DirectionFormat::Arrow), "↓");
    }
}
