// Gauge mapping - scalar to needle angle and colour band
use serde::Serialize;

/// Total sweep of the dial; the remaining 90° at the bottom holds the label.
pub const SWEEP_DEGREES: f64 = 270.0;
/// Needle angle at zero, measured clockwise from vertical.
pub const START_DEGREES: f64 = -135.0;
pub const WARNING_FRACTION: f64 = 0.6;
pub const DANGER_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorBand {
    Normal,
    Warning,
    Danger,
}

impl ColorBand {
    pub fn css_color(self) -> &'static str {
        match self {
            ColorBand::Normal => "#10b981",
            ColorBand::Warning => "#f59e0b",
            ColorBand::Danger => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeReading {
    /// Raw input, never clamped. This is what the label shows.
    pub value: f64,
    pub max: f64,
    pub angle_fraction: f64,
    pub angle_degrees: f64,
    pub band: ColorBand,
}

impl GaugeReading {
    /// End point of a needle of `radius` pivoting at (`cx`, `cy`), y growing downwards.
    pub fn needle_tip(&self, cx: f64, cy: f64, radius: f64) -> (f64, f64) {
        let radians = self.angle_degrees.to_radians();
        (cx + radius * radians.sin(), cy - radius * radians.cos())
    }

    pub fn label(&self, precision: usize) -> String {
        format!("{:.*}", precision, self.value)
    }
}

/// Maps `value` onto a dial reading from 0 to `max`.
pub fn map(value: f64, max: f64) -> GaugeReading {
    let usable = max.is_finite() && max > 0.0 && !value.is_nan();

    let angle_fraction = if usable {
        value.clamp(0.0, max) / max
    } else {
        0.0
    };

    let band = if !usable {
        ColorBand::Normal
    } else if value > DANGER_FRACTION * max {
        ColorBand::Danger
    } else if value > WARNING_FRACTION * max {
        ColorBand::Warning
    } else {
        ColorBand::Normal
    };

    GaugeReading {
        value,
        max,
        angle_fraction,
        angle_degrees: START_DEGREES + angle_fraction * SWEEP_DEGREES,
        band,
    }
}

/// A dial with a fixed range, redrawn for every new sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeRenderer {
    max: f64,
}

impl GaugeRenderer {
    pub fn new(max: f64) -> Self {
        Self { max }
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn map(&self, value: f64) -> GaugeReading {
        map(value, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands() {
        assert_eq!(map(2500.0, 3000.0).band, ColorBand::Danger);
        assert_eq!(map(2000.0, 3000.0).band, ColorBand::Warning);
        assert_eq!(map(1000.0, 3000.0).band, ColorBand::Normal);

        // thresholds are strict
        assert_eq!(map(2400.0, 3000.0).band, ColorBand::Warning);
        assert_eq!(map(1800.0, 3000.0).band, ColorBand::Normal);
    }

    #[test]
    fn test_out_of_range_clamps_angle_only() {
        let low = map(-50.0, 3000.0);
        assert_eq!(low.angle_fraction, 0.0);
        assert_eq!(low.angle_degrees, START_DEGREES);
        assert_eq!(low.value, -50.0);
        assert_eq!(low.label(0), "-50");

        let high = map(3600.0, 3000.0);
        assert_eq!(high.angle_fraction, 1.0);
        assert_eq!(high.angle_degrees, 135.0);
        assert_eq!(high.band, ColorBand::Danger);
        assert_eq!(high.value, 3600.0);
    }

    #[test]
    fn test_angle_is_linear_over_sweep() {
        let half = map(1500.0, 3000.0);
        assert_eq!(half.angle_fraction, 0.5);
        assert_eq!(half.angle_degrees, 0.0);

        let (x, y) = half.needle_tip(100.0, 100.0, 80.0);
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        let zero_range = map(10.0, 0.0);
        assert_eq!(zero_range.angle_fraction, 0.0);
        assert_eq!(zero_range.band, ColorBand::Normal);

        let nan = map(f64::NAN, 3000.0);
        assert_eq!(nan.angle_fraction, 0.0);
        assert_eq!(nan.band, ColorBand::Normal);
    }

    #[test]
    fn test_infinite_values_clamp_like_any_out_of_range_value() {
        let high = map(f64::INFINITY, 3000.0);
        assert_eq!(high.angle_fraction, 1.0);
        assert_eq!(high.angle_degrees, 135.0);
        assert_eq!(high.band, ColorBand::Danger);
        assert_eq!(high.value, f64::INFINITY);

        let low = map(f64::NEG_INFINITY, 3000.0);
        assert_eq!(low.angle_fraction, 0.0);
        assert_eq!(low.angle_degrees, START_DEGREES);
        assert_eq!(low.band, ColorBand::Normal);
    }

    #[test]
    fn test_renderer_uses_fixed_range() {
        let renderer = GaugeRenderer::new(3000.0);
        assert_eq!(renderer.map(2500.0), map(2500.0, 3000.0));
        assert_eq!(ColorBand::Danger.css_color(), "#ef4444");
    }
}
