//! Overlay geometry: uniform scaling and the axis-aligned bounding box of a
//! rotated rectangle.

/// Width/height pair in pixels. Fractional until rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides multiplied by `factor`; aspect ratio is preserved.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Rounded to whole pixels for the engine, never below one pixel per
    /// side. A zero side means "keep the input size" to the scale filter.
    pub fn to_pixels(&self) -> (i64, i64) {
        (
            (self.width.round() as i64).max(1),
            (self.height.round() as i64).max(1),
        )
    }
}

/// Top-left offset on the base frame, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Angle reduced into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Bounding box of a `size` rectangle rotated by `degrees` about its center:
/// `(|w·cosθ| + |h·sinθ|, |w·sinθ| + |h·cosθ|)`.
///
/// Width and height are evaluated with the same normalized angle.
pub fn rotated_bounds(size: Size, degrees: f64) -> Size {
    let theta = normalize_degrees(degrees).to_radians();
    let (sin, cos) = theta.sin_cos();
    Size::new(
        (size.width * cos).abs() + (size.height * sin).abs(),
        (size.width * sin).abs() + (size.height * cos).abs(),
    )
}

/// Scaled size and rotated bounding box for an overlay source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub scaled: Size,
    pub bounds: Size,
}

impl OverlayGeometry {
    pub fn compute(source: Size, scale: f64, rotation_degrees: f64) -> Self {
        let scaled = source.scaled(scale);
        Self {
            scaled,
            bounds: rotated_bounds(scaled, rotation_degrees),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_size(actual: Size, width: f64, height: f64) {
        assert!(
            (actual.width - width).abs() < EPS && (actual.height - height).abs() < EPS,
            "expected {}x{}, got {}x{}",
            width,
            height,
            actual.width,
            actual.height
        );
    }

    #[test]
    fn test_bounds_at_right_angles() {
        let size = Size::new(200.0, 100.0);
        assert_size(rotated_bounds(size, 0.0), 200.0, 100.0);
        assert_size(rotated_bounds(size, 90.0), 100.0, 200.0);
        assert_size(rotated_bounds(size, 180.0), 200.0, 100.0);
        assert_size(rotated_bounds(size, 270.0), 100.0, 200.0);
        assert_size(rotated_bounds(size, 360.0), 200.0, 100.0);
    }

    #[test]
    fn test_bounds_at_45_degrees() {
        let expected = 300.0 * std::f64::consts::FRAC_1_SQRT_2;
        assert_size(rotated_bounds(Size::new(200.0, 100.0), 45.0), expected, expected);
    }

    #[test]
    fn test_negative_and_large_angles_match_normalized() {
        let size = Size::new(64.0, 30.0);
        let reference = rotated_bounds(size, 30.0);
        assert_size(rotated_bounds(size, -330.0), reference.width, reference.height);
        assert_size(rotated_bounds(size, 750.0), reference.width, reference.height);
        assert!((normalize_degrees(-90.0) - 270.0).abs() < EPS);
    }

    #[test]
    fn test_pixels_never_collapse_to_zero() {
        assert_eq!(Size::new(200.0, 100.0).scaled(0.001).to_pixels(), (1, 1));
        assert_eq!(Size::new(200.0, 100.0).scaled(0.004).to_pixels(), (1, 1));
        assert_eq!(Size::new(200.0, 100.0).scaled(0.01).to_pixels(), (2, 1));
    }

    #[test]
    fn test_geometry_uses_scaled_size() {
        let geometry = OverlayGeometry::compute(Size::new(200.0, 100.0), 0.5, 90.0);
        assert_size(geometry.scaled, 100.0, 50.0);
        assert_size(geometry.bounds, 50.0, 100.0);
        assert_eq!(geometry.bounds.to_pixels(), (50, 100));
    }
}
