/// Arena axis selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Axis-aligned flight volume, in arena meters.
///
/// Built only through [`ArenaBounds::new`], which rejects inverted or
/// non-finite extents, so every value of this type satisfies `max >= min`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArenaBounds {
    min: [f64; 3],
    max: [f64; 3],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InvalidBounds {
    pub axis: Axis,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for InvalidBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid {} bounds: min={} max={}",
            self.axis, self.min, self.max
        )
    }
}

impl std::error::Error for InvalidBounds {}

impl ArenaBounds {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Result<Self, InvalidBounds> {
        for axis in Axis::ALL {
            let (lo, hi) = (min[axis.index()], max[axis.index()]);
            if !lo.is_finite() || !hi.is_finite() || hi < lo {
                return Err(InvalidBounds {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(Self { min, max })
    }

    pub fn min(&self, axis: Axis) -> f64 {
        self.min[axis.index()]
    }

    pub fn max(&self, axis: Axis) -> f64 {
        self.max[axis.index()]
    }

    /// `[min_x, min_y, min_z]`.
    pub fn min_corner(&self) -> [f64; 3] {
        self.min
    }

    pub fn max_corner(&self) -> [f64; 3] {
        self.max
    }

    pub fn span(&self, axis: Axis) -> f64 {
        self.max(axis) - self.min(axis)
    }

    pub fn contains(&self, point: [f64; 3]) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| point[a.index()] >= self.min(a) && point[a.index()] <= self.max(a))
    }
}

#[cfg(test)]
mod tests {
    use super::{ArenaBounds, Axis};

    #[test]
    fn spans_follow_extents() {
        let b = ArenaBounds::new([-1.0, 0.0, 0.0], [3.0, 2.5, 2.0]).unwrap();
        assert_eq!(b.span(Axis::X), 4.0);
        assert_eq!(b.span(Axis::Y), 2.5);
        assert_eq!(b.min(Axis::Z), 0.0);
        assert!(b.contains([0.0, 1.0, 1.0]));
        assert!(!b.contains([3.5, 1.0, 1.0]));
    }

    #[test]
    fn corners_match_per_axis_extents() {
        let b = ArenaBounds::new([-1.0, 0.0, 0.5], [3.0, 2.5, 2.0]).unwrap();
        assert_eq!(b.min_corner(), Axis::ALL.map(|a| b.min(a)));
        assert_eq!(b.max_corner(), [3.0, 2.5, 2.0]);
    }

    #[test]
    fn inverted_axis_is_rejected() {
        let err = ArenaBounds::new([0.0, 5.0, 0.0], [1.0, 4.0, 1.0]).unwrap_err();
        assert_eq!(err.axis, Axis::Y);
    }

    #[test]
    fn zero_span_is_allowed() {
        let b = ArenaBounds::new([2.0, 0.0, 0.0], [2.0, 1.0, 1.0]).unwrap();
        assert_eq!(b.span(Axis::X), 0.0);
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(ArenaBounds::new([f64::NAN, 0.0, 0.0], [1.0, 1.0, 1.0]).is_err());
    }
}
