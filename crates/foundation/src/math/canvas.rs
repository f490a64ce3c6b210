//! Arena-space <-> canvas-space mapping.
//!
//! The usable canvas is the rectangle left after shrinking the canvas by
//! `inset * size` on every side. Arena `[min, max]` maps linearly onto
//! `[size * inset, size * (1 - inset)]`, independently per axis.
//!
//! Functions here are pure: callers pass the bounds and canvas size
//! explicitly, nothing is read from ambient window state.

use crate::bounds::{ArenaBounds, Axis};

/// Inset applied to both axes unless configured otherwise.
pub const DEFAULT_INSET: f64 = 0.3;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MapError {
    /// The arena has not been fetched yet.
    NotReady,
    /// The arena has zero span on this axis.
    DegenerateAxis(Axis),
    InvalidCanvas { width: f64, height: f64 },
    /// Inset outside `[0, 0.5)`.
    InvalidInset(f64),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::NotReady => write!(f, "arena bounds are not known yet"),
            MapError::DegenerateAxis(axis) => {
                write!(f, "arena has zero span on the {axis} axis")
            }
            MapError::InvalidCanvas { width, height } => {
                write!(f, "canvas size must be positive: {width}x{height}")
            }
            MapError::InvalidInset(inset) => write!(f, "inset {inset} is outside [0, 0.5)"),
        }
    }
}

impl std::error::Error for MapError {}

/// Canvas size plus the inset margin shared by both axes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasParams {
    pub width: f64,
    pub height: f64,
    pub inset: f64,
}

impl CanvasParams {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            inset: DEFAULT_INSET,
        }
    }

    pub fn with_inset(mut self, inset: f64) -> Self {
        self.inset = inset;
        self
    }

    pub fn validate(&self) -> Result<(), MapError> {
        // Written as negated comparisons so NaN fails too.
        let finite = self.width.is_finite() && self.height.is_finite();
        if !(self.width > 0.0 && self.height > 0.0) || !finite {
            return Err(MapError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.inset >= 0.0 && self.inset < 0.5) {
            return Err(MapError::InvalidInset(self.inset));
        }
        Ok(())
    }

    /// Lower edge and length of the usable band along one canvas side.
    fn band(&self, size: f64) -> (f64, f64) {
        (size * self.inset, size * (1.0 - 2.0 * self.inset))
    }

    /// Corners of the usable rectangle: top-left, bottom-left, bottom-right, top-right.
    pub fn anchors(&self) -> Result<[Point2; 4], MapError> {
        self.validate()?;
        let (x0, w) = self.band(self.width);
        let (y0, h) = self.band(self.height);
        let (x1, y1) = (x0 + w, y0 + h);
        Ok([
            Point2::new(x0, y0),
            Point2::new(x0, y1),
            Point2::new(x1, y1),
            Point2::new(x1, y0),
        ])
    }
}

fn checked_span(bounds: &ArenaBounds, axis: Axis) -> Result<f64, MapError> {
    let span = bounds.span(axis);
    if span == 0.0 {
        return Err(MapError::DegenerateAxis(axis));
    }
    Ok(span)
}

fn axis_to_canvas(
    bounds: &ArenaBounds,
    params: &CanvasParams,
    axis: Axis,
    size: f64,
    v: f64,
) -> Result<f64, MapError> {
    let span = checked_span(bounds, axis)?;
    let (offset, len) = params.band(size);
    Ok((v - bounds.min(axis)) / span * len + offset)
}

fn axis_to_arena(
    bounds: &ArenaBounds,
    params: &CanvasParams,
    axis: Axis,
    size: f64,
    v: f64,
) -> Result<f64, MapError> {
    let span = checked_span(bounds, axis)?;
    let (offset, len) = params.band(size);
    Ok((v - offset) / len * span + bounds.min(axis))
}

/// Map an arena `(x, y)` in meters to canvas coordinates.
pub fn to_canvas(
    bounds: &ArenaBounds,
    arena: Point2,
    params: &CanvasParams,
) -> Result<Point2, MapError> {
    params.validate()?;
    Ok(Point2::new(
        axis_to_canvas(bounds, params, Axis::X, params.width, arena.x)?,
        axis_to_canvas(bounds, params, Axis::Y, params.height, arena.y)?,
    ))
}

/// Inverse of [`to_canvas`].
pub fn to_arena(
    bounds: &ArenaBounds,
    canvas: Point2,
    params: &CanvasParams,
) -> Result<Point2, MapError> {
    params.validate()?;
    Ok(Point2::new(
        axis_to_arena(bounds, params, Axis::X, params.width, canvas.x)?,
        axis_to_arena(bounds, params, Axis::Y, params.height, canvas.y)?,
    ))
}
