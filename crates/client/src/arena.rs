use foundation::math::canvas;
use foundation::{ArenaBounds, CanvasParams, MapError, Point2};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::ClientError;
use crate::protocol::Arena;
use crate::transport::{Endpoint, Transport};

/// Client-side copy of the arena bounds.
///
/// Starts out unknown. [`ArenaModel::refresh`] replaces all six bounds in one
/// write or, on any failure, leaves the previous value untouched.
#[derive(Debug)]
pub struct ArenaModel {
    transport: Transport,
    bounds: RwLock<Option<ArenaBounds>>,
}

impl ArenaModel {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            bounds: RwLock::new(None),
        }
    }

    pub async fn refresh(&self) -> Result<ArenaBounds, ClientError> {
        let record: Arena = self.transport.get(&Endpoint::Arena).await?;
        let bounds = record.bounds().map_err(ClientError::InvalidArena)?;
        *self.bounds.write() = Some(bounds);
        debug!(?bounds, "arena refreshed");
        Ok(bounds)
    }

    pub fn is_known(&self) -> bool {
        self.bounds.read().is_some()
    }

    pub fn bounds(&self) -> Option<ArenaBounds> {
        *self.bounds.read()
    }

    fn known(&self) -> Result<ArenaBounds, MapError> {
        self.bounds().ok_or(MapError::NotReady)
    }

    pub fn transform_to_canvas(
        &self,
        arena: Point2,
        params: &CanvasParams,
    ) -> Result<Point2, MapError> {
        canvas::to_canvas(&self.known()?, arena, params)
    }

    pub fn transform_to_arena(
        &self,
        canvas: Point2,
        params: &CanvasParams,
    ) -> Result<Point2, MapError> {
        canvas::to_arena(&self.known()?, canvas, params)
    }

    /// Corners of the canvas area the arena is drawn into.
    pub fn anchors(&self, params: &CanvasParams) -> Result<[Point2; 4], MapError> {
        self.known()?;
        params.anchors()
    }
}
