//! Rendering sink interface
//!
//! Window and widget handling live outside the engine. The scheduler only
//! needs to ask the sink for the current map surface size and to tell it
//! that the snapshot changed.

use crate::geo::SurfaceDims;
use crate::snapshot::DashboardSnapshot;

/// Consumer of the dashboard snapshot
pub trait RenderSink: Send {
    /// Current size of the map surface; read fresh on every projection
    /// since the owner may resize it
    fn surface_dims(&self) -> SurfaceDims;

    /// The snapshot changed and a redraw may occur
    fn redraw(&mut self, snapshot: &DashboardSnapshot);
}

impl<T: RenderSink + ?Sized> RenderSink for Box<T> {
    fn surface_dims(&self) -> SurfaceDims {
        (**self).surface_dims()
    }

    fn redraw(&mut self, snapshot: &DashboardSnapshot) {
        (**self).redraw(snapshot)
    }
}
