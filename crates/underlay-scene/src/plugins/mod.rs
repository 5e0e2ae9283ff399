//! Built-in visualizations.

mod edge;
mod geo;
mod history;

pub use edge::EdgeRope;
pub use geo::{GeoExtrusion, wall_count};
pub use history::{HistorySlice, ShapeHistory, Snapshot};

use crate::plugin::PluginConstructor;

/// Built-in plugins in their default dispatch order.
pub fn builtin_constructors() -> Vec<PluginConstructor> {
    vec![
        GeoExtrusion::construct,
        HistorySlice::construct,
        EdgeRope::construct,
    ]
}

/// Shared palette, as HSL (degrees, percent, percent).
pub(crate) const GEO_FILL_HSL: [f32; 3] = [190.0, 50.0, 50.0];
pub(crate) const GEO_STROKE_HSL: [f32; 3] = [190.0, 50.0, 30.0];

pub(crate) fn hsl(c: [f32; 3]) -> engine_core::Color {
    engine_core::Color::from_hsl(c[0], c[1], c[2])
}
