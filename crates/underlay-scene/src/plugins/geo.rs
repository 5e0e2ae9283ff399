use std::rc::Rc;

use engine_core::{Color, EndShape, Painter};

use super::{GEO_FILL_HSL, GEO_STROKE_HSL, hsl};
use crate::document::{DocumentModel, Shape, ShapeGeometry, ShapeKind};
use crate::plugin::{PluginContext, VisualizationPlugin};
use crate::sync::FrameTransform;

/// Number of extruded walls for an outline.
///
/// Closed outlines get one wall per vertex (the last wraps to the first); open outlines and
/// arrows get one per consecutive pair.
pub fn wall_count(geometry: &ShapeGeometry, kind: &ShapeKind) -> usize {
    let n = geometry.vertices.len();
    if n < 2 {
        0
    } else if geometry.is_closed && !kind.is_always_open() {
        n
    } else {
        n - 1
    }
}

/// Extrudes each shape's outline straight back from the page into a tower of quads.
pub struct GeoExtrusion {
    document: Rc<dyn DocumentModel>,
    depth: f32,
    fill: Color,
    stroke: Color,
}

impl GeoExtrusion {
    pub const NAME: &'static str = "Geo";

    pub fn new(document: Rc<dyn DocumentModel>, depth: f32) -> Self {
        Self {
            document,
            depth,
            fill: hsl(GEO_FILL_HSL),
            stroke: hsl(GEO_STROKE_HSL),
        }
    }

    pub fn construct(ctx: &PluginContext) -> Box<dyn VisualizationPlugin> {
        Box::new(Self::new(ctx.document.clone(), ctx.config.geo.depth))
    }
}

impl VisualizationPlugin for GeoExtrusion {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&mut self, painter: &mut Painter, shapes: &[Shape]) -> anyhow::Result<()> {
        for shape in shapes {
            let Some(geometry) = self.document.shape_geometry(shape) else {
                continue;
            };
            let walls = wall_count(&geometry, &shape.kind);
            if walls == 0 {
                continue;
            }

            painter.push();
            painter.apply_transform(FrameTransform::shape_local(shape));
            painter.stroke(self.stroke);
            painter.fill(self.fill);
            let vertices = &geometry.vertices;
            for i in 0..walls {
                let [ax, ay] = vertices[i];
                let [bx, by] = vertices[(i + 1) % vertices.len()];
                painter.begin_shape()?;
                painter.vertex(ax, ay, 0.0)?;
                painter.vertex(bx, by, 0.0)?;
                painter.vertex(bx, by, -self.depth)?;
                painter.vertex(ax, ay, -self.depth)?;
                painter.end_shape(EndShape::Close)?;
            }
            painter.pop()?;
        }
        Ok(())
    }
}
