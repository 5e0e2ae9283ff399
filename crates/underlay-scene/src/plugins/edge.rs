use std::f32::consts::PI;
use std::rc::Rc;

use engine_core::{EndShape, Painter, lerp_hsl};

use super::hsl;
use crate::document::{DocumentModel, Shape};
use crate::plugin::{PluginContext, VisualizationPlugin};

const ROPE_BASE_HSL: [f32; 3] = [250.0, 50.0, 50.0];
const ROPE_ACCENT_HSL: [f32; 3] = [0.0, 100.0, 50.0];

/// Hangs a sagging rope between each shape and the one before it in document order.
pub struct EdgeRope {
    document: Rc<dyn DocumentModel>,
    segments: u32,
    sag: f32,
    stroke_weight: f32,
}

impl EdgeRope {
    pub const NAME: &'static str = "Edges";

    pub fn new(document: Rc<dyn DocumentModel>, segments: u32, sag: f32, stroke_weight: f32) -> Self {
        Self {
            document,
            segments: segments.max(1),
            sag,
            stroke_weight,
        }
    }

    pub fn construct(ctx: &PluginContext) -> Box<dyn VisualizationPlugin> {
        let edges = &ctx.config.edges;
        Box::new(Self::new(
            ctx.document.clone(),
            edges.segments,
            edges.sag,
            edges.stroke_weight,
        ))
    }

    /// Rope vertices relative to the start point: `segments + 1` points, dipping to `-sag` halfway.
    pub fn rope_points(&self, delta: [f32; 2]) -> impl Iterator<Item = (f32, [f32; 3])> + '_ {
        (0..=self.segments).map(move |i| {
            let t = i as f32 / self.segments as f32;
            let dip = self.sag * (PI * t).sin();
            (t, [delta[0] * t, delta[1] * t, -dip])
        })
    }
}

impl VisualizationPlugin for EdgeRope {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&mut self, painter: &mut Painter, shapes: &[Shape]) -> anyhow::Result<()> {
        let Some((first, rest)) = shapes.split_first() else {
            return Ok(());
        };
        // Only advances past shapes that got a rope, so unbounded shapes are bridged over.
        let mut previous = first;
        for shape in rest {
            // Page-bounds centers ignore rotation beyond what the bounds already reflect.
            let from = self.document.shape_page_bounds(shape).map(|b| b.center());
            let to = self.document.shape_page_bounds(previous).map(|b| b.center());
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };

            painter.push();
            painter.translate(from[0], from[1], 0.0);
            painter.stroke(hsl(ROPE_BASE_HSL));
            painter.stroke_weight(self.stroke_weight);
            painter.no_fill();
            painter.begin_shape()?;
            for (t, [x, y, z]) in self.rope_points([to[0] - from[0], to[1] - from[1]]) {
                painter.stroke(lerp_hsl(ROPE_BASE_HSL, ROPE_ACCENT_HSL, t));
                painter.vertex(x, y, z)?;
            }
            painter.end_shape(EndShape::Open)?;
            painter.pop()?;
            previous = shape;
        }
        Ok(())
    }
}
