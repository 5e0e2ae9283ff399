use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use engine_core::{Color, EndShape, Painter};

use super::{GEO_FILL_HSL, GEO_STROKE_HSL, hsl};
use crate::document::{DocumentModel, Shape, ShapeChange, ShapeId, Subscription};
use crate::history::HistoryStore;
use crate::plugin::{PluginContext, VisualizationPlugin};

/// A shape's placement and outline at one mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub vertices: Vec<[f32; 2]>,
}

pub type ShapeHistory = HistoryStore<ShapeId, Snapshot>;

/// Stacks each shape's recorded past behind it as flat outline slices, newest nearest.
///
/// Recording runs for as long as the plugin exists, including while it is disabled.
pub struct HistorySlice {
    history: Rc<RefCell<ShapeHistory>>,
    layer_depth: f32,
    fill: Color,
    stroke: Color,
    _subscription: Subscription,
}

impl HistorySlice {
    pub const NAME: &'static str = "History";

    pub fn new(document: &dyn DocumentModel, capacity: NonZeroUsize, layer_depth: f32) -> Self {
        let history = Rc::new(RefCell::new(HistoryStore::new(capacity)));
        let sink = Rc::downgrade(&history);
        let subscription = document.subscribe(Box::new(move |change: &ShapeChange| {
            // Records without an outline have nothing to slice.
            let Some(geometry) = &change.geometry else {
                return;
            };
            let Some(history) = sink.upgrade() else {
                return;
            };
            history.borrow_mut().push(
                change.next.id,
                Snapshot {
                    x: change.next.x,
                    y: change.next.y,
                    rotation: change.next.rotation,
                    vertices: geometry.vertices.clone(),
                },
            );
        }));
        Self {
            history,
            layer_depth,
            fill: hsl(GEO_FILL_HSL),
            stroke: hsl(GEO_STROKE_HSL),
            _subscription: subscription,
        }
    }

    pub fn construct(ctx: &PluginContext) -> Box<dyn VisualizationPlugin> {
        // Sanitized configs never carry a zero capacity.
        let capacity = NonZeroUsize::new(ctx.config.history.capacity).unwrap_or(NonZeroUsize::MIN);
        Box::new(Self::new(
            ctx.document.as_ref(),
            capacity,
            ctx.config.history.layer_depth,
        ))
    }

    /// Shared handle to the recorded history.
    pub fn history(&self) -> Rc<RefCell<ShapeHistory>> {
        self.history.clone()
    }
}

impl VisualizationPlugin for HistorySlice {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render(&mut self, painter: &mut Painter, shapes: &[Shape]) -> anyhow::Result<()> {
        let history = self.history.borrow();
        for shape in shapes {
            let Some(ring) = history.get(&shape.id) else {
                continue;
            };
            let count = ring.len();
            for (index, snapshot) in ring.iter().enumerate().rev() {
                if snapshot.vertices.is_empty() {
                    continue;
                }
                let depth = self.layer_depth * (count - 1 - index) as f32;
                painter.push();
                painter.translate(snapshot.x, snapshot.y, depth);
                painter.rotate_z(snapshot.rotation);
                painter.stroke(self.stroke);
                painter.fill(self.fill);
                painter.begin_shape()?;
                for &[x, y] in &snapshot.vertices {
                    painter.vertex(x, y, 0.0)?;
                }
                painter.end_shape(EndShape::Close)?;
                painter.pop()?;
            }
        }
        Ok(())
    }
}
