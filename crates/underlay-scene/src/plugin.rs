//! Contract for 3D visualizations drawn in the underlay.

use std::rc::Rc;

use engine_core::Painter;
use underlay_config::UnderlayConfig;

use crate::document::{DocumentModel, Shape};

/// One independent 3D visualization.
///
/// `render` runs once per frame for enabled plugins, after the frame transform is installed on
/// the painter. Shapes arrive in document order and must be treated as read-only. An error or
/// panic only discards this plugin's output for the current frame.
pub trait VisualizationPlugin {
    /// Unique display name, also the registry key.
    fn name(&self) -> &str;

    fn render(&mut self, painter: &mut Painter, shapes: &[Shape]) -> anyhow::Result<()>;
}

/// What a plugin receives when it is constructed.
#[derive(Clone)]
pub struct PluginContext {
    pub document: Rc<dyn DocumentModel>,
    pub config: UnderlayConfig,
}

pub type PluginConstructor = fn(&PluginContext) -> Box<dyn VisualizationPlugin>;
