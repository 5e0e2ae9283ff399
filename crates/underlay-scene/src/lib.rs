//! underlay-scene: a camera-synchronized 3D scene rendered beneath a 2D document surface.
//!
//! Each frame the [`UnderlayRenderer`] captures the document's shapes and camera, lets every
//! enabled [`VisualizationPlugin`] draw into an offscreen target through an immediate-mode
//! [`engine_core::Painter`], and composites that target onto the screen with depth fog that
//! fades into the document's background.

pub mod compositor;
pub mod document;
pub mod error;
pub mod frame;
pub mod history;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod renderer;
pub mod sync;

pub use compositor::{Compositor, PipelineState};
pub use document::{
    AppearanceMode, Camera, ChangeListener, ChangeNotifier, DocumentModel, MemoryDocument,
    PageBounds, Shape, ShapeChange, ShapeGeometry, ShapeId, ShapeKind, Subscription,
};
pub use error::{Result, UnderlayError};
pub use frame::{FrameContext, background_color};
pub use history::{HistoryStore, RingBuffer};
pub use plugin::{PluginConstructor, PluginContext, VisualizationPlugin};
pub use plugins::{EdgeRope, GeoExtrusion, HistorySlice, Snapshot, builtin_constructors};
pub use registry::{DispatchReport, PluginRegistry};
pub use renderer::UnderlayRenderer;
pub use sync::FrameTransform;
