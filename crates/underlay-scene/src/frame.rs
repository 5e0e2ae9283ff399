use engine_core::{Color, Viewport};

use crate::document::{AppearanceMode, Camera, DocumentModel, Shape};
use crate::sync::FrameTransform;

/// Background tone behind the 2D surface in dark mode, as HSL (degrees, percent, percent).
pub const DARK_BACKGROUND_HSL: [f32; 3] = [220.0, 10.0, 10.0];

/// Fixed background palette; there is no blending between modes.
pub fn background_color(mode: AppearanceMode) -> Color {
    match mode {
        AppearanceMode::Dark => {
            let [h, s, l] = DARK_BACKGROUND_HSL;
            Color::from_hsl(h, s, l)
        }
        AppearanceMode::Light => Color::rgba(255, 255, 255, 255),
    }
}

/// Everything a frame reads from the document, captured once before drawing starts.
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub shapes: Vec<Shape>,
    pub camera: Camera,
    pub background: Color,
    pub viewport: Viewport,
}

impl FrameContext {
    pub fn capture(document: &dyn DocumentModel, viewport: Viewport) -> Self {
        Self {
            shapes: document.current_shapes(),
            camera: document.camera(),
            background: background_color(document.appearance_mode()),
            viewport,
        }
    }

    pub fn transform(&self) -> FrameTransform {
        FrameTransform::from_camera(self.camera, self.viewport)
    }
}
