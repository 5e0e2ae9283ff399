//! Default perspective camera for a viewport.
//!
//! The eye sits on +Z at the distance where the depth-zero plane spans exactly the viewport,
//! so one render-space unit at z = 0 is one pixel.

use crate::display_list::Viewport;
use crate::scene::Transform3D;

pub const DEFAULT_FOVY: f32 = std::f32::consts::FRAC_PI_3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraProjection {
    pub eye_distance: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl CameraProjection {
    pub fn for_viewport(viewport: Viewport) -> Self {
        let width = viewport.width.max(1) as f32;
        let height = viewport.height.max(1) as f32;
        let eye_distance = (height * 0.5) / (DEFAULT_FOVY * 0.5).tan();
        Self {
            eye_distance,
            near: eye_distance * 0.1,
            far: eye_distance * 10.0,
            aspect: width / height,
        }
    }

    pub fn view(&self) -> Transform3D {
        Transform3D::translate(0.0, 0.0, -self.eye_distance)
    }

    pub fn projection(&self) -> Transform3D {
        Transform3D::perspective(DEFAULT_FOVY, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Transform3D {
        self.projection().concat(self.view())
    }

    /// Project a render-space point to pixel coordinates (y down) and 0..1 depth.
    pub fn project_to_pixels(&self, viewport: Viewport, p: [f32; 3]) -> [f32; 3] {
        let clip = self.view_proj().transform_point4([p[0], p[1], p[2], 1.0]);
        let w = if clip[3].abs() > f32::EPSILON { clip[3] } else { f32::EPSILON };
        let ndc = [clip[0] / w, clip[1] / w, clip[2] / w];
        [
            (ndc[0] + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc[1]) * 0.5 * viewport.height as f32,
            ndc[2],
        ]
    }
}
