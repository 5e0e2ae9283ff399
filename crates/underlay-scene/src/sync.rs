//! Camera synchronization between the 2D document and the 3D scene.
//!
//! Render space is centered on the viewport with +y up, and one unit at depth zero is one pixel
//! (see [`engine_core::CameraProjection`]). The frame transform maps page coordinates into it:
//!
//! ```text
//! render = flip_y * scale(zoom) * translate(cam.x - w / 2zoom, cam.y - h / 2zoom) * page
//! ```
//!
//! which puts every page point on the pixel the 2D surface draws it at.

use engine_core::{Painter, Transform3D, Viewport};

use crate::document::{Camera, Shape};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransform {
    camera: Camera,
    viewport: Viewport,
    matrix: Transform3D,
}

impl FrameTransform {
    pub fn from_camera(camera: Camera, viewport: Viewport) -> Self {
        let zoom = if camera.zoom.is_finite() && camera.zoom > 0.0 {
            camera.zoom
        } else {
            tracing::debug!(zoom = camera.zoom, "ignoring non-positive camera zoom");
            1.0
        };
        let camera = Camera { zoom, ..camera };
        let [half_w, half_h] = viewport.center();
        let matrix = Transform3D::scale(1.0, -1.0, 1.0)
            .concat(Transform3D::scale(zoom, zoom, zoom))
            .concat(Transform3D::translate(
                camera.x - half_w / zoom,
                camera.y - half_h / zoom,
                0.0,
            ));
        Self {
            camera,
            viewport,
            matrix,
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn matrix(&self) -> Transform3D {
        self.matrix
    }

    /// Install the transform on a freshly begun frame, before any plugin draws.
    pub fn apply(&self, painter: &mut Painter) {
        painter.apply_transform(self.matrix);
    }

    /// Page point (with depth) to render space.
    pub fn document_to_render(&self, p: [f32; 3]) -> [f32; 3] {
        self.matrix.transform_point(p)
    }

    /// Page point to viewport pixels (origin top-left, y down), as the 2D surface places it.
    pub fn document_to_viewport(&self, p: [f32; 2]) -> [f32; 2] {
        let [rx, ry, _] = self.document_to_render([p[0], p[1], 0.0]);
        let [half_w, half_h] = self.viewport.center();
        [rx + half_w, half_h - ry]
    }

    /// Page point that lands on the viewport center.
    pub fn viewport_center_in_document(&self) -> [f32; 2] {
        let [half_w, half_h] = self.viewport.center();
        [
            half_w / self.camera.zoom - self.camera.x,
            half_h / self.camera.zoom - self.camera.y,
        ]
    }

    /// Local transform of a shape: translate to its position, then rotate.
    pub fn shape_local(shape: &Shape) -> Transform3D {
        Transform3D::translate(shape.x, shape.y, 0.0).concat(Transform3D::rotate_z(shape.rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::CameraProjection;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-2 && (a[1] - b[1]).abs() < 1e-2
    }

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let viewport = Viewport::new(1024, 768);
        for zoom in [0.1, 0.5, 1.0, 2.0, 8.0] {
            for (x, y) in [(0.0, 0.0), (-350.0, 120.0), (4000.0, -2500.0)] {
                let sync = FrameTransform::from_camera(Camera { x, y, zoom }, viewport);
                let center = sync.viewport_center_in_document();
                assert!(
                    close(sync.document_to_viewport(center), [512.0, 384.0]),
                    "zoom {zoom} camera ({x}, {y})"
                );
                let render = sync.document_to_render([center[0], center[1], 0.0]);
                assert!(close([render[0], render[1]], [0.0, 0.0]));
            }
        }
    }

    #[test]
    fn matches_the_2d_surface_mapping() {
        // The 2D surface draws page point p at (p + camera) * zoom.
        let viewport = Viewport::new(800, 600);
        let camera = Camera { x: 30.0, y: -40.0, zoom: 1.5 };
        let sync = FrameTransform::from_camera(camera, viewport);
        let p = [120.0, 75.0];
        let expected = [(p[0] + camera.x) * camera.zoom, (p[1] + camera.y) * camera.zoom];
        assert!(close(sync.document_to_viewport(p), expected));
    }

    #[test]
    fn depth_zero_lands_on_the_same_pixel_after_projection() {
        let viewport = Viewport::new(800, 600);
        let sync = FrameTransform::from_camera(Camera { x: 10.0, y: 20.0, zoom: 2.0 }, viewport);
        let projection = CameraProjection::for_viewport(viewport);
        let p = [55.0, -12.0];
        let projected = projection.project_to_pixels(viewport, sync.document_to_render([p[0], p[1], 0.0]));
        assert!(close([projected[0], projected[1]], sync.document_to_viewport(p)));
    }

    #[test]
    fn invalid_zoom_falls_back_to_identity_scale() {
        let sync = FrameTransform::from_camera(
            Camera { x: 0.0, y: 0.0, zoom: 0.0 },
            Viewport::new(100, 100),
        );
        assert_eq!(sync.camera().zoom, 1.0);
    }

    #[test]
    fn shape_local_rotates_about_the_origin() {
        let shape = Shape {
            id: crate::document::ShapeId(1),
            kind: crate::document::ShapeKind::Geo,
            x: 10.0,
            y: 0.0,
            rotation: std::f32::consts::FRAC_PI_2,
        };
        let p = FrameTransform::shape_local(&shape).transform_point([1.0, 0.0, 0.0]);
        assert!((p[0] - 10.0).abs() < 1e-5 && (p[1] - 1.0).abs() < 1e-5);
    }
}
