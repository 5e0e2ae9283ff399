//! GPU-style resource interface consumed by the underlay compositor.
//!
//! A backend owns offscreen targets and shader programs behind opaque ids. Draw calls go to
//! whichever destination is bound: an offscreen target or the screen.

use engine_shaders::ShaderSource;

use crate::display_list::{DisplayList, Viewport};
use crate::error::BackendError;
use crate::scene::ColorLinPremul;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    Color,
    Depth,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Vec3([f32; 3]),
    Texture { target: TargetId, attachment: Attachment },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
    pub color: ColorLinPremul,
    pub depth: f32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: ColorLinPremul::default(),
            depth: 1.0,
        }
    }
}

/// Destination of subsequent draw calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    None,
    Target(TargetId),
    Screen,
}

pub trait RenderBackend {
    /// Allocate a render target with color and depth attachments sized to `viewport`.
    fn create_offscreen_target(&mut self, viewport: Viewport) -> Result<TargetId, BackendError>;

    fn release_target(&mut self, target: TargetId);

    /// Compile a program from a vertex + fragment source pair.
    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, BackendError>;

    fn release_program(&mut self, program: ProgramId);

    fn bind_target(&mut self, target: TargetId) -> Result<(), BackendError>;

    fn unbind_target(&mut self) -> Result<(), BackendError>;

    fn bind_screen(&mut self) -> Result<(), BackendError>;

    /// Clear the bound destination's color and depth.
    fn clear(&mut self, values: ClearValues) -> Result<(), BackendError>;

    /// Rasterize a recorded display list into the bound offscreen target.
    fn draw_display_list(&mut self, list: &DisplayList) -> Result<(), BackendError>;

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), BackendError>;

    /// Draw one quad covering the bound destination with the active program.
    fn draw_fullscreen_quad(&mut self) -> Result<(), BackendError>;
}
