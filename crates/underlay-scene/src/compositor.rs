//! Two-pass frame pipeline: an offscreen scene pass followed by a depth-aware fog composite.
//!
//! ```text
//! Uninitialized --initialize--> Ready --begin_scene--> SceneBegun --end_scene--> SceneEnded
//!       ^                         ^                                                  |
//!       |                         +--finish_frame-- Composited <--composite----------+
//! ```
//!
//! A backend failure inside a frame aborts it back to `Ready`. Calling an operation from the
//! wrong state is rejected without touching the backend.

use engine_core::{
    Attachment, BackendError, ClearValues, Color, Painter, ProgramId, RenderBackend, TargetId,
    UniformValue, Viewport,
};
use engine_shaders::FOG_SHADER;

use crate::error::{Result, UnderlayError};
use crate::frame::FrameContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    SceneBegun,
    SceneEnded,
    Composited,
}

pub struct Compositor<B: RenderBackend> {
    backend: B,
    state: PipelineState,
    viewport: Viewport,
    target: Option<TargetId>,
    program: Option<ProgramId>,
    target_bound: bool,
}

impl<B: RenderBackend> Compositor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: PipelineState::Uninitialized,
            viewport: Viewport::default(),
            target: None,
            program: None,
            target_bound: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Offscreen target holding the scene's color and depth.
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn require_state(&self, expected: PipelineState, op: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UnderlayError::InvalidTransition {
                from: self.state,
                op,
            })
        }
    }

    /// Abort the frame on backend failure so the next one starts from `Ready`.
    fn checked<T>(&mut self, result: std::result::Result<T, BackendError>) -> Result<T> {
        result.map_err(|err| {
            self.abort_frame();
            UnderlayError::Backend(err)
        })
    }

    /// Allocate the offscreen target and compile the fog program.
    ///
    /// Failure leaves the compositor `Uninitialized` with nothing allocated.
    pub fn initialize(&mut self, viewport: Viewport) -> Result<()> {
        self.require_state(PipelineState::Uninitialized, "initialize")?;
        let target = self
            .backend
            .create_offscreen_target(viewport)
            .map_err(UnderlayError::Init)?;
        let program = match self.backend.compile_program(&FOG_SHADER) {
            Ok(program) => program,
            Err(err) => {
                self.backend.release_target(target);
                return Err(UnderlayError::Init(err));
            }
        };
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            ?target,
            ?program,
            "underlay pipeline initialized"
        );
        self.viewport = viewport;
        self.target = Some(target);
        self.program = Some(program);
        self.state = PipelineState::Ready;
        Ok(())
    }

    /// Reallocate the offscreen target for a new viewport. Only valid between frames; on
    /// failure the previous target is kept.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.require_state(PipelineState::Ready, "resize")?;
        if viewport == self.viewport {
            return Ok(());
        }
        let target = self.backend.create_offscreen_target(viewport)?;
        if let Some(old) = self.target.replace(target) {
            self.backend.release_target(old);
        }
        tracing::debug!(width = viewport.width, height = viewport.height, "underlay target resized");
        self.viewport = viewport;
        Ok(())
    }

    /// Bind and clear the offscreen target, then hand out a painter with basic lighting and
    /// the frame's camera transform already applied.
    pub fn begin_scene(&mut self, frame: &FrameContext) -> Result<Painter> {
        self.require_state(PipelineState::Ready, "begin scene")?;
        let target = self.target.ok_or(UnderlayError::InvalidTransition {
            from: self.state,
            op: "begin scene",
        })?;
        self.state = PipelineState::SceneBegun;

        let bound = self.backend.bind_target(target);
        self.checked(bound)?;
        self.target_bound = true;
        let cleared = self.backend.clear(ClearValues::default());
        self.checked(cleared)?;

        let mut painter = Painter::begin_frame(self.viewport);
        painter.lights();
        frame.transform().apply(&mut painter);
        Ok(painter)
    }

    /// Rasterize everything recorded into the offscreen target and unbind it.
    pub fn end_scene(&mut self, painter: Painter) -> Result<()> {
        self.require_state(PipelineState::SceneBegun, "end scene")?;
        let list = painter.finish();
        let drawn = self.backend.draw_display_list(&list);
        self.checked(drawn)?;
        let unbound = self.backend.unbind_target();
        self.checked(unbound)?;
        self.target_bound = false;
        self.state = PipelineState::SceneEnded;
        Ok(())
    }

    /// Draw the offscreen scene onto the screen through the fog program. The only step that
    /// writes to the visible screen.
    pub fn composite(&mut self, background: Color) -> Result<()> {
        self.require_state(PipelineState::SceneEnded, "composite")?;
        let (Some(target), Some(program)) = (self.target, self.program) else {
            return Err(UnderlayError::InvalidTransition {
                from: self.state,
                op: "composite",
            });
        };
        let result = self.fog_pass(target, program, background);
        self.checked(result)?;
        self.state = PipelineState::Composited;
        Ok(())
    }

    fn fog_pass(
        &mut self,
        target: TargetId,
        program: ProgramId,
        background: Color,
    ) -> std::result::Result<(), BackendError> {
        self.backend.bind_screen()?;
        self.backend.use_program(program)?;
        self.backend
            .set_uniform(program, "fog", UniformValue::Vec3(background.to_rgb()))?;
        self.backend.set_uniform(
            program,
            "colorBuffer",
            UniformValue::Texture {
                target,
                attachment: Attachment::Color,
            },
        )?;
        self.backend.set_uniform(
            program,
            "depthBuffer",
            UniformValue::Texture {
                target,
                attachment: Attachment::Depth,
            },
        )?;
        self.backend.draw_fullscreen_quad()
    }

    pub fn finish_frame(&mut self) -> Result<()> {
        self.require_state(PipelineState::Composited, "finish frame")?;
        self.state = PipelineState::Ready;
        Ok(())
    }

    /// Drop the frame in progress and return to `Ready`, unbinding the target if needed.
    pub fn abort_frame(&mut self) {
        if self.state == PipelineState::Uninitialized {
            return;
        }
        if self.target_bound {
            if let Err(err) = self.backend.unbind_target() {
                tracing::debug!(error = %err, "unbind during frame abort failed");
            }
            self.target_bound = false;
        }
        if self.state != PipelineState::Ready {
            tracing::debug!(from = ?self.state, "underlay frame aborted");
        }
        self.state = PipelineState::Ready;
    }
}

impl<B: RenderBackend> Drop for Compositor<B> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.release_program(program);
        }
        if let Some(target) = self.target.take() {
            self.backend.release_target(target);
        }
    }
}
