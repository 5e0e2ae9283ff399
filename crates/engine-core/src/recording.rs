//! Headless backend that validates binding state and records every call.
//!
//! Used by tests and by hosts that want to run the frame pipeline without a GPU.

use std::collections::{HashMap, HashSet};

use engine_shaders::ShaderSource;

use crate::backend::{
    Attachment, ClearValues, Destination, ProgramId, RenderBackend, TargetId, UniformValue,
};
use crate::display_list::{DisplayList, Viewport};
use crate::error::BackendError;

/// Uniform names understood by programs compiled on this backend.
const KNOWN_UNIFORMS: [&str; 3] = ["fog", "colorBuffer", "depthBuffer"];

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    CreateTarget(Viewport),
    ReleaseTarget(TargetId),
    CompileProgram(String),
    ReleaseProgram(ProgramId),
    BindTarget(TargetId),
    UnbindTarget,
    BindScreen,
    Clear(ClearValues),
    /// Number of shape commands rasterized.
    DrawDisplayList(usize),
    UseProgram(ProgramId),
    SetUniform(ProgramId, String, UniformValue),
    DrawFullscreenQuad,
}

#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    /// Display lists received by `draw_display_list`, in order.
    pub lists: Vec<DisplayList>,
    /// Make the next `create_offscreen_target` fail.
    pub fail_target_allocation: bool,
    /// Make the next `compile_program` fail.
    pub fail_shader_compilation: bool,
    /// Make every `draw_display_list` fail.
    pub fail_draws: bool,
    next_id: u32,
    targets: HashMap<TargetId, Viewport>,
    programs: HashSet<ProgramId>,
    destination: Destination,
    active_program: Option<ProgramId>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn target_viewport(&self, target: TargetId) -> Option<Viewport> {
        self.targets.get(&target).copied()
    }

    /// Drop the recorded history, keeping resources and bindings.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        self.lists.clear();
        std::mem::take(&mut self.calls)
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for RecordingBackend {
    fn create_offscreen_target(&mut self, viewport: Viewport) -> Result<TargetId, BackendError> {
        self.calls.push(BackendCall::CreateTarget(viewport));
        if std::mem::take(&mut self.fail_target_allocation) {
            return Err(BackendError::TargetAllocation("injected failure".into()));
        }
        if viewport.is_empty() {
            return Err(BackendError::TargetAllocation(format!(
                "empty viewport {}x{}",
                viewport.width, viewport.height
            )));
        }
        let id = TargetId(self.next_id());
        self.targets.insert(id, viewport);
        Ok(id)
    }

    fn release_target(&mut self, target: TargetId) {
        self.calls.push(BackendCall::ReleaseTarget(target));
        self.targets.remove(&target);
        if self.destination == Destination::Target(target) {
            self.destination = Destination::None;
        }
    }

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, BackendError> {
        self.calls.push(BackendCall::CompileProgram(source.label.to_string()));
        if std::mem::take(&mut self.fail_shader_compilation) {
            return Err(BackendError::ShaderCompilation {
                label: source.label.to_string(),
                message: "injected failure".into(),
            });
        }
        let id = ProgramId(self.next_id());
        self.programs.insert(id);
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        self.calls.push(BackendCall::ReleaseProgram(program));
        self.programs.remove(&program);
        if self.active_program == Some(program) {
            self.active_program = None;
        }
    }

    fn bind_target(&mut self, target: TargetId) -> Result<(), BackendError> {
        self.calls.push(BackendCall::BindTarget(target));
        if !self.targets.contains_key(&target) {
            return Err(BackendError::UnknownTarget(target));
        }
        self.destination = Destination::Target(target);
        Ok(())
    }

    fn unbind_target(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::UnbindTarget);
        match self.destination {
            Destination::Target(_) => {
                self.destination = Destination::None;
                Ok(())
            }
            other => Err(BackendError::InvalidState(format!(
                "unbind_target with destination {other:?}"
            ))),
        }
    }

    fn bind_screen(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::BindScreen);
        if let Destination::Target(_) = self.destination {
            return Err(BackendError::InvalidState(
                "bind_screen while an offscreen target is bound".into(),
            ));
        }
        self.destination = Destination::Screen;
        Ok(())
    }

    fn clear(&mut self, values: ClearValues) -> Result<(), BackendError> {
        self.calls.push(BackendCall::Clear(values));
        if self.destination == Destination::None {
            return Err(BackendError::InvalidState("clear with nothing bound".into()));
        }
        Ok(())
    }

    fn draw_display_list(&mut self, list: &DisplayList) -> Result<(), BackendError> {
        self.calls
            .push(BackendCall::DrawDisplayList(list.commands.len()));
        if !matches!(self.destination, Destination::Target(_)) {
            return Err(BackendError::InvalidState(
                "scene draws require a bound offscreen target".into(),
            ));
        }
        if self.fail_draws {
            return Err(BackendError::Gpu("injected draw failure".into()));
        }
        self.lists.push(list.clone());
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.calls.push(BackendCall::UseProgram(program));
        if !self.programs.contains(&program) {
            return Err(BackendError::UnknownProgram(program));
        }
        self.active_program = Some(program);
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), BackendError> {
        self.calls
            .push(BackendCall::SetUniform(program, name.to_string(), value));
        if !self.programs.contains(&program) {
            return Err(BackendError::UnknownProgram(program));
        }
        if !KNOWN_UNIFORMS.contains(&name) {
            return Err(BackendError::UnknownUniform(name.to_string()));
        }
        if let UniformValue::Texture { target, attachment } = value {
            if !self.targets.contains_key(&target) {
                return Err(BackendError::UnknownTarget(target));
            }
            let expected = match name {
                "colorBuffer" => Some(Attachment::Color),
                "depthBuffer" => Some(Attachment::Depth),
                _ => None,
            };
            if expected != Some(attachment) {
                return Err(BackendError::UniformType {
                    name: name.to_string(),
                    expected: "a matching texture attachment",
                });
            }
        }
        Ok(())
    }

    fn draw_fullscreen_quad(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::DrawFullscreenQuad);
        if self.destination != Destination::Screen {
            return Err(BackendError::InvalidState(
                "fullscreen quad requires the screen to be bound".into(),
            ));
        }
        if self.active_program.is_none() {
            return Err(BackendError::InvalidState("no active program".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_draws_require_a_target() {
        let mut backend = RecordingBackend::new();
        let list = DisplayList::default();
        assert!(backend.draw_display_list(&list).is_err());

        let target = backend.create_offscreen_target(Viewport::new(4, 4)).unwrap();
        backend.bind_target(target).unwrap();
        assert!(backend.draw_display_list(&list).is_ok());
        assert!(backend.bind_screen().is_err());
    }

    #[test]
    fn injected_failures_fire_once() {
        let mut backend = RecordingBackend::new();
        backend.fail_target_allocation = true;
        assert!(backend.create_offscreen_target(Viewport::new(4, 4)).is_err());
        assert!(backend.create_offscreen_target(Viewport::new(4, 4)).is_ok());
    }

    #[test]
    fn unknown_uniform_is_rejected() {
        let mut backend = RecordingBackend::new();
        let program = backend
            .compile_program(&engine_shaders::FOG_SHADER)
            .unwrap();
        let err = backend
            .set_uniform(program, "img", UniformValue::Vec3([0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownUniform(name) if name == "img"));
    }
}
