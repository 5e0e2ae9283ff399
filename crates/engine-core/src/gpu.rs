//! wgpu implementation of [`RenderBackend`].
//!
//! Offscreen targets pair an `Rgba8Unorm` color attachment with a `Depth32Float` depth
//! attachment, both sampleable by the composite pass. Commands are submitted per pass, so every
//! call completes within the frame that issued it.

use std::sync::Arc;

use engine_shaders::ShaderSource;

use crate::allocator::{OwnedTexture, RenderAllocator, Slots, TexKey};
use crate::backend::{
    Attachment, ClearValues, Destination, ProgramId, RenderBackend, TargetId, UniformValue,
};
use crate::display_list::{DisplayList, Viewport};
use crate::error::BackendError;
use crate::pipeline::{
    CompositeProgram, FogUniform, OFFSCREEN_COLOR_FORMAT, OFFSCREEN_DEPTH_FORMAT, ScenePipeline,
    SceneUniform,
};
use crate::projection::CameraProjection;
use crate::scene::Lighting;
use crate::upload::upload_display_list;

const LIGHT_DIR: [f32; 4] = [0.3, -0.5, 1.0, 0.0];
const AMBIENT: f32 = 0.45;

struct OffscreenTarget {
    color: OwnedTexture,
    depth: OwnedTexture,
    viewport: Viewport,
}

struct ProgramSlot {
    program: CompositeProgram,
    params: FogUniform,
    params_buffer: wgpu::Buffer,
    color: Option<TargetId>,
    depth: Option<TargetId>,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    allocator: RenderAllocator,
    surface_format: wgpu::TextureFormat,
    scene: ScenePipeline,
    scene_uniform: wgpu::Buffer,
    targets: Slots<OffscreenTarget>,
    programs: Slots<ProgramSlot>,
    destination: Destination,
    pending_clear: Option<ClearValues>,
    active_program: Option<ProgramId>,
    screen: Option<wgpu::TextureView>,
}

/// Run `f` inside a validation error scope and surface any captured error.
fn validated<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let oom = pollster::block_on(device.pop_error_scope());
    match validation.or(oom) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, BackendError> {
        let scene = validated(&device, || ScenePipeline::new(device.clone())).map_err(|message| {
            BackendError::ShaderCompilation {
                label: "scene".into(),
                message,
            }
        })?;
        let scene_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let allocator = RenderAllocator::new(device.clone());
        Ok(Self {
            device,
            queue,
            allocator,
            surface_format,
            scene,
            scene_uniform,
            targets: Slots::default(),
            programs: Slots::default(),
            destination: Destination::None,
            pending_clear: None,
            active_program: None,
            screen: None,
        })
    }

    /// Provide the view the next composite pass writes to (typically the acquired surface texture).
    pub fn set_screen(&mut self, view: wgpu::TextureView) {
        self.screen = Some(view);
    }

    /// Forget the screen view once the host has presented it.
    pub fn clear_screen(&mut self) {
        self.screen = None;
    }

    fn target(&self, id: TargetId) -> Result<&OffscreenTarget, BackendError> {
        self.targets
            .get(id.0)
            .ok_or(BackendError::UnknownTarget(id))
    }

    fn program_mut(&mut self, id: ProgramId) -> Result<&mut ProgramSlot, BackendError> {
        self.programs
            .get_mut(id.0)
            .ok_or(BackendError::UnknownProgram(id))
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn to_wgpu_color(values: &ClearValues) -> wgpu::Color {
        wgpu::Color {
            r: values.color.r as f64,
            g: values.color.g as f64,
            b: values.color.b as f64,
            a: values.color.a as f64,
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn create_offscreen_target(&mut self, viewport: Viewport) -> Result<TargetId, BackendError> {
        if viewport.is_empty() {
            return Err(BackendError::TargetAllocation(format!(
                "empty viewport {}x{}",
                viewport.width, viewport.height
            )));
        }
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let device = self.device.clone();
        let allocator = &mut self.allocator;
        let (color, depth) = validated(&device, || {
            let color = allocator.allocate_texture(
                TexKey {
                    width: viewport.width,
                    height: viewport.height,
                    format: OFFSCREEN_COLOR_FORMAT,
                    usage,
                },
                "underlay:offscreen-color",
            );
            let depth = allocator.allocate_texture(
                TexKey {
                    width: viewport.width,
                    height: viewport.height,
                    format: OFFSCREEN_DEPTH_FORMAT,
                    usage,
                },
                "underlay:offscreen-depth",
            );
            (color, depth)
        })
        .map_err(BackendError::TargetAllocation)?;

        Ok(TargetId(self.targets.insert(OffscreenTarget {
            color,
            depth,
            viewport,
        })))
    }

    fn release_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.remove(target.0) {
            self.allocator.release_texture(t.color);
            self.allocator.release_texture(t.depth);
            // Keep pooled attachments only for sizes a live target still uses.
            let live: Vec<(u32, u32)> = self
                .targets
                .values()
                .map(|other| (other.viewport.width, other.viewport.height))
                .collect();
            self.allocator.retain_texture_sizes(&live);
        }
        if self.destination == Destination::Target(target) {
            self.destination = Destination::None;
        }
    }

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, BackendError> {
        let device = self.device.clone();
        let format = self.surface_format;
        let program = validated(&device, || CompositeProgram::new(&device, source, format))
            .map_err(|message| BackendError::ShaderCompilation {
                label: source.label.to_string(),
                message,
            })?;
        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite-params"),
            size: std::mem::size_of::<FogUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(ProgramId(self.programs.insert(ProgramSlot {
            program,
            params: FogUniform::default(),
            params_buffer,
            color: None,
            depth: None,
        })))
    }

    fn release_program(&mut self, program: ProgramId) {
        self.programs.remove(program.0);
        if self.active_program == Some(program) {
            self.active_program = None;
        }
    }

    fn bind_target(&mut self, target: TargetId) -> Result<(), BackendError> {
        self.target(target)?;
        self.destination = Destination::Target(target);
        self.pending_clear = None;
        Ok(())
    }

    fn unbind_target(&mut self) -> Result<(), BackendError> {
        match self.destination {
            Destination::Target(_) => {
                self.destination = Destination::None;
                self.pending_clear = None;
                Ok(())
            }
            other => Err(BackendError::InvalidState(format!(
                "unbind_target with destination {other:?}"
            ))),
        }
    }

    fn bind_screen(&mut self) -> Result<(), BackendError> {
        if let Destination::Target(_) = self.destination {
            return Err(BackendError::InvalidState(
                "bind_screen while an offscreen target is bound".into(),
            ));
        }
        if self.screen.is_none() {
            return Err(BackendError::NoScreen);
        }
        self.destination = Destination::Screen;
        Ok(())
    }

    fn clear(&mut self, values: ClearValues) -> Result<(), BackendError> {
        if self.destination == Destination::None {
            return Err(BackendError::InvalidState("clear with nothing bound".into()));
        }
        // Applied as the load op of the next pass on this destination.
        self.pending_clear = Some(values);
        Ok(())
    }

    fn draw_display_list(&mut self, list: &DisplayList) -> Result<(), BackendError> {
        let Destination::Target(id) = self.destination else {
            return Err(BackendError::InvalidState(
                "scene draws require a bound offscreen target".into(),
            ));
        };
        let viewport = self.target(id)?.viewport;

        let camera = CameraProjection::for_viewport(viewport);
        let uniform = SceneUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
            light_dir: LIGHT_DIR,
            params: [
                if list.lighting == Lighting::Basic { 1.0 } else { 0.0 },
                AMBIENT,
                0.0,
                0.0,
            ],
        };
        self.queue
            .write_buffer(&self.scene_uniform, 0, bytemuck::bytes_of(&uniform));

        let gpu_scene = upload_display_list(&mut self.allocator, &self.queue, list);
        let bind_group = self.scene.bind_group(&self.device, &self.scene_uniform);
        let clear = self.pending_clear.take();
        let target = self.target(id)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("underlay-scene-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("underlay-scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match &clear {
                            Some(c) => wgpu::LoadOp::Clear(Self::to_wgpu_color(c)),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: match &clear {
                            Some(c) => wgpu::LoadOp::Clear(c.depth),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.scene.record(&mut pass, &bind_group, &gpu_scene);
        }
        self.submit(encoder);
        gpu_scene.release(&mut self.allocator);
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.program_mut(program)?;
        self.active_program = Some(program);
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), BackendError> {
        if let UniformValue::Texture { target, .. } = value {
            self.target(target)?;
        }
        let slot = self.program_mut(program)?;
        match (name, value) {
            ("fog", UniformValue::Vec3([r, g, b])) => {
                slot.params.fog = [r, g, b, 1.0];
            }
            ("colorBuffer", UniformValue::Texture { target, attachment: Attachment::Color }) => {
                slot.color = Some(target);
            }
            ("depthBuffer", UniformValue::Texture { target, attachment: Attachment::Depth }) => {
                slot.depth = Some(target);
            }
            ("fog", _) => {
                return Err(BackendError::UniformType {
                    name: name.into(),
                    expected: "vec3",
                });
            }
            ("colorBuffer" | "depthBuffer", _) => {
                return Err(BackendError::UniformType {
                    name: name.into(),
                    expected: "a matching texture attachment",
                });
            }
            _ => return Err(BackendError::UnknownUniform(name.into())),
        }
        Ok(())
    }

    fn draw_fullscreen_quad(&mut self) -> Result<(), BackendError> {
        if self.destination != Destination::Screen {
            return Err(BackendError::InvalidState(
                "fullscreen quad requires the screen to be bound".into(),
            ));
        }
        let program = self
            .active_program
            .ok_or_else(|| BackendError::InvalidState("no active program".into()))?;
        let clear = self
            .pending_clear
            .take()
            .map(|c| Self::to_wgpu_color(&c))
            .unwrap_or(wgpu::Color::BLACK);
        let slot = self
            .programs
            .get(program.0)
            .ok_or(BackendError::UnknownProgram(program))?;
        let (Some(color_id), Some(depth_id)) = (slot.color, slot.depth) else {
            return Err(BackendError::InvalidState(
                "composite program is missing its texture uniforms".into(),
            ));
        };
        let color = self.target(color_id)?;
        let depth = self.target(depth_id)?;
        let screen = self.screen.as_ref().ok_or(BackendError::NoScreen)?;

        let camera = CameraProjection::for_viewport(depth.viewport);
        let mut params = slot.params;
        // Fog starts at the depth-zero plane and saturates at the far plane.
        params.depth = [camera.near, camera.far, camera.eye_distance, camera.far];
        self.queue
            .write_buffer(&slot.params_buffer, 0, bytemuck::bytes_of(&params));
        let bind_group = slot.program.bind_group(
            &self.device,
            &slot.params_buffer,
            &color.color.view,
            &depth.depth.view,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("underlay-composite-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("underlay-composite-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: screen,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            slot.program.record(&mut pass, &bind_group);
        }
        self.submit(encoder);
        // One composite per bind_screen.
        self.destination = Destination::None;
        Ok(())
    }
}
