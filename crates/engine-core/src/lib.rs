//! engine-core: immediate-mode 3D drawing library and render backends for the underlay.

/// Re-export wgpu for downstream crates while avoiding direct dependency leakage.
pub use wgpu;

mod allocator;
mod backend;
mod color;
mod display_list;
mod error;
mod gpu;
mod painter;
mod pipeline;
mod projection;
mod recording;
mod scene;
mod upload;

pub use allocator::{BufKey, OwnedBuffer, OwnedTexture, Pool, RenderAllocator, Slots, TexKey};
pub use backend::*;
pub use color::lerp_hsl;
pub use display_list::*;
pub use error::{BackendError, DrawError};
pub use gpu::WgpuBackend;
pub use painter::*;
pub use pipeline::*;
pub use projection::*;
pub use recording::{BackendCall, RecordingBackend};
pub use scene::*;
pub use upload::*;

/// Choose an sRGB surface format when available; otherwise, pick the first format.
pub fn choose_srgb_surface_format(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
) -> Option<wgpu::TextureFormat> {
    let caps = surface.get_capabilities(adapter);
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
}

/// Create a surface configuration for the given size, favoring FIFO present mode when present.
///
/// Returns `None` when the surface is not supported by the adapter.
pub fn make_surface_config(
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    width: u32,
    height: u32,
) -> Option<wgpu::SurfaceConfiguration> {
    let caps = surface.get_capabilities(adapter);
    let format = choose_srgb_surface_format(adapter, surface)?;
    let present_mode = caps
        .present_modes
        .iter()
        .copied()
        .find(|m| *m == wgpu::PresentMode::Fifo)
        .or_else(|| caps.present_modes.first().copied())?;
    let alpha_mode = caps
        .alpha_modes
        .iter()
        .copied()
        .find(|m| *m == wgpu::CompositeAlphaMode::Opaque)
        .or_else(|| caps.alpha_modes.first().copied())?;
    Some(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    })
}
