//! Umbrella crate for the 3D underlay: re-exports the scene, rendering core and configuration.

pub use engine_core as render;
pub use underlay_config as config;
pub use underlay_scene::*;

/// Build a renderer over `document` with every built-in plugin registered.
pub fn renderer_with_builtins<B: engine_core::RenderBackend>(
    document: std::rc::Rc<dyn DocumentModel>,
    backend: B,
    viewport: engine_core::Viewport,
    config: &config::UnderlayConfig,
) -> anyhow::Result<UnderlayRenderer<B>> {
    Ok(UnderlayRenderer::new(
        document,
        backend,
        viewport,
        &builtin_constructors(),
        config,
    )?)
}
