use std::rc::Rc;

use engine_core::{RenderBackend, Viewport};
use underlay_config::UnderlayConfig;

use crate::compositor::Compositor;
use crate::document::DocumentModel;
use crate::error::Result;
use crate::frame::FrameContext;
use crate::plugin::{PluginConstructor, PluginContext};
use crate::registry::{DispatchReport, PluginRegistry};

/// The 3D underlay for one document: plugins, frame pipeline and the backend they draw with.
pub struct UnderlayRenderer<B: RenderBackend> {
    document: Rc<dyn DocumentModel>,
    compositor: Compositor<B>,
    registry: PluginRegistry,
}

impl<B: RenderBackend> UnderlayRenderer<B> {
    /// Initialize the frame pipeline, then construct each plugin once, in order.
    ///
    /// Plugins named in `config.plugins.enabled` start enabled; all others start disabled.
    /// Fails with [`crate::UnderlayError::Init`] if the offscreen target or the fog program
    /// cannot be created.
    pub fn new(
        document: Rc<dyn DocumentModel>,
        backend: B,
        viewport: Viewport,
        constructors: &[PluginConstructor],
        config: &UnderlayConfig,
    ) -> Result<Self> {
        let mut compositor = Compositor::new(backend);
        compositor.initialize(viewport)?;

        let ctx = PluginContext {
            document: document.clone(),
            config: config.clone(),
        };
        let mut registry = PluginRegistry::new();
        for construct in constructors {
            registry.register(construct(&ctx));
        }
        for name in &config.plugins.enabled {
            if !registry.set_enabled(name, true) {
                tracing::warn!(plugin = %name, "configured plugin is not registered");
            }
        }
        tracing::info!(
            plugins = registry.len(),
            width = viewport.width,
            height = viewport.height,
            "underlay renderer ready"
        );

        Ok(Self {
            document,
            compositor,
            registry,
        })
    }

    /// Draw one frame: capture the document, dispatch enabled plugins into the offscreen
    /// target, then composite it with fog onto the screen.
    ///
    /// Plugin failures are reported in the returned [`DispatchReport`]; an `Err` means the
    /// backend failed and the frame was dropped.
    pub fn render_frame(&mut self) -> Result<DispatchReport> {
        let frame = FrameContext::capture(self.document.as_ref(), self.compositor.viewport());
        let mut painter = self.compositor.begin_scene(&frame)?;
        let report = self.registry.dispatch(&mut painter, &frame.shapes);
        self.compositor.end_scene(painter)?;
        self.compositor.composite(frame.background)?;
        self.compositor.finish_frame()?;
        Ok(report)
    }

    /// Returns `false` if no plugin has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        self.registry.set_enabled(name, enabled)
    }

    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        self.registry.toggle(name)
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.registry.is_enabled(name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.registry.names().map(str::to_string).collect()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn compositor(&self) -> &Compositor<B> {
        &self.compositor
    }

    pub fn backend(&self) -> &B {
        self.compositor.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.compositor.backend_mut()
    }

    pub fn document(&self) -> &Rc<dyn DocumentModel> {
        &self.document
    }

    /// Follow a host resize. Zero-sized viewports (minimized windows) are ignored.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        if viewport.is_empty() {
            return Ok(());
        }
        self.compositor.resize(viewport)
    }
}
