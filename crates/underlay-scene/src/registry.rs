//! Named plugin instances with runtime enable/disable.

use std::panic::{AssertUnwindSafe, catch_unwind};

use engine_core::Painter;
use indexmap::IndexMap;

use crate::document::Shape;
use crate::plugin::VisualizationPlugin;

struct PluginEntry {
    plugin: Box<dyn VisualizationPlugin>,
    enabled: bool,
}

/// Outcome of one [`PluginRegistry::dispatch`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Plugins whose output was kept, in dispatch order.
    pub rendered: Vec<String>,
    /// Plugins whose output was discarded, with the reason.
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plugins keyed by name, dispatched in registration order.
///
/// Every plugin starts disabled.
#[derive(Default)]
pub struct PluginRegistry {
    entries: IndexMap<String, PluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a plugin under its name. A plugin already registered under that name is replaced
    /// in place, keeping its dispatch position, and the slot starts disabled again.
    pub fn register(&mut self, plugin: Box<dyn VisualizationPlugin>) {
        let name = plugin.name().to_string();
        let entry = PluginEntry {
            plugin,
            enabled: false,
        };
        if self.entries.insert(name.clone(), entry).is_some() {
            tracing::debug!(plugin = %name, "replaced registered plugin");
        }
    }

    /// Returns `false` when no plugin has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Flip a plugin's enabled flag and return the new value.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let entry = self.entries.get_mut(name)?;
        entry.enabled = !entry.enabled;
        Some(entry.enabled)
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entries.get(name).map(|entry| entry.enabled)
    }

    /// Registered names in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn enabled_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every enabled plugin in registration order.
    ///
    /// Each plugin starts from the painter state in effect when dispatch began. A plugin that
    /// returns an error or panics has its recorded output rolled back and is reported in
    /// [`DispatchReport::failed`]; the remaining plugins still run.
    pub fn dispatch(&mut self, painter: &mut Painter, shapes: &[Shape]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (name, entry) in self.entries.iter_mut().filter(|(_, entry)| entry.enabled) {
            let checkpoint = painter.checkpoint();
            let plugin = &mut entry.plugin;
            let outcome = catch_unwind(AssertUnwindSafe(|| plugin.render(painter, shapes)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(format!("{err:#}")),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            match failure {
                None => {
                    painter.restore_state(&checkpoint);
                    report.rendered.push(name.clone());
                }
                Some(reason) => {
                    tracing::warn!(plugin = %name, error = %reason, "underlay plugin failed; skipping its output this frame");
                    painter.rollback(&checkpoint);
                    report.failed.push((name.clone(), reason));
                }
            }
        }
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{EndShape, Viewport};

    /// Draws one point-shape per call and counts how often it ran.
    struct Counter {
        name: &'static str,
        calls: usize,
    }

    impl VisualizationPlugin for Counter {
        fn name(&self) -> &str {
            self.name
        }

        fn render(&mut self, painter: &mut Painter, _shapes: &[Shape]) -> anyhow::Result<()> {
            self.calls += 1;
            painter.begin_shape()?;
            painter.vertex(self.calls as f32, 0.0, 0.0)?;
            painter.end_shape(EndShape::Open)?;
            Ok(())
        }
    }

    fn counter(name: &'static str) -> Box<dyn VisualizationPlugin> {
        Box::new(Counter { name, calls: 0 })
    }

    fn painter() -> Painter {
        Painter::begin_frame(Viewport::new(10, 10))
    }

    #[test]
    fn plugins_start_disabled_and_dispatch_in_registration_order() {
        let mut registry = PluginRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(counter(name));
        }
        assert_eq!(registry.enabled_names().count(), 0);
        assert!(registry.dispatch(&mut painter(), &[]).rendered.is_empty());

        registry.set_enabled("b", true);
        registry.set_enabled("c", true);
        for _ in 0..3 {
            let report = registry.dispatch(&mut painter(), &[]);
            assert_eq!(report.rendered, vec!["c", "b"]);
        }
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut registry = PluginRegistry::new();
        registry.register(counter("a"));
        assert!(!registry.set_enabled("missing", true));
        assert_eq!(registry.toggle("missing"), None);
        assert_eq!(registry.is_enabled("missing"), None);
        assert_eq!(registry.is_enabled("a"), Some(false));
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = PluginRegistry::new();
        registry.register(counter("a"));
        registry.register(counter("b"));
        registry.set_enabled("a", true);
        registry.register(counter("a"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.is_enabled("a"), Some(false));
    }

    #[test]
    fn toggling_keeps_plugin_state() {
        let mut registry = PluginRegistry::new();
        registry.register(counter("a"));
        registry.set_enabled("a", true);

        let mut p = painter();
        registry.dispatch(&mut p, &[]);
        assert_eq!(registry.toggle("a"), Some(false));
        registry.dispatch(&mut p, &[]);
        assert_eq!(registry.toggle("a"), Some(true));
        registry.dispatch(&mut p, &[]);

        // The counter kept counting across the disabled frame: calls 1 and 2 were recorded.
        let xs: Vec<f32> = p
            .display_list()
            .shapes()
            .map(|shape| shape.vertices[0].pos[0])
            .collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    struct Failing {
        panic: bool,
    }

    impl VisualizationPlugin for Failing {
        fn name(&self) -> &str {
            if self.panic { "panics" } else { "errors" }
        }

        fn render(&mut self, painter: &mut Painter, _shapes: &[Shape]) -> anyhow::Result<()> {
            painter.push();
            painter.translate(100.0, 0.0, 0.0);
            painter.begin_shape()?;
            painter.vertex(0.0, 0.0, 0.0)?;
            painter.end_shape(EndShape::Open)?;
            if self.panic {
                panic!("boom");
            }
            anyhow::bail!("no geometry service")
        }
    }

    #[test]
    fn failures_are_isolated_and_rolled_back() {
        let mut registry = PluginRegistry::new();
        registry.register(counter("first"));
        registry.register(Box::new(Failing { panic: false }));
        registry.register(Box::new(Failing { panic: true }));
        registry.register(counter("last"));
        for name in ["first", "errors", "panics", "last"] {
            registry.set_enabled(name, true);
        }

        let mut p = painter();
        let before = p.current_transform();
        let report = registry.dispatch(&mut p, &[]);

        assert_eq!(report.rendered, vec!["first", "last"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "errors");
        assert!(report.failed[0].1.contains("no geometry service"));
        assert!(report.failed[1].1.contains("boom"));
        assert!(!report.is_clean());

        // Only the two healthy plugins' shapes survive, and the leaked push was undone.
        assert_eq!(p.display_list().commands.len(), 2);
        assert_eq!(p.current_transform(), before);
        assert!(p.pop().is_err());
    }
}
