use std::rc::Rc;

use engine_core::{BackendCall, Destination, EndShape, Painter, RecordingBackend, Viewport};
use underlay_config::UnderlayConfig;
use underlay_scene::{
    AppearanceMode, Camera, DocumentModel, EdgeRope, GeoExtrusion, HistorySlice, MemoryDocument,
    PipelineState, PluginConstructor, PluginContext, Shape, ShapeGeometry, ShapeKind,
    UnderlayError, UnderlayRenderer, VisualizationPlugin, background_color, builtin_constructors,
};

const VIEWPORT: Viewport = Viewport {
    width: 800,
    height: 600,
};

fn document() -> Rc<MemoryDocument> {
    let doc = Rc::new(MemoryDocument::new());
    doc.insert(
        ShapeKind::Geo,
        0.0,
        0.0,
        ShapeGeometry::polygon(vec![[0.0, 0.0], [100.0, 0.0], [50.0, 80.0]]),
    );
    doc.insert(
        ShapeKind::Arrow,
        200.0,
        50.0,
        ShapeGeometry::polyline(vec![[0.0, 0.0], [120.0, 30.0]]),
    );
    doc.insert(ShapeKind::Geo, 400.0, 300.0, ShapeGeometry::rect(60.0, 40.0));
    doc
}

fn renderer(
    doc: &Rc<MemoryDocument>,
    config: &UnderlayConfig,
) -> anyhow::Result<UnderlayRenderer<RecordingBackend>> {
    Ok(UnderlayRenderer::new(
        doc.clone(),
        RecordingBackend::new(),
        VIEWPORT,
        &builtin_constructors(),
        config,
    )?)
}

fn last_list(renderer: &UnderlayRenderer<RecordingBackend>) -> &engine_core::DisplayList {
    renderer.backend().lists.last().expect("a display list was drawn")
}

#[test]
fn plugins_start_disabled_and_render_nothing() -> anyhow::Result<()> {
    let doc = document();
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    assert_eq!(renderer.plugin_names(), vec!["Geo", "History", "Edges"]);
    for name in renderer.plugin_names() {
        assert_eq!(renderer.is_enabled(&name), Some(false));
    }

    let report = renderer.render_frame()?;
    assert!(report.rendered.is_empty());
    assert!(last_list(&renderer).commands.is_empty());
    assert_eq!(renderer.compositor().state(), PipelineState::Ready);
    Ok(())
}

#[test]
fn geo_walls_and_edge_ropes_reach_the_offscreen_target() -> anyhow::Result<()> {
    let doc = document();
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    renderer.set_enabled(GeoExtrusion::NAME, true);
    renderer.set_enabled(EdgeRope::NAME, true);

    let report = renderer.render_frame()?;
    assert_eq!(report.rendered, vec!["Geo", "Edges"]);
    assert!(report.is_clean());

    let list = last_list(&renderer);
    let closed = list.shapes().filter(|s| s.end == EndShape::Close).count();
    let open = list.shapes().filter(|s| s.end == EndShape::Open).count();
    // Triangle: 3 walls, open arrow: 1 wall, rectangle: 4 walls.
    assert_eq!(closed, 3 + 1 + 4);
    // Three shapes, two consecutive pairs.
    assert_eq!(open, 2);
    Ok(())
}

#[test]
fn frame_runs_the_two_passes_in_order() -> anyhow::Result<()> {
    let doc = document();
    doc.set_appearance_mode(AppearanceMode::Dark);
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    renderer.backend_mut().take_calls();

    renderer.render_frame()?;
    let calls = renderer.backend_mut().take_calls();
    let kinds: Vec<&str> = calls
        .iter()
        .map(|call| match call {
            BackendCall::BindTarget(_) => "bind-target",
            BackendCall::Clear(_) => "clear",
            BackendCall::DrawDisplayList(_) => "draw-scene",
            BackendCall::UnbindTarget => "unbind-target",
            BackendCall::BindScreen => "bind-screen",
            BackendCall::UseProgram(_) => "use-program",
            BackendCall::SetUniform(_, name, _) => name.as_str(),
            BackendCall::DrawFullscreenQuad => "quad",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "bind-target",
            "clear",
            "draw-scene",
            "unbind-target",
            "bind-screen",
            "use-program",
            "fog",
            "colorBuffer",
            "depthBuffer",
            "quad",
        ]
    );

    let fog = calls.iter().find_map(|call| match call {
        BackendCall::SetUniform(_, name, engine_core::UniformValue::Vec3(rgb)) if name == "fog" => {
            Some(*rgb)
        }
        _ => None,
    });
    assert_eq!(fog, Some(background_color(AppearanceMode::Dark).to_rgb()));
    assert_eq!(renderer.backend().destination(), Destination::Screen);
    Ok(())
}

#[test]
fn history_records_while_disabled_and_survives_toggling() -> anyhow::Result<()> {
    let doc = document();
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    let id = doc.current_shapes()[2].id;
    for step in 1..=4 {
        doc.update(id, |s| s.rotation = step as f32 * 0.1);
    }

    assert_eq!(renderer.toggle(HistorySlice::NAME), Some(true));
    renderer.render_frame()?;
    let first = last_list(&renderer).commands.len();
    assert_eq!(first, 4);

    renderer.toggle(HistorySlice::NAME);
    renderer.render_frame()?;
    assert!(last_list(&renderer).commands.is_empty());

    doc.update(id, |s| s.x += 10.0);
    renderer.toggle(HistorySlice::NAME);
    renderer.render_frame()?;
    assert_eq!(last_list(&renderer).commands.len(), first + 1);
    Ok(())
}

#[test]
fn history_capacity_comes_from_config() -> anyhow::Result<()> {
    let doc = document();
    let mut config = UnderlayConfig::default();
    config.history.capacity = 3;
    config.plugins.enabled = vec![HistorySlice::NAME.to_string()];
    let mut renderer = renderer(&doc, &config)?;

    let id = doc.current_shapes()[0].id;
    for step in 1..=10 {
        doc.update(id, |s| s.y = step as f32);
    }
    renderer.render_frame()?;
    let list = last_list(&renderer);
    assert_eq!(list.commands.len(), 3);

    // Newest slice first, at depth zero; older ones recede by the layer depth.
    let depths: Vec<f32> = list
        .shapes()
        .map(|s| s.transform.m[14])
        .collect();
    assert_eq!(depths, vec![0.0, -50.0, -100.0]);
    Ok(())
}

#[test]
fn configured_plugins_start_enabled() -> anyhow::Result<()> {
    let doc = document();
    let mut config = UnderlayConfig::default();
    config.plugins.enabled = vec!["Edges".into(), "Nope".into()];
    let renderer = renderer(&doc, &config)?;
    assert_eq!(renderer.is_enabled("Edges"), Some(true));
    assert_eq!(renderer.is_enabled("Geo"), Some(false));
    assert_eq!(renderer.is_enabled("Nope"), None);
    Ok(())
}

#[test]
fn target_allocation_failure_is_fatal() {
    let doc = document();
    let mut backend = RecordingBackend::new();
    backend.fail_target_allocation = true;
    let result = UnderlayRenderer::new(
        doc.clone() as Rc<dyn DocumentModel>,
        backend,
        VIEWPORT,
        &builtin_constructors(),
        &UnderlayConfig::default(),
    );
    assert!(matches!(result, Err(UnderlayError::Init(_))));
    // No plugin was constructed, so nothing subscribed to the document.
    assert_eq!(doc.listener_count(), 0);
}

#[test]
fn shader_failure_is_fatal() {
    let doc = document();
    let mut backend = RecordingBackend::new();
    backend.fail_shader_compilation = true;
    let result = UnderlayRenderer::new(
        doc.clone(),
        backend,
        VIEWPORT,
        &builtin_constructors(),
        &UnderlayConfig::default(),
    );
    assert!(matches!(result, Err(UnderlayError::Init(_))));
}

/// Fails on every other frame.
struct Flaky {
    frame: usize,
}

impl VisualizationPlugin for Flaky {
    fn name(&self) -> &str {
        "Flaky"
    }

    fn render(&mut self, painter: &mut Painter, shapes: &[Shape]) -> anyhow::Result<()> {
        self.frame += 1;
        for _ in shapes {
            painter.begin_shape()?;
            painter.vertex(0.0, 0.0, 0.0)?;
            painter.end_shape(EndShape::Open)?;
        }
        if self.frame % 2 == 0 {
            anyhow::bail!("frame {} went wrong", self.frame);
        }
        Ok(())
    }
}

fn flaky(_: &PluginContext) -> Box<dyn VisualizationPlugin> {
    Box::new(Flaky { frame: 0 })
}

#[test]
fn a_failing_plugin_only_loses_its_own_frame() -> anyhow::Result<()> {
    let doc = document();
    let constructors: Vec<PluginConstructor> = vec![flaky, GeoExtrusion::construct];
    let mut config = UnderlayConfig::default();
    config.plugins.enabled = vec!["Flaky".into(), "Geo".into()];
    let mut renderer = UnderlayRenderer::new(
        doc.clone(),
        RecordingBackend::new(),
        VIEWPORT,
        &constructors,
        &config,
    )?;

    let ok = renderer.render_frame()?;
    assert_eq!(ok.rendered, vec!["Flaky", "Geo"]);
    assert_eq!(last_list(&renderer).commands.len(), 3 + 8);

    let failed = renderer.render_frame()?;
    assert_eq!(failed.rendered, vec!["Geo"]);
    assert_eq!(failed.failed[0].0, "Flaky");
    assert_eq!(last_list(&renderer).commands.len(), 8);

    let recovered = renderer.render_frame()?;
    assert!(recovered.is_clean());
    Ok(())
}

#[test]
fn backend_failure_drops_the_frame_but_not_the_renderer() -> anyhow::Result<()> {
    let doc = document();
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    renderer.backend_mut().fail_draws = true;
    assert!(matches!(renderer.render_frame(), Err(UnderlayError::Backend(_))));
    assert_eq!(renderer.compositor().state(), PipelineState::Ready);

    renderer.backend_mut().fail_draws = false;
    renderer.render_frame()?;
    Ok(())
}

#[test]
fn resize_reallocates_between_frames() -> anyhow::Result<()> {
    let doc = document();
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    renderer.resize(Viewport::new(1024, 768))?;
    renderer.resize(Viewport::new(0, 0))?;
    assert_eq!(renderer.compositor().viewport(), Viewport::new(1024, 768));
    renderer.render_frame()?;
    assert_eq!(last_list(&renderer).viewport, Viewport::new(1024, 768));
    assert_eq!(renderer.backend().live_targets(), 1);
    Ok(())
}

#[test]
fn dropping_the_renderer_releases_resources_and_subscriptions() -> anyhow::Result<()> {
    let doc = document();
    let renderer = renderer(&doc, &UnderlayConfig::default())?;
    assert_eq!(doc.listener_count(), 1);
    drop(renderer);
    assert_eq!(doc.listener_count(), 0);
    Ok(())
}

#[test]
fn camera_drives_the_frame_transform() -> anyhow::Result<()> {
    let doc = document();
    doc.set_camera(Camera {
        x: -100.0,
        y: 40.0,
        zoom: 2.0,
    });
    let mut renderer = renderer(&doc, &UnderlayConfig::default())?;
    renderer.set_enabled("Geo", true);
    renderer.render_frame()?;

    let list = last_list(&renderer);
    let first_wall = list.shapes().next().expect("geo wall");
    // The triangle's origin (page 0,0) is drawn where the 2D surface puts it:
    // ((0 - 100) * 2, (0 + 40) * 2) = (-200, 80) px, i.e. render (-600, 220).
    let origin = first_wall.transform.transform_point([0.0, 0.0, 0.0]);
    assert!((origin[0] + 600.0).abs() < 1e-3, "{origin:?}");
    assert!((origin[1] - 220.0).abs() < 1e-3, "{origin:?}");
    Ok(())
}

#[test]
fn configured_rope_weight_sets_the_tessellated_width() -> anyhow::Result<()> {
    let doc = Rc::new(MemoryDocument::new());
    doc.insert(ShapeKind::Geo, 0.0, 100.0, ShapeGeometry::rect(20.0, 20.0));
    doc.insert(ShapeKind::Geo, 300.0, 100.0, ShapeGeometry::rect(20.0, 20.0));
    let mut config = UnderlayConfig::default();
    config.edges.stroke_weight = 6.0;
    config.plugins.enabled = vec![EdgeRope::NAME.into()];
    let mut renderer = renderer(&doc, &config)?;
    renderer.render_frame()?;

    let mesh = engine_core::tessellate_display_list(last_list(&renderer));
    assert!(mesh.triangles.is_empty());
    assert_eq!(mesh.strokes.len(), 20 * 6);
    // A horizontal rope sags along depth only, so its render-space height is the stroke weight.
    let ys = mesh.strokes.iter().map(|v| v.pos[1]);
    let height = ys.clone().fold(f32::MIN, f32::max) - ys.fold(f32::MAX, f32::min);
    assert!((height - 6.0).abs() < 1e-3, "rope height {height}");
    Ok(())
}
