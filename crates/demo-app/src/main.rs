use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use engine_core::{Viewport, WgpuBackend, make_surface_config};
use pollster::FutureExt;
use underlay_config::UnderlayConfig;
use underlay_scene::{
    AppearanceMode, Camera, DocumentModel, EdgeRope, GeoExtrusion, HistorySlice, MemoryDocument,
    UnderlayRenderer, builtin_constructors,
};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

mod sample;

const ZOOM_STEP: f32 = 1.1;
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 8.0;

fn main() -> Result<()> {
    env_logger::init();
    let config = UnderlayConfig::load();

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::PhysicalSize::new(
            config.window.width,
            config.window.height,
        ))
        .build(&event_loop)?;
    // Leak the window to satisfy wgpu surface lifetime; event loop never returns.
    let window: &'static winit::window::Window = Box::leak(Box::new(window));

    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(window)?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .block_on()
        .context("no suitable GPU adapter found")?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .block_on()?;
    let device = Arc::new(device);
    let queue = Arc::new(queue);

    let mut size = window.inner_size();
    let surface_config = make_surface_config(&adapter, &surface, size.width, size.height)
        .context("surface is not supported by the adapter")?;
    surface.configure(&device, &surface_config);

    let document = Rc::new(MemoryDocument::new());
    let shapes = sample::populate(&document);
    document.set_appearance_mode(AppearanceMode::Dark);
    log::info!("document ready with {} shapes", document.len());

    let backend = WgpuBackend::new(device.clone(), queue.clone(), surface_config.format)?;
    let mut renderer = UnderlayRenderer::new(
        document.clone(),
        backend,
        Viewport::new(size.width, size.height),
        &builtin_constructors(),
        &config,
    )?;
    log::info!(
        "plugins: {:?} (keys 1/2/3 toggle, D toggles dark mode, R moves the first shape)",
        renderer.plugin_names()
    );

    let mut cursor: Option<(f32, f32)> = None;
    let mut dragging = false;

    event_loop.run(move |event, target| match event {
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            window_id,
        } if window_id == window.id() => {
            target.exit();
        }
        Event::WindowEvent {
            event: WindowEvent::Resized(new_size),
            window_id,
        } if window_id == window.id() => {
            size = new_size;
            if size.width > 0 && size.height > 0 {
                if let Some(new_config) =
                    make_surface_config(&adapter, &surface, size.width, size.height)
                {
                    surface.configure(&device, &new_config);
                }
                if let Err(err) = renderer.resize(Viewport::new(size.width, size.height)) {
                    log::warn!("underlay resize failed: {err}");
                }
            }
        }
        Event::WindowEvent {
            event: WindowEvent::CursorMoved { position, .. },
            ..
        } => {
            let now = (position.x as f32, position.y as f32);
            if let (true, Some(prev)) = (dragging, cursor) {
                let mut camera = document.camera();
                camera.x += (now.0 - prev.0) / camera.zoom;
                camera.y += (now.1 - prev.1) / camera.zoom;
                document.set_camera(camera);
            }
            cursor = Some(now);
        }
        Event::WindowEvent {
            event: WindowEvent::MouseInput { state, button, .. },
            ..
        } => {
            if button == MouseButton::Left {
                dragging = state == ElementState::Pressed;
            }
        }
        Event::WindowEvent {
            event: WindowEvent::MouseWheel { delta, .. },
            ..
        } => {
            let lines = match delta {
                MouseScrollDelta::LineDelta(_, y) => y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
            };
            let anchor = cursor.unwrap_or((size.width as f32 * 0.5, size.height as f32 * 0.5));
            document.set_camera(zoom_about(document.camera(), anchor, ZOOM_STEP.powf(lines)));
        }
        Event::WindowEvent {
            event: WindowEvent::KeyboardInput { event, .. },
            ..
        } if event.state == ElementState::Pressed && !event.repeat => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return;
            };
            let plugin = match code {
                KeyCode::Digit1 => Some(GeoExtrusion::NAME),
                KeyCode::Digit2 => Some(HistorySlice::NAME),
                KeyCode::Digit3 => Some(EdgeRope::NAME),
                _ => None,
            };
            if let Some(name) = plugin {
                if let Some(enabled) = renderer.toggle(name) {
                    log::info!("{name} {}", if enabled { "enabled" } else { "disabled" });
                }
                return;
            }
            match code {
                KeyCode::KeyD => {
                    let mode = match document.appearance_mode() {
                        AppearanceMode::Dark => AppearanceMode::Light,
                        AppearanceMode::Light => AppearanceMode::Dark,
                    };
                    document.set_appearance_mode(mode);
                }
                KeyCode::KeyR => {
                    if let Some(&id) = shapes.first() {
                        document.update(id, |shape| {
                            shape.x += 20.0;
                            shape.rotation += std::f32::consts::PI / 12.0;
                        });
                    }
                }
                _ => {}
            }
        }
        Event::WindowEvent {
            event: WindowEvent::RedrawRequested,
            window_id,
        } if window_id == window.id() => match surface.get_current_texture() {
            Ok(frame) => {
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                renderer.backend_mut().set_screen(view);
                match renderer.render_frame() {
                    Ok(report) => {
                        for (name, reason) in &report.failed {
                            log::warn!("plugin {name} failed: {reason}");
                        }
                    }
                    Err(err) => log::warn!("frame dropped: {err}"),
                }
                renderer.backend_mut().clear_screen();
                frame.present();
            }
            Err(_) => {
                if let Some(new_config) =
                    make_surface_config(&adapter, &surface, size.width, size.height)
                {
                    surface.configure(&device, &new_config);
                }
            }
        },
        Event::AboutToWait => {
            window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}

/// Scale the zoom by `factor` while keeping the page point under `anchor` fixed on screen.
fn zoom_about(camera: Camera, anchor: (f32, f32), factor: f32) -> Camera {
    let zoom = (camera.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    let page = (anchor.0 / camera.zoom - camera.x, anchor.1 / camera.zoom - camera.y);
    Camera {
        x: anchor.0 / zoom - page.0,
        y: anchor.1 / zoom - page.1,
        zoom,
    }
}
