use instant::Instant;
use winit::{
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use viewer_core::{
    analyze_transparency, force_transparency, BloomLayer, BloomMode, BloomParamsUpdate, BloomState,
    Camera, GlowEngine, GlowMode, GlowParamsUpdate, GlowSettings, ModelLoader, OrbitControls,
    Scene,
};
use viewer_render::Renderer;

const FALLBACK_MODEL: &str = "assets/house.obj";

const ORBIT_SPEED: f32 = 0.005; // radians per pixel of drag
const ZOOM_LINE_STEP: f32 = 0.5;

struct App<'w> {
    window: &'w winit::window::Window,
    renderer: Renderer<'w>,
    loader: ModelLoader,
    scene: Scene,
    layer: BloomLayer,
    glow: GlowEngine,
    bloom: BloomState,
    camera: Camera,
    controls: OrbitControls,
    start: Instant,
    model_path: String,
    mouse_down: bool,
    last_cursor: Option<(f64, f64)>,
}

impl<'w> App<'w> {
    fn load_model(&mut self, path: &str) {
        log::info!("loading model '{path}'...");
        // Tear down effect state bound to the outgoing model before anything
        // about the new one is built.
        self.glow.clear(&mut self.scene, &mut self.layer);
        self.layer.clear();
        match self.loader.load(path) {
            Ok(scene) => {
                self.scene = scene;
                self.layer.tag_emissive(&self.scene);
                self.glow.apply(&mut self.scene, &mut self.layer);
                self.model_path = path.to_string();
                log::info!("model '{path}' ready ({} meshes)", self.scene.len());
            }
            Err(err) => {
                log::error!("failed to load '{path}': {err}");
                if path != FALLBACK_MODEL {
                    log::warn!("falling back to '{FALLBACK_MODEL}'");
                    self.load_model(FALLBACK_MODEL);
                }
            }
        }
    }

    fn frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        // Strict per-frame order: pulse, then controls, then the bloom render.
        let now_sec = self.start.elapsed().as_secs_f64();
        self.glow.update(&mut self.scene, now_sec);
        self.controls.update();
        self.controls.apply_to(&mut self.camera);
        self.renderer
            .render_frame(&mut self.scene, &self.layer, &self.bloom, &self.camera)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.aspect = width as f32 / height as f32;
        self.renderer.resize(width, height);
    }

    fn reapply_glow(&mut self) {
        self.glow.apply(&mut self.scene, &mut self.layer);
    }

    fn handle_key(&mut self, key: &Key) {
        match key {
            Key::Character(ch) => match ch.as_str() {
                "b" => {
                    let next = match self.bloom.mode {
                        BloomMode::Simple => BloomMode::Selective,
                        BloomMode::Selective => BloomMode::Simple,
                    };
                    self.bloom.set_mode(next);
                }
                "g" => {
                    let next = match self.glow.mode() {
                        GlowMode::Emissive => GlowMode::Separate,
                        GlowMode::Separate => GlowMode::Emissive,
                    };
                    self.glow.set_mode(next);
                    self.reapply_glow();
                }
                "p" => {
                    let enabled = !self.glow.pulse_enabled();
                    self.glow.set_pulse_enabled(&mut self.scene, enabled);
                }
                "f" => {
                    let mut settings = self.glow.settings();
                    settings.force_all = !settings.force_all;
                    self.glow.set_settings(settings);
                    self.reapply_glow();
                    log::info!("force-all glow: {}", settings.force_all);
                }
                "n" => {
                    // Name heuristics only
                    self.glow.set_settings(GlowSettings {
                        by_transparency: false,
                        by_emissive: false,
                        force_all: false,
                        ..GlowSettings::default()
                    });
                    self.reapply_glow();
                    log::info!("glow selector: name heuristics only");
                }
                "m" => {
                    self.glow.set_settings(GlowSettings::default());
                    self.reapply_glow();
                    log::info!("glow selector: default heuristics");
                }
                "h" => {
                    let hue = self.glow.params().hue + 0.05;
                    self.glow
                        .update_params(&mut self.scene, GlowParamsUpdate {
                            hue: Some(hue),
                            ..GlowParamsUpdate::default()
                        });
                    log::info!("glow hue: {:.2}", self.glow.params().hue);
                }
                "t" | "T" => {
                    let delta = if ch.as_str() == "T" { 0.05 } else { -0.05 };
                    let threshold = (self.bloom.params.threshold + delta).max(0.0);
                    self.bloom.update_params(BloomParamsUpdate {
                        threshold: Some(threshold),
                        ..BloomParamsUpdate::default()
                    });
                    log::info!("bloom threshold: {:.2}", self.bloom.params.threshold);
                }
                "r" | "R" => {
                    let delta = if ch.as_str() == "R" { 0.1 } else { -0.1 };
                    let radius = (self.bloom.params.radius + delta).max(0.0);
                    self.bloom.update_params(BloomParamsUpdate {
                        radius: Some(radius),
                        ..BloomParamsUpdate::default()
                    });
                    log::info!("bloom radius: {:.2}", self.bloom.params.radius);
                }
                "e" | "E" => {
                    let delta = if ch.as_str() == "E" { 0.1 } else { -0.1 };
                    let exposure = (self.bloom.params.exposure + delta).max(0.0);
                    self.bloom.update_params(BloomParamsUpdate {
                        exposure: Some(exposure),
                        ..BloomParamsUpdate::default()
                    });
                    log::info!("exposure: {:.2}", self.bloom.params.exposure);
                }
                "o" | "O" => {
                    let opacity = if ch.as_str() == "O" { 1.0 } else { 0.5 };
                    force_transparency(&mut self.scene, opacity);
                    self.reapply_glow();
                }
                "a" => {
                    let report = analyze_transparency(&self.scene);
                    log::info!(
                        "{} transparent / {} opaque meshes",
                        report.transparent.len(),
                        report.opaque.len()
                    );
                    for mesh in &report.transparent {
                        log::info!("  transparent: {} (opacity {:.2})", mesh.name, mesh.opacity);
                    }
                }
                "l" => {
                    let path = self.model_path.clone();
                    self.load_model(&path);
                }
                "c" => {
                    self.loader.clear_cache();
                }
                _ => {}
            },
            Key::Named(NamedKey::ArrowUp) => {
                let strength = self.bloom.params.strength + 0.1;
                self.bloom.update_params(BloomParamsUpdate {
                    strength: Some(strength),
                    ..BloomParamsUpdate::default()
                });
                log::info!("bloom strength: {:.2}", self.bloom.params.strength);
            }
            Key::Named(NamedKey::ArrowDown) => {
                let strength = (self.bloom.params.strength - 0.1).max(0.0);
                self.bloom.update_params(BloomParamsUpdate {
                    strength: Some(strength),
                    ..BloomParamsUpdate::default()
                });
                log::info!("bloom strength: {:.2}", self.bloom.params.strength);
            }
            Key::Named(NamedKey::ArrowRight) => {
                let intensity = self.glow.params().intensity + 0.2;
                self.glow.update_params(&mut self.scene, GlowParamsUpdate {
                    intensity: Some(intensity),
                    ..GlowParamsUpdate::default()
                });
                log::info!("glow intensity: {:.2}", self.glow.params().intensity);
            }
            Key::Named(NamedKey::ArrowLeft) => {
                let intensity = (self.glow.params().intensity - 0.2).max(0.0);
                self.glow.update_params(&mut self.scene, GlowParamsUpdate {
                    intensity: Some(intensity),
                    ..GlowParamsUpdate::default()
                });
                log::info!("glow intensity: {:.2}", self.glow.params().intensity);
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let model_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| FALLBACK_MODEL.to_string());

    let event_loop = EventLoop::new().expect("event loop");
    let window = WindowBuilder::new()
        .with_title("Model Viewer (bloom + glow)")
        .build(&event_loop)
        .expect("window");

    let size = window.inner_size();
    let renderer = pollster::block_on(Renderer::new(&window)).expect("gpu");

    let mut app = App {
        window: &window,
        renderer,
        loader: ModelLoader::new(),
        scene: Scene::new(),
        layer: BloomLayer::new(),
        glow: GlowEngine::new(),
        bloom: BloomState::default(),
        camera: Camera::new(size.width as f32 / size.height.max(1) as f32),
        controls: OrbitControls::new(),
        start: Instant::now(),
        model_path: model_path.clone(),
        mouse_down: false,
        last_cursor: None,
    };
    app.load_model(&model_path);

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            } => app.resize(size.width, size.height),
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => elwt.exit(),
            Event::WindowEvent {
                event: WindowEvent::KeyboardInput { event, .. },
                ..
            } => {
                if event.state == ElementState::Pressed {
                    app.handle_key(&event.logical_key);
                }
            }
            Event::WindowEvent {
                event: WindowEvent::MouseInput { state, button, .. },
                ..
            } => {
                if button == MouseButton::Left {
                    app.mouse_down = state == ElementState::Pressed;
                    if !app.mouse_down {
                        app.last_cursor = None;
                    }
                }
            }
            Event::WindowEvent {
                event: WindowEvent::CursorMoved { position, .. },
                ..
            } => {
                if app.mouse_down {
                    if let Some((lx, ly)) = app.last_cursor {
                        let dx = (position.x - lx) as f32;
                        let dy = (position.y - ly) as f32;
                        app.controls.rotate(-dx * ORBIT_SPEED, dy * ORBIT_SPEED);
                    }
                    app.last_cursor = Some((position.x, position.y));
                } else {
                    app.last_cursor = None;
                }
            }
            Event::WindowEvent {
                event: WindowEvent::MouseWheel { delta, .. },
                ..
            } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * ZOOM_LINE_STEP,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 * 0.01,
                };
                app.controls.zoom(amount);
            }
            Event::AboutToWait => match app.frame() {
                Ok(_) => app.window.request_redraw(),
                Err(wgpu::SurfaceError::Lost) => {
                    let size = app.window.inner_size();
                    app.resize(size.width, size.height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                Err(_) => {}
            },
            _ => {}
        })
        .unwrap();
}
