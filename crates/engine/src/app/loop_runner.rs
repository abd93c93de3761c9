use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::input::{ActionStates, InputAction};
use super::joystick::{JoystickLayout, VirtualJoystick};
use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use super::rendering::{start_button_rect, HudData, Renderer, ScreenRect, Viewport};
use super::scene::{InputSnapshot, Scene, SceneWorld, Vec2};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub canvas: Viewport,
    /// Initial window size as a multiple of the canvas.
    pub window_scale: f64,
    pub metrics_log_interval: Duration,
    pub debug_overlay_visible: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Hangout".to_string(),
            canvas: Viewport::CANVAS,
            window_scale: 1.5,
            metrics_log_interval: Duration::from_secs(1),
            debug_overlay_visible: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Runs `scene` until the window closes. Every redraw measures the real elapsed time and runs
/// exactly one update with it.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        asset_dir = %app_paths.asset_dir.display(),
        "startup"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let canvas = config.canvas;
    let scale = if config.window_scale.is_finite() && config.window_scale > 0.0 {
        config.window_scale
    } else {
        1.0
    };
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                canvas.width as f64 * scale,
                canvas.height as f64 * scale,
            ))
            .with_min_inner_size(LogicalSize::new(canvas.width as f64, canvas.height as f64))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), canvas, app_paths.asset_dir.clone())
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        canvas_width = canvas.width,
        canvas_height = canvas.height,
        window_scale = scale,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut world = SceneWorld::default();
    scene.load(&mut world);
    info!(
        has_character = world.character().is_some(),
        "scene_loaded"
    );

    let mut input_collector = InputCollector::new(canvas);
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut latest_metrics = LoopMetricsSnapshot::default();
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = config.debug_overlay_visible;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize_surface(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize_surface(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => input_collector.release_all(),
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor(renderer.window_to_canvas(position.x, position.y));
                }
                WindowEvent::CursorLeft { .. } => input_collector.clear_cursor(),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => input_collector.handle_primary_click(),
                WindowEvent::Touch(touch) => {
                    let point = renderer.window_to_canvas(touch.location.x, touch.location.y);
                    input_collector.handle_touch(touch.id, touch.phase, point);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }
                    if input_collector.take_start_pressed() {
                        info!("game_started");
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let snapshot = input_collector.snapshot();
                    scene.update(frame_delta_ms(raw_frame_dt), &snapshot, &mut world);

                    let status_lines = if overlay_visible {
                        let mut lines = vec![format_metrics_line(latest_metrics)];
                        lines.extend(scene.status_lines(&world));
                        lines
                    } else {
                        Vec::new()
                    };
                    let hud = HudData {
                        show_start_notice: !input_collector.started,
                        joystick: input_collector
                            .touch_seen
                            .then_some(&input_collector.joystick),
                        status_lines: &status_lines,
                    };
                    match renderer.render_frame(&world, &hud) {
                        Ok(stats) => debug!(
                            tiles_drawn = stats.tiles_drawn,
                            character_drawn = stats.character_drawn,
                            "frame_rendered"
                        ),
                        Err(error) => {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                    }

                    let next_title = scene.debug_title(&world);
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(metrics) = metrics_accumulator.maybe_snapshot(now) {
                        latest_metrics = metrics;
                        info!(
                            fps = metrics.fps,
                            frame_time_ms = metrics.frame_time_ms,
                            slowest_frame_ms = metrics.slowest_frame_ms,
                            tiles_drawn = renderer.last_stats().tiles_drawn,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                scene.unload(&mut world);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn frame_delta_ms(raw_frame_dt: Duration) -> f32 {
    raw_frame_dt.as_secs_f32() * 1000.0
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn format_metrics_line(metrics: LoopMetricsSnapshot) -> String {
    format!(
        "FPS: {:.0}  FRAME: {:.1} MS",
        metrics.fps, metrics.frame_time_ms
    )
}

#[derive(Debug)]
struct InputCollector {
    quit_requested: bool,
    started: bool,
    start_pressed_edge: bool,
    overlay_toggle_is_down: bool,
    overlay_toggle_pressed_edge: bool,
    keyboard: ActionStates,
    joystick: VirtualJoystick,
    touch_seen: bool,
    cursor: Option<Vec2>,
    start_button: ScreenRect,
}

impl InputCollector {
    fn new(canvas: Viewport) -> Self {
        Self {
            quit_requested: false,
            started: false,
            start_pressed_edge: false,
            overlay_toggle_is_down: false,
            overlay_toggle_pressed_edge: false,
            keyboard: ActionStates::default(),
            joystick: VirtualJoystick::new(JoystickLayout::for_viewport(canvas)),
            touch_seen: false,
            cursor: None,
            start_button: start_button_rect(canvas),
        }
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) if is_pressed => self.quit_requested = true,
            PhysicalKey::Code(KeyCode::F3) => self.handle_overlay_toggle_key_state(key_event.state),
            PhysicalKey::Code(KeyCode::Enter | KeyCode::Space) if is_pressed => self.start(),
            key => self.update_action_state_from_physical_key(key, is_pressed),
        }
    }

    fn handle_overlay_toggle_key_state(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.overlay_toggle_is_down {
                    self.overlay_toggle_pressed_edge = true;
                }
                self.overlay_toggle_is_down = true;
            }
            ElementState::Released => self.overlay_toggle_is_down = false,
        }
    }

    /// Movement keys are ignored until the game has started.
    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        if !self.started {
            return;
        }
        let action = match key {
            PhysicalKey::Code(KeyCode::KeyW | KeyCode::ArrowUp) => InputAction::MoveUp,
            PhysicalKey::Code(KeyCode::KeyS | KeyCode::ArrowDown) => InputAction::MoveDown,
            PhysicalKey::Code(KeyCode::KeyA | KeyCode::ArrowLeft) => InputAction::MoveLeft,
            PhysicalKey::Code(KeyCode::KeyD | KeyCode::ArrowRight) => InputAction::MoveRight,
            _ => return,
        };
        self.keyboard.set(action, is_pressed);
    }

    fn set_cursor(&mut self, point: Vec2) {
        self.cursor = Some(point);
    }

    fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    fn handle_primary_click(&mut self) {
        if self
            .cursor
            .is_some_and(|point| self.start_button.contains(point))
        {
            self.start();
        }
    }

    fn handle_touch(&mut self, id: u64, phase: TouchPhase, point: Vec2) {
        if !self.touch_seen {
            self.touch_seen = true;
            info!("touch_input_detected");
        }
        match phase {
            TouchPhase::Started if !self.started => {
                if self.start_button.contains(point) {
                    self.start();
                }
            }
            TouchPhase::Started => {
                self.joystick.begin(id, point);
            }
            TouchPhase::Moved => {
                self.joystick.drag(id, point);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.joystick.end(id);
            }
        }
    }

    fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.start_pressed_edge = true;
        }
    }

    fn release_all(&mut self) {
        self.keyboard.clear();
    }

    fn snapshot(&self) -> InputSnapshot {
        let directions = self.keyboard.directions().union(self.joystick.flags());
        InputSnapshot::new(ActionStates::from(directions))
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        std::mem::take(&mut self.overlay_toggle_pressed_edge)
    }

    fn take_start_pressed(&mut self) -> bool {
        std::mem::take(&mut self.start_pressed_edge)
    }
}
