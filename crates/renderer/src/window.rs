use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use timeline::SystemWallClock;
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::camera::{Camera, OrbitCamera};
use crate::frame::{FrameHost, FrameOutcome, LoopState, RenderLoop};
use crate::gpu::WgpuBackend;
use crate::program::{ProgramContext, ShaderProgram};
use crate::types::RendererConfig;
use crate::RenderError;

const DEFAULT_SHADER: &str = include_str!("../shaders/raymarch.frag");
const PIXELS_PER_ZOOM_STEP: f64 = 50.0;

type WindowLoop = RenderLoop<WgpuBackend, OrbitCamera, SystemWallClock>;

/// Frame scheduling through `Window::request_redraw`, paced by the Fifo swapchain.
struct WindowHost {
    window: Arc<Window>,
}

impl FrameHost for WindowHost {
    fn viewport(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Turns cursor motion into drag deltas while the left button is held.
#[derive(Debug, Default)]
struct DragState {
    pressed: bool,
    last: Option<PhysicalPosition<f64>>,
}

impl DragState {
    fn button(&mut self, state: ElementState) {
        self.pressed = state == ElementState::Pressed;
    }

    fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let previous = self.last.replace(position);
        if !self.pressed {
            return None;
        }
        previous.map(|from| ((position.x - from.x) as f32, (position.y - from.y) as f32))
    }
}

/// Everything the event loop owns. The render loop, and with it the surface,
/// is declared before the host so it is dropped before the window.
struct WindowState {
    render: WindowLoop,
    host: WindowHost,
    drag: DragState,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let mut backend =
            WgpuBackend::new(window.as_ref(), size, config.antialiasing, config.color_space)?;

        let source = match &config.shader_source {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read shader at {}", path.display()))?,
            None => DEFAULT_SHADER.to_string(),
        };
        let program_id = backend
            .create_program(&source)
            .context("failed to build raymarch program")?;
        let program = ShaderProgram::new(&backend, program_id);
        let quad = backend.create_quad();

        let mut camera = OrbitCamera::default();
        camera.set_aspect_ratio(aspect_ratio(size));
        camera.update_projection_matrix();

        let render = RenderLoop::new(
            ProgramContext::new(backend),
            program,
            quad,
            camera,
            config.channels.clone(),
            SystemWallClock,
        )
        .with_time_offset(config.time_offset);

        Ok(Self {
            render,
            host: WindowHost { window },
            drag: DragState::default(),
        })
    }

    fn window(&self) -> &Window {
        &self.host.window
    }

    fn start(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let result = self.render.start(&self.host);
        self.handle_frame(result, elwt);
    }

    fn frame(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let result = self.render.frame(&self.host);
        self.handle_frame(result, elwt);
    }

    fn handle_frame(
        &mut self,
        result: Result<FrameOutcome, RenderError>,
        elwt: &EventLoopWindowTarget<()>,
    ) {
        let err = match result {
            Ok(_) => return,
            Err(err) => err,
        };
        match err.as_surface_error() {
            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let backend = self.render.context_mut().backend_mut();
                let size = backend.size();
                backend.resize(size);
            }
            Some(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Some(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting");
                elwt.exit();
            }
            Some(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
            None => {
                error!(error = %err, "frame failed; exiting");
                elwt.exit();
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.render.context_mut().backend_mut().resize(size);
        let camera = self.render.camera_mut();
        camera.set_aspect_ratio(aspect_ratio(size));
        camera.update_projection_matrix();
    }
}

fn aspect_ratio(size: PhysicalSize<u32>) -> f32 {
    size.width.max(1) as f32 / size.height.max(1) as f32
}

/// Opens the window and drives the `winit` event loop until it closes.
///
/// The first frame runs on `Resumed`: `on_start` fires, then the clock zero
/// point is captured. Every frame requests the next redraw itself.
pub(crate) fn run<F>(config: RendererConfig, on_start: F) -> Result<()>
where
    F: FnOnce(),
{
    let event_loop = EventLoop::new().context("failed to initialise event loop")?;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(
            config.surface_size.0,
            config.surface_size.1,
        ))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)?;
    let mut on_start = Some(on_start);

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::Resumed => {
                    if matches!(state.render.state(), LoopState::Idle) {
                        if let Some(hook) = on_start.take() {
                            hook();
                        }
                        state.start(elwt);
                    }
                }
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            info!("window closed");
                            elwt.exit();
                        }
                        WindowEvent::Resized(new_size) => {
                            debug!(width = new_size.width, height = new_size.height, "resized");
                            state.resize(new_size);
                        }
                        WindowEvent::MouseInput {
                            state: button_state,
                            button: MouseButton::Left,
                            ..
                        } => {
                            state.drag.button(button_state);
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            if let Some((dx, dy)) = state.drag.moved(position) {
                                state.render.camera_mut().push_drag(dx, dy);
                            }
                        }
                        WindowEvent::MouseWheel { delta, .. } => {
                            let steps = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(offset) => {
                                    (offset.y / PIXELS_PER_ZOOM_STEP) as f32
                                }
                            };
                            state.render.camera_mut().push_zoom(steps);
                        }
                        WindowEvent::RedrawRequested => state.frame(elwt),
                        _ => {}
                    }
                }
                Event::LoopExiting => {
                    if let Some(fps) = state.render.stats().last_fps() {
                        info!(fps, "render loop stopped");
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_only_reports_while_pressed() {
        let mut drag = DragState::default();
        assert_eq!(drag.moved(PhysicalPosition::new(10.0, 10.0)), None);

        drag.button(ElementState::Pressed);
        assert_eq!(
            drag.moved(PhysicalPosition::new(14.0, 7.0)),
            Some((4.0, -3.0))
        );

        drag.button(ElementState::Released);
        assert_eq!(drag.moved(PhysicalPosition::new(20.0, 20.0)), None);
    }

    #[test]
    fn aspect_ratio_survives_zero_height() {
        assert_eq!(aspect_ratio(PhysicalSize::new(1920, 1080)), 1920.0 / 1080.0);
        assert_eq!(aspect_ratio(PhysicalSize::new(800, 0)), 800.0);
    }
}
