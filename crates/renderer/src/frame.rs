//! Per-frame orchestration.
//!
//! Every frame runs the same fixed sequence: update the camera, tick the
//! clock, evaluate all channels at that one raw time, push uniforms, draw,
//! then ask the host for the next frame. A frame whose raw time cannot be
//! evaluated skips the uniform push and the draw but is still rescheduled.

use timeline::{ChannelSet, ClockAccumulator, PhaseSet, WallClock};
use tracing::{debug, info, trace, warn};

use crate::camera::Camera;
use crate::program::{GraphicsBackend, ProgramContext, ShaderProgram};
use crate::sync::{sync_uniforms, UniformFrame};
use crate::RenderError;

/// What the render loop needs from the window system.
pub trait FrameHost {
    /// Drawable size in physical pixels.
    fn viewport(&self) -> (u32, u32);
    /// Schedules one more frame on the next display refresh.
    fn request_frame(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    Idle,
    Running { clock: ClockAccumulator },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Uniforms were written and the quad was drawn.
    Drawn { raw_seconds: f64, phases: PhaseSet },
    /// The raw time was rejected; nothing reached the GPU this frame.
    Rejected { raw_seconds: f64 },
    /// The loop was not in a state to run this call.
    Skipped,
}

/// Frames-per-second over one-second windows of wall time.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    window_start_ms: Option<f64>,
    frames: u32,
    last_fps: Option<f64>,
}

impl FrameStats {
    const WINDOW_MS: f64 = 1000.0;

    /// Counts one frame; returns the rate when a window closes.
    pub fn record(&mut self, now_ms: f64, raw_seconds: f64) -> Option<f64> {
        let Some(start) = self.window_start_ms else {
            self.window_start_ms = Some(now_ms);
            return None;
        };
        let elapsed = now_ms - start;
        if elapsed < 0.0 {
            self.window_start_ms = Some(now_ms);
            self.frames = 0;
            return None;
        }

        self.frames += 1;
        if elapsed < Self::WINDOW_MS {
            return None;
        }

        let fps = f64::from(self.frames) * 1000.0 / elapsed;
        debug!(fps, raw_seconds, "frame stats");
        self.window_start_ms = Some(now_ms);
        self.frames = 0;
        self.last_fps = Some(fps);
        Some(fps)
    }

    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }
}

pub struct RenderLoop<B: GraphicsBackend, C, W> {
    gl: ProgramContext<B>,
    program: ShaderProgram<B>,
    mesh: B::Mesh,
    camera: C,
    channels: ChannelSet,
    wall: W,
    time_offset: f64,
    state: LoopState,
    stats: FrameStats,
    rejected_run: u64,
}

impl<B, C, W> RenderLoop<B, C, W>
where
    B: GraphicsBackend,
    C: Camera,
    W: WallClock,
{
    pub fn new(
        gl: ProgramContext<B>,
        program: ShaderProgram<B>,
        mesh: B::Mesh,
        camera: C,
        channels: ChannelSet,
        wall: W,
    ) -> Self {
        Self {
            gl,
            program,
            mesh,
            camera,
            channels,
            wall,
            time_offset: 0.0,
            state: LoopState::Idle,
            stats: FrameStats::default(),
            rejected_run: 0,
        }
    }

    /// Seconds added to the accumulated clock before evaluation.
    pub fn with_time_offset(mut self, seconds: f64) -> Self {
        self.time_offset = seconds;
        self
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn context(&self) -> &ProgramContext<B> {
        &self.gl
    }

    pub fn context_mut(&mut self) -> &mut ProgramContext<B> {
        &mut self.gl
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Consecutive frames rejected so far; zero once a frame is drawn again.
    pub fn rejected_run(&self) -> u64 {
        self.rejected_run
    }

    /// Captures the clock zero point and runs the first frame.
    pub fn start<H: FrameHost + ?Sized>(&mut self, host: &H) -> Result<FrameOutcome, RenderError> {
        if let LoopState::Running { .. } = self.state {
            debug!("render loop already running");
            return Ok(FrameOutcome::Skipped);
        }
        let clock = ClockAccumulator::start(&self.wall);
        self.state = LoopState::Running { clock };
        info!(time_offset = self.time_offset, "render loop started");
        self.frame(host)
    }

    /// Runs one frame. The next frame is requested even when this one fails.
    pub fn frame<H: FrameHost + ?Sized>(&mut self, host: &H) -> Result<FrameOutcome, RenderError> {
        let LoopState::Running { clock } = &mut self.state else {
            return Ok(FrameOutcome::Skipped);
        };

        self.camera.update();
        let now_ms = self.wall.now_ms();
        let raw_seconds = clock.tick(now_ms) + self.time_offset;

        let outcome = match self.channels.evaluate(raw_seconds) {
            Ok(phases) => {
                if self.rejected_run > 0 {
                    info!(
                        rejected = self.rejected_run,
                        raw_seconds, "frame updates resumed"
                    );
                    self.rejected_run = 0;
                }
                let (width, height) = host.viewport();
                let frame = UniformFrame {
                    dims: [width as f32, height as f32],
                    eye: self.camera.eye().into(),
                    inv_view_proj: self.camera.inv_view_proj().into(),
                    phases,
                };
                sync_uniforms(&mut self.gl, &self.program, &frame);
                trace!(raw_seconds, ?phases, "drawing frame");
                self.program
                    .draw(&mut self.gl, &self.mesh)
                    .map(|()| FrameOutcome::Drawn {
                        raw_seconds,
                        phases,
                    })
            }
            Err(err) => {
                if self.rejected_run == 0 {
                    warn!(%err, "rejecting frame updates until raw time is valid");
                } else {
                    trace!(%err, "rejecting frame update");
                }
                self.rejected_run += 1;
                Ok(FrameOutcome::Rejected { raw_seconds })
            }
        };

        self.stats.record(now_ms, raw_seconds);
        host.request_frame();
        outcome
    }
}
