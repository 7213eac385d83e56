//! Renderer crate for scoremarch.
//!
//! Glues the `winit` window, the `wgpu` raymarch pipeline and the timeline
//! channels together. The overall flow is:
//!
//! ```text
//!   scoremarch CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowHost ──▶ winit event loop ──▶ RenderLoop::frame()
//!                                                            │
//!        camera.update ─▶ clock.tick ─▶ ChannelSet::evaluate ┤
//!                                                            └─▶ sync_uniforms ─▶ draw
//! ```
//!
//! [`RenderLoop`] is backend-neutral: it talks to a [`GraphicsBackend`] through
//! a [`ProgramContext`], which remembers the bound program so repeated binds
//! never reach the GPU. The `wgpu` implementation lives in `gpu`, the window
//! host in `window`.

mod camera;
mod compile;
mod frame;
mod gpu;
mod program;
mod sync;
mod types;
mod window;

use anyhow::Result;

pub use camera::{Camera, OrbitCamera};
pub use compile::ShaderInterface;
pub use frame::{FrameHost, FrameOutcome, FrameStats, LoopState, RenderLoop};
pub use program::{
    Drawable, GraphicsBackend, ProgramContext, ShaderProgram, UniformLocation, UniformLocations,
    UniformName, UniformValue,
};
pub use sync::{sync_uniforms, UniformFrame};
pub use types::{Antialiasing, ColorSpaceMode, RendererConfig};

/// Errors surfaced by a single frame or by GPU set-up.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("draw issued with no shader program bound")]
    NoProgramBound,
    #[error("unknown shader program {0}")]
    UnknownProgram(usize),
    #[error("shader error: {0}")]
    Shader(String),
}

impl RenderError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            RenderError::Surface(err) => Some(err),
            _ => None,
        }
    }
}

pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and renders until it is closed.
    ///
    /// `on_start` runs once the GPU is ready, immediately before the clock
    /// zero point is captured; the binary uses it to start the audio track.
    pub fn run<F>(self, on_start: F) -> Result<()>
    where
        F: FnOnce(),
    {
        window::run(self.config, on_start)
    }
}
