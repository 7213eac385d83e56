//! `wgpu` implementation of the graphics backend.
//!
//! - `context` owns instance/device/surface wiring and swapchain resizes.
//! - `pipeline` compiles wrapped GLSL into one render pipeline per program.
//! - `uniforms` mirrors the injected std140 block on the CPU.
//! - `quad` holds the fullscreen quad buffers.
//! - `backend` exposes all of it through `GraphicsBackend`.

mod backend;
mod context;
mod pipeline;
mod quad;
mod uniforms;

pub(crate) use backend::WgpuBackend;
