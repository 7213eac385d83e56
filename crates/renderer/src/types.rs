use std::path::PathBuf;

use timeline::ChannelSet;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Off
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain; shader output is presented as written.
    #[default]
    Gamma,
    /// sRGB swapchain; shader output is treated as linear.
    Linear,
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Fragment shader to raymarch with; `None` uses the bundled shader.
    pub shader_source: Option<PathBuf>,
    /// Per-channel time-warp tables.
    pub channels: ChannelSet,
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
    /// Seconds added to the clock before evaluation. A negative offset
    /// rejects frames until the clock has caught up.
    pub time_offset: f64,
    pub title: String,
}

impl RendererConfig {
    pub fn new(channels: ChannelSet) -> Self {
        Self {
            surface_size: (1280, 720),
            shader_source: None,
            channels,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            time_offset: 0.0,
            title: "scoremarch".to_string(),
        }
    }
}
