use wgpu::util::DeviceExt;

use crate::program::Drawable;

/// Clip-space corners, counter-clockwise from bottom-left.
const POSITIONS: [[f32; 4]; 4] = [
    [-1.0, -1.0, 0.999, 1.0],
    [1.0, -1.0, 0.999, 1.0],
    [1.0, 1.0, 0.999, 1.0],
    [-1.0, 1.0, 0.999, 1.0],
];

const INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Fullscreen quad the raymarch shader is drawn onto.
pub struct ScreenQuad {
    pub(crate) positions: wgpu::Buffer,
    pub(crate) indices: wgpu::Buffer,
}

impl ScreenQuad {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen quad positions"),
            contents: bytemuck::cast_slice(&POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen quad indices"),
            contents: bytemuck::cast_slice(&INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { positions, indices }
    }

    pub(crate) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

impl Drawable for ScreenQuad {
    fn element_count(&self) -> u32 {
        INDICES.len() as u32
    }
}
