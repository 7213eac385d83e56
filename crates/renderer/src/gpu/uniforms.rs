use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::program::{UniformLocation, UniformName, UniformValue};

/// CPU mirror of the `RaymarchParams` std140 block injected by `compile.rs`.
///
/// Field order and offsets must match the GLSL header.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct RaymarchUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub eye_pos: [f32; 3],
    pub time: f32,
    pub dims: [f32; 2],
    pub time_aux: [f32; 4],
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for RaymarchUniforms {}
unsafe impl Pod for RaymarchUniforms {}

impl RaymarchUniforms {
    pub const SIZE: u64 = size_of::<Self>() as u64;

    /// Byte offset of `name` inside the block; used as its location.
    pub fn location(name: UniformName) -> UniformLocation {
        let offset = match name {
            UniformName::InvViewProj => offset_of!(Self, inv_view_proj),
            UniformName::EyePos => offset_of!(Self, eye_pos),
            UniformName::Time => offset_of!(Self, time),
            UniformName::Dims => offset_of!(Self, dims),
            UniformName::TimeAux1 => offset_of!(Self, time_aux),
            UniformName::TimeAux2 => offset_of!(Self, time_aux) + 4,
            UniformName::TimeAux3 => offset_of!(Self, time_aux) + 8,
            UniformName::TimeAux4 => offset_of!(Self, time_aux) + 12,
        };
        UniformLocation(offset as u32)
    }

    /// Copies `value` to `location`. Returns `false` if it does not fit.
    pub fn write(&mut self, location: UniformLocation, value: &UniformValue) -> bool {
        let src: &[u8] = match value {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        };
        let start = location.0 as usize;
        let dst = bytemuck::bytes_of_mut(self);
        match dst.get_mut(start..start + src.len()) {
            Some(slot) => {
                slot.copy_from_slice(src);
                true
            }
            None => false,
        }
    }
}
