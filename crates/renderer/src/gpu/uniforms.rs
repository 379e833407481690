use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::shader::UniformSlot;

/// std140 image of the `Transform` block: one column-major `mat4`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct TransformUniform {
    pub mvp: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn new(mvp: Mat4) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
        }
    }
}

/// Bytes needed for a buffer holding the matrix at `slot`.
pub(crate) fn buffer_size(slot: UniformSlot) -> u64 {
    u64::from(slot.offset) + std::mem::size_of::<TransformUniform>() as u64
}

pub(crate) fn write_transform(
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    slot: UniformSlot,
    mvp: Mat4,
) {
    queue.write_buffer(
        buffer,
        u64::from(slot.offset),
        bytemuck::bytes_of(&TransformUniform::new(mvp)),
    );
}
