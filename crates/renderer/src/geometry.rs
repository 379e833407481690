use bytemuck::{Pod, Zeroable};
use lampstate::DisplayedColor;

pub type Rgba = [f32; 4];

/// Bytes between consecutive vertices in the GPU buffer.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<GpuVertex>() as u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: Rgba,
}

/// Vertex layout uploaded to the GPU. `w` of the position is always 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 4],
    pub color: Rgba,
}

impl GpuVertex {
    pub fn new(position: [f32; 3], color: Rgba) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color,
        }
    }

    pub(crate) const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// The lamp: a single triangle centred on the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    vertices: [Vertex; 3],
}

impl GeometryBuffer {
    pub fn triangle() -> Self {
        Self {
            vertices: [
                Vertex {
                    position: [-0.5, -0.25, 0.0],
                    color: [1.0, 0.0, 0.0, 1.0],
                },
                Vertex {
                    position: [0.5, -0.25, 0.0],
                    color: [0.0, 0.0, 1.0, 1.0],
                },
                Vertex {
                    position: [0.0, 0.559_016_994, 0.0],
                    color: [0.0, 1.0, 0.0, 1.0],
                },
            ],
        }
    }

    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    /// The triangle painted a single color.
    pub fn tinted(&self, color: Rgba) -> [GpuVertex; 3] {
        self.vertices
            .map(|vertex| GpuVertex::new(vertex.position, color))
    }
}

impl Default for GeometryBuffer {
    fn default() -> Self {
        Self::triangle()
    }
}

/// Colors used for each displayed state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LampPalette {
    pub background: Rgba,
    pub red: Rgba,
    pub green: Rgba,
    pub blink: Rgba,
}

impl LampPalette {
    /// Triangle color for a displayed state. The dark blink phase blends into
    /// the background.
    pub fn color_for(&self, displayed: DisplayedColor) -> Rgba {
        match displayed {
            DisplayedColor::Red => self.red,
            DisplayedColor::Green => self.green,
            DisplayedColor::BlinkOn => self.blink,
            DisplayedColor::Dark => self.background,
        }
    }
}

impl Default for LampPalette {
    fn default() -> Self {
        Self {
            background: [0.5, 0.5, 0.5, 1.0],
            red: [1.0, 0.0, 0.0, 1.0],
            green: [0.0, 1.0, 0.0, 1.0],
            blink: [1.0, 0.75, 0.0, 1.0],
        }
    }
}
