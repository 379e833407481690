//! Renderer crate for the traffic-light indicator.
//!
//! One rotating triangle, tinted by the lamp state, drawn through a small
//! GLSL program on a `wgpu` surface. The overall flow is:
//!
//! ```text
//!   touch / wireless ──publish──▶ StateChannel
//!                                      │ consume once per frame
//!                                      ▼
//!   winit event loop ──▶ RenderLoop::on_frame ──▶ SignalController::tick
//!                              │
//!                              ├─▶ ProjectionPipeline::compose ─▶ MVP uniform
//!                              └─▶ GeometryBuffer::tinted ──────▶ vertex buffer
//!                                                   │
//!                                                   ▼
//!                                        GraphicsBackend::draw
//! ```
//!
//! `RenderLoop` owns the lifecycle rules and is generic over
//! [`GraphicsBackend`]; [`WgpuBackend`] is the real implementation and
//! [`WindowRuntime`] hosts it on the render thread.

pub mod capability;
pub mod error;
pub mod geometry;
mod gpu;
pub mod projection;
pub mod render_loop;
pub mod shader;
mod types;
mod window;

pub use capability::{check_shader_model, ShaderModelLevel};
pub use error::{CapabilityError, RenderError, ShaderError, Stage};
pub use geometry::{GeometryBuffer, GpuVertex, LampPalette, Rgba, Vertex};
pub use gpu::WgpuBackend;
pub use projection::{Frustum, ProjectionPipeline};
pub use render_loop::{
    FrameCommand, FrameOutcome, FrameReport, GraphicsBackend, LoopPhase, RenderLoop,
    ShaderSources,
};
pub use shader::{ShaderProgram, UniformSlot};
pub use types::{PausePolicy, RendererConfig, SurfaceSize};
pub use window::{WindowRuntime, RENDER_THREAD_NAME};
