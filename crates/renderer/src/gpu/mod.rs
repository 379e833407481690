//! `wgpu` implementation of the render loop's graphics backend.
//!
//! - `context` owns instance/adapter/device/surface wiring, runs the shader
//!   capability gate, and reconfigures the swapchain on resize.
//! - `pipeline` builds the lamp render pipeline from a linked
//!   [`ShaderProgram`](crate::shader::ShaderProgram).
//! - `uniforms` mirrors the `Transform` block and writes the MVP each frame.
//! - `state` ties them together behind [`WgpuBackend`].

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::WgpuBackend;
