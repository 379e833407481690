use std::sync::Arc;

use winit::window::Window;

use crate::capability::ShaderModelLevel;
use crate::error::RenderError;
use crate::geometry::{GpuVertex, VERTEX_STRIDE};
use crate::render_loop::{FrameCommand, GraphicsBackend};
use crate::shader::ShaderProgram;
use crate::types::SurfaceSize;

use super::context::GpuContext;
use super::pipeline::LampPipeline;
use super::uniforms::{buffer_size, write_transform};

/// Every GPU object tied to one surface. Dropped as a unit.
pub(crate) struct GpuState {
    uniform_bind_group: wgpu::BindGroup,
    empty_bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    pipeline: LampPipeline,
    context: GpuContext,
}

impl GpuState {
    /// # Safety
    ///
    /// `window` must outlive the returned state.
    unsafe fn new(
        window: &Window,
        size: SurfaceSize,
        program: &ShaderProgram,
        required_model: ShaderModelLevel,
    ) -> Result<Self, RenderError> {
        let context = GpuContext::new(window, size, required_model)?;
        let device = &context.device;
        let pipeline = LampPipeline::new(device, context.config.format, program);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transform uniform"),
            size: buffer_size(pipeline.slot),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transform bind group"),
            layout: &pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: pipeline.slot.binding,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let empty_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("empty bind group"),
            layout: &pipeline.empty_layout,
            entries: &[],
        });
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamp vertices"),
            size: VERTEX_STRIDE * 3,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::info!(
            format = ?context.config.format,
            shader_model = %context.shader_model,
            "GPU resources ready"
        );

        Ok(Self {
            uniform_bind_group,
            empty_bind_group,
            uniform_buffer,
            vertex_buffer,
            pipeline,
            context,
        })
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.context.resize(size);
    }

    fn render(&mut self, frame: &FrameCommand) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.context.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        write_transform(
            &self.context.queue,
            &self.uniform_buffer,
            self.pipeline.slot,
            frame.mvp,
        );
        self.context.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice::<GpuVertex, u8>(&frame.vertices),
        );

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lamp frame"),
            });
        {
            let [r, g, b, a] = frame.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lamp pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            for group in 0..self.pipeline.slot.group {
                render_pass.set_bind_group(group, &self.empty_bind_group, &[]);
            }
            render_pass.set_bind_group(self.pipeline.slot.group, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

/// [`GraphicsBackend`] drawing into a `winit` window through `wgpu`.
pub struct WgpuBackend {
    // Declared before `window` so it is dropped first.
    state: Option<GpuState>,
    window: Arc<Window>,
    required_model: ShaderModelLevel,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, required_model: ShaderModelLevel) -> Self {
        Self {
            state: None,
            window,
            required_model,
        }
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Reapplies the current surface configuration after a lost or outdated
    /// swapchain.
    pub fn reconfigure(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.context.reconfigure();
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create(&mut self, program: &ShaderProgram, size: SurfaceSize) -> Result<(), RenderError> {
        self.state = None;
        // SAFETY: the window is held by `self` and outlives `state`, which is
        // dropped first.
        let state = unsafe { GpuState::new(self.window.as_ref(), size, program, self.required_model)? };
        self.state = Some(state);
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        if let Some(state) = self.state.as_mut() {
            state.resize(size);
        }
    }

    fn draw(&mut self, frame: &FrameCommand) -> Result<(), RenderError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| RenderError::Backend("draw requested without GPU resources".into()))?;
        state.render(frame)?;
        Ok(())
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            tracing::debug!("released GPU resources");
        }
    }
}
