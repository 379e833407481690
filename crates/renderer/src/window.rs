use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use lampstate::{SignalController, SystemTimeSource, TimeSource, TouchInput};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::WindowBuilder;

use crate::gpu::WgpuBackend;
use crate::render_loop::{FrameOutcome, LoopPhase, RenderLoop};
use crate::types::{RendererConfig, SurfaceSize};

pub const RENDER_THREAD_NAME: &str = "trafficlight-render";

#[derive(Debug, Clone)]
enum WindowCommand {
    Shutdown,
}

/// Handle to the render thread and its window.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window on a dedicated render thread.
    ///
    /// Returns once the first surface has been created, so capability and
    /// shader failures surface here.
    pub fn spawn(config: RendererConfig, controller: SignalController) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.into())
            .spawn(move || run_window_thread(config, controller, ready_tx))
            .map_err(|err| anyhow!("failed to spawn render thread: {err}"))?;

        let proxy = match ready_rx.recv() {
            Ok(Ok(proxy)) => proxy,
            Ok(Err(err)) => {
                reap_failed_start(handle);
                return Err(err);
            }
            Err(err) => {
                return Err(match reap_failed_start(handle) {
                    Some(panic) => anyhow!("render thread panicked during startup: {panic}"),
                    None => anyhow!("render thread failed to initialise: {err}"),
                });
            }
        };

        Ok(Self {
            proxy,
            join_handle: Some(handle),
        })
    }

    /// Blocks until the window is closed.
    pub fn wait(mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|err| anyhow!("render thread panicked: {err:?}"))?,
            None => Ok(()),
        }
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("render thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Joins a render thread that never reported ready. Returns its panic
/// message, if it panicked.
fn reap_failed_start<T>(handle: JoinHandle<T>) -> Option<String> {
    let payload = handle.join().err()?;
    let message = panic_message(payload.as_ref());
    tracing::error!(panic = %message, "render thread panicked during startup");
    Some(message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

type ReadySender = Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>;

fn run_window_thread(
    config: RendererConfig,
    controller: SignalController,
    ready_tx: ReadySender,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(target_os = "linux")]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    let startup = || -> Result<_> {
        let event_loop = builder
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
        let size = config.surface_size;
        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(size.width, size.height))
            .build(&event_loop)
            .map_err(|err| anyhow!("failed to create window: {err}"))?;
        let window = Arc::new(window);
        let inner = window.inner_size();

        let touch = TouchInput::new(config.touch_mapping, controller.publisher());
        let backend = WgpuBackend::new(window, config.min_shader_model);
        let mut render_loop = RenderLoop::new(
            backend,
            controller,
            config.palette,
            config.pause_policy,
            SurfaceSize::new(inner.width, inner.height),
        );
        render_loop
            .on_created()
            .map_err(|err| anyhow!("failed to initialise renderer: {err}"))?;
        Ok((event_loop, render_loop, touch))
    };

    let (event_loop, mut render_loop, touch) = match startup() {
        Ok(parts) => parts,
        Err(err) => {
            let message = err.to_string();
            let _ = ready_tx.send(Err(err));
            return Err(anyhow!(message));
        }
    };
    let _ = ready_tx.send(Ok(event_loop.create_proxy()));

    let window_id = render_loop.backend().window().id();
    let mut clock = SystemTimeSource::new();
    let mut cursor: Option<PhysicalPosition<f64>> = None;
    let mut fatal: Option<anyhow::Error> = None;

    let run_result = event_loop.run(|event, elwt| match event {
        Event::UserEvent(WindowCommand::Shutdown) => {
            render_loop.on_destroyed();
            elwt.exit();
        }
        Event::Suspended => render_loop.on_pause(),
        Event::Resumed => {
            if let Err(err) = render_loop.on_resume() {
                tracing::error!(error = %err, "failed to resume rendering");
                fatal = Some(anyhow!("failed to resume rendering: {err}"));
                elwt.exit();
            }
        }
        Event::WindowEvent { window_id: id, event } if id == window_id => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                render_loop.on_destroyed();
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                render_loop.on_size_changed(size.width, size.height);
            }
            WindowEvent::CursorMoved { position, .. } => cursor = Some(position),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(position) = cursor {
                    touch.on_pointer_up(position.y, f64::from(render_loop.size().height));
                }
            }
            WindowEvent::Touch(touch_event) if touch_event.phase == TouchPhase::Ended => {
                touch.on_pointer_up(
                    touch_event.location.y,
                    f64::from(render_loop.size().height),
                );
            }
            WindowEvent::RedrawRequested => {
                let sample = clock.sample();
                match render_loop.on_frame(sample.millis) {
                    Ok(FrameOutcome::Drawn(report)) => {
                        if report.applied.is_some() {
                            tracing::info!(
                                state = %report.state,
                                displayed = %report.displayed,
                                "lamp updated"
                            );
                        }
                    }
                    Ok(FrameOutcome::Skipped) => {}
                    Err(err) => match err.as_surface_error() {
                        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            render_loop.backend_mut().reconfigure();
                        }
                        Some(wgpu::SurfaceError::Timeout) => {
                            tracing::warn!("surface timeout; retrying next frame");
                        }
                        Some(wgpu::SurfaceError::OutOfMemory) => {
                            tracing::error!("surface out of memory; exiting");
                            fatal = Some(anyhow!("surface out of memory"));
                            render_loop.on_destroyed();
                            elwt.exit();
                        }
                        Some(other) => {
                            tracing::warn!(error = ?other, "surface error; retrying next frame");
                        }
                        None => {
                            tracing::error!(error = %err, "frame failed");
                            fatal = Some(anyhow!("frame failed: {err}"));
                            render_loop.on_destroyed();
                            elwt.exit();
                        }
                    },
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            if matches!(render_loop.phase(), LoopPhase::Created | LoopPhase::Drawing) {
                render_loop.backend().window().request_redraw();
            }
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
