//! Surface lifecycle and the per-frame driver.
//!
//! `RenderLoop` turns host lifecycle callbacks (created, resized, frame,
//! paused, resumed, destroyed) into explicit phase transitions and drives a
//! [`GraphicsBackend`] once per frame. Everything GPU specific sits behind the
//! backend trait so the lifecycle rules can be exercised without a device.

use std::fmt;

use glam::Mat4;
use lampstate::{
    AnimationClock, DisplayedColor, LampState, SignalController, StatePublisher, Transition,
};

use crate::error::RenderError;
use crate::geometry::{GeometryBuffer, GpuVertex, LampPalette, Rgba};
use crate::projection::{model_matrix, ProjectionPipeline};
use crate::shader::{ShaderProgram, FRAGMENT_SHADER_GLSL, VERTEX_SHADER_GLSL};
use crate::types::{PausePolicy, SurfaceSize};

/// Everything the backend needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommand {
    pub clear_color: Rgba,
    pub mvp: Mat4,
    pub vertices: [GpuVertex; 3],
}

/// GPU side of the loop.
pub trait GraphicsBackend {
    /// Builds every resource needed to draw `program` on a surface of `size`.
    fn create(&mut self, program: &ShaderProgram, size: SurfaceSize) -> Result<(), RenderError>;
    /// Adapts the swapchain and viewport to a new surface size.
    fn resize(&mut self, size: SurfaceSize);
    /// Uploads the transform and issues the triangle draw.
    fn draw(&mut self, frame: &FrameCommand) -> Result<(), RenderError>;
    /// Drops every resource built by [`GraphicsBackend::create`].
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Uninitialized,
    Created,
    Drawing,
    Paused,
    Destroyed,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoopPhase::Uninitialized => "uninitialized",
            LoopPhase::Created => "created",
            LoopPhase::Drawing => "drawing",
            LoopPhase::Paused => "paused",
            LoopPhase::Destroyed => "destroyed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub angle_degrees: f32,
    pub applied: Option<Transition>,
    pub state: LampState,
    pub displayed: DisplayedColor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Drawn(FrameReport),
    /// No frame this tick: paused, destroyed or not created yet.
    Skipped,
}

/// GLSL text compiled on every surface creation.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            vertex: VERTEX_SHADER_GLSL.to_string(),
            fragment: FRAGMENT_SHADER_GLSL.to_string(),
        }
    }
}

pub struct RenderLoop<B: GraphicsBackend> {
    backend: B,
    controller: SignalController,
    clock: AnimationClock,
    palette: LampPalette,
    pause_policy: PausePolicy,
    sources: ShaderSources,
    program: Option<ShaderProgram>,
    geometry: Option<GeometryBuffer>,
    projection: ProjectionPipeline,
    size: SurfaceSize,
    phase: LoopPhase,
    resources_live: bool,
    frame_index: u64,
}

impl<B: GraphicsBackend> RenderLoop<B> {
    pub fn new(
        backend: B,
        controller: SignalController,
        palette: LampPalette,
        pause_policy: PausePolicy,
        size: SurfaceSize,
    ) -> Self {
        Self {
            backend,
            controller,
            clock: AnimationClock::new(),
            palette,
            pause_policy,
            sources: ShaderSources::default(),
            program: None,
            geometry: None,
            projection: ProjectionPipeline::new(size.width, size.height),
            size,
            phase: LoopPhase::Uninitialized,
            resources_live: false,
            frame_index: 0,
        }
    }

    /// Replaces the shader text used on the next [`RenderLoop::on_created`].
    pub fn with_shader_sources(mut self, sources: ShaderSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn controller(&self) -> &SignalController {
        &self.controller
    }

    pub fn program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    pub fn projection(&self) -> &ProjectionPipeline {
        &self.projection
    }

    pub fn publisher(&self) -> StatePublisher {
        self.controller.publisher()
    }

    /// Surface (re)created: compile, link and build backend resources.
    ///
    /// Resources from an earlier surface are always released first. A shader
    /// failure leaves the loop uninitialized.
    pub fn on_created(&mut self) -> Result<(), RenderError> {
        if self.phase == LoopPhase::Destroyed {
            return Err(RenderError::Destroyed {
                operation: "create a surface",
            });
        }

        self.release_resources();
        self.program = None;
        self.geometry = None;
        self.phase = LoopPhase::Uninitialized;

        let program = ShaderProgram::compile_and_link(&self.sources.vertex, &self.sources.fragment)
            .inspect_err(|err| tracing::error!(error = %err, "shader program rejected"))?;

        self.projection = ProjectionPipeline::new(self.size.width, self.size.height);
        self.backend.create(&program, self.size)?;
        self.resources_live = true;

        self.program = Some(program);
        self.geometry = Some(GeometryBuffer::triangle());
        self.phase = LoopPhase::Created;
        tracing::info!(
            width = self.size.width,
            height = self.size.height,
            "render surface created"
        );
        Ok(())
    }

    pub fn on_size_changed(&mut self, width: u32, height: u32) {
        if self.phase == LoopPhase::Destroyed {
            return;
        }
        self.size = SurfaceSize::new(width, height);
        self.projection.on_surface_size(width, height);
        if self.resources_live && !self.size.is_empty() {
            self.backend.resize(self.size);
        }
    }

    /// Draws one frame at wall-clock `now_ms`.
    pub fn on_frame(&mut self, now_ms: u64) -> Result<FrameOutcome, RenderError> {
        if !matches!(self.phase, LoopPhase::Created | LoopPhase::Drawing) || !self.resources_live
        {
            return Ok(FrameOutcome::Skipped);
        }
        // Minimized or zero-sized surfaces have no usable projection.
        if self.size.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }
        let Some(geometry) = self.geometry.as_ref() else {
            return Ok(FrameOutcome::Skipped);
        };

        let tick = self.controller.tick(now_ms);
        let angle_degrees = self.clock.angle_at(now_ms);
        let command = FrameCommand {
            clear_color: self.palette.background,
            mvp: self.projection.compose(model_matrix(angle_degrees)),
            vertices: geometry.tinted(self.palette.color_for(tick.displayed)),
        };

        self.phase = LoopPhase::Drawing;
        self.backend.draw(&command)?;

        let report = FrameReport {
            frame_index: self.frame_index,
            angle_degrees,
            applied: tick.applied,
            state: tick.state,
            displayed: tick.displayed,
        };
        self.frame_index += 1;
        Ok(FrameOutcome::Drawn(report))
    }

    pub fn on_pause(&mut self) {
        if !matches!(self.phase, LoopPhase::Created | LoopPhase::Drawing) {
            return;
        }
        self.phase = LoopPhase::Paused;
        if self.pause_policy == PausePolicy::Teardown {
            self.release_resources();
        }
        tracing::debug!(policy = %self.pause_policy, "render loop paused");
    }

    pub fn on_resume(&mut self) -> Result<(), RenderError> {
        if self.phase != LoopPhase::Paused {
            return Ok(());
        }
        if !self.resources_live {
            let Some(program) = self.program.as_ref() else {
                return Err(RenderError::Backend(
                    "no linked shader program to rebuild from".into(),
                ));
            };
            self.backend.create(program, self.size)?;
            self.resources_live = true;
            tracing::debug!("rebuilt GPU resources after pause");
        }
        self.phase = LoopPhase::Drawing;
        Ok(())
    }

    /// Releases everything once; later calls are no-ops.
    pub fn on_destroyed(&mut self) {
        if self.phase == LoopPhase::Destroyed {
            return;
        }
        self.release_resources();
        self.program = None;
        self.geometry = None;
        self.phase = LoopPhase::Destroyed;
        tracing::info!(frames = self.frame_index, "render surface destroyed");
    }

    fn release_resources(&mut self) {
        if self.resources_live {
            self.backend.release();
            self.resources_live = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampstate::{StateChannel, TrafficLight};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingBackend {
        live: bool,
        creates: usize,
        releases: usize,
        resizes: Vec<SurfaceSize>,
        frames: Vec<FrameCommand>,
        fail_next_draw: Option<wgpu::SurfaceError>,
    }

    impl GraphicsBackend for RecordingBackend {
        fn create(
            &mut self,
            program: &ShaderProgram,
            _size: SurfaceSize,
        ) -> Result<(), RenderError> {
            assert!(!self.live, "resources must be released before recreation");
            assert_eq!(program.position_location(), 0);
            self.live = true;
            self.creates += 1;
            Ok(())
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.resizes.push(size);
        }

        fn draw(&mut self, frame: &FrameCommand) -> Result<(), RenderError> {
            assert!(self.live, "draw without resources");
            if let Some(err) = self.fail_next_draw.take() {
                return Err(RenderError::Surface(err));
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn release(&mut self) {
            assert!(self.live, "double release");
            self.live = false;
            self.releases += 1;
        }
    }

    fn render_loop(policy: PausePolicy) -> (StatePublisher, RenderLoop<RecordingBackend>) {
        let (publisher, consumer) = StateChannel::new();
        let light = TrafficLight::with_blink_interval(Duration::from_millis(500));
        let controller = SignalController::new(light, consumer);
        let render_loop = RenderLoop::new(
            RecordingBackend::default(),
            controller,
            LampPalette::default(),
            policy,
            SurfaceSize::new(720, 1280),
        );
        (publisher, render_loop)
    }

    fn drawn(outcome: FrameOutcome) -> FrameReport {
        match outcome {
            FrameOutcome::Drawn(report) => report,
            FrameOutcome::Skipped => panic!("expected a drawn frame"),
        }
    }

    #[test]
    fn frames_are_skipped_before_creation() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        assert_eq!(render_loop.on_frame(0).unwrap(), FrameOutcome::Skipped);
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
    }

    #[test]
    fn first_frame_moves_to_drawing() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        assert_eq!(render_loop.phase(), LoopPhase::Created);
        let report = drawn(render_loop.on_frame(0).unwrap());
        assert_eq!(report.frame_index, 0);
        assert_eq!(report.displayed, DisplayedColor::Red);
        assert_eq!(render_loop.phase(), LoopPhase::Drawing);

        let frame = &render_loop.backend().frames[0];
        assert_eq!(frame.clear_color, [0.5, 0.5, 0.5, 1.0]);
        assert!(frame.vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn frame_uses_the_animation_angle() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        let report = drawn(render_loop.on_frame(2_500).unwrap());
        assert!((report.angle_degrees - 90.0).abs() < 1e-4);
        let expected = render_loop.projection().compose(model_matrix(90.0));
        assert!(render_loop.backend().frames[0].mvp.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn drains_the_channel_once_per_frame() {
        let (publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        publisher.publish(Transition::SetGreen);
        let report = drawn(render_loop.on_frame(16).unwrap());
        assert_eq!(report.applied, Some(Transition::SetGreen));
        assert_eq!(report.displayed, DisplayedColor::Green);
        assert_eq!(drawn(render_loop.on_frame(32).unwrap()).applied, None);
    }

    #[test]
    fn no_frames_while_paused() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        render_loop.on_frame(0).unwrap();
        render_loop.on_pause();
        assert_eq!(render_loop.phase(), LoopPhase::Paused);
        assert_eq!(render_loop.on_frame(16).unwrap(), FrameOutcome::Skipped);
        assert_eq!(render_loop.backend().frames.len(), 1);
        assert_eq!(render_loop.backend().releases, 0);
    }

    #[test]
    fn publish_while_paused_applies_on_first_frame_after_resume() {
        let (publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        render_loop.on_frame(0).unwrap();
        render_loop.on_pause();
        publisher.publish(Transition::SetGreen);
        publisher.publish(Transition::SetBlinking);
        render_loop.on_resume().unwrap();
        let report = drawn(render_loop.on_frame(5_000).unwrap());
        assert_eq!(report.applied, Some(Transition::SetBlinking));
        assert_eq!(report.displayed, DisplayedColor::BlinkOn);
    }

    #[test]
    fn teardown_policy_rebuilds_on_resume() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Teardown);
        render_loop.on_created().unwrap();
        render_loop.on_pause();
        assert_eq!(render_loop.backend().releases, 1);
        render_loop.on_pause();
        assert_eq!(render_loop.backend().releases, 1);
        render_loop.on_resume().unwrap();
        assert_eq!(render_loop.backend().creates, 2);
        assert!(matches!(
            render_loop.on_frame(0).unwrap(),
            FrameOutcome::Drawn(_)
        ));
    }

    #[test]
    fn recreation_releases_stale_resources() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        render_loop.on_created().unwrap();
        assert_eq!(render_loop.backend().creates, 2);
        assert_eq!(render_loop.backend().releases, 1);
    }

    #[test]
    fn destroy_is_terminal_and_idempotent() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Teardown);
        render_loop.on_created().unwrap();
        render_loop.on_pause();
        render_loop.on_destroyed();
        render_loop.on_destroyed();
        assert_eq!(render_loop.backend().releases, 1);
        assert_eq!(render_loop.phase(), LoopPhase::Destroyed);
        assert_eq!(render_loop.on_frame(0).unwrap(), FrameOutcome::Skipped);
        assert!(matches!(
            render_loop.on_created(),
            Err(RenderError::Destroyed { .. })
        ));
    }

    #[test]
    fn shader_failure_leaves_loop_uninitialized() {
        let (_publisher, render_loop) = render_loop(PausePolicy::Preserve);
        let mut render_loop = render_loop.with_shader_sources(ShaderSources {
            vertex: VERTEX_SHADER_GLSL.replace("u_MVPMatrix * a_Position", "u_Missing * a_Position"),
            fragment: FRAGMENT_SHADER_GLSL.to_string(),
        });
        let err = render_loop.on_created().expect_err("shader must not compile");
        assert!(matches!(err, RenderError::Shader(_)));
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
        assert_eq!(render_loop.backend().creates, 0);
    }

    #[test]
    fn resize_reaches_projection_and_backend() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_size_changed(400, 400);
        assert!(render_loop.backend().resizes.is_empty());
        render_loop.on_created().unwrap();
        render_loop.on_size_changed(800, 800);
        assert_eq!(render_loop.backend().resizes, vec![SurfaceSize::new(800, 800)]);
        let frustum = render_loop.projection().frustum();
        assert_eq!(frustum.left, -frustum.right);
    }

    #[test]
    fn empty_surface_skips_frames_until_restored() {
        let (publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        render_loop.on_size_changed(0, 0);
        publisher.publish(Transition::SetGreen);
        assert!(matches!(render_loop.on_frame(16).unwrap(), FrameOutcome::Skipped));
        render_loop.on_size_changed(0, 480);
        assert!(matches!(render_loop.on_frame(32).unwrap(), FrameOutcome::Skipped));
        assert!(render_loop.backend().frames.is_empty());

        render_loop.on_size_changed(320, 480);
        let report = drawn(render_loop.on_frame(48).unwrap());
        assert_eq!(report.applied, Some(Transition::SetGreen));
        assert!(render_loop.backend().frames[0].mvp.is_finite());
    }

    #[test]
    fn dark_blink_phase_paints_background() {
        let (publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        publisher.publish(Transition::SetBlinking);
        render_loop.on_frame(0).unwrap();
        let report = drawn(render_loop.on_frame(500).unwrap());
        assert_eq!(report.displayed, DisplayedColor::Dark);
        let frame = render_loop.backend().frames.last().unwrap();
        assert!(frame.vertices.iter().all(|v| v.color == frame.clear_color));
    }

    #[test]
    fn surface_errors_propagate() {
        let (_publisher, mut render_loop) = render_loop(PausePolicy::Preserve);
        render_loop.on_created().unwrap();
        render_loop.backend_mut().fail_next_draw = Some(wgpu::SurfaceError::Outdated);
        let err = render_loop.on_frame(0).expect_err("outdated surface");
        assert!(matches!(
            err.as_surface_error(),
            Some(wgpu::SurfaceError::Outdated)
        ));
        assert!(matches!(
            render_loop.on_frame(16).unwrap(),
            FrameOutcome::Drawn(_)
        ));
    }
}
