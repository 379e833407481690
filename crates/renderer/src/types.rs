use std::time::Duration;

use lampstate::{
    SignalController, StateChannel, TouchMapping, TrafficLight, DEFAULT_BLINK_INTERVAL,
};

use crate::capability::ShaderModelLevel;
use crate::geometry::LampPalette;

/// What happens to GPU resources while the surface is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PausePolicy {
    /// Keep everything alive and simply stop drawing.
    #[default]
    Preserve,
    /// Release GPU resources on pause and rebuild them on resume.
    Teardown,
}

impl std::fmt::Display for PausePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PausePolicy::Preserve => f.write_str("preserve"),
            PausePolicy::Teardown => f.write_str("teardown"),
        }
    }
}

/// Surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the configuration file after CLI overrides have been applied.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: SurfaceSize,
    pub title: String,
    pub palette: LampPalette,
    /// Blink phase length of the lamp built by [`RendererConfig::signal_controller`].
    pub blink_interval: Duration,
    pub touch_mapping: TouchMapping,
    pub pause_policy: PausePolicy,
    /// Lowest adapter shader model accepted at surface creation.
    pub min_shader_model: ShaderModelLevel,
}

impl Default for RendererConfig {
    /// Portrait 720x1280 window with the stock palette.
    fn default() -> Self {
        Self {
            surface_size: SurfaceSize::new(720, 1280),
            title: "Traffic Light".to_string(),
            palette: LampPalette::default(),
            blink_interval: DEFAULT_BLINK_INTERVAL,
            touch_mapping: TouchMapping::default(),
            pause_policy: PausePolicy::default(),
            min_shader_model: ShaderModelLevel::default(),
        }
    }
}

impl RendererConfig {
    /// A red lamp timed with this configuration's blink interval.
    ///
    /// Producers get their publishers from [`SignalController::publisher`].
    pub fn signal_controller(&self) -> SignalController {
        let (_, consumer) = StateChannel::new();
        SignalController::new(TrafficLight::with_blink_interval(self.blink_interval), consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lampstate::{DisplayedColor, LampState, Transition};

    #[test]
    fn controller_uses_configured_blink_interval() {
        let config = RendererConfig {
            blink_interval: Duration::from_millis(200),
            ..RendererConfig::default()
        };
        let mut controller = config.signal_controller();
        assert_eq!(controller.light().blink_interval(), Duration::from_millis(200));
        assert_eq!(controller.state(), LampState::Red);

        controller.publisher().publish(Transition::SetBlinking);
        assert_eq!(controller.tick(0).displayed, DisplayedColor::BlinkOn);
        assert_eq!(controller.tick(200).displayed, DisplayedColor::Dark);
    }

    #[test]
    fn empty_sizes() {
        assert!(SurfaceSize::new(0, 10).is_empty());
        assert!(SurfaceSize::new(10, 0).is_empty());
        assert!(!SurfaceSize::new(1, 1).is_empty());
    }
}
