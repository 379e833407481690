use crate::channel::{StateConsumer, StatePublisher};
use crate::fsm::{DisplayedColor, LampState, TrafficLight, Transition};

/// Result of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalTick {
    /// Transition taken out of the channel this tick, if any.
    pub applied: Option<Transition>,
    pub state: LampState,
    pub displayed: DisplayedColor,
}

/// Logic side of the lamp: the state machine plus the only channel consumer.
///
/// The render loop calls [`SignalController::tick`] once per frame; nothing
/// else applies transitions.
#[derive(Debug)]
pub struct SignalController {
    light: TrafficLight,
    consumer: StateConsumer,
}

impl SignalController {
    pub fn new(light: TrafficLight, consumer: StateConsumer) -> Self {
        Self { light, consumer }
    }

    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    pub fn state(&self) -> LampState {
        self.light.state()
    }

    pub fn displayed(&self) -> DisplayedColor {
        self.light.displayed()
    }

    /// Another publisher feeding this controller's channel.
    pub fn publisher(&self) -> StatePublisher {
        self.consumer.publisher()
    }

    /// Drains the channel, applies the pending transition and advances the
    /// blink phase.
    pub fn tick(&mut self, now_ms: u64) -> SignalTick {
        let applied = self.consumer.consume_if_any();
        if let Some(transition) = applied {
            self.light.apply(transition, now_ms);
        }
        self.light.tick(now_ms);
        SignalTick {
            applied,
            state: self.light.state(),
            displayed: self.light.displayed(),
        }
    }
}
