//! Lamp logic shared by the renderer and the control binary.
//!
//! Everything here is free of graphics: the state machine, the single-slot
//! hand-off between producer threads and the render loop, the animation
//! clock, and the adapters that turn touch and wireless input into
//! transitions.

pub mod channel;
pub mod clock;
pub mod controller;
pub mod fsm;
pub mod touch;
pub mod wireless;

pub use channel::{StateChannel, StateConsumer, StatePublisher};
pub use clock::{
    AnimationClock, FixedTimeSource, SystemTimeSource, TimeSample, TimeSource,
    ROTATION_PERIOD_MS,
};
pub use controller::{SignalController, SignalTick};
pub use fsm::{DisplayedColor, LampState, TrafficLight, Transition, DEFAULT_BLINK_INTERVAL};
pub use touch::{map_touch_up, TouchInput, TouchMapping};
pub use wireless::{
    decode_command, parse_line, AckSink, Acknowledgement, ControlMessage, TupleValue,
    WirelessAdapter, WirelessDecodeError,
};
