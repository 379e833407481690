use std::fmt;
use std::time::Duration;

/// Blink phase length used when nothing else is configured.
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Logical state of the lamp. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LampState {
    #[default]
    Red,
    Blinking,
    Green,
}

impl LampState {
    pub const ALL: [LampState; 3] = [LampState::Red, LampState::Blinking, LampState::Green];

    /// Successor in the fixed `Red -> Blinking -> Green -> Red` cycle.
    pub fn next(self) -> Self {
        match self {
            LampState::Red => LampState::Blinking,
            LampState::Blinking => LampState::Green,
            LampState::Green => LampState::Red,
        }
    }
}

impl fmt::Display for LampState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LampState::Red => f.write_str("red"),
            LampState::Blinking => f.write_str("blinking"),
            LampState::Green => f.write_str("green"),
        }
    }
}

/// Commands accepted by [`TrafficLight::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    SetRed,
    SetBlinking,
    SetGreen,
    SetNextTargetState,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::SetRed,
        Transition::SetBlinking,
        Transition::SetGreen,
        Transition::SetNextTargetState,
    ];
}

/// What the renderer paints for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayedColor {
    Red,
    Green,
    /// Blinking, lamp lit.
    BlinkOn,
    /// Blinking, lamp off: only the background shows.
    Dark,
}

impl fmt::Display for DisplayedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayedColor::Red => f.write_str("red"),
            DisplayedColor::Green => f.write_str("green"),
            DisplayedColor::BlinkOn => f.write_str("blink-on"),
            DisplayedColor::Dark => f.write_str("dark"),
        }
    }
}

/// Traffic-light state machine.
///
/// Time is passed in as absolute wall-clock milliseconds, the same clock the
/// animation uses, so the blink phase is checked from the render tick instead
/// of a timer thread.
#[derive(Debug, Clone)]
pub struct TrafficLight {
    state: LampState,
    blink_on: bool,
    last_toggle_ms: u64,
    blink_interval_ms: u64,
}

impl TrafficLight {
    pub fn new() -> Self {
        Self::with_blink_interval(DEFAULT_BLINK_INTERVAL)
    }

    pub fn with_blink_interval(interval: Duration) -> Self {
        let blink_interval_ms = u64::try_from(interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        Self {
            state: LampState::default(),
            blink_on: false,
            last_toggle_ms: 0,
            blink_interval_ms,
        }
    }

    pub fn state(&self) -> LampState {
        self.state
    }

    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    /// Applies a command and returns the resulting state.
    pub fn apply(&mut self, transition: Transition, now_ms: u64) -> LampState {
        let target = match transition {
            Transition::SetRed => LampState::Red,
            Transition::SetBlinking => LampState::Blinking,
            Transition::SetGreen => LampState::Green,
            Transition::SetNextTargetState => self.state.next(),
        };

        if target == LampState::Blinking {
            self.blink_on = true;
            self.last_toggle_ms = now_ms;
        } else {
            self.blink_on = false;
        }

        if target != self.state {
            tracing::debug!(from = %self.state, to = %target, ?transition, "lamp state changed");
        }
        self.state = target;
        target
    }

    /// Advances the blink phase. Returns true when the visible phase flipped.
    ///
    /// When several intervals have passed (a long frame or a pause) the phase
    /// moves by that many steps so it stays aligned with the wall clock.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.state != LampState::Blinking {
            return false;
        }

        let elapsed = now_ms.saturating_sub(self.last_toggle_ms);
        let steps = elapsed / self.blink_interval_ms;
        if steps == 0 {
            return false;
        }

        self.last_toggle_ms += steps * self.blink_interval_ms;
        if steps % 2 == 1 {
            self.blink_on = !self.blink_on;
            true
        } else {
            false
        }
    }

    pub fn displayed(&self) -> DisplayedColor {
        match self.state {
            LampState::Red => DisplayedColor::Red,
            LampState::Green => DisplayedColor::Green,
            LampState::Blinking if self.blink_on => DisplayedColor::BlinkOn,
            LampState::Blinking => DisplayedColor::Dark,
        }
    }
}

impl Default for TrafficLight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_red() {
        let light = TrafficLight::new();
        assert_eq!(light.state(), LampState::Red);
        assert_eq!(light.displayed(), DisplayedColor::Red);
    }

    #[test]
    fn explicit_commands_are_idempotent() {
        let mut light = TrafficLight::new();
        assert_eq!(light.apply(Transition::SetGreen, 0), LampState::Green);
        assert_eq!(light.apply(Transition::SetGreen, 10), LampState::Green);
        assert_eq!(light.apply(Transition::SetRed, 20), LampState::Red);
        assert_eq!(light.apply(Transition::SetRed, 30), LampState::Red);
    }

    #[test]
    fn next_target_cycles_with_period_three() {
        for start in LampState::ALL {
            let mut light = TrafficLight::new();
            match start {
                LampState::Red => light.apply(Transition::SetRed, 0),
                LampState::Blinking => light.apply(Transition::SetBlinking, 0),
                LampState::Green => light.apply(Transition::SetGreen, 0),
            };
            let mut seen = Vec::new();
            for step in 1..=3 {
                seen.push(light.apply(Transition::SetNextTargetState, step));
            }
            assert_eq!(light.state(), start);
            assert_eq!(seen[0], start.next());
            assert_eq!(seen[1], start.next().next());
        }
    }

    #[test]
    fn every_command_sequence_stays_in_defined_states() {
        // Enumerates all sequences of length four over the four commands.
        let mut light = TrafficLight::new();
        let mut now = 0;
        for a in Transition::ALL {
            for b in Transition::ALL {
                for c in Transition::ALL {
                    for d in Transition::ALL {
                        for transition in [a, b, c, d] {
                            now += 137;
                            let state = light.apply(transition, now);
                            light.tick(now + 600);
                            assert!(LampState::ALL.contains(&state));
                            assert_eq!(state, light.state());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn set_blinking_resets_phase() {
        let mut light = TrafficLight::new();
        light.apply(Transition::SetBlinking, 1_000);
        assert!(light.blink_on());
        assert!(light.tick(1_500));
        assert!(!light.blink_on());
        light.apply(Transition::SetBlinking, 1_700);
        assert!(light.blink_on());
        assert!(!light.tick(2_100));
        assert!(light.tick(2_200));
        assert_eq!(light.displayed(), DisplayedColor::Dark);
    }

    #[test]
    fn blink_toggles_each_interval() {
        let mut light = TrafficLight::with_blink_interval(Duration::from_millis(500));
        light.apply(Transition::SetBlinking, 0);
        assert_eq!(light.displayed(), DisplayedColor::BlinkOn);
        assert!(!light.tick(499));
        assert_eq!(light.displayed(), DisplayedColor::BlinkOn);
        assert!(light.tick(500));
        assert_eq!(light.displayed(), DisplayedColor::Dark);
        assert!(light.tick(1_000));
        assert_eq!(light.displayed(), DisplayedColor::BlinkOn);
    }

    #[test]
    fn blink_stays_aligned_after_long_gap() {
        let mut light = TrafficLight::with_blink_interval(Duration::from_millis(500));
        light.apply(Transition::SetBlinking, 0);
        // Four whole intervals: phase lands back on "on".
        assert!(!light.tick(2_250));
        assert!(light.blink_on());
        // Next boundary is 2_500, not 2_750.
        assert!(light.tick(2_500));
        assert!(!light.blink_on());
    }

    #[test]
    fn tick_is_inert_outside_blinking() {
        let mut light = TrafficLight::new();
        assert!(!light.tick(10_000));
        light.apply(Transition::SetGreen, 0);
        assert!(!light.tick(10_000));
        assert_eq!(light.displayed(), DisplayedColor::Green);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let light = TrafficLight::with_blink_interval(Duration::ZERO);
        assert_eq!(light.blink_interval(), Duration::from_millis(1));
    }
}
