use crate::channel::StatePublisher;
use crate::fsm::Transition;

/// How a pointer release is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchMapping {
    /// Top, middle and bottom thirds select red, blinking and green.
    #[default]
    Banded,
    /// Any release advances to the next state.
    Cycle,
}

/// Maps a pointer "up" at vertical position `y` on a surface `height` tall.
///
/// Bands are half-open from the top: `[0, h/3)`, `[h/3, 2h/3)`, `[2h/3, h]`,
/// so a release exactly on a boundary belongs to the lower band. Positions
/// outside the surface produce nothing.
pub fn map_touch_up(mapping: TouchMapping, y: f64, height: f64) -> Option<Transition> {
    if !(height > 0.0) || !y.is_finite() || y < 0.0 || y > height {
        return None;
    }

    match mapping {
        TouchMapping::Cycle => Some(Transition::SetNextTargetState),
        TouchMapping::Banded => {
            let band = ((y * 3.0) / height).floor() as usize;
            Some(match band.min(2) {
                0 => Transition::SetRed,
                1 => Transition::SetBlinking,
                _ => Transition::SetGreen,
            })
        }
    }
}

/// Turns pointer releases into published transitions.
#[derive(Debug, Clone)]
pub struct TouchInput {
    mapping: TouchMapping,
    publisher: StatePublisher,
}

impl TouchInput {
    pub fn new(mapping: TouchMapping, publisher: StatePublisher) -> Self {
        Self { mapping, publisher }
    }

    pub fn mapping(&self) -> TouchMapping {
        self.mapping
    }

    /// Handles a release; returns the transition that was published, if any.
    pub fn on_pointer_up(&self, y: f64, height: f64) -> Option<Transition> {
        let transition = map_touch_up(self.mapping, y, height);
        match transition {
            Some(transition) => {
                tracing::debug!(y, height, ?transition, "pointer release mapped");
                self.publisher.publish(transition);
            }
            None => tracing::trace!(y, height, "pointer release outside surface ignored"),
        }
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StateChannel;

    #[test]
    fn bands_cover_the_surface_top_to_bottom() {
        let h = 900.0;
        assert_eq!(map_touch_up(TouchMapping::Banded, 0.0, h), Some(Transition::SetRed));
        assert_eq!(map_touch_up(TouchMapping::Banded, 299.9, h), Some(Transition::SetRed));
        assert_eq!(
            map_touch_up(TouchMapping::Banded, 450.0, h),
            Some(Transition::SetBlinking)
        );
        assert_eq!(map_touch_up(TouchMapping::Banded, 899.0, h), Some(Transition::SetGreen));
        assert_eq!(map_touch_up(TouchMapping::Banded, 900.0, h), Some(Transition::SetGreen));
    }

    #[test]
    fn exact_thirds_select_the_lower_band() {
        let h = 600.0;
        assert_eq!(
            map_touch_up(TouchMapping::Banded, 200.0, h),
            Some(Transition::SetBlinking)
        );
        assert_eq!(map_touch_up(TouchMapping::Banded, 400.0, h), Some(Transition::SetGreen));
    }

    #[test]
    fn no_gap_across_the_full_height() {
        let h = 300.0;
        let mut previous_band = 0;
        let mut y = 0.0;
        while y <= h {
            let transition = map_touch_up(TouchMapping::Banded, y, h).expect("defined band");
            let band = match transition {
                Transition::SetRed => 0,
                Transition::SetBlinking => 1,
                Transition::SetGreen => 2,
                Transition::SetNextTargetState => unreachable!("banded mapping never cycles"),
            };
            assert!(band >= previous_band);
            previous_band = band;
            y += 0.5;
        }
        assert_eq!(previous_band, 2);
    }

    #[test]
    fn outside_surface_is_ignored() {
        assert_eq!(map_touch_up(TouchMapping::Banded, -1.0, 600.0), None);
        assert_eq!(map_touch_up(TouchMapping::Banded, 601.0, 600.0), None);
        assert_eq!(map_touch_up(TouchMapping::Banded, 10.0, 0.0), None);
        assert_eq!(map_touch_up(TouchMapping::Cycle, f64::NAN, 600.0), None);
    }

    #[test]
    fn cycle_mapping_ignores_position() {
        for y in [0.0, 150.0, 600.0] {
            assert_eq!(
                map_touch_up(TouchMapping::Cycle, y, 600.0),
                Some(Transition::SetNextTargetState)
            );
        }
    }

    #[test]
    fn touch_input_publishes() {
        let (publisher, consumer) = StateChannel::new();
        let input = TouchInput::new(TouchMapping::Banded, publisher);
        assert_eq!(input.on_pointer_up(10.0, 300.0), Some(Transition::SetRed));
        assert_eq!(consumer.consume_if_any(), Some(Transition::SetRed));
        assert_eq!(input.on_pointer_up(400.0, 300.0), None);
        assert_eq!(consumer.consume_if_any(), None);
    }
}
