//! Button state tracker
//!
//! One small state machine per wire id, `Idle -> Pressed -> Idle`. Pads that
//! keep reporting pressure while held only fire on the first event.

use std::collections::HashMap;
use tracing::trace;

use crate::grid::{decode, Coordinate, WireId};
use crate::midi::{format_hex, WireEvent};
use crate::registry::MappingRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PadState {
    #[default]
    Idle,
    Pressed,
}

/// Per-pad bookkeeping, created on the first event seen for a wire id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub state: PadState,
    pub press_count: u32,
    pub last_intensity: u8,
}

/// State change caused by one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Pressed; the only transition that fires actions
    Press,
    /// Pressed -> Idle
    Release,
    /// Repeated pressure while held, or a release while already idle
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEvent {
    pub event: WireEvent,
    pub coordinate: Coordinate,
    pub transition: Transition,
    pub press_count: u32,
}

/// Diagnostics snapshot for one pad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonInfo {
    pub coordinate: Coordinate,
    pub state: PadState,
    pub press_count: u32,
    pub last_intensity: u8,
    pub has_mapping: bool,
}

#[derive(Debug, Default)]
pub struct ButtonTracker {
    states: HashMap<WireId, ButtonState>,
}

impl ButtonTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw packet; malformed packets are dropped without touching state
    pub fn observe_raw(&mut self, raw: &[u8]) -> Option<TrackedEvent> {
        match WireEvent::from_raw(raw) {
            Some(event) => Some(self.observe(event)),
            None => {
                trace!("Dropping malformed event: {}", format_hex(raw));
                None
            }
        }
    }

    /// Apply one event to its pad's state machine
    ///
    /// Only intensity matters: `> 0` presses, `0` releases, whatever the
    /// status byte says.
    pub fn observe(&mut self, event: WireEvent) -> TrackedEvent {
        let state = self.states.entry(event.id).or_default();

        let transition = match (state.state, event.is_press()) {
            (PadState::Idle, true) => {
                state.state = PadState::Pressed;
                state.press_count += 1;
                Transition::Press
            }
            (PadState::Pressed, false) => {
                state.state = PadState::Idle;
                Transition::Release
            }
            _ => Transition::Unchanged,
        };
        state.last_intensity = event.intensity;

        TrackedEvent {
            event,
            coordinate: decode(event.id),
            transition,
            press_count: state.press_count,
        }
    }

    pub fn state(&self, id: WireId) -> Option<&ButtonState> {
        self.states.get(&id)
    }

    /// Read-only snapshot for diagnostics
    pub fn button_info(&self, id: WireId, registry: &MappingRegistry) -> Option<ButtonInfo> {
        let state = self.states.get(&id)?;
        let coordinate = decode(id);
        Some(ButtonInfo {
            coordinate,
            state: state.state,
            press_count: state.press_count,
            last_intensity: state.last_intensity,
            has_mapping: registry.contains(coordinate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors;

    fn press(tracker: &mut ButtonTracker, id: u8, velocity: u8) -> Transition {
        tracker.observe_raw(&[0x90, id, velocity]).unwrap().transition
    }

    #[test]
    fn test_press_then_release() {
        let mut tracker = ButtonTracker::new();

        assert_eq!(press(&mut tracker, 11, 100), Transition::Press);
        assert_eq!(press(&mut tracker, 11, 0), Transition::Release);

        let state = tracker.state(WireId::new(11)).unwrap();
        assert_eq!(state.state, PadState::Idle);
        assert_eq!(state.press_count, 1);
    }

    #[test]
    fn test_repeated_pressure_fires_once() {
        let mut tracker = ButtonTracker::new();

        let transitions: Vec<_> = [100, 90, 110, 127, 64]
            .iter()
            .map(|v| press(&mut tracker, 5, *v))
            .collect();

        assert_eq!(transitions[0], Transition::Press);
        assert!(transitions[1..].iter().all(|t| *t == Transition::Unchanged));
        assert_eq!(tracker.state(WireId::new(5)).unwrap().press_count, 1);
    }

    #[test]
    fn test_release_rearms() {
        let mut tracker = ButtonTracker::new();

        press(&mut tracker, 5, 100);
        press(&mut tracker, 5, 100);
        tracker.observe_raw(&[0x80, 5, 0]);

        assert_eq!(press(&mut tracker, 5, 100), Transition::Press);
        assert_eq!(tracker.state(WireId::new(5)).unwrap().press_count, 2);
    }

    #[test]
    fn test_status_byte_does_not_decide() {
        let mut tracker = ButtonTracker::new();

        // Note Off carrying pressure still presses
        let tracked = tracker.observe_raw(&[0x80, 7, 50]).unwrap();
        assert_eq!(tracked.transition, Transition::Press);

        // Note On with zero velocity releases
        let tracked = tracker.observe_raw(&[0x90, 7, 0]).unwrap();
        assert_eq!(tracked.transition, Transition::Release);
    }

    #[test]
    fn test_release_while_idle_is_unchanged() {
        let mut tracker = ButtonTracker::new();
        assert_eq!(press(&mut tracker, 3, 0), Transition::Unchanged);
        assert_eq!(tracker.state(WireId::new(3)).unwrap().press_count, 0);
    }

    #[test]
    fn test_malformed_events_are_dropped() {
        let mut tracker = ButtonTracker::new();

        assert!(tracker.observe_raw(&[0x90, 11]).is_none());
        assert!(tracker.observe_raw(&[0x90, 11, 100, 1]).is_none());
        assert!(tracker.state(WireId::new(11)).is_none());
    }

    #[test]
    fn test_last_intensity_tracks_every_event() {
        let mut tracker = ButtonTracker::new();

        press(&mut tracker, 22, 40);
        press(&mut tracker, 22, 90);
        assert_eq!(tracker.state(WireId::new(22)).unwrap().last_intensity, 90);

        press(&mut tracker, 22, 0);
        assert_eq!(tracker.state(WireId::new(22)).unwrap().last_intensity, 0);
    }

    #[test]
    fn test_tracked_event_carries_coordinate() {
        let mut tracker = ButtonTracker::new();
        let tracked = tracker.observe_raw(&[0x90, 34, 100]).unwrap();

        assert_eq!((tracked.coordinate.x(), tracked.coordinate.y()), (4, 3));
        assert_eq!(tracked.press_count, 1);
    }

    #[test]
    fn test_button_info() {
        let mut tracker = ButtonTracker::new();
        let mut registry = MappingRegistry::new();
        registry.register(Coordinate::new(1, 0, 8).unwrap(), colors::GREEN, "code_editor");

        assert!(tracker.button_info(WireId::new(1), &registry).is_none());

        press(&mut tracker, 1, 100);
        press(&mut tracker, 2, 100);

        let info = tracker.button_info(WireId::new(1), &registry).unwrap();
        assert_eq!(info.state, PadState::Pressed);
        assert_eq!(info.press_count, 1);
        assert_eq!(info.last_intensity, 100);
        assert!(info.has_mapping);

        let info = tracker.button_info(WireId::new(2), &registry).unwrap();
        assert!(!info.has_mapping);
    }
}
