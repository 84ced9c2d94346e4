//! Pad input handling

use tracing::{debug, info};

use super::{Dispatcher, PressOutcome};
use crate::dispatch::DispatchJob;
use crate::grid::Coordinate;
use crate::registry::DispatchOutcome;
use crate::tracker::{TrackedEvent, Transition};

impl super::Controller {
    /// Process one raw packet from the device
    ///
    /// Returns the outcome of the press when the packet fired one. Malformed
    /// packets, repeated pressure and releases return `None`.
    pub async fn handle_raw(&mut self, raw: &[u8]) -> Option<PressOutcome> {
        let tracked = self.tracker.observe_raw(raw)?;

        if self.debug_mode {
            log_button_event(&tracked);
        }

        match tracked.transition {
            Transition::Press => Some(self.on_press(tracked.coordinate).await),
            Transition::Release => {
                self.on_release(tracked.coordinate);
                None
            }
            Transition::Unchanged => None,
        }
    }

    async fn on_press(&mut self, coordinate: Coordinate) -> PressOutcome {
        match &self.dispatcher {
            Dispatcher::Inline(executor) => {
                match self.registry.dispatch(coordinate, executor.as_ref()).await {
                    DispatchOutcome::Skipped(reason) => PressOutcome::Skipped(reason),
                    DispatchOutcome::Completed(result) => PressOutcome::Completed(result),
                }
            }
            Dispatcher::Queued(queue) => match self.registry.resolve(coordinate) {
                Ok(mapping) => {
                    let outcome = queue.submit(DispatchJob {
                        coordinate,
                        action_ref: mapping.action_ref.clone(),
                    });
                    debug!("Press at {} -> {:?}", coordinate, outcome);
                    PressOutcome::Submitted(outcome)
                }
                Err(reason) => {
                    debug!("Skipping button {}: {}", coordinate, reason);
                    PressOutcome::Skipped(reason)
                }
            },
        }
    }

    /// Releases never run actions
    fn on_release(&self, coordinate: Coordinate) {
        debug!("Button {} released", coordinate);
    }
}

fn log_button_event(tracked: &TrackedEvent) {
    let label = match tracked.transition {
        Transition::Press => "pressed",
        Transition::Release => "released",
        Transition::Unchanged => "held",
    };
    info!(
        "🎹 Button {} {} (id {}, intensity {}, presses {})",
        tracked.coordinate,
        label,
        tracked.event.id,
        tracked.event.intensity,
        tracked.press_count
    );
}
