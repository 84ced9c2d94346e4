//! Controller - wires the pad grid to the action pipeline
//!
//! The controller owns every piece of event-side state:
//! - Button tracker (debounce per pad)
//! - Mapping registry
//! - LED feedback
//! - Dispatcher, inline or queued
//!
//! It lives in a single task and is only mutated through `&mut self`, so
//! events are handled strictly one at a time in arrival order.

mod input;
mod lifecycle;


use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::colors;
use crate::config::AppConfig;
use crate::device::{DeviceConnection, DeviceError, DeviceEvent};
use crate::dispatch::{
    ActionExecutor, DispatchMode, DispatchQueue, DispatchReport, DispatchResult, QueueSettings,
    SubmitOutcome,
};
use crate::feedback::FeedbackController;
use crate::grid::{Coordinate, GridError, DEFAULT_GRID_SIZE};
use crate::registry::{ActionDescriptor, MappingRegistry, SkipReason};
use crate::tracker::{ButtonInfo, ButtonTracker};

/// Settings the controller needs from the configuration
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub grid_size: u8,
    /// Log every button event at info level
    pub debug_mode: bool,
    pub mode: DispatchMode,
    pub queue: QueueSettings,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            debug_mode: false,
            mode: DispatchMode::default(),
            queue: QueueSettings::default(),
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            grid_size: config.launchpad.grid_size,
            debug_mode: config.launchpad.debug_mode,
            mode: config.dispatch.mode,
            queue: config.dispatch.queue_settings(),
        }
    }
}

/// Where presses are sent
pub(crate) enum Dispatcher {
    /// Run inside the event loop
    Inline(Arc<dyn ActionExecutor>),
    /// Hand off to the queue worker
    Queued(DispatchQueue),
}

/// What a press led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    /// Nothing runnable at the pad
    Skipped(SkipReason),
    /// Inline dispatch finished
    Completed(DispatchResult),
    /// Handed to the dispatch queue
    Submitted(SubmitOutcome),
}

/// Pad grid controller
pub struct Controller {
    pub(crate) grid_size: u8,
    pub(crate) debug_mode: bool,
    pub(crate) device: Arc<dyn DeviceConnection>,
    pub(crate) tracker: ButtonTracker,
    pub(crate) registry: MappingRegistry,
    pub(crate) feedback: FeedbackController,
    pub(crate) dispatcher: Dispatcher,
}

impl Controller {
    /// Create a controller; queued mode spawns the dispatch worker
    pub fn new(
        device: Arc<dyn DeviceConnection>,
        executor: Arc<dyn ActionExecutor>,
        options: ControllerOptions,
    ) -> Self {
        Self::with_reports(device, executor, options, None)
    }

    /// Like [`Controller::new`], publishing queued dispatch results to `reports`
    pub fn with_reports(
        device: Arc<dyn DeviceConnection>,
        executor: Arc<dyn ActionExecutor>,
        options: ControllerOptions,
        reports: Option<mpsc::UnboundedSender<DispatchReport>>,
    ) -> Self {
        let dispatcher = match options.mode {
            DispatchMode::Inline => Dispatcher::Inline(executor),
            DispatchMode::Queued => {
                Dispatcher::Queued(DispatchQueue::spawn(executor, options.queue, reports))
            }
        };

        debug!(
            "Controller ready ({}x{} grid, {:?} dispatch)",
            options.grid_size, options.grid_size, options.mode
        );

        Self {
            grid_size: options.grid_size,
            debug_mode: options.debug_mode,
            feedback: FeedbackController::new(device.clone()),
            device,
            tracker: ButtonTracker::new(),
            registry: MappingRegistry::new(),
            dispatcher,
        }
    }

    /// Open the device and clear whatever its LEDs were showing
    pub fn connect(&self, identifier: &str) -> Result<mpsc::Receiver<DeviceEvent>, DeviceError> {
        let events = self.device.connect(identifier)?;
        self.refresh_leds();
        Ok(events)
    }

    pub fn grid_size(&self) -> u8 {
        self.grid_size
    }

    /// Validate a grid position against this controller's grid
    pub fn coordinate(&self, x: i32, y: i32) -> Result<Coordinate, GridError> {
        Coordinate::new(x, y, self.grid_size)
    }

    /// Map an action to a pad and light it
    pub fn add_mapping(
        &mut self,
        x: i32,
        y: i32,
        color: u8,
        action_ref: &str,
    ) -> Result<ActionDescriptor, GridError> {
        let coordinate = self.coordinate(x, y)?;
        let descriptor = self.registry.register(coordinate, color, action_ref);
        self.feedback.set_color(coordinate, color);
        Ok(descriptor)
    }

    /// Enable or disable a mapping; false when the pad is unmapped
    pub fn set_active(&mut self, coordinate: Coordinate, active: bool) -> bool {
        if !self.registry.set_active(coordinate, active) {
            let verb = if active { "activate" } else { "deactivate" };
            debug!("No mapping at {} to {}", coordinate, verb);
            return false;
        }
        self.show_mapping(coordinate);
        true
    }

    /// Flip a mapping, returning its new active state
    pub fn toggle_mapping(&mut self, coordinate: Coordinate) -> Option<bool> {
        let active = self.registry.toggle(coordinate)?;
        self.show_mapping(coordinate);
        Some(active)
    }

    /// Registered mappings, ordered by wire id
    pub fn list_mappings(&self) -> Vec<&ActionDescriptor> {
        self.registry.list()
    }

    /// Diagnostics for a pad that has produced at least one event
    pub fn button_info(&self, coordinate: Coordinate) -> Option<ButtonInfo> {
        self.tracker.button_info(coordinate.wire_id(), &self.registry)
    }

    /// Clear the grid, then light every active mapping
    pub fn refresh_leds(&self) {
        self.feedback.reset_all(self.grid_size);
        for mapping in self.registry.list().into_iter().filter(|m| m.active) {
            self.feedback.set_color(mapping.coordinate, mapping.color);
        }
        info!("🎨 LEDs refreshed ({} mappings)", self.registry.len());
    }

    /// Active mappings show their color, inactive ones are dark
    fn show_mapping(&self, coordinate: Coordinate) {
        if let Some(mapping) = self.registry.lookup(coordinate) {
            let color = if mapping.active { mapping.color } else { colors::OFF };
            self.feedback.set_color(coordinate, color);
        }
    }
}
