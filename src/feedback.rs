//! LED feedback

use std::sync::Arc;
use tracing::{debug, warn};

use crate::colors;
use crate::device::DeviceConnection;
use crate::grid::Coordinate;
use crate::midi::WireEvent;

/// Pushes pad colors to the device
///
/// Fire-and-forget: a failed send is logged and otherwise ignored, LED
/// state is cosmetic.
#[derive(Clone)]
pub struct FeedbackController {
    device: Arc<dyn DeviceConnection>,
}

impl FeedbackController {
    pub fn new(device: Arc<dyn DeviceConnection>) -> Self {
        Self { device }
    }

    /// Light one pad with a palette index
    pub fn set_color(&self, coordinate: Coordinate, color: u8) {
        let event = WireEvent::note_on(coordinate.wire_id(), color);
        match self.device.send(&event) {
            Ok(()) => debug!("🎨 {} -> color {}", coordinate, color),
            Err(e) => warn!("Failed to set color of {}: {}", coordinate, e),
        }
    }

    /// Turn every pad of the grid off
    pub fn reset_all(&self, grid_size: u8) {
        for coordinate in Coordinate::iter_grid(grid_size) {
            self.set_color(coordinate, colors::OFF);
        }
        debug!("All {}x{} pads reset", grid_size, grid_size);
    }
}
