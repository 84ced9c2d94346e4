//! padshell - run shell actions from a Launchpad pad grid
//!
//! Pressing a pad runs the shell command mapped to it; pad LEDs show which
//! mappings are active.

pub mod colors;
pub mod config;
pub mod controller;
pub mod device;
pub mod dispatch;
pub mod feedback;
pub mod grid;
pub mod midi;
pub mod registry;
pub mod tracker;

pub use config::AppConfig;
pub use controller::{Controller, ControllerOptions, PressOutcome};
pub use device::{DeviceConnection, LaunchpadDevice};
pub use dispatch::{ActionExecutor, DispatchResult, ShellExecutor};
pub use grid::{decode, encode, Coordinate, GridError, WireId};
