//! Mapping registry - which action lives on which pad

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::dispatch::{ActionExecutor, DispatchResult};
use crate::grid::Coordinate;

/// Registered association between a pad and an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub coordinate: Coordinate,
    /// Palette index shown on the pad while active
    pub color: u8,
    pub action_ref: String,
    pub active: bool,
}

/// Why a press did not run anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unmapped,
    Inactive,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unmapped => write!(f, "no mapping"),
            SkipReason::Inactive => write!(f, "mapping inactive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Completed(DispatchResult),
}

/// Coordinate → action table
///
/// At most one descriptor per coordinate; registering again replaces the
/// previous one. Descriptors are never removed.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    mappings: HashMap<Coordinate, ActionDescriptor>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing whatever was mapped at the coordinate
    pub fn register(
        &mut self,
        coordinate: Coordinate,
        color: u8,
        action_ref: impl Into<String>,
    ) -> ActionDescriptor {
        let descriptor = ActionDescriptor {
            coordinate,
            color,
            action_ref: action_ref.into(),
            active: true,
        };

        if let Some(previous) = self.mappings.insert(coordinate, descriptor.clone()) {
            debug!(
                "Replacing mapping {} -> {} with {}",
                coordinate, previous.action_ref, descriptor.action_ref
            );
        }
        info!("✨ Created mapping: {} -> {}", coordinate, descriptor.action_ref);

        descriptor
    }

    pub fn lookup(&self, coordinate: Coordinate) -> Option<&ActionDescriptor> {
        self.mappings.get(&coordinate)
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.mappings.contains_key(&coordinate)
    }

    /// Set the active flag; false when nothing is mapped there
    pub fn set_active(&mut self, coordinate: Coordinate, active: bool) -> bool {
        match self.mappings.get_mut(&coordinate) {
            Some(mapping) => {
                mapping.active = active;
                log_active(coordinate, active);
                true
            }
            None => false,
        }
    }

    /// Flip the active flag, returning the new state
    pub fn toggle(&mut self, coordinate: Coordinate) -> Option<bool> {
        let mapping = self.mappings.get_mut(&coordinate)?;
        mapping.active = !mapping.active;
        log_active(coordinate, mapping.active);
        Some(mapping.active)
    }

    /// All mappings ordered by wire id
    pub fn list(&self) -> Vec<&ActionDescriptor> {
        let mut list: Vec<_> = self.mappings.values().collect();
        list.sort_by_key(|m| m.coordinate.wire_id());
        list
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Active descriptor for a coordinate, or the reason there is none
    pub fn resolve(&self, coordinate: Coordinate) -> Result<&ActionDescriptor, SkipReason> {
        match self.mappings.get(&coordinate) {
            None => Err(SkipReason::Unmapped),
            Some(mapping) if !mapping.active => Err(SkipReason::Inactive),
            Some(mapping) => Ok(mapping),
        }
    }

    /// Run the action mapped at a coordinate
    ///
    /// Unmapped or inactive pads are skipped with a diagnostic line; this is
    /// never an error.
    pub async fn dispatch(
        &self,
        coordinate: Coordinate,
        executor: &dyn ActionExecutor,
    ) -> DispatchOutcome {
        match self.resolve(coordinate) {
            Ok(mapping) => {
                debug!("🔄 Executing alias for button {}", coordinate);
                DispatchOutcome::Completed(executor.execute(&mapping.action_ref).await)
            }
            Err(reason) => {
                debug!("Skipping button {}: {}", coordinate, reason);
                DispatchOutcome::Skipped(reason)
            }
        }
    }
}

fn log_active(coordinate: Coordinate, active: bool) {
    if active {
        info!("🟢 Mapping {} activated", coordinate);
    } else {
        info!("🔴 Mapping {} deactivated", coordinate);
    }
}
