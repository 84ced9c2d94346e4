//! Grid coordinates and the wire id codec
//!
//! Pads are addressed on the wire by a single note number built from the
//! grid position: `id = x + y * ROW_STRIDE`. The grid must stay narrower
//! than the stride, otherwise two coordinates would share a note.

use std::fmt;

use thiserror::Error;

/// Distance between two rows on the wire
pub const ROW_STRIDE: u8 = 10;

/// Grid size of a Launchpad Mini
pub const DEFAULT_GRID_SIZE: u8 = 8;

/// Largest note number a MIDI data byte can address
const MAX_WIRE_ID: i32 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error(
        "coordinate ({x}, {y}) cannot be encoded (x must be 0-{max_x}, id must fit 0-127)",
        max_x = ROW_STRIDE - 1
    )]
    OutOfRange { x: i32, y: i32 },

    #[error("coordinate ({x}, {y}) is outside the {grid_size}x{grid_size} grid")]
    OutsideGrid { x: i32, y: i32, grid_size: u8 },

    #[error("grid size {0} is invalid (must be 1-{max})", max = ROW_STRIDE)]
    InvalidGridSize(u8),
}

/// Flat note identifier of a pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireId(u8);

impl WireId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a pad on the grid, `(0, 0)` being the first note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    x: u8,
    y: u8,
}

impl Coordinate {
    /// Build a coordinate that is both encodable and inside the grid
    pub fn new(x: i32, y: i32, grid_size: u8) -> Result<Self, GridError> {
        check_grid_size(grid_size)?;
        encode(x, y)?;
        if x >= grid_size as i32 || y >= grid_size as i32 {
            return Err(GridError::OutsideGrid { x, y, grid_size });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// Wire id for this coordinate
    ///
    /// Every constructed coordinate is encodable, so this cannot fail.
    pub fn wire_id(&self) -> WireId {
        WireId(self.x + self.y * ROW_STRIDE)
    }

    /// Every coordinate of a square grid, row by row
    pub fn iter_grid(grid_size: u8) -> impl Iterator<Item = Coordinate> {
        let size = grid_size.min(ROW_STRIDE);
        (0..size).flat_map(move |y| (0..size).map(move |x| Coordinate { x, y }))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Encode a grid position to its wire id
pub fn encode(x: i32, y: i32) -> Result<WireId, GridError> {
    if x < 0 || y < 0 || x >= ROW_STRIDE as i32 {
        return Err(GridError::OutOfRange { x, y });
    }
    let id = x + y * ROW_STRIDE as i32;
    if id > MAX_WIRE_ID {
        return Err(GridError::OutOfRange { x, y });
    }
    Ok(WireId(id as u8))
}

/// Decode a wire id back to its grid position
pub fn decode(id: WireId) -> Coordinate {
    Coordinate {
        x: id.0 % ROW_STRIDE,
        y: id.0 / ROW_STRIDE,
    }
}

/// A grid must be non-empty and narrower than the row stride
pub fn check_grid_size(grid_size: u8) -> Result<(), GridError> {
    if grid_size == 0 || grid_size > ROW_STRIDE {
        return Err(GridError::InvalidGridSize(grid_size));
    }
    Ok(())
}
