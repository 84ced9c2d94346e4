//! MIDI wire events
//!
//! The pad grid speaks plain three-byte note messages in both directions:
//! `(status, note, velocity)`. Inbound, velocity is the pad intensity;
//! outbound, velocity is the palette index of the LED color.

use std::fmt;

use crate::grid::WireId;

/// Note On status byte (channel 1)
pub const NOTE_ON: u8 = 0x90;

/// Note Off status byte (channel 1)
pub const NOTE_OFF: u8 = 0x80;

/// Highest value a MIDI data byte can carry
pub const MAX_DATA: u8 = 0x7F;

/// A single `(status, id, intensity)` triple on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEvent {
    pub status: u8,
    pub id: WireId,
    /// Velocity for inbound events, color index for outbound ones
    pub intensity: u8,
}

impl WireEvent {
    /// Parse a raw MIDI packet
    ///
    /// Anything that is not exactly a status/id/intensity triple is rejected.
    pub fn from_raw(data: &[u8]) -> Option<Self> {
        match *data {
            [status, id, intensity] => Some(Self {
                status,
                id: WireId::new(id & MAX_DATA),
                intensity: intensity & MAX_DATA,
            }),
            _ => None,
        }
    }

    /// Outbound LED event
    pub fn note_on(id: WireId, velocity: u8) -> Self {
        Self {
            status: NOTE_ON,
            id,
            intensity: velocity & MAX_DATA,
        }
    }

    /// Encode to MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.id.get() & MAX_DATA, self.intensity & MAX_DATA]
    }

    /// True when the pad reports any pressure at all
    ///
    /// The status byte is ignored: Note On with velocity 0 and Note Off are
    /// both releases.
    pub fn is_press(&self) -> bool {
        self.intensity > 0
    }
}

impl fmt::Display for WireEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.status & 0xF0 {
            0x90 => "NoteOn",
            0x80 => "NoteOff",
            0xB0 => "CC",
            _ => "Other",
        };
        write!(
            f,
            "{} ch:{} n:{} v:{}",
            kind,
            (self.status & 0x0F) + 1,
            self.id,
            self.intensity
        )
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
