//! Event/command protocol definitions.
//!
//! Serial frame layout: `0xAA | TYPE | LEN_HI | LEN_LO | PAYLOAD(LEN) | XOR_CHECKSUM`.

use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::{FW_VERSION_MAJOR, FW_VERSION_MINOR, FW_VERSION_PATCH, NUM_COLS, NUM_ROWS};

/// First byte of every serial frame
pub const START_MARKER: u8 = 0xAA;

/// Magic carried by the handshake packet and echoed in its acknowledgement: "MPD"
pub const HANDSHAKE_MAGIC: [u8; 3] = [0x4D, 0x50, 0x44];

/// Largest payload a receiver accepts. Frames declaring more are dropped.
pub const RX_BUFFER_SIZE: usize = 256;

/// Start marker, type, two length bytes and the checksum
pub const FRAME_OVERHEAD: usize = 5;

/// Largest encoded frame
pub const MAX_FRAME_SIZE: usize = RX_BUFFER_SIZE + FRAME_OVERHEAD;

/// Packet type tag of a serial frame
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    KeyEvent = 0x01,
    EncoderEvent = 0x02,
    ConfigData = 0x03,
    Battery = 0x04,
    DeviceInfo = 0x05,
    Command = 0x06,
    Handshake = 0x07,
    HandshakeAck = 0x08,
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        value as u8
    }
}

/// First byte of key and encoder event payloads
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventType {
    KeyPress = 0x01,
    KeyRelease = 0x02,
    EncoderRotate = 0x10,
    EncoderButtonPress = 0x11,
    EncoderButtonRelease = 0x12,
}

impl EventType {
    pub fn key(pressed: bool) -> Self {
        if pressed { Self::KeyPress } else { Self::KeyRelease }
    }

    pub fn encoder_button(pressed: bool) -> Self {
        if pressed {
            Self::EncoderButtonPress
        } else {
            Self::EncoderButtonRelease
        }
    }
}

/// Rotation direction of the encoder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// A clockwise turn, positive position delta
    Clockwise,
    /// A counterclockwise turn, negative position delta
    CounterClockwise,
}

impl Direction {
    pub const CLOCKWISE_BYTE: u8 = 0x01;
    pub const COUNTER_CLOCKWISE_BYTE: u8 = 0xFF;

    /// Wire encoding of the direction
    pub fn to_byte(self) -> u8 {
        match self {
            Direction::Clockwise => Self::CLOCKWISE_BYTE,
            Direction::CounterClockwise => Self::COUNTER_CLOCKWISE_BYTE,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::CLOCKWISE_BYTE => Some(Direction::Clockwise),
            Self::COUNTER_CLOCKWISE_BYTE => Some(Direction::CounterClockwise),
            _ => None,
        }
    }

    /// Sign of the position delta
    pub fn signum(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Board identification sent after a handshake and exposed on the device-info characteristic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub fw_major: u8,
    pub fw_minor: u8,
    pub fw_patch: u8,
    pub rows: u8,
    pub cols: u8,
    pub has_encoder: bool,
    pub has_battery: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            fw_major: FW_VERSION_MAJOR,
            fw_minor: FW_VERSION_MINOR,
            fw_patch: FW_VERSION_PATCH,
            rows: NUM_ROWS as u8,
            cols: NUM_COLS as u8,
            has_encoder: true,
            has_battery: false,
        }
    }
}

impl DeviceInfo {
    /// Length of the serial device-info payload
    pub const SERIAL_LEN: usize = 7;
    /// Length of the wireless characteristic value, one reserved byte longer
    pub const WIRELESS_LEN: usize = 8;

    /// `[fwMajor, fwMinor, fwPatch, rows, cols, hasEncoder, hasBattery]`
    pub fn to_bytes(&self) -> [u8; Self::SERIAL_LEN] {
        [
            self.fw_major,
            self.fw_minor,
            self.fw_patch,
            self.rows,
            self.cols,
            self.has_encoder as u8,
            self.has_battery as u8,
        ]
    }

    /// Serial layout followed by a reserved zero byte
    pub fn to_wireless_bytes(&self) -> [u8; Self::WIRELESS_LEN] {
        let mut out = [0u8; Self::WIRELESS_LEN];
        out[..Self::SERIAL_LEN].copy_from_slice(&self.to_bytes());
        out
    }
}
