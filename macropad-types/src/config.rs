//! Persisted device settings.
//!
//! The structs here are what a `ConfigStore` keeps across reboots. Each of them also
//! knows its byte layout inside config-data and command payloads.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::NUM_KEYS;

/// Longest text macro attached to a key
pub const MAX_MACRO_LENGTH: usize = 32;
/// Longest device name, in bytes
pub const MAX_DEVICE_NAME_LENGTH: usize = 31;

pub const DEFAULT_DEVICE_NAME: &str = "MacroPad";
pub const DEFAULT_DEBOUNCE_MS: u16 = 20;
pub const DEFAULT_ENCODER_SENSITIVITY: u8 = 2;
pub const DEFAULT_SLEEP_TIMEOUT_MS: u32 = 300_000;

/// What a key does on the host side
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromRepr, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MapType {
    #[default]
    None = 0x00,
    SingleKey = 0x01,
    MediaKey = 0x02,
    ModifierCombo = 0x03,
    TextMacro = 0x04,
    Shortcut = 0x05,
    LaunchApp = 0x06,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMapping {
    pub map_type: MapType,
    /// HID usage id
    pub key_code: u8,
    /// HID modifier bit flags
    pub modifiers: u8,
    pub macro_text: Vec<u8, MAX_MACRO_LENGTH>,
}

impl KeyMapping {
    /// Fixed part of the layout: type, key code, modifiers, macro length
    pub const HEADER_LEN: usize = 4;

    /// Parse `[type, keyCode, modifiers, macroLen, macro...]` from the front of `data`.
    ///
    /// Returns the mapping and the number of bytes it occupied.
    pub fn parse(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < Self::HEADER_LEN {
            return None;
        }
        let map_type = MapType::from_repr(data[0])?;
        let macro_len = data[3] as usize;
        let end = Self::HEADER_LEN + macro_len;
        if macro_len > MAX_MACRO_LENGTH || data.len() < end {
            return None;
        }
        let macro_text = Vec::from_slice(&data[Self::HEADER_LEN..end]).ok()?;
        Some((
            Self {
                map_type,
                key_code: data[1],
                modifiers: data[2],
                macro_text,
            },
            end,
        ))
    }

    /// Append the wire layout to `out`
    pub fn write_to<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), ()> {
        out.extend_from_slice(&[
            self.map_type as u8,
            self.key_code,
            self.modifiers,
            self.macro_text.len() as u8,
        ])
        .map_err(|_| ())?;
        out.extend_from_slice(&self.macro_text).map_err(|_| ())
    }
}

/// What the encoder does on the host side
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromRepr, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderMode {
    #[default]
    Volume = 0x01,
    Scroll = 0x02,
    Zoom = 0x03,
    Brightness = 0x04,
    Custom = 0x05,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderConfig {
    pub mode: EncoderMode,
    pub cw_key_code: u8,
    pub ccw_key_code: u8,
    pub cw_modifiers: u8,
    pub ccw_modifiers: u8,
    /// Quadrature transitions per reported step, 1-10 in practice
    pub sensitivity: u8,
    pub button_key_code: u8,
    pub button_modifiers: u8,
    pub button_map_type: MapType,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: EncoderMode::Volume,
            cw_key_code: 0,
            ccw_key_code: 0,
            cw_modifiers: 0,
            ccw_modifiers: 0,
            sensitivity: DEFAULT_ENCODER_SENSITIVITY,
            button_key_code: 0,
            button_modifiers: 0,
            button_map_type: MapType::None,
        }
    }
}

impl EncoderConfig {
    pub const LEN: usize = 9;

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }
        Some(Self {
            mode: EncoderMode::from_repr(data[0])?,
            cw_key_code: data[1],
            ccw_key_code: data[2],
            cw_modifiers: data[3],
            ccw_modifiers: data[4],
            sensitivity: data[5],
            button_key_code: data[6],
            button_modifiers: data[7],
            button_map_type: MapType::from_repr(data[8])?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            self.mode as u8,
            self.cw_key_code,
            self.ccw_key_code,
            self.cw_modifiers,
            self.ccw_modifiers,
            self.sensitivity,
            self.button_key_code,
            self.button_modifiers,
            self.button_map_type as u8,
        ]
    }
}

/// Everything the device remembers across reboots
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub device_name: String<MAX_DEVICE_NAME_LENGTH>,
    pub debounce_ms: u16,
    pub encoder_sensitivity: u8,
    pub sleep_timeout_ms: u32,
    pub key_mappings: [KeyMapping; NUM_KEYS],
    pub encoder: EncoderConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut device_name = String::new();
        // Fits by construction
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            device_name,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            encoder_sensitivity: DEFAULT_ENCODER_SENSITIVITY,
            sleep_timeout_ms: DEFAULT_SLEEP_TIMEOUT_MS,
            key_mappings: core::array::from_fn(|_| KeyMapping::default()),
            encoder: EncoderConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Length of the device-settings section
    pub const SETTINGS_LEN: usize = 7;

    /// Replace the device name, truncated to [`MAX_DEVICE_NAME_LENGTH`] bytes on a char boundary
    pub fn set_device_name(&mut self, name: &str) {
        let mut end = name.len().min(MAX_DEVICE_NAME_LENGTH);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.device_name.clear();
        let _ = self.device_name.push_str(&name[..end]);
    }

    /// `[debounce_hi, debounce_lo, sensitivity, sleep (4 bytes, big-endian)]`
    pub fn settings_bytes(&self) -> [u8; Self::SETTINGS_LEN] {
        let debounce = self.debounce_ms.to_be_bytes();
        let sleep = self.sleep_timeout_ms.to_be_bytes();
        [
            debounce[0],
            debounce[1],
            self.encoder_sensitivity,
            sleep[0],
            sleep[1],
            sleep[2],
            sleep[3],
        ]
    }

    /// Apply a device-settings section, returns false when it is too short
    pub fn apply_settings_bytes(&mut self, data: &[u8]) -> bool {
        if data.len() < Self::SETTINGS_LEN {
            return false;
        }
        self.debounce_ms = u16::from_be_bytes([data[0], data[1]]);
        self.encoder_sensitivity = data[2];
        self.sleep_timeout_ms = u32::from_be_bytes([data[3], data[4], data[5], data[6]]);
        true
    }
}
