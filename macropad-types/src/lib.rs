//! # MacroPad Types
//!
//! Type definitions shared by the MacroPad firmware and anything that talks to it.
//!
//! ## Modules
//!
//! - [`protocol`] - Packet types, event codes and the device-info payload
//! - [`command`] - Host command codes and config section identifiers
//! - [`config`] - Persisted device settings and their wire layouts
//!
//! The byte values in this crate are the protocol. Both the serial framing and the
//! wireless characteristics carry the same payload layouts.

#![no_std]

pub mod command;
pub mod config;
pub mod protocol;

/// Number of rows of the key matrix
pub const NUM_ROWS: usize = 2;
/// Number of columns of the key matrix
pub const NUM_COLS: usize = 5;
/// Number of keys, indexed `row * NUM_COLS + col`
pub const NUM_KEYS: usize = NUM_ROWS * NUM_COLS;

/// Firmware version reported in the device-info payload
pub const FW_VERSION_MAJOR: u8 = 1;
pub const FW_VERSION_MINOR: u8 = 0;
pub const FW_VERSION_PATCH: u8 = 0;
