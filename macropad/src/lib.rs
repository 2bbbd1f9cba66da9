#![doc = include_str!("../../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
// Add std for tests
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
pub use macropad_types::config::DEFAULT_DEBOUNCE_MS;
pub use macropad_types::{NUM_COLS, NUM_KEYS, NUM_ROWS};

pub mod channel;
pub mod config;
pub mod config_store;
pub mod debounce;
pub mod dispatcher;
pub mod encoder;
pub mod event;
pub mod host;
pub mod macropad;
pub mod matrix;
pub mod protocol;
pub mod transport;

pub use macropad::MacroPad;
pub use macropad_types as types;

/// Raw mutex used by every static channel and signal
pub(crate) type RawMutex = CriticalSectionRawMutex;

/// Settle time shared by the matrix keys and the encoder push-button
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS as u64);
