//! Exposed channels which can be used to share data with the wireless stack and the battery sampler

use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
pub use embassy_sync::{blocking_mutex, channel, signal};

use crate::RawMutex;
use crate::transport::WirelessWrite;

pub const WIRELESS_WRITE_CHANNEL_SIZE: usize = 4;

/// Host writes to the config and command characteristics, received by the wireless stack
pub static WIRELESS_WRITE_CHANNEL: Channel<RawMutex, WirelessWrite, WIRELESS_WRITE_CHANNEL_SIZE> = Channel::new();
/// Latest battery percentage, only the newest value is kept
pub static BATTERY_LEVEL: Signal<RawMutex, u8> = Signal::new();
