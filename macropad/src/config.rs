use embassy_time::Duration;
use macropad_types::config::DEFAULT_ENCODER_SENSITIVITY;
use macropad_types::protocol::DeviceInfo;

use crate::DEFAULT_DEBOUNCE;

/// Board configuration of the macro pad runner.
///
/// The persisted [`DeviceConfig`](macropad_types::config::DeviceConfig) overrides
/// `debounce` and `encoder_sensitivity` once it is loaded.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroPadConfig {
    /// Sent after a handshake and published on the device-info characteristic
    pub device_info: DeviceInfo,
    /// Debounce time of the keys and the encoder push-button
    pub debounce: Duration,
    /// Quadrature transitions per reported encoder step
    pub encoder_sensitivity: u8,
    /// Pause between two iterations of the polling loop
    pub scan_interval: Duration,
    /// Busy-wait after activating a matrix row, in microseconds
    pub row_settle_us: u32,
}

impl Default for MacroPadConfig {
    fn default() -> Self {
        Self {
            device_info: DeviceInfo::default(),
            debounce: DEFAULT_DEBOUNCE,
            encoder_sensitivity: DEFAULT_ENCODER_SENSITIVITY,
            scan_interval: Duration::from_millis(1),
            row_settle_us: 10,
        }
    }
}
