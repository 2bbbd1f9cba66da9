//! Host → device command codes and config section identifiers.
//!
//! A command payload is `[code, args...]`, a config payload is `[section, data...]`.

use strum::FromRepr;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandCode {
    FactoryReset = 0x01,
    SetDeviceName = 0x02,
    SetDebounce = 0x03,
    SetEncoderSensitivity = 0x04,
    SetSleepTimeout = 0x05,
    SaveConfig = 0x06,
    RequestConfig = 0x07,
    SetKeyMap = 0x08,
    SetEncoderMode = 0x09,
    SyncProfile = 0x0A,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigSection {
    KeyMapping = 0x01,
    EncoderConfig = 0x02,
    DeviceSettings = 0x03,
}
