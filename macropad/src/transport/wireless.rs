use heapless::Vec;
use macropad_types::protocol::{DeviceInfo, PacketType, RX_BUFFER_SIZE};

use super::{Transport, TransportError};

/// 128-bit UUID of the macro pad GATT service
pub const SERVICE_UUID: &str = "e5e60001-b594-4841-8a6c-5b0d12e7e4a8";
/// Standard battery service
pub const BATTERY_SERVICE_UUID: u16 = 0x180F;
/// Standard battery level characteristic
pub const BATTERY_LEVEL_UUID: u16 = 0x2A19;

/// Largest characteristic write accepted from the host
pub const MAX_WRITE_LEN: usize = RX_BUFFER_SIZE;

/// Characteristics exposed on the wireless link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    /// Notify, key event payload
    KeyEvent,
    /// Notify, encoder event payload
    EncoderEvent,
    /// Read, device-info payload plus a reserved byte
    DeviceInfo,
    /// Read and notify, battery percentage
    Battery,
    /// Read, write and notify, `[section, data...]`
    Config,
    /// Write, `[code, args...]`
    Command,
    /// Battery level of the standard battery service
    BatteryLevel,
}

impl Characteristic {
    pub fn uuid(&self) -> &'static str {
        match self {
            Characteristic::KeyEvent => "e5e60002-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::EncoderEvent => "e5e60003-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::DeviceInfo => "e5e60004-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::Battery => "e5e60005-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::Config => "e5e60006-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::Command => "e5e60007-b594-4841-8a6c-5b0d12e7e4a8",
            Characteristic::BatteryLevel => "2a19",
        }
    }
}

/// A write to the config or command characteristic, queued by the wireless stack
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WirelessWrite {
    pub characteristic: Characteristic,
    pub data: Vec<u8, MAX_WRITE_LEN>,
}

impl WirelessWrite {
    /// Returns `None` when `data` is longer than [`MAX_WRITE_LEN`]
    pub fn new(characteristic: Characteristic, data: &[u8]) -> Option<Self> {
        Some(Self {
            characteristic,
            data: Vec::from_slice(data).ok()?,
        })
    }
}

/// GATT server as seen by the firmware core.
///
/// Advertising, pairing and connection management live in the wireless stack. The core only
/// needs to know whether a central is connected and how to update characteristic values.
pub trait GattChannel {
    fn is_connected(&self) -> bool;

    /// Update the stored value of `characteristic` without notifying
    fn set_value(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), TransportError>;

    /// Update the value of `characteristic` and notify the connected central
    async fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), TransportError>;
}

/// GATT channel of a board without a radio, never connected
#[derive(Clone, Copy, Debug, Default)]
pub struct Disconnected;

impl GattChannel for Disconnected {
    fn is_connected(&self) -> bool {
        false
    }

    fn set_value(&mut self, _characteristic: Characteristic, _value: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    async fn notify(&mut self, _characteristic: Characteristic, _value: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Wireless link, every packet type maps onto a characteristic
pub struct WirelessTransport<G: GattChannel> {
    gatt: G,
}

impl<G: GattChannel> WirelessTransport<G> {
    /// Wrap `gatt` and publish the device info
    pub fn new(mut gatt: G, device_info: &DeviceInfo) -> Self {
        if gatt
            .set_value(Characteristic::DeviceInfo, &device_info.to_wireless_bytes())
            .is_err()
        {
            error!("Failed to set device info characteristic");
        }
        Self { gatt }
    }

    pub fn gatt(&self) -> &G {
        &self.gatt
    }

    pub fn gatt_mut(&mut self) -> &mut G {
        &mut self.gatt
    }
}

impl<G: GattChannel> Transport for WirelessTransport<G> {
    fn is_ready(&self) -> bool {
        self.gatt.is_connected()
    }

    async fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), TransportError> {
        match packet_type {
            PacketType::KeyEvent => self.gatt.notify(Characteristic::KeyEvent, payload).await,
            PacketType::EncoderEvent => self.gatt.notify(Characteristic::EncoderEvent, payload).await,
            PacketType::ConfigData => self.gatt.notify(Characteristic::Config, payload).await,
            PacketType::Battery => {
                self.gatt.notify(Characteristic::Battery, payload).await?;
                self.gatt.notify(Characteristic::BatteryLevel, payload).await
            }
            PacketType::DeviceInfo => {
                // Serial layout plus the reserved byte
                let mut value = [0u8; DeviceInfo::WIRELESS_LEN];
                if payload.len() > DeviceInfo::SERIAL_LEN {
                    return Err(TransportError::PayloadTooLarge);
                }
                value[..payload.len()].copy_from_slice(payload);
                self.gatt.set_value(Characteristic::DeviceInfo, &value)
            }
            // Connection state replaces the handshake on this link
            PacketType::HandshakeAck => {
                trace!("Dropping handshake ack on wireless link");
                Ok(())
            }
            PacketType::Command | PacketType::Handshake => Err(TransportError::Unsupported),
        }
    }
}
