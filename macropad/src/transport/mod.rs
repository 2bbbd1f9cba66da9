//! Links to the host.
//!
//! Both links carry the same payloads. The serial link wraps them in frames, the wireless
//! link maps every packet type onto its own characteristic.

pub mod serial;
pub mod wireless;

pub use macropad_types::protocol::PacketType;
pub use serial::{SerialBridge, SerialTransport};
pub use wireless::{Characteristic, Disconnected, GattChannel, WirelessTransport, WirelessWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Writing to the underlying link failed
    Io,
    /// Payload doesn't fit in a frame or characteristic
    PayloadTooLarge,
    /// The link has no way to carry this packet type
    Unsupported,
}

/// An outbound link to the host
pub trait Transport {
    /// Whether events may be sent: handshake done on serial, connected on wireless
    fn is_ready(&self) -> bool;

    /// Called after a valid handshake. Links without a handshake ignore it.
    fn mark_ready(&mut self) {}

    /// Send one payload of `packet_type`, ignoring readiness
    async fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport> Transport for &mut T {
    fn is_ready(&self) -> bool {
        T::is_ready(self)
    }

    fn mark_ready(&mut self) {
        T::mark_ready(self)
    }

    async fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), TransportError> {
        T::send(self, packet_type, payload).await
    }
}
