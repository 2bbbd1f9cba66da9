use heapless::Vec;
use macropad_types::protocol::{RX_BUFFER_SIZE, START_MARKER};

use super::codec::Checksum;

/// A verified frame. The payload borrows the parser's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<'a> {
    pub packet_type: u8,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParserState {
    /// Waiting for the start marker
    Idle,
    ReadType,
    ReadLengthHigh,
    ReadLengthLow,
    ReadPayload,
    ReadChecksum,
}

/// Byte-at-a-time frame parser.
///
/// Every call to [`PacketParser::feed`] consumes exactly one byte. Bad checksums and
/// declared lengths above `N` drop the frame and return to [`ParserState::Idle`], no
/// payload byte of an oversize frame is buffered.
pub struct PacketParser<const N: usize = RX_BUFFER_SIZE> {
    state: ParserState,
    packet_type: u8,
    length: u16,
    checksum: Checksum,
    buffer: Vec<u8, N>,
}

impl<const N: usize> Default for PacketParser<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketParser<N> {
    pub const fn new() -> Self {
        Self {
            state: ParserState::Idle,
            packet_type: 0,
            length: 0,
            checksum: Checksum::new(),
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.buffer.clear();
    }

    /// Consume one byte, returning the packet it completes
    pub fn feed(&mut self, byte: u8) -> Option<Packet<'_>> {
        match self.state {
            ParserState::Idle => {
                if byte == START_MARKER {
                    self.checksum = Checksum::new();
                    self.buffer.clear();
                    self.state = ParserState::ReadType;
                }
            }
            ParserState::ReadType => {
                self.packet_type = byte;
                self.checksum.fold(byte);
                self.state = ParserState::ReadLengthHigh;
            }
            ParserState::ReadLengthHigh => {
                self.length = (byte as u16) << 8;
                self.checksum.fold(byte);
                self.state = ParserState::ReadLengthLow;
            }
            ParserState::ReadLengthLow => {
                self.length |= byte as u16;
                self.checksum.fold(byte);
                if self.length as usize > N {
                    debug!("Dropping frame, length {} exceeds {}", self.length, N);
                    self.state = ParserState::Idle;
                } else if self.length == 0 {
                    self.state = ParserState::ReadChecksum;
                } else {
                    self.state = ParserState::ReadPayload;
                }
            }
            ParserState::ReadPayload => {
                // The length was checked against the capacity
                let _ = self.buffer.push(byte);
                self.checksum.fold(byte);
                if self.buffer.len() >= self.length as usize {
                    self.state = ParserState::ReadChecksum;
                }
            }
            ParserState::ReadChecksum => {
                self.state = ParserState::Idle;
                if byte == self.checksum.value() {
                    return Some(Packet {
                        packet_type: self.packet_type,
                        payload: &self.buffer,
                    });
                }
                debug!(
                    "Checksum mismatch on packet type {:#x}: got {:#x}, expected {:#x}",
                    self.packet_type,
                    byte,
                    self.checksum.value()
                );
            }
        }
        None
    }
}
