use heapless::Vec;
use macropad_types::protocol::{FRAME_OVERHEAD, MAX_FRAME_SIZE, RX_BUFFER_SIZE, START_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Payload is longer than a receiver accepts
    PayloadTooLarge,
    /// Output buffer cannot hold the frame
    BufferTooSmall,
}

/// Running XOR over the frame header and payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum(u8);

impl Checksum {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn fold(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    pub fn fold_slice(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.fold(*b);
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Checksum of a frame, folding `packet_type`, the length bytes and then the payload
pub fn checksum(packet_type: u8, len_high: u8, len_low: u8, payload: &[u8]) -> u8 {
    let mut sum = Checksum::new();
    sum.fold(packet_type);
    sum.fold(len_high);
    sum.fold(len_low);
    sum.fold_slice(payload);
    sum.value()
}

/// Write one frame into `buf`, returning the number of bytes used.
///
/// The payload is not escaped, the receiver relies on the length field alone.
pub fn encode_into(packet_type: u8, payload: &[u8], buf: &mut [u8]) -> Result<usize, CodecError> {
    if payload.len() > RX_BUFFER_SIZE {
        return Err(CodecError::PayloadTooLarge);
    }
    let total = payload.len() + FRAME_OVERHEAD;
    if buf.len() < total {
        return Err(CodecError::BufferTooSmall);
    }

    let [len_high, len_low] = (payload.len() as u16).to_be_bytes();
    buf[0] = START_MARKER;
    buf[1] = packet_type;
    buf[2] = len_high;
    buf[3] = len_low;
    buf[4..4 + payload.len()].copy_from_slice(payload);
    buf[total - 1] = checksum(packet_type, len_high, len_low, payload);
    Ok(total)
}

/// Encode one frame into a freshly allocated fixed-capacity buffer
pub fn encode(packet_type: u8, payload: &[u8]) -> Result<Vec<u8, MAX_FRAME_SIZE>, CodecError> {
    let mut frame = Vec::new();
    frame
        .resize_default(payload.len().min(RX_BUFFER_SIZE) + FRAME_OVERHEAD)
        .map_err(|_| CodecError::BufferTooSmall)?;
    let used = encode_into(packet_type, payload, &mut frame)?;
    frame.truncate(used);
    Ok(frame)
}
