//! Serial framing: frame encoder and the resumable byte parser

mod codec;
mod parser;

pub use codec::{Checksum, CodecError, checksum, encode, encode_into};
pub use macropad_types::protocol::{
    EventType, FRAME_OVERHEAD, HANDSHAKE_MAGIC, MAX_FRAME_SIZE, PacketType, RX_BUFFER_SIZE, START_MARKER,
};
pub use parser::{Packet, PacketParser, ParserState};
