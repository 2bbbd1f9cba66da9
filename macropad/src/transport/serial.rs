use core::cell::RefCell;

use embedded_io_async::{Read, ReadReady, Write};
use macropad_types::protocol::{DeviceInfo, MAX_FRAME_SIZE, PacketType};

use super::{Transport, TransportError};
use crate::dispatcher::Dispatcher;
use crate::host::{HostHandler, LiveSettings};
use crate::protocol::{CodecError, PacketParser, encode_into};

/// Bytes pulled from the reader per read call
const READ_CHUNK_SIZE: usize = 64;

/// Framed serial link.
///
/// Events are only sent after the host completed the handshake. Once set the handshake
/// flag stays set.
pub struct SerialTransport<W: Write> {
    writer: W,
    handshaked: bool,
}

impl<W: Write> SerialTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            handshaked: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<W: Write> Transport for SerialTransport<W> {
    fn is_ready(&self) -> bool {
        self.handshaked
    }

    fn mark_ready(&mut self) {
        if !self.handshaked {
            info!("Serial handshake completed");
        }
        self.handshaked = true;
    }

    async fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), TransportError> {
        let mut frame = [0u8; MAX_FRAME_SIZE];
        let len = encode_into(packet_type.into(), payload, &mut frame).map_err(|e| match e {
            CodecError::PayloadTooLarge | CodecError::BufferTooSmall => TransportError::PayloadTooLarge,
        })?;
        self.writer
            .write_all(&frame[..len])
            .await
            .map_err(|_e| TransportError::Io)?;
        self.writer.flush().await.map_err(|_e| TransportError::Io)
    }
}

/// The serial side of the host link: frame parser, dispatcher and the wire itself.
pub struct SerialBridge<'a, R: Read + ReadReady, W: Write, H: HostHandler> {
    reader: R,
    parser: PacketParser,
    dispatcher: Dispatcher<'a, SerialTransport<W>, H>,
}

impl<'a, R: Read + ReadReady, W: Write, H: HostHandler> SerialBridge<'a, R, W, H> {
    pub fn new(reader: R, writer: W, handler: &'a RefCell<H>, device_info: DeviceInfo) -> Self {
        Self {
            reader,
            parser: PacketParser::new(),
            dispatcher: Dispatcher::new(SerialTransport::new(writer), handler, device_info),
        }
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher<'a, SerialTransport<W>, H> {
        &mut self.dispatcher
    }

    pub fn is_handshaked(&self) -> bool {
        self.dispatcher.is_ready()
    }

    /// Process every byte that is available right now without waiting for more.
    ///
    /// Returns the most recent live settings change requested by the host, if any.
    pub async fn poll(&mut self) -> Option<LiveSettings> {
        let mut settings = None;
        let mut buf = [0u8; READ_CHUNK_SIZE];
        while let Ok(true) = self.reader.read_ready() {
            match self.reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => settings = self.process(&buf[..n]).await.or(settings),
                Err(_e) => {
                    error!("Serial read error");
                    break;
                }
            }
        }
        settings
    }

    async fn process(&mut self, bytes: &[u8]) -> Option<LiveSettings> {
        let mut settings = None;
        for byte in bytes {
            if let Some(packet) = self.parser.feed(*byte)
                && let Some(update) = self.dispatcher.handle_packet(packet).await
            {
                settings = Some(update);
            }
        }
        settings
    }
}
