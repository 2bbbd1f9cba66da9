use core::cell::RefCell;

use macropad_types::protocol::{DeviceInfo, EventType, HANDSHAKE_MAGIC, PacketType};

use crate::event::{EncoderEvent, KeyEvent};
use crate::host::{HostAction, HostHandler, LiveSettings};
use crate::protocol::Packet;
use crate::transport::{Characteristic, Transport};

/// Routes host packets to the [`HostHandler`] and input events to the host.
///
/// Every outbound event is silently dropped while the transport is not ready, nothing is
/// queued for later.
pub struct Dispatcher<'a, T: Transport, H: HostHandler> {
    transport: T,
    handler: &'a RefCell<H>,
    device_info: DeviceInfo,
}

impl<'a, T: Transport, H: HostHandler> Dispatcher<'a, T, H> {
    pub fn new(transport: T, handler: &'a RefCell<H>, device_info: DeviceInfo) -> Self {
        Self {
            transport,
            handler,
            device_info,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Replace the host handler
    pub fn set_handler(&mut self, handler: &'a RefCell<H>) {
        self.handler = handler;
    }

    pub fn is_ready(&self) -> bool {
        self.transport.is_ready()
    }

    /// Handle a verified packet from the serial parser
    pub async fn handle_packet(&mut self, packet: Packet<'_>) -> Option<LiveSettings> {
        match PacketType::from_repr(packet.packet_type) {
            Some(PacketType::Handshake) => {
                self.handle_handshake(packet.payload).await;
                None
            }
            Some(PacketType::Command) => self.handle_command(packet.payload).await,
            Some(PacketType::ConfigData) => self.handle_config(packet.payload).await,
            _ => {
                debug!("Ignoring packet type {:#x}", packet.packet_type);
                None
            }
        }
    }

    /// Handle a host write to a wireless characteristic
    pub async fn handle_characteristic_write(
        &mut self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Option<LiveSettings> {
        match characteristic {
            Characteristic::Command => self.handle_command(data).await,
            Characteristic::Config => self.handle_config(data).await,
            _ => {
                debug!("Ignoring write to {:?}", characteristic);
                None
            }
        }
    }

    async fn handle_handshake(&mut self, payload: &[u8]) {
        if payload != HANDSHAKE_MAGIC {
            debug!("Invalid handshake magic");
            return;
        }
        self.transport.mark_ready();
        self.send(PacketType::HandshakeAck, &HANDSHAKE_MAGIC).await;
        self.send_device_info().await;
    }

    /// `[code, args...]`, empty payloads are dropped
    pub async fn handle_command(&mut self, payload: &[u8]) -> Option<LiveSettings> {
        let (&code, args) = payload.split_first()?;
        let action = self.handler.borrow_mut().on_command(code, args);
        self.perform(action).await
    }

    /// `[section, data...]` with at least one data byte
    pub async fn handle_config(&mut self, payload: &[u8]) -> Option<LiveSettings> {
        if payload.len() < 2 {
            debug!("Config payload too short");
            return None;
        }
        let action = self.handler.borrow_mut().on_config(payload[0], &payload[1..]);
        self.perform(action).await
    }

    async fn perform(&mut self, action: HostAction) -> Option<LiveSettings> {
        match action {
            HostAction::None => None,
            HostAction::Apply(settings) => Some(settings),
            HostAction::Reply(payloads) => {
                for payload in payloads.iter() {
                    self.send_config_data(payload).await;
                }
                None
            }
        }
    }

    pub async fn send_key_event(&mut self, event: KeyEvent) {
        let payload = [EventType::key(event.pressed) as u8, event.index];
        self.send_gated(PacketType::KeyEvent, &payload).await;
    }

    pub async fn send_encoder_event(&mut self, event: EncoderEvent) {
        let payload = match event {
            EncoderEvent::Rotate { direction, steps } => [EventType::EncoderRotate as u8, direction.to_byte(), steps],
            EncoderEvent::Button { pressed } => [EventType::encoder_button(pressed) as u8, 0, 0],
        };
        self.send_gated(PacketType::EncoderEvent, &payload).await;
    }

    /// `percent` is the charge between 0 and 100
    pub async fn send_battery_level(&mut self, percent: u8) {
        self.send_gated(PacketType::Battery, &[percent.min(100)]).await;
    }

    /// Send a `[section, data...]` payload
    pub async fn send_config_data(&mut self, payload: &[u8]) {
        self.send_gated(PacketType::ConfigData, payload).await;
    }

    pub async fn send_device_info(&mut self) {
        let info = self.device_info.to_bytes();
        self.send_gated(PacketType::DeviceInfo, &info).await;
    }

    async fn send_gated(&mut self, packet_type: PacketType, payload: &[u8]) {
        if !self.transport.is_ready() {
            trace!("Transport not ready, dropping {:?}", packet_type);
            return;
        }
        self.send(packet_type, payload).await;
    }

    async fn send(&mut self, packet_type: PacketType, payload: &[u8]) {
        if let Err(e) = self.transport.send(packet_type, payload).await {
            error!("Failed to send {:?}: {:?}", packet_type, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use macropad_types::protocol::Direction;

    use super::*;
    use crate::transport::TransportError;

    #[derive(Default)]
    struct Recorder {
        ready: bool,
        sent: std::vec::Vec<(PacketType, std::vec::Vec<u8>)>,
    }

    impl Transport for Recorder {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn mark_ready(&mut self) {
            self.ready = true;
        }

        async fn send(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.push((packet_type, payload.to_vec()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Handler {
        commands: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
        configs: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
    }

    impl HostHandler for Handler {
        fn on_command(&mut self, code: u8, args: &[u8]) -> HostAction {
            self.commands.push((code, args.to_vec()));
            HostAction::None
        }

        fn on_config(&mut self, section: u8, data: &[u8]) -> HostAction {
            self.configs.push((section, data.to_vec()));
            HostAction::None
        }
    }

    fn packet(packet_type: PacketType, payload: &[u8]) -> Packet<'_> {
        Packet {
            packet_type: packet_type as u8,
            payload,
        }
    }

    #[test]
    fn handshake_sends_ack_then_device_info() {
        let handler = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &handler, DeviceInfo::default());
        block_on(dispatcher.handle_packet(packet(PacketType::Handshake, &HANDSHAKE_MAGIC)));

        assert!(dispatcher.is_ready());
        assert_eq!(
            dispatcher.transport().sent,
            vec![
                (PacketType::HandshakeAck, vec![0x4D, 0x50, 0x44]),
                (PacketType::DeviceInfo, vec![1, 0, 0, 2, 5, 1, 0]),
            ]
        );
    }

    #[test]
    fn wrong_magic_is_ignored() {
        let handler = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &handler, DeviceInfo::default());
        let payloads: [&[u8]; 4] = [&[0x4D, 0x50, 0x45], &[0x4D, 0x50], &[0x4D, 0x50, 0x44, 0x00], &[]];
        for payload in payloads {
            block_on(dispatcher.handle_packet(packet(PacketType::Handshake, payload)));
        }
        assert!(!dispatcher.is_ready());
        assert!(dispatcher.transport().sent.is_empty());
    }

    #[test]
    fn events_are_dropped_until_ready() {
        let handler = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &handler, DeviceInfo::default());
        block_on(async {
            dispatcher.send_key_event(KeyEvent { index: 3, pressed: true }).await;
            dispatcher.send_battery_level(80).await;
            dispatcher.send_config_data(&[0x03, 0x00]).await;
            dispatcher.send_device_info().await;
        });
        assert!(dispatcher.transport().sent.is_empty());

        dispatcher.transport_mut().ready = true;
        block_on(dispatcher.send_key_event(KeyEvent { index: 3, pressed: false }));
        assert_eq!(dispatcher.transport().sent, vec![(PacketType::KeyEvent, vec![0x02, 3])]);
    }

    #[test]
    fn encoder_payloads() {
        let handler = RefCell::new(Handler::default());
        let transport = Recorder {
            ready: true,
            ..Default::default()
        };
        let mut dispatcher = Dispatcher::new(transport, &handler, DeviceInfo::default());
        block_on(async {
            dispatcher
                .send_encoder_event(EncoderEvent::Rotate {
                    direction: Direction::Clockwise,
                    steps: 2,
                })
                .await;
            dispatcher
                .send_encoder_event(EncoderEvent::Rotate {
                    direction: Direction::CounterClockwise,
                    steps: 1,
                })
                .await;
            dispatcher.send_encoder_event(EncoderEvent::Button { pressed: true }).await;
            dispatcher.send_encoder_event(EncoderEvent::Button { pressed: false }).await;
            dispatcher.send_battery_level(150).await;
        });
        assert_eq!(
            dispatcher.transport().sent,
            vec![
                (PacketType::EncoderEvent, vec![0x10, 0x01, 2]),
                (PacketType::EncoderEvent, vec![0x10, 0xFF, 1]),
                (PacketType::EncoderEvent, vec![0x11, 0, 0]),
                (PacketType::EncoderEvent, vec![0x12, 0, 0]),
                (PacketType::Battery, vec![100]),
            ]
        );
    }

    #[test]
    fn command_and_config_are_forwarded_verbatim() {
        let handler = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &handler, DeviceInfo::default());
        block_on(async {
            dispatcher.handle_packet(packet(PacketType::Command, &[0x03, 0x00, 0x14])).await;
            dispatcher.handle_packet(packet(PacketType::Command, &[0x07])).await;
            // Empty command and too short config
            dispatcher.handle_packet(packet(PacketType::Command, &[])).await;
            dispatcher.handle_packet(packet(PacketType::ConfigData, &[0x01])).await;
            dispatcher.handle_packet(packet(PacketType::ConfigData, &[0x02, 0xAB])).await;
            // Device to host types are not handled
            dispatcher.handle_packet(packet(PacketType::KeyEvent, &[0x01, 0x00])).await;
        });

        let handler = handler.borrow();
        assert_eq!(handler.commands, vec![(0x03, vec![0x00, 0x14]), (0x07, vec![])]);
        assert_eq!(handler.configs, vec![(0x02, vec![0xAB])]);
    }

    #[test]
    fn characteristic_writes_use_the_same_framing() {
        let handler = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &handler, DeviceInfo::default());
        block_on(async {
            dispatcher.handle_characteristic_write(Characteristic::Command, &[0x06]).await;
            dispatcher.handle_characteristic_write(Characteristic::Config, &[0x03, 0x00, 0x0A]).await;
            dispatcher.handle_characteristic_write(Characteristic::KeyEvent, &[0x01, 0x02]).await;
        });
        let handler = handler.borrow();
        assert_eq!(handler.commands, vec![(0x06, vec![])]);
        assert_eq!(handler.configs, vec![(0x03, vec![0x00, 0x0A])]);
    }

    #[test]
    fn replaced_handler_receives_commands() {
        let first = RefCell::new(Handler::default());
        let second = RefCell::new(Handler::default());
        let mut dispatcher = Dispatcher::new(Recorder::default(), &first, DeviceInfo::default());
        block_on(dispatcher.handle_command(&[0x06]));
        dispatcher.set_handler(&second);
        block_on(dispatcher.handle_command(&[0x07]));
        assert_eq!(first.borrow().commands, vec![(0x06, vec![])]);
        assert_eq!(second.borrow().commands, vec![(0x07, vec![])]);
    }
}
