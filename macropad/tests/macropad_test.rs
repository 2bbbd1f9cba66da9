pub mod common;

use core::cell::RefCell;

use embassy_futures::block_on;
use embassy_time::Instant;
use embedded_hal_mock::eh1::delay::NoopDelay;
use macropad::MacroPad;
use macropad::channel::{BATTERY_LEVEL, WIRELESS_WRITE_CHANNEL};
use macropad::config::MacroPadConfig;
use macropad::config_store::MemoryConfigStore;
use macropad::dispatcher::Dispatcher;
use macropad::encoder::{QuadratureDecoder, RotaryEncoder};
use macropad::host::ConfigCommandHandler;
use macropad::matrix::KeyMatrix;
use macropad::protocol::encode;
use macropad::transport::{Characteristic, SerialBridge, WirelessTransport, WirelessWrite};

use crate::common::{ButtonPin, MockSerialReader, MockSerialWriter, RecordingGatt, matrix_pins, new_matrix, set_key};

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn frame(packet_type: u8, payload: &[u8]) -> Vec<u8> {
    encode(packet_type, payload).unwrap().to_vec()
}

#[test]
fn test_polling_loop_end_to_end() {
    let config = MacroPadConfig::default();
    let decoder = QuadratureDecoder::new();
    decoder.init(false, false);
    let handler = RefCell::new(ConfigCommandHandler::new(MemoryConfigStore::new()));

    let state = new_matrix::<2, 5>();
    let (rows, cols) = matrix_pins(&state);
    let matrix = KeyMatrix::new(rows, cols, NoopDelay::new(), config.debounce, config.row_settle_us);
    let button = ButtonPin::default();
    let encoder = RotaryEncoder::new(&decoder, button.clone(), config.encoder_sensitivity, config.debounce);
    let reader = MockSerialReader::default();
    let writer = MockSerialWriter::default();
    let serial = SerialBridge::new(reader.clone(), writer.clone(), &handler, config.device_info);
    let gatt = RecordingGatt {
        connected: true,
        ..Default::default()
    };
    let wireless = Dispatcher::new(
        WirelessTransport::new(gatt, &config.device_info),
        &handler,
        config.device_info,
    );
    let mut pad = MacroPad::new(matrix, encoder, serial, wireless, &config);
    pad.apply_settings(handler.borrow().live_settings());

    // Handshake and a key press in the same iteration
    reader.push(&frame(0x07, &[0x4D, 0x50, 0x44]));
    set_key(&state, 1, 2, true);
    block_on(pad.poll_once(at(0)));
    assert_eq!(
        writer.take_frames(),
        vec![(0x08, vec![0x4D, 0x50, 0x44]), (0x05, vec![1, 0, 0, 2, 5, 1, 0])]
    );

    // Debounced key press goes to both links
    block_on(pad.poll_once(at(25)));
    assert_eq!(writer.take_frames(), vec![(0x01, vec![0x01, 7])]);
    assert!(pad.matrix().is_pressed(7));

    // Four clockwise transitions at sensitivity 2
    for (a, b) in [(true, false), (true, true), (false, true), (false, false)] {
        decoder.on_phase_change(a, b);
    }
    block_on(pad.poll_once(at(30)));
    assert_eq!(writer.take_frames(), vec![(0x02, vec![0x10, 0x01, 2])]);

    // Encoder push-button
    button.set(true);
    block_on(pad.poll_once(at(40)));
    block_on(pad.poll_once(at(60)));
    assert_eq!(writer.take_frames(), vec![(0x02, vec![0x11, 0x00, 0x00])]);
    assert!(pad.encoder().is_button_pressed());

    // Battery level from the sampler
    BATTERY_LEVEL.signal(77);
    block_on(pad.poll_once(at(61)));
    assert_eq!(writer.take_frames(), vec![(0x04, vec![77])]);

    // Sensitivity change written over the wireless link
    let write = WirelessWrite::new(Characteristic::Command, &[0x04, 0x01]).unwrap();
    WIRELESS_WRITE_CHANNEL.try_send(write).unwrap();
    block_on(pad.poll_once(at(62)));
    assert_eq!(pad.encoder().sensitivity(), 1);
    assert_eq!(handler.borrow().config().encoder_sensitivity, 1);

    // Debounce change over serial applies to the next release
    reader.push(&frame(0x06, &[0x03, 0x00, 0x05]));
    set_key(&state, 1, 2, false);
    block_on(pad.poll_once(at(100)));
    assert!(writer.take_frames().is_empty());
    block_on(pad.poll_once(at(105)));
    assert_eq!(writer.take_frames(), vec![(0x01, vec![0x02, 7])]);

    let notifications = &pad.wireless().transport().gatt().notifications;
    assert_eq!(
        notifications,
        &vec![
            (Characteristic::KeyEvent, vec![0x01, 7]),
            (Characteristic::EncoderEvent, vec![0x10, 0x01, 2]),
            (Characteristic::EncoderEvent, vec![0x11, 0x00, 0x00]),
            (Characteristic::Battery, vec![77]),
            (Characteristic::BatteryLevel, vec![77]),
            (Characteristic::KeyEvent, vec![0x02, 7]),
        ]
    );
}
