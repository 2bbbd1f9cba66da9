#![allow(dead_code)]

use core::cell::RefCell;
use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;
use std::collections::VecDeque;
use std::rc::Rc;

use critical_section as _;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal_async::digital::Wait;
use embedded_io_async::{ErrorType, Read, ReadReady, Write};
use macropad::protocol::PacketParser;
use macropad::transport::{Characteristic, GattChannel, TransportError};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Electrical state of a simulated key matrix
pub struct MatrixState<const ROW: usize, const COL: usize> {
    /// Row lines driven low
    rows_low: [bool; ROW],
    /// Physically closed switches
    pressed: [[bool; COL]; ROW],
}

pub type SharedMatrix<const ROW: usize, const COL: usize> = Rc<RefCell<MatrixState<ROW, COL>>>;

pub fn new_matrix<const ROW: usize, const COL: usize>() -> SharedMatrix<ROW, COL> {
    Rc::new(RefCell::new(MatrixState {
        rows_low: [false; ROW],
        pressed: [[false; COL]; ROW],
    }))
}

pub fn set_key<const ROW: usize, const COL: usize>(matrix: &SharedMatrix<ROW, COL>, row: usize, col: usize, pressed: bool) {
    matrix.borrow_mut().pressed[row][col] = pressed;
}

pub struct RowPin<const ROW: usize, const COL: usize> {
    matrix: SharedMatrix<ROW, COL>,
    row: usize,
}

impl<const ROW: usize, const COL: usize> PinErrorType for RowPin<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> OutputPin for RowPin<ROW, COL> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.matrix.borrow_mut().rows_low[self.row] = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.matrix.borrow_mut().rows_low[self.row] = false;
        Ok(())
    }
}

/// Pulled-up column, low when a closed switch connects it to an active row
pub struct ColPin<const ROW: usize, const COL: usize> {
    matrix: SharedMatrix<ROW, COL>,
    col: usize,
}

impl<const ROW: usize, const COL: usize> PinErrorType for ColPin<ROW, COL> {
    type Error = Infallible;
}

impl<const ROW: usize, const COL: usize> InputPin for ColPin<ROW, COL> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let state = self.matrix.borrow();
        Ok((0..ROW).any(|row| state.rows_low[row] && state.pressed[row][self.col]))
    }
}

pub fn matrix_pins<const ROW: usize, const COL: usize>(
    matrix: &SharedMatrix<ROW, COL>,
) -> ([RowPin<ROW, COL>; ROW], [ColPin<ROW, COL>; COL]) {
    (
        core::array::from_fn(|row| RowPin {
            matrix: matrix.clone(),
            row,
        }),
        core::array::from_fn(|col| ColPin {
            matrix: matrix.clone(),
            col,
        }),
    )
}

/// Active-low push-button
#[derive(Clone, Default)]
pub struct ButtonPin {
    pub pressed: Rc<RefCell<bool>>,
}

impl ButtonPin {
    pub fn set(&self, pressed: bool) {
        *self.pressed.borrow_mut() = pressed;
    }
}

impl PinErrorType for ButtonPin {
    type Error = Infallible;
}

impl InputPin for ButtonPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!*self.pressed.borrow())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(*self.pressed.borrow())
    }
}

/// Both lines of a simulated quadrature encoder
#[derive(Default)]
pub struct PhaseLines {
    /// Current `(a, b)` levels
    levels: (bool, bool),
    /// Levels applied one per edge, in order
    pending: VecDeque<(bool, bool)>,
}

pub type SharedPhaseLines = Rc<RefCell<PhaseLines>>;

/// Queue level changes, each one is delivered as an edge on the encoder pins
pub fn push_phases(lines: &SharedPhaseLines, phases: &[(bool, bool)]) {
    lines.borrow_mut().pending.extend(phases.iter().copied());
}

/// True once every queued level change was delivered
pub fn phases_drained(lines: &SharedPhaseLines) -> bool {
    lines.borrow().pending.is_empty()
}

/// One phase line of the simulated encoder.
///
/// Waiting for an edge on either pin moves both lines to the next queued levels. With nothing
/// queued the wait stays pending.
pub struct PhasePin {
    lines: SharedPhaseLines,
    is_b: bool,
}

pub fn phase_pins(initial: (bool, bool)) -> (SharedPhaseLines, PhasePin, PhasePin) {
    let lines = Rc::new(RefCell::new(PhaseLines {
        levels: initial,
        pending: VecDeque::new(),
    }));
    let a = PhasePin {
        lines: lines.clone(),
        is_b: false,
    };
    let b = PhasePin {
        lines: lines.clone(),
        is_b: true,
    };
    (lines, a, b)
}

impl PhasePin {
    async fn next_edge(&mut self) -> Result<(), Infallible> {
        poll_fn(|_cx| {
            let mut lines = self.lines.borrow_mut();
            match lines.pending.pop_front() {
                Some(levels) => {
                    lines.levels = levels;
                    Poll::Ready(Ok(()))
                }
                None => Poll::Pending,
            }
        })
        .await
    }
}

impl PinErrorType for PhasePin {
    type Error = Infallible;
}

impl InputPin for PhasePin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let (a, b) = self.lines.borrow().levels;
        Ok(if self.is_b { b } else { a })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl Wait for PhasePin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.next_edge().await
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.next_edge().await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.next_edge().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.next_edge().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        self.next_edge().await
    }
}

/// Serial RX side, bytes pushed by the test are readable immediately
#[derive(Clone, Default)]
pub struct MockSerialReader {
    pub input: Rc<RefCell<VecDeque<u8>>>,
}

impl MockSerialReader {
    pub fn push(&self, bytes: &[u8]) {
        self.input.borrow_mut().extend(bytes.iter().copied());
    }
}

impl ErrorType for MockSerialReader {
    type Error = Infallible;
}

impl Read for MockSerialReader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut input = self.input.borrow_mut();
        let n = buf.len().min(input.len());
        for slot in buf.iter_mut().take(n) {
            if let Some(b) = input.pop_front() {
                *slot = b;
            }
        }
        Ok(n)
    }
}

impl ReadReady for MockSerialReader {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.borrow().is_empty())
    }
}

/// Serial TX side, collects everything written
#[derive(Clone, Default)]
pub struct MockSerialWriter {
    pub output: Rc<RefCell<Vec<u8>>>,
}

impl MockSerialWriter {
    /// Decode and drain the frames written so far
    pub fn take_frames(&self) -> Vec<(u8, Vec<u8>)> {
        let bytes: Vec<u8> = self.output.borrow_mut().drain(..).collect();
        decode_frames(&bytes)
    }
}

impl ErrorType for MockSerialWriter {
    type Error = Infallible;
}

impl Write for MockSerialWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub fn decode_frames(bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut parser: PacketParser = PacketParser::new();
    let mut frames = Vec::new();
    for b in bytes {
        if let Some(packet) = parser.feed(*b) {
            frames.push((packet.packet_type, packet.payload.to_vec()));
        }
    }
    frames
}

/// GATT server that records every value update
#[derive(Default)]
pub struct RecordingGatt {
    pub connected: bool,
    pub values: Vec<(Characteristic, Vec<u8>)>,
    pub notifications: Vec<(Characteristic, Vec<u8>)>,
}

impl GattChannel for RecordingGatt {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn set_value(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), TransportError> {
        self.values.push((characteristic, value.to_vec()));
        Ok(())
    }

    async fn notify(&mut self, characteristic: Characteristic, value: &[u8]) -> Result<(), TransportError> {
        self.notifications.push((characteristic, value.to_vec()));
        Ok(())
    }
}
