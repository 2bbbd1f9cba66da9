//! Quadrature rotary encoder with a debounced push-button
//!
//! The encoder is split in two halves:
//! - [`QuadratureDecoder`] accumulates the raw position. It is updated from the pin edge
//!   context (an interrupt handler or [`run_quadrature_monitor`]) and only holds atomics.
//! - [`RotaryEncoder`] is polled from the main loop. It turns position deltas into whole
//!   steps according to the sensitivity and debounces the push-button.
use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use embassy_futures::select::select;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;
use macropad_types::protocol::Direction;

use crate::debounce::DebouncedInput;
use crate::event::EncoderEvent;

/// Position delta of every `(previous_code << 2) | current_code` transition.
///
/// Codes are `(a << 1) | b`. Illegal or no-op transitions, including a double step caused by a
/// missed edge, contribute 0.
const TRANSITION_TABLE: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

fn quadrature_code(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

/// Signal-side state of the encoder.
///
/// There must be a single writer calling [`QuadratureDecoder::on_phase_change`]. Readers may
/// run anywhere, a position read is a single atomic load.
pub struct QuadratureDecoder {
    position: AtomicI32,
    last_code: AtomicU8,
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        Self {
            position: AtomicI32::new(0),
            last_code: AtomicU8::new(0),
        }
    }

    /// Record the current phase levels without moving
    pub fn init(&self, a: bool, b: bool) {
        self.last_code.store(quadrature_code(a, b), Ordering::Relaxed);
    }

    /// Handle a level change on either phase line
    pub fn on_phase_change(&self, a: bool, b: bool) {
        let code = quadrature_code(a, b);
        let last = self.last_code.load(Ordering::Relaxed);
        let delta = TRANSITION_TABLE[((last << 2) | code) as usize & 0x0F];
        if delta != 0 {
            let position = self.position.load(Ordering::Relaxed);
            self.position
                .store(position.wrapping_add(delta as i32), Ordering::Release);
        }
        self.last_code.store(code, Ordering::Relaxed);
    }

    /// Accumulated raw position
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }
}

/// Watch both phase pins and feed every edge into `decoder`.
///
/// Spawn this in its own task, ideally on a higher priority executor than the main loop.
pub async fn run_quadrature_monitor<A: InputPin + Wait, B: InputPin + Wait>(
    decoder: &QuadratureDecoder,
    mut pin_a: A,
    mut pin_b: B,
) -> ! {
    decoder.init(pin_a.is_high().unwrap_or(false), pin_b.is_high().unwrap_or(false));
    loop {
        select(pin_a.wait_for_any_edge(), pin_b.wait_for_any_edge()).await;
        let (Ok(a), Ok(b)) = (pin_a.is_high(), pin_b.is_high()) else {
            continue;
        };
        decoder.on_phase_change(a, b);
    }
}

/// Whole steps reported by one poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rotation {
    pub direction: Direction,
    pub steps: u8,
}

/// Turns the raw position into steps of `sensitivity` transitions.
///
/// Only whole steps advance the reported position, the remainder carries over to the next poll.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepReporter {
    reported: i32,
    sensitivity: u8,
}

impl StepReporter {
    pub fn new(sensitivity: u8) -> Self {
        Self {
            reported: 0,
            sensitivity: sensitivity.max(1),
        }
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    /// Set the number of transitions per step, clamped to at least 1
    pub fn set_sensitivity(&mut self, sensitivity: u8) {
        self.sensitivity = sensitivity.max(1);
    }

    /// Position already reported as steps
    pub fn reported_position(&self) -> i32 {
        self.reported
    }

    /// Compare `position` against the reported position, emitting the whole steps in between.
    ///
    /// A single report is capped at `u8::MAX` steps, what is left is reported on the next call.
    pub fn update(&mut self, position: i32) -> Option<Rotation> {
        let diff = position.wrapping_sub(self.reported);
        let sensitivity = self.sensitivity as u32;
        let magnitude = diff.unsigned_abs();
        if magnitude < sensitivity {
            return None;
        }

        let steps = (magnitude / sensitivity).min(u8::MAX as u32);
        let direction = if diff > 0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        let advance = (steps * sensitivity) as i32;
        self.reported = self.reported.wrapping_add(direction.signum() * advance);

        Some(Rotation {
            direction,
            steps: steps as u8,
        })
    }
}

/// Poll-side half of the encoder: step reporting plus the push-button.
pub struct RotaryEncoder<'a, Btn: InputPin> {
    decoder: &'a QuadratureDecoder,
    reporter: StepReporter,
    /// Active-low push-button
    button_pin: Btn,
    button: DebouncedInput,
}

impl<'a, Btn: InputPin> RotaryEncoder<'a, Btn> {
    pub fn new(decoder: &'a QuadratureDecoder, button_pin: Btn, sensitivity: u8, debounce: Duration) -> Self {
        Self {
            decoder,
            reporter: StepReporter::new(sensitivity),
            button_pin,
            button: DebouncedInput::new(debounce),
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: u8) {
        self.reporter.set_sensitivity(sensitivity);
    }

    pub fn sensitivity(&self) -> u8 {
        self.reporter.sensitivity()
    }

    /// Change the debounce time of the push-button
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.button.set_interval(debounce);
    }

    /// Raw accumulated position
    pub fn position(&self) -> i32 {
        self.decoder.position()
    }

    pub fn is_button_pressed(&self) -> bool {
        self.button.is_active()
    }

    /// Poll rotation and the push-button once. Rotation comes first when both happen.
    pub fn update(&mut self, now: Instant) -> (Option<EncoderEvent>, Option<EncoderEvent>) {
        let rotation = self
            .reporter
            .update(self.decoder.position())
            .map(|Rotation { direction, steps }| EncoderEvent::Rotate { direction, steps });

        let level = self.button_pin.is_low().unwrap_or(false);
        let button = self
            .button
            .sample(level, now)
            .map(|pressed| EncoderEvent::Button { pressed });

        (rotation, button)
    }
}
