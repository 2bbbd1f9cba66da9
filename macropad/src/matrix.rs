use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::debounce::DebouncedInput;
use crate::event::KeyEvent;

/// Largest matrix the scanner supports, bounded by the width of [`KeyMatrix::pressed_mask`]
pub const MAX_MATRIX_KEYS: usize = 32;

/// Events accepted during a single scan pass, in row-major order
pub type ScanEvents = Vec<KeyEvent, MAX_MATRIX_KEYS>;

/// Matrix is the physical pcb layout of the key matrix.
///
/// Rows are outputs driven low one at a time, the rest are held high. Columns are pulled-up
/// inputs, a pressed key pulls its column low while its row is active.
pub struct KeyMatrix<In: InputPin, Out: OutputPin, D: DelayNs, const ROW: usize, const COL: usize> {
    /// Row output pins
    row_pins: [Out; ROW],
    /// Column input pins
    col_pins: [In; COL],
    /// Busy-wait delay for the row settle time
    delay: D,
    /// Settle time after activating a row, in microseconds
    settle_us: u32,
    /// Debounce state of every key, `[row][col]`
    keys: [[DebouncedInput; COL]; ROW],
}

impl<In: InputPin, Out: OutputPin, D: DelayNs, const ROW: usize, const COL: usize> KeyMatrix<In, Out, D, ROW, COL> {
    /// Create a matrix from row and column pins. All rows start inactive.
    pub fn new(
        mut row_pins: [Out; ROW],
        col_pins: [In; COL],
        delay: D,
        debounce: Duration,
        settle_us: u32,
    ) -> Self {
        const { assert!(ROW * COL <= MAX_MATRIX_KEYS, "key matrix too large") };
        for pin in row_pins.iter_mut() {
            pin.set_high().ok();
        }
        Self {
            row_pins,
            col_pins,
            delay,
            settle_us,
            keys: [[DebouncedInput::new(debounce); COL]; ROW],
        }
    }

    /// Scan every key once.
    ///
    /// Rows go in order `0..ROW` and columns in order `0..COL`, so the returned events are
    /// sorted by key index.
    pub fn scan(&mut self, now: Instant) -> ScanEvents {
        let mut events = ScanEvents::new();
        for (row, row_pin) in self.row_pins.iter_mut().enumerate() {
            row_pin.set_low().ok();
            self.delay.delay_us(self.settle_us);

            for (col, col_pin) in self.col_pins.iter_mut().enumerate() {
                // A failed read counts as released
                let level = col_pin.is_low().unwrap_or(false);
                if let Some(pressed) = self.keys[row][col].sample(level, now) {
                    let event = KeyEvent {
                        index: (row * COL + col) as u8,
                        pressed,
                    };
                    trace!("Key {} {}", event.index, if pressed { "pressed" } else { "released" });
                    // Capacity is checked in `new`
                    let _ = events.push(event);
                }
            }

            row_pin.set_high().ok();
        }
        events
    }

    /// Change the debounce time of every key
    pub fn set_debounce(&mut self, debounce: Duration) {
        for key in self.keys.iter_mut().flatten() {
            key.set_interval(debounce);
        }
    }

    /// Debounced state of the key at `index`, false when out of range
    pub fn is_pressed(&self, index: usize) -> bool {
        if index >= ROW * COL {
            return false;
        }
        self.keys[index / COL][index % COL].is_active()
    }

    /// Bit `i` is set when key `i` is pressed
    pub fn pressed_mask(&self) -> u32 {
        self.keys
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, key)| key.is_active())
            .fold(0, |mask, (index, _)| mask | (1 << index))
    }
}
