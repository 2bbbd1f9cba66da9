//! Input events produced by the matrix and the encoder

use macropad_types::protocol::Direction;

/// A debounced key transition, `index = row * COL + col`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub index: u8,
    pub pressed: bool,
}

/// Events from the rotary encoder and its push-button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderEvent {
    /// `steps` whole detents in `direction`, never zero
    Rotate { direction: Direction, steps: u8 },
    /// Debounced push-button transition
    Button { pressed: bool },
}
