//! Keypad input.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;
use crate::state::CalculatorState;

/// A key on the calculator keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Digit(char),
    Decimal,
    Operator(Operation),
    Equals,
    Clear,
    Backspace,
}

impl Key {
    /// Map a keyboard character to a key.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Key::Digit(c)),
            '.' | ',' => Some(Key::Decimal),
            '=' | '\n' | '\r' => Some(Key::Equals),
            'c' | 'C' | '\u{1b}' => Some(Key::Clear),
            '\u{8}' | '\u{7f}' => Some(Key::Backspace),
            other => Operation::from_symbol(other).map(Key::Operator),
        }
    }
}

impl CalculatorState {
    /// Dispatch a key press.
    pub fn press(&mut self, key: Key) {
        match key {
            Key::Digit(digit) => self.append_digit(digit),
            Key::Decimal => self.append_decimal(),
            Key::Operator(operation) => self.perform_operator(operation),
            Key::Equals => self.perform_equals(),
            Key::Clear => self.clear(),
            Key::Backspace => self.delete_last_digit(),
        }
    }
}
