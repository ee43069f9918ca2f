//! Calculator state machine over a decimal display string.

use kurs_common::{format_display_value, parse_decimal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::operation::Operation;

/// State of the four-function calculator.
///
/// `display_value` is always a valid partial decimal literal: never empty,
/// at most one `.`, and a leading `-` only on computed results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorState {
    display_value: String,
    pending_operator: Operation,
    stored_operand: f64,
    awaiting_new_entry: bool,
    history: String,
}

impl CalculatorState {
    /// Create a calculator showing `"0"`.
    pub fn new() -> Self {
        Self {
            display_value: "0".to_string(),
            pending_operator: Operation::None,
            stored_operand: 0.0,
            awaiting_new_entry: false,
            history: String::new(),
        }
    }

    /// Current display string.
    pub fn display_value(&self) -> &str {
        &self.display_value
    }

    /// Operation awaiting its second operand.
    pub fn pending_operator(&self) -> Operation {
        self.pending_operator
    }

    /// First operand of the pending operation.
    pub fn stored_operand(&self) -> f64 {
        self.stored_operand
    }

    /// Whether the next digit starts a new number.
    pub fn awaiting_new_entry(&self) -> bool {
        self.awaiting_new_entry
    }

    /// History line, e.g. `3 +` or `3 + 5 = 8`.
    pub fn history(&self) -> &str {
        &self.history
    }

    /// Display value as a number.
    pub fn current_value(&self) -> Option<f64> {
        parse_decimal(&self.display_value)
    }

    /// Append a digit. Anything but `0`-`9` is ignored.
    pub fn append_digit(&mut self, digit: char) {
        if !digit.is_ascii_digit() {
            debug!(%digit, "Ignoring non-digit input");
            return;
        }

        if self.awaiting_new_entry {
            self.display_value = digit.to_string();
            self.awaiting_new_entry = false;
        } else if self.display_value == "0" {
            self.display_value = digit.to_string();
        } else {
            self.display_value.push(digit);
        }
    }

    /// Append the decimal point.
    pub fn append_decimal(&mut self) {
        if self.awaiting_new_entry {
            self.display_value = "0.".to_string();
            self.awaiting_new_entry = false;
        } else if !self.display_value.contains('.') {
            self.display_value.push('.');
        }
    }

    /// Start (or chain) an operation.
    ///
    /// `Percent` acts immediately on the display. Any other operator first
    /// folds a pending operation into the stored operand.
    pub fn perform_operator(&mut self, operation: Operation) {
        let Some(current) = self.current_value() else {
            debug!(display = %self.display_value, "Display is not a number, ignoring operator");
            return;
        };

        if operation == Operation::Percent {
            self.display_value = format_display_value(current / 100.0);
            return;
        }

        if self.pending_operator != Operation::None {
            let result = self.pending_operator.apply(self.stored_operand, current);
            self.display_value = format_display_value(result);
            self.stored_operand = result;
        } else {
            self.stored_operand = current;
        }

        self.pending_operator = operation;
        self.awaiting_new_entry = true;
        self.history = format!(
            "{} {}",
            format_display_value(self.stored_operand),
            operation.symbol()
        );
    }

    /// Complete the pending operation, if any.
    pub fn perform_equals(&mut self) {
        if self.pending_operator == Operation::None {
            return;
        }

        let Some(current) = self.current_value() else {
            debug!(display = %self.display_value, "Display is not a number, ignoring equals");
            return;
        };

        let result = self.pending_operator.apply(self.stored_operand, current);
        self.history = format!(
            "{} {} {} = {}",
            format_display_value(self.stored_operand),
            self.pending_operator.symbol(),
            format_display_value(current),
            format_display_value(result)
        );
        self.display_value = format_display_value(result);
        self.pending_operator = Operation::None;
        self.awaiting_new_entry = true;
    }

    /// Drop the last character, falling back to `"0"`.
    pub fn delete_last_digit(&mut self) {
        self.display_value.pop();

        if matches!(self.display_value.as_str(), "" | "-" | "-0") {
            self.display_value = "0".to_string();
        }
    }

    /// Reset display, pending operation, stored operand and history.
    pub fn clear(&mut self) {
        self.display_value = "0".to_string();
        self.pending_operator = Operation::None;
        self.stored_operand = 0.0;
        self.history.clear();
    }
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self::new()
    }
}
