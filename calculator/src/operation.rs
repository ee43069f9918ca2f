//! Calculator operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An arithmetic operation awaiting its second operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    None,
    Add,
    Subtract,
    Multiply,
    Divide,
    Percent,
}

impl Operation {
    /// Symbol shown in the history line.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::None => "",
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "×",
            Operation::Divide => "÷",
            Operation::Percent => "%",
        }
    }

    /// Apply the operation to `a` and `b`. Never fails: division by zero
    /// yields 0.
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b != 0.0 {
                    a / b
                } else {
                    0.0
                }
            }
            Operation::Percent => a * (b / 100.0),
            Operation::None => b,
        }
    }

    /// Parse a keypad or keyboard symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operation::Add),
            '-' | '−' => Some(Operation::Subtract),
            '*' | '×' | 'x' => Some(Operation::Multiply),
            '/' | '÷' => Some(Operation::Divide),
            '%' => Some(Operation::Percent),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(Operation::Add.apply(3.0, 5.0), 8.0);
        assert_eq!(Operation::Subtract.apply(3.0, 5.0), -2.0);
        assert_eq!(Operation::Multiply.apply(3.0, 5.0), 15.0);
        assert_eq!(Operation::Divide.apply(10.0, 4.0), 2.5);
        assert_eq!(Operation::Percent.apply(200.0, 15.0), 30.0);
        assert_eq!(Operation::None.apply(3.0, 5.0), 5.0);
    }

    #[test]
    fn test_divide_by_zero_yields_zero() {
        assert_eq!(Operation::Divide.apply(10.0, 0.0), 0.0);
        assert_eq!(Operation::Divide.apply(-10.0, -0.0), 0.0);
    }

    #[test]
    fn test_from_symbol() {
        assert_eq!(Operation::from_symbol('×'), Some(Operation::Multiply));
        assert_eq!(Operation::from_symbol('/'), Some(Operation::Divide));
        assert_eq!(Operation::from_symbol('='), None);
    }
}
