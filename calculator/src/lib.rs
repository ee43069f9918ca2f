//! Kurs Calculator
//!
//! Four-function calculator whose display value feeds currency conversion.
//!
//! The display is kept as a string so partial entries like `"12."` survive
//! between key presses; arithmetic happens on `f64` and results are rendered
//! back with up to ten fraction digits.

pub mod key;
pub mod operation;
pub mod state;

pub use key::Key;
pub use operation::Operation;
pub use state::CalculatorState;
