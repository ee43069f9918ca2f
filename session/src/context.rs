//! Selected currency pair.

use kurs_common::{Currency, KursResult};
use serde::Serialize;
use tracing::debug;

/// The pair the calculator display is converted between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionContext {
    from: &'static Currency,
    to: &'static Currency,
}

impl ConversionContext {
    /// Create a context for two catalog codes.
    pub fn new(from: &str, to: &str) -> KursResult<Self> {
        Ok(Self {
            from: Currency::find(from)?,
            to: Currency::find(to)?,
        })
    }

    pub fn from(&self) -> &'static Currency {
        self.from
    }

    pub fn to(&self) -> &'static Currency {
        self.to
    }

    /// Select the source currency.
    pub fn select_from(&mut self, code: &str) -> KursResult<()> {
        self.from = Currency::find(code)?;
        debug!(from = %self.from, "Selected source currency");
        Ok(())
    }

    /// Select the target currency.
    pub fn select_to(&mut self, code: &str) -> KursResult<()> {
        self.to = Currency::find(code)?;
        debug!(to = %self.to, "Selected target currency");
        Ok(())
    }

    /// Exchange source and target.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self {
            from: Currency::usd(),
            to: Currency::rub(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pair() {
        let context = ConversionContext::default();
        assert_eq!(context.from().code(), "USD");
        assert_eq!(context.to().code(), "RUB");
    }

    #[test]
    fn test_select_and_swap() {
        let mut context = ConversionContext::default();
        context.select_from("eur").unwrap();
        context.select_to("TRY").unwrap();
        context.swap();

        assert_eq!(context.from().code(), "TRY");
        assert_eq!(context.to().code(), "EUR");
    }

    #[test]
    fn test_unknown_code_keeps_selection() {
        let mut context = ConversionContext::default();
        let err = context.select_to("XYZ").unwrap_err();

        assert_eq!(err.error_code(), "UNKNOWN_CURRENCY");
        assert_eq!(context.to().code(), "RUB");
    }
}
