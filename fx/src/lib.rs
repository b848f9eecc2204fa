//! ratesync Conversion Engine
//!
//! Pure, I/O-free functions for converting amounts between currencies via
//! the base currency, and for rendering amounts and rates for display.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratesync_fx::{convert, format_amount, NumberLocale};
//!
//! let rub = convert(10.0, &usd, &rub_rate);
//! let text = format_amount(rub, &rub_rate.code, NumberLocale::Ru);
//! ```

pub mod conversion;
pub mod format;
pub mod error;

pub use conversion::{convert, convert_units, cross_rate};
pub use format::{format_amount, format_rate, NumberLocale};
pub use error::{FxError, FxResult};
