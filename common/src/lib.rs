//! ratesync Common Types
//!
//! This crate contains the types shared by every ratesync component:
//! currency identifiers, the persisted rate record, the user's currency
//! selection, telemetry events and the sync error taxonomy.

pub mod identifiers;
pub mod rate;
pub mod selection;
pub mod telemetry;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use rate::*;
pub use selection::*;
pub use telemetry::*;
pub use error::*;
pub use time::*;
