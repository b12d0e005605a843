//! Input hygiene for candle series supplied by market-data collaborators.

pub mod canonicalize;

pub use canonicalize::{canonicalize, is_strictly_increasing, CanonicalCandles};
