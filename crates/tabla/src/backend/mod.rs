//! Parser backends.
//!
//! Only the table-driven LR(1) backend is provided; see [`lr`].

pub mod lr;

pub use lr::{CompiledParser, LrConfig};
