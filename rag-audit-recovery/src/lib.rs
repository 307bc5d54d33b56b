//! Best-effort recovery of conversation turns from logged records.
//!
//! Records are first parsed strictly as JSON. Anything that fails that path
//! is handed to a set of independent per-field extractors that search the
//! raw text for labelled values, so one corrupted field never blocks the
//! others.

pub mod engine;
pub mod extractors;
pub mod strict;
pub mod values;

pub use engine::*;
pub use extractors::*;
pub use strict::*;
pub use values::synthesize_turn_id;
