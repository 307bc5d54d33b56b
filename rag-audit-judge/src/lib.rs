//! Judge client for scoring conversation turns with an external LLM.
//!
//! One composite prompt yields all three quality dimensions. Transport
//! failures are classified and driven through a resilience policy: rate
//! limits back off and retry on the same model, an unavailable or missing
//! model switches to the fallback, malformed replies get a bounded number of
//! retries and anything unrecognised fails the record without retry.

pub mod client;
pub mod error;
pub mod policy;
pub mod prompt;
pub mod response;
pub mod service;

pub use client::*;
pub use error::*;
pub use policy::*;
pub use prompt::*;
pub use response::*;
pub use service::*;
