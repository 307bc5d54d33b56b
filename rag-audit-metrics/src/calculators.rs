pub mod cost;
pub mod latency;
pub mod performance;

pub use cost::*;
pub use latency::*;
pub use performance::*;
