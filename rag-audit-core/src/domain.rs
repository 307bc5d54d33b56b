pub mod record;
pub mod turn;
pub mod metrics;
pub mod scores;
pub mod report;
pub mod config;

pub use record::*;
pub use turn::*;
pub use metrics::*;
pub use scores::*;
pub use report::*;
pub use config::*;
