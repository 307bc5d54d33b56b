pub mod calculators;
pub mod aggregators;

pub use calculators::*;
pub use aggregators::*;
