//! Command implementations

pub mod recover;
pub mod run;

pub use recover::RecoverArgs;
pub use run::RunArgs;
