pub mod error;
pub mod io;
pub mod pipeline;

pub use error::*;
pub use io::*;
pub use pipeline::*;
