mod config;
mod constants;
mod error;
mod stats;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use stats::*;
