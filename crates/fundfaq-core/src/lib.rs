pub mod config;
pub mod error;
pub mod extract;
pub mod source;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
