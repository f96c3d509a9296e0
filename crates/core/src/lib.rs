pub mod config;
pub mod detection;
pub mod error;
pub mod level;
pub mod result;

pub use config::Config;
pub use detection::*;
pub use error::*;
pub use level::*;
pub use result::*;
