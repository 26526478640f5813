//! The API of blockpool-core.

mod configuration;
mod error;
mod platform;
mod pool;

pub use configuration::{Configuration, PoolConfig, Properties};
pub use error::PoolError;
pub use platform::Platform;
pub use pool::{Pool, PoolStats};
