//! Application plumbing shared by the library and the binary
//!
//! - [`config`] - JSON configuration with defaults and a per-user location
//! - [`error`] - [`CoreError`] and [`CoreResult`]

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
