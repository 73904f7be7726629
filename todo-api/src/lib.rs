pub mod api;
pub mod config;
pub mod global;
pub mod logging;

pub use config::{AppConfig, Cli};
pub use global::Global;
