//! pomobar-core - Shared functionality for the pomobar timer
//!
//! Standard paths, the JSON configuration file, and the small formatting
//! helpers used by every front end.

pub mod config;
pub mod format;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
