//! Application configuration and constants
//!
//! This module defines central configuration values used across the application.
//! Naming and banner strings should reference these constants rather than
//! hardcoding values.

/// The application name
pub const APP_NAME: &str = "PDC Capture";

/// The application type/category
pub const APP_TYPE: &str = "Parallel Video Capture";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Console prompt
pub const CONSOLE_PROMPT: &str = "> ";

/// Console line buffer size in bytes (including room for the terminator)
pub const CONSOLE_LINE_BYTES: usize = 256;

/// Maximum tokens parsed from one console line
pub const CONSOLE_MAX_ARGS: usize = 16;

/// Idle time after a trailing CR before the line is executed, in ms
pub const CONSOLE_CR_IDLE_MS: u32 = 50;

/// Full application title (name + type)
pub const fn app_title() -> &'static str {
    APP_NAME
}

/// Startup banner
pub const fn banner() -> &'static str {
    "PDC Capture - parallel video capture console"
}
