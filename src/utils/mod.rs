//! Shared utilities.
//!
//! - [`app_data`] - Configuration and the app data directory
//! - [`text`] - Title normalization

pub mod app_data;
pub mod text;

pub use app_data::*;
pub use text::*;
