//! Data models for the DNA Center API.
//!
//! This module contains the wire records returned by DNA Center and the
//! normalized records derived from them.

// Export submodules
pub mod api_response;
pub mod auth;
pub mod device;
pub mod site;
pub mod topology;

pub use api_response::ApiResponse;
