//! Data models and DTOs (Data Transfer Objects)
//!
//! Records map one-to-one to catalog tables, payloads carry incoming
//! changes and views shape nested responses.

pub mod catalog;
pub mod enums;
pub mod metadata;
pub mod payloads;
pub mod views;

// Re-export commonly used types
pub use catalog::*;
pub use enums::*;
pub use metadata::*;
pub use payloads::*;
pub use views::*;
