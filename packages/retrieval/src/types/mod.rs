//! Core data types shared across the library.

pub mod chat;
pub mod section;

pub use chat::{Author, ChatEntry};
pub use section::Section;
