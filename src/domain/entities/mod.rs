//! Core domain entities.
//!
//! - [`Link`] - A shortened URL mapping with its redirect counter
//! - [`NewLink`] - Input for creating a link

pub mod link;

pub use link::{Link, NewLink};
