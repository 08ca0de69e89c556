//! Application layer services implementing business logic.
//!
//! Services consume repository traits and provide a clean API for HTTP
//! handlers.
//!
//! - [`services::link_service::LinkService`] - Shortening, lookup and redirect recording

pub mod services;
