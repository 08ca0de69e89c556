//! Domain layer containing business entities and repository contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`redirect_event`] - Live analytics event emitted after each redirect
//!
//! # Redirect Flow
//!
//! 1. HTTP handler receives a redirect request
//! 2. [`repositories::LinkRepository::increment_redirects`] atomically bumps the counter
//! 3. A [`redirect_event::RedirectEvent`] is built from the updated [`entities::Link`]
//! 4. The event is fanned out to live viewers by [`crate::live::Broadcaster`]

pub mod entities;
pub mod redirect_event;
pub mod repositories;
