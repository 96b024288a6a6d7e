//! Client for the Zuko sessions egress API.
//!
//! Follows the `next_page_id` cursor until the server stops returning one.

mod client;
pub mod error;
mod wire_types;


pub use client::{SessionSource, SessionsClient, truncate};
pub use error::UpstreamError;
pub use wire_types::SessionPage;
