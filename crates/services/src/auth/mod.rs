//! Auth sub-client: the only writer of the shared session.

pub mod client;
pub mod domain;

pub use client::{AuthClient, DEFAULT_REFRESH_INTERVAL};
