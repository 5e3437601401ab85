//! Unified backend client.
//!
//! `ServiceLocator` owns one addressing strategy, one shared session and one
//! shared transport, and hands out lazily-built auth, storage and functions
//! sub-clients wired to them.

pub mod addressing;
pub mod errors;
pub mod handle;
pub mod locator;
pub mod options;
pub mod resolver;

pub use addressing::{AddressingStrategy, ServiceUrls, SubdomainAddress};
pub use common::types::ServiceKind;
pub use errors::{ConfigurationError, LocatorError, ServiceConstructionError};
pub use handle::{HandleStatus, ServiceHandle};
pub use locator::ServiceLocator;
pub use options::{LocatorConfig, LocatorOptions};
pub use resolver::resolve_endpoint;
