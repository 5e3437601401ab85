//! Service sub-clients and the shared resources they are built from.
//! - `session`: shared authentication state and its credential store.
//! - `transport`: the single HTTP client reused by every sub-client.
//! - `auth`, `storage`, `functions`: thin protocol clients over the transport.

pub mod errors;
pub mod session;
pub mod transport;
pub mod auth;
pub mod storage;
pub mod functions;

pub use auth::AuthClient;
pub use errors::ServiceError;
pub use functions::FunctionsClient;
pub use session::{CredentialStore, MemoryCredentialStore, Session, SessionData, SessionReader, SharedSession};
pub use storage::StorageClient;
pub use transport::{SharedTransport, Transport, TransportConfig};
