//! Client half of the crate: what a front end needs to hold a session and call
//! the API with it.

pub mod api;
pub mod latest;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use latest::{LatestOnly, Ticket};
pub use session::{
    Credential, FileSessionStorage, MemorySessionStorage, SessionInvalidated, SessionManager,
    SessionState, SessionStorage, StorageError, StoredSession, SubscriptionId,
};
