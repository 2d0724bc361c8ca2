//! Client SDK for the storefront API.
//!
//! Three pieces cooperate to keep a signed-in session:
//!
//! - [`CredentialStore`]: durable storage for the single bearer token.
//! - [`Api`]: HTTP client whose outgoing requests are decorated with
//!   `Authorization: Bearer <token>` whenever the store holds one.
//! - [`Session`]: the in-memory identity, kept in lockstep with the store
//!   by `login`/`logout`.
//!
//! A 401 from the server clears the stored token automatically, so the next
//! request goes out unauthenticated and the UI can prompt for a re-login.

mod api;
mod credentials;
mod session;
pub mod types;

pub use self::api::{Api, ClientError};
pub use self::credentials::{CredentialStore, FileStore, MemoryStore, StoreError};
pub use self::session::{Identity, Session};
