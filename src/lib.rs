//! # Krist
//!
//! `krist` is an e-commerce storefront split in two halves:
//!
//! - A REST API server (`krist::new`) exposing signup/signin, product
//!   browsing, cart, favorites and orders. Protected routes sit behind a
//!   bearer-token verification middleware; tokens are compact HS256 JWTs
//!   signed with a single server-held secret.
//! - A client SDK (`client`) that keeps the current token in a durable
//!   [`client::CredentialStore`], decorates outgoing requests with the
//!   `Authorization: Bearer` header, and tracks the signed-in identity.
//!
//! The server never stores issued tokens; verification is stateless and
//! per-request. The client treats an unreadable store as "logged out" and
//! lets the server reject the request.

pub mod cli;
pub mod client;
pub mod krist;
