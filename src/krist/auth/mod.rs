pub mod jwt;

mod verify;
pub use self::verify::{require_auth, Identity, Verifier};

/// Lifetime of issued tokens, in seconds (30 days).
pub const TOKEN_EXPIRATION: i64 = 60 * 60 * 24 * 30;
