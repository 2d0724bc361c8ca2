pub mod health;
pub use self::health::health;

pub mod user_signup;
pub use self::user_signup::signup;

pub mod user_signin;
pub use self::user_signin::signin;

pub mod products;
pub use self::products::{product_details, products};

pub mod cart;
pub use self::cart::{add_to_cart, get_cart, remove_from_cart};

pub mod favorite;
pub use self::favorite::{add_favorite, get_favorites, remove_favorite};

pub mod order;
pub use self::order::{get_orders, place_order};

// common functions for the handlers
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimum accepted password length for signup.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// User fields returned to clients; the password hash never leaves the
/// handlers.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Body returned by signup and signin: the issued token plus the user it
/// belongs to.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generate a per-user random salt for password hashing.
///
/// # Errors
/// Returns an error if the OS randomness source fails.
pub fn generate_salt() -> Result<[u8; 16], rand::Error> {
    let mut salt = [0u8; 16];
    OsRng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}

/// Hash a password with its salt; only the digest is stored.
pub fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("shopper@example.com"));
        assert!(valid_email("a.b+c@mail.example.org"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing@tld"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Shopper@Example.COM "), "shopper@example.com");
    }

    #[test]
    fn test_hash_password_depends_on_salt() {
        let salt_a = [1u8; 16];
        let salt_b = [2u8; 16];
        assert_eq!(
            hash_password(&salt_a, "hunter22"),
            hash_password(&salt_a, "hunter22")
        );
        assert_ne!(
            hash_password(&salt_a, "hunter22"),
            hash_password(&salt_b, "hunter22")
        );
        assert_ne!(
            hash_password(&salt_a, "hunter22"),
            hash_password(&salt_a, "hunter23")
        );
    }

    #[test]
    fn test_generate_salt_is_random() {
        let a = generate_salt().unwrap();
        let b = generate_salt().unwrap();
        assert_ne!(a, b);
    }
}
