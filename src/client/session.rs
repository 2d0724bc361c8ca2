use crate::client::credentials::{CredentialStore, StoreError};
use crate::client::types::User;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// The signed-in user as the client knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Client-side session state: the in-memory identity paired with the token
/// held in the credential store.
///
/// `login` and `logout` are the only writers of the store through this type,
/// which keeps the invariant simple: the identity always corresponds to the
/// token last written, or is absent when no token exists. Because the API
/// layer clears the store on a 401, [`Session::current`] re-checks the store
/// so a revoked token hides the stale identity as well.
pub struct Session {
    identity: Option<Identity>,
    store: Arc<dyn CredentialStore>,
}

impl Session {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            identity: None,
            store,
        }
    }

    /// Persist the token and remember the identity it belongs to.
    ///
    /// # Errors
    /// Returns an error if the token cannot be written; in that case the
    /// identity is left untouched so state and store stay consistent.
    pub fn login(&mut self, identity: Identity, token: &str) -> Result<(), StoreError> {
        self.store.set(token)?;
        self.identity = Some(identity);
        Ok(())
    }

    /// Drop the token and the identity. A store failure is logged but the
    /// in-memory identity is cleared regardless; worst case a stale token
    /// lingers on disk and the server rejects it.
    pub fn logout(&mut self) {
        if let Err(err) = self.store.clear() {
            warn!("Failed to clear credential store on logout: {err}");
        }
        self.identity = None;
    }

    /// The current identity, or `None` when logged out. Hidden whenever the
    /// store no longer holds a token, e.g. after the API layer dropped a
    /// rejected one.
    #[must_use]
    pub fn current(&self) -> Option<&Identity> {
        match self.store.get() {
            Ok(Some(_)) => self.identity.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::Api;
    use crate::client::credentials::MemoryStore;
    use crate::krist::auth::Verifier;
    use axum::http::{header::AUTHORIZATION, HeaderMap};
    use secrecy::SecretString;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn login_pairs_identity_with_stored_token() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store.clone());
        let me = identity();

        session.login(me.clone(), "tok").unwrap();

        assert_eq!(session.current(), Some(&me));
        assert!(session.is_authenticated());
        assert_eq!(store.get().unwrap(), Some("tok".to_string()));
    }

    #[test]
    fn logout_clears_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store.clone());
        session.login(identity(), "tok").unwrap();

        session.logout();

        assert_eq!(session.current(), None);
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn identity_is_hidden_once_the_token_is_gone() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store.clone());
        session.login(identity(), "tok").unwrap();

        // e.g. the API layer dropped a token the server rejected
        store.clear().unwrap();

        assert_eq!(session.current(), None);
    }

    /// Full round-trip: login, decorate an outgoing request, verify the
    /// header server-side, and get the same identity back.
    #[test]
    fn login_then_decorated_request_verifies_to_same_identity() {
        let store = Arc::new(MemoryStore::new());
        let verifier = Verifier::new(SecretString::from("S"));
        let me = identity();
        let token = verifier.issue(me.id).unwrap();

        let mut session = Session::new(store.clone());
        session.login(me.clone(), &token).unwrap();

        let api = Api::new("http://localhost:8080", store).unwrap();
        let request = api.build_get("/api/user/cart");
        let header = request.headers().get(AUTHORIZATION).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header.clone());

        let verified = verifier.verify(&headers).unwrap();
        assert_eq!(verified.user_id, me.id);

        // the wrong secret rejects the very same request
        let other = Verifier::new(SecretString::from("T"));
        assert!(other.verify(&headers).is_err());
    }

    #[test]
    fn after_logout_requests_carry_no_header() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store.clone());
        session.login(identity(), "tok").unwrap();
        session.logout();

        let api = Api::new("http://localhost:8080", store).unwrap();
        let request = api.build_get("/api/user/cart");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
