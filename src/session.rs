//! Identity session — wraps the external auth provider.
//!
//! The provider is a trait seam; the session tracks the signed-in user and
//! exposes it as observable state via a `watch` channel, so dashboards can
//! react to every auth-state transition (`on_session_change`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

/// The authenticated identity, as resolved by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Surfaced as an inline message, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Auth provider failure: {0}")]
    Provider(String),
}

/// External identity provider surface.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    async fn sign_out(&self);
}

// ═══════════════════════════════════════════════════════════
// IdentitySession
// ═══════════════════════════════════════════════════════════

/// Tracks the current user; observable through [`on_session_change`].
///
/// [`on_session_change`]: IdentitySession::on_session_change
pub struct IdentitySession {
    provider: Arc<dyn AuthProvider>,
    tx: watch::Sender<Option<AuthUser>>,
}

impl IdentitySession {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { provider, tx }
    }

    /// Sign in through the provider. On success the session transitions and
    /// every `on_session_change` subscriber is notified.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let user = self.provider.sign_in(email, password).await?;
        self.tx.send_replace(Some(user.clone()));
        tracing::info!(uid = %user.uid, "Signed in");
        Ok(user)
    }

    /// Sign out and clear the session. Safe to call when already signed out.
    pub async fn sign_out(&self) {
        self.provider.sign_out().await;
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
    }

    /// The currently signed-in user, if any.
    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Fires on every auth-state transition (sign-in and sign-out).
    pub fn on_session_change(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }
}

// ═══════════════════════════════════════════════════════════
// LocalAuthProvider — in-process provider (local mode + tests)
// ═══════════════════════════════════════════════════════════

/// Credential table held in memory. The production deployment swaps in a
/// managed-provider adapter; the session logic above is identical either way.
pub struct LocalAuthProvider {
    users: Mutex<HashMap<String, (String, String)>>,
}

impl LocalAuthProvider {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Register a user: email → (password, uid).
    pub fn register(&self, email: &str, password: &str, uid: &str) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(email.to_string(), (password.to_string(), uid.to_string()));
        }
    }
}

impl Default for LocalAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let users = self
            .users
            .lock()
            .map_err(|_| AuthError::Provider("credential table lock poisoned".into()))?;
        match users.get(email) {
            Some((stored, uid)) if stored == password => Ok(AuthUser {
                uid: uid.clone(),
                email: email.to_string(),
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_out(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_user() -> IdentitySession {
        let provider = LocalAuthProvider::new();
        provider.register("ada@example.org", "hunter2", "p1");
        IdentitySession::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn sign_in_with_valid_credentials() {
        let session = session_with_user();
        let user = session.sign_in("ada@example.org", "hunter2").await.unwrap();
        assert_eq!(user.uid, "p1");
        assert!(session.is_signed_in());
    }

    #[tokio::test]
    async fn sign_in_with_wrong_password_fails() {
        let session = session_with_user();
        let err = session.sign_in("ada@example.org", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let session = session_with_user();
        session.sign_in("ada@example.org", "hunter2").await.unwrap();
        session.sign_out().await;
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn session_change_fires_on_transitions() {
        let session = session_with_user();
        let mut rx = session.on_session_change();
        assert!(rx.borrow().is_none());

        session.sign_in("ada@example.org", "hunter2").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().uid, "p1");

        session.sign_out().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn sign_out_when_signed_out_is_safe() {
        let session = session_with_user();
        session.sign_out().await;
        assert!(!session.is_signed_in());
    }
}
