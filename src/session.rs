use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::model::task::Identity;

/// Error type for authentication operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("password must be at least 6 characters")]
    WeakPassword,
    #[error("not signed in")]
    NotSignedIn,
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Current identity plus a change stream.
///
/// Clones share the same channel. Subscribers see every sign-in and
/// sign-out as a new value; `None` means signed out.
#[derive(Debug, Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Session { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    /// Publish a new identity to every subscriber
    pub fn publish(&self, identity: Option<Identity>) {
        debug!(
            user = identity.as_ref().map(|i| i.email.as_str()).unwrap_or("<none>"),
            "session changed"
        );
        self.tx.send_replace(identity);
    }
}

/// Sign-in, sign-up and sign-out against an identity provider
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register and sign in a new account
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The session this service publishes identity changes to
    fn session(&self) -> &Session;
}

/// In-process identity provider for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryAuth {
    session: Session,
    accounts: Mutex<HashMap<String, Account>>,
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    password: String,
}

impl MemoryAuth {
    pub fn new(session: Session) -> Self {
        MemoryAuth {
            session,
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

#[async_trait]
impl AuthService for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(&email) {
                return Err(AuthError::AlreadyRegistered(email));
            }
            let account = Account {
                id: Uuid::new_v4().to_string(),
                password: password.to_string(),
            };
            let identity = Identity::new(account.id.clone(), email.clone());
            accounts.insert(email, account);
            identity
        };
        self.session.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let identity = {
            let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            match accounts.get(&email) {
                Some(account) if account.password == password => {
                    Identity::new(account.id.clone(), email.clone())
                }
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        self.session.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session.current().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        self.session.publish(None);
        Ok(())
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_sign_up_signs_in_and_notifies() {
        let auth = MemoryAuth::default();
        let mut rx = auth.session().subscribe();

        let identity = auth.sign_up("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(identity.email, "ada@example.com");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(identity.clone()));
        assert_eq!(auth.session().current(), Some(identity));
    }

    #[tokio::test]
    async fn test_sign_in_same_id_as_sign_up() {
        let auth = MemoryAuth::default();
        let created = auth.sign_up("ada@example.com", "hunter22").await.unwrap();
        auth.sign_out().await.unwrap();
        assert_eq!(auth.session().current(), None);

        let signed_in = auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(signed_in, created);
    }

    #[tokio::test]
    async fn test_sign_out_twice() {
        let auth = MemoryAuth::default();
        auth.sign_up("ada@example.com", "hunter22").await.unwrap();
        auth.sign_out().await.unwrap();
        assert_eq!(auth.sign_out().await, Err(AuthError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = MemoryAuth::default();
        auth.sign_up("ada@example.com", "hunter22").await.unwrap();
        auth.sign_out().await.unwrap();
        let err = auth.sign_in("ada@example.com", "hunter23").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(auth.session().current(), None);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up() {
        let auth = MemoryAuth::default();
        auth.sign_up("ada@example.com", "hunter22").await.unwrap();
        let err = auth.sign_up("ADA@example.com", "other-pass").await.unwrap_err();
        assert_eq!(err, AuthError::AlreadyRegistered("ada@example.com".into()));
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let auth = MemoryAuth::default();
        assert!(matches!(
            auth.sign_up("no-at-sign", "hunter22").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert_eq!(
            auth.sign_up("ada@example.com", "short").await,
            Err(AuthError::WeakPassword)
        );
    }

    #[test]
    fn test_session_clones_share_channel() {
        let session = Session::default();
        let other = session.clone();
        other.publish(Some(Identity::new("u1", "a@b.c")));
        assert_eq!(session.current().map(|i| i.id), Some("u1".to_string()));
    }
}
