#![cfg(feature = "std")]

//! Player identity. The session core only ever sees the resulting
//! [`PlayerId`]; how credentials are checked lives behind [`Authenticator`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::session::PlayerId;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

/// Opaque reconnect credential issued after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    /// 128 random bits, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill(&mut bytes);
        SessionToken(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidUsername,
    InvalidPassword,
    UsernameTaken,
    BadCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidUsername => write!(
                f,
                "Username must be {}-{} letters, digits or underscores",
                MIN_USERNAME_LEN, MAX_USERNAME_LEN
            ),
            AuthError::InvalidPassword => write!(f, "Password must not be empty"),
            AuthError::UsernameTaken => write!(f, "Username already exists"),
            AuthError::BadCredentials => write!(f, "Invalid username or password"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Identity collaborator consulted by the server.
pub trait Authenticator: Send + Sync {
    fn register(&self, username: &str, password: &str) -> Result<SessionToken, AuthError>;
    fn login(&self, username: &str, password: &str) -> Result<SessionToken, AuthError>;
    /// Player a previously issued token belongs to.
    fn resolve(&self, token: &SessionToken) -> Option<PlayerId>;
}

fn valid_username(name: &str) -> bool {
    (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&name.chars().count())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Default)]
struct Accounts {
    passwords: HashMap<PlayerId, String>,
    tokens: HashMap<SessionToken, PlayerId>,
}

/// Process-local account table. Credentials are kept as given and vanish
/// with the process; it stands in for a real identity service.
#[derive(Default)]
pub struct MemoryAuthenticator {
    accounts: Mutex<Accounts>,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(accounts: &mut Accounts, player: &str) -> SessionToken {
        let token = SessionToken::generate();
        accounts.tokens.insert(token.clone(), player.to_string());
        token
    }
}

impl Authenticator for MemoryAuthenticator {
    fn register(&self, username: &str, password: &str) -> Result<SessionToken, AuthError> {
        if !valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }
        if password.is_empty() {
            return Err(AuthError::InvalidPassword);
        }
        let mut accounts = self.accounts.lock().map_err(|_| AuthError::BadCredentials)?;
        if accounts.passwords.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }
        accounts
            .passwords
            .insert(username.to_string(), password.to_string());
        Ok(Self::issue(&mut accounts, username))
    }

    fn login(&self, username: &str, password: &str) -> Result<SessionToken, AuthError> {
        let mut accounts = self.accounts.lock().map_err(|_| AuthError::BadCredentials)?;
        match accounts.passwords.get(username) {
            Some(stored) if stored == password => Ok(Self::issue(&mut accounts, username)),
            _ => Err(AuthError::BadCredentials),
        }
    }

    fn resolve(&self, token: &SessionToken) -> Option<PlayerId> {
        let accounts = self.accounts.lock().ok()?;
        accounts.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_login_issues_distinct_tokens() {
        let auth = MemoryAuthenticator::new();
        let first = auth.register("alice", "pw").unwrap();
        let second = auth.login("alice", "pw").unwrap();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 32);
        assert_eq!(auth.resolve(&first).as_deref(), Some("alice"));
        assert_eq!(auth.resolve(&second).as_deref(), Some("alice"));
    }

    #[test]
    fn rejects_bad_input() {
        let auth = MemoryAuthenticator::new();
        assert_eq!(auth.register("al", "pw"), Err(AuthError::InvalidUsername));
        assert_eq!(auth.register("bad name", "pw"), Err(AuthError::InvalidUsername));
        assert_eq!(auth.register("alice", ""), Err(AuthError::InvalidPassword));
        auth.register("alice", "pw").unwrap();
        assert_eq!(auth.register("alice", "other"), Err(AuthError::UsernameTaken));
        assert_eq!(auth.login("alice", "nope"), Err(AuthError::BadCredentials));
        assert_eq!(auth.login("bob", "pw"), Err(AuthError::BadCredentials));
        assert_eq!(auth.resolve(&SessionToken("feed".into())), None);
    }
}
