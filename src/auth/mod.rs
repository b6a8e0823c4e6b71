//! Process-wide sign-in state.
//!
//! A single [`AuthContext`] owns the current [`AuthState`]. It is hydrated from
//! the session store at startup, and every change (login, role switch, logout)
//! is written back to the store and published to subscribers.

pub mod google;
pub mod store;

use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use store::{ FileSessionStore, MemorySessionStore, SessionStore };

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session data is corrupted: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("invalid role '{0}' (expected 'teacher' or 'student')")]
    InvalidRole(String),
    #[error("not signed in")]
    NotAuthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Student => write!(f, "student"),
            UserRole::Teacher => write!(f, "teacher"),
        }
    }
}

impl FromStr for UserRole {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            _ => Err(AuthError::InvalidRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(rename = "type", default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            picture: None,
            role,
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(UserProfile),
}

impl AuthState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::SignedIn(profile) => Some(profile),
            AuthState::SignedOut => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }

    pub fn role(&self) -> Option<UserRole> {
        self.profile().map(|p| p.role)
    }
}

pub struct AuthContext {
    state: watch::Sender<AuthState>,
    store: Box<dyn SessionStore>,
}

impl AuthContext {
    /// Restores the persisted session. Unreadable session data is discarded
    /// and the context starts signed out.
    pub fn hydrate(store: Box<dyn SessionStore>) -> Self {
        let initial = match store.load() {
            Ok(Some(profile)) => {
                info!("Restored session for {} ({})", profile.email, profile.role);
                AuthState::SignedIn(profile)
            }
            Ok(None) => AuthState::SignedOut,
            Err(e) => {
                warn!("Ignoring unreadable session data: {}", e);
                AuthState::SignedOut
            }
        };
        let (state, _) = watch::channel(initial);
        Self { state, store }
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn changes(&self) -> WatchStream<AuthState> {
        WatchStream::new(self.subscribe())
    }

    pub fn login(&self, profile: UserProfile) -> Result<UserProfile, AuthError> {
        if profile.email.trim().is_empty() {
            return Err(AuthError::InvalidCredential("email is required".into()));
        }
        self.store.save(&profile)?;
        info!("Signed in {} as {}", profile.email, profile.role);
        self.state.send_replace(AuthState::SignedIn(profile.clone()));
        Ok(profile)
    }

    pub fn login_with_google(&self, credential: &str, role: UserRole) -> Result<UserProfile, AuthError> {
        let claims = google::decode_credential(credential)?;
        self.login(UserProfile {
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            role,
            id: Some(claims.sub),
        })
    }

    pub fn switch_role(&self, role: UserRole) -> Result<UserProfile, AuthError> {
        let mut profile = self.current().profile().cloned().ok_or(AuthError::NotAuthenticated)?;
        if profile.role == role {
            return Ok(profile);
        }
        profile.role = role;
        self.store.save(&profile)?;
        info!("Switched {} to the {} view", profile.email, role);
        self.state.send_replace(AuthState::SignedIn(profile.clone()));
        Ok(profile)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        if self.state.send_replace(AuthState::SignedOut).is_authenticated() {
            info!("Signed out");
        }
        Ok(())
    }
}
