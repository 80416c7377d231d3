use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    domain::UserProfile,
    github::FetchError,
    storage::{LocalStorage, StorageError},
};

pub const TOKEN_KEY: &str = "github_token";
pub const USER_KEY: &str = "github_user";

/// Resolves the profile that belongs to an access token.
pub trait ProfileSource {
    fn fetch_profile(&self, token: &str) -> Result<UserProfile, FetchError>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
}

// Manual Debug impl to avoid leaking the token
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("profile", &self.profile)
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    LoggedOut,
    /// Token and cached profile were both present.
    Restored,
    /// Token was present but the profile had to be fetched again.
    Refetched,
    /// The saved token could not be validated and was discarded.
    Rejected(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RestoreStep {
    Done(RestoreOutcome),
    /// The saved token needs its profile fetched before the session is usable.
    NeedsProfile(String),
}

pub struct SessionStore {
    storage: LocalStorage,
    current: Option<Session>,
}

impl SessionStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Restores what local storage alone can decide. A saved token without a
    /// readable profile comes back as [`RestoreStep::NeedsProfile`]; the
    /// caller resolves it through a [`ProfileSource`] and hands the result to
    /// [`SessionStore::finish_restore`].
    pub fn begin_restore(&mut self) -> Result<RestoreStep, SessionError> {
        self.current = None;

        let token = match self.storage.read::<String>(TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => token,
            Ok(_) => {
                self.storage.remove(USER_KEY)?;
                return Ok(RestoreStep::Done(RestoreOutcome::LoggedOut));
            }
            Err(err) => {
                warn!(error = %err, "stored token is unreadable; discarding session");
                self.erase()?;
                return Ok(RestoreStep::Done(RestoreOutcome::LoggedOut));
            }
        };

        let cached = match self.storage.read::<UserProfile>(USER_KEY) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "stored profile is unreadable; fetching a fresh one");
                None
            }
        };

        match cached {
            Some(profile) => {
                info!(login = %profile.login, "restored saved session");
                self.current = Some(Session { token, profile });
                Ok(RestoreStep::Done(RestoreOutcome::Restored))
            }
            None => Ok(RestoreStep::NeedsProfile(token)),
        }
    }

    pub fn finish_restore(
        &mut self,
        token: String,
        fetched: Result<UserProfile, FetchError>,
    ) -> Result<RestoreOutcome, SessionError> {
        match fetched {
            Ok(profile) => {
                self.set_session(token, profile)?;
                Ok(RestoreOutcome::Refetched)
            }
            Err(err) => {
                warn!(error = %err, "saved token was rejected; logging out");
                self.erase()?;
                Ok(RestoreOutcome::Rejected(err.to_string()))
            }
        }
    }

    /// Persists token and profile together; the in-memory session only
    /// changes once both are on disk.
    pub fn set_session(&mut self, token: String, profile: UserProfile) -> Result<(), SessionError> {
        self.storage.write(USER_KEY, &profile)?;
        if let Err(err) = self.storage.write(TOKEN_KEY, &token) {
            if let Err(rollback) = self.storage.remove(USER_KEY) {
                warn!(error = %rollback, "failed to roll back stored profile");
            }
            return Err(err.into());
        }
        info!(login = %profile.login, "session established");
        self.current = Some(Session { token, profile });
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.current = None;
        self.erase()?;
        info!("session cleared");
        Ok(())
    }

    fn erase(&self) -> Result<(), SessionError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}
