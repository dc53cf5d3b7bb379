//! Process-wide bearer credential with single-flight refresh.
//!
//! At most one credential is cached. When it is missing or within the safety
//! margin of its expiry, the first caller starts a refresh through the
//! [`TokenSource`]; every concurrent caller awaits that same in-flight refresh
//! and receives the same credential or the same error.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::auth::TokenSource;
use crate::error::GigaChatError;

/// A bearer token and the instant it stops being accepted
///
/// Debug output redacts the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: Arc<str>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential
    #[must_use]
    pub fn new(token: impl Into<Arc<str>>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// The bearer token value
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute expiry
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if `now + margin` is strictly before the expiry
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        TimeDelta::from_std(margin)
            .ok()
            .and_then(|m| now.checked_add_signed(m))
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Observable state of a [`TokenCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No usable credential and no refresh running
    Empty,
    /// A refresh is in flight
    Fetching,
    /// A credential is cached and outside the safety margin
    Valid,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, GigaChatError>>>;

/// Rejects a credential that is already expired when it arrives
fn reject_expired(credential: Credential) -> Result<Credential, GigaChatError> {
    let now = Utc::now();
    if credential.expires_at <= now {
        tracing::warn!(expires_at = %credential.expires_at, "received an expired access token");
        return Err(GigaChatError::Parse(format!(
            "access token expired at {}, before it was received at {now}",
            credential.expires_at
        )));
    }
    Ok(credential)
}

#[derive(Default)]
struct CacheState {
    credential: Option<Credential>,
    refresh: Option<RefreshFuture>,
}

/// Serves a currently valid [`Credential`] to any number of concurrent callers
pub struct TokenCache<S: TokenSource> {
    source: Arc<S>,
    safety_margin: Duration,
    state: Mutex<CacheState>,
}

impl<S: TokenSource> fmt::Debug for TokenCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("safety_margin", &self.safety_margin)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl<S: TokenSource> TokenCache<S> {
    /// Creates an empty cache
    #[must_use]
    pub fn new(source: S, safety_margin: Duration) -> Self {
        Self {
            source: Arc::new(source),
            safety_margin,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The underlying credential source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached credential, refreshing it first if needed
    ///
    /// # Errors
    ///
    /// Returns the refresh error. Every caller that waited on the same refresh
    /// gets the same error, and the cache is left empty.
    pub async fn get_valid_token(&self) -> Result<Credential, GigaChatError> {
        let refresh = {
            let mut state = self.lock();
            if let Some(credential) = &state.credential
                && credential.is_valid_at(Utc::now(), self.safety_margin)
            {
                tracing::debug!("using cached access token");
                return Ok(credential.clone());
            }
            state.credential = None;

            if let Some(pending) = &state.refresh {
                tracing::debug!("joining in-flight token refresh");
                pending.clone()
            } else {
                tracing::debug!("starting token refresh");
                let source = Arc::clone(&self.source);
                let pending = async move { reject_expired(source.fetch().await?) }
                    .boxed()
                    .shared();
                state.refresh = Some(pending.clone());
                pending
            }
        };

        let result = refresh.clone().await;
        self.settle(&refresh, &result);
        result
    }

    /// Stores the outcome of `refresh` if it is still the current one
    fn settle(&self, refresh: &RefreshFuture, result: &Result<Credential, GigaChatError>) {
        let mut state = self.lock();
        let is_current = state
            .refresh
            .as_ref()
            .is_some_and(|pending| pending.ptr_eq(refresh));
        if !is_current {
            return;
        }
        state.refresh = None;
        state.credential = result.as_ref().ok().cloned();
    }

    /// Drops the cached credential; idempotent
    pub fn invalidate(&self) {
        let mut state = self.lock();
        if state.credential.take().is_some() {
            tracing::debug!("access token invalidated");
        }
    }

    /// Current state of the cache
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        let state = self.lock();
        if state.refresh.is_some() {
            CacheStatus::Fetching
        } else if state
            .credential
            .as_ref()
            .is_some_and(|c| c.is_valid_at(Utc::now(), self.safety_margin))
        {
            CacheStatus::Valid
        } else {
            CacheStatus::Empty
        }
    }
}
