//! Helpers around WeCom's use of short-lived access tokens.
//!
//! An application exchanges its corp ID and secret for an access token which
//! must accompany every other call. The token is cached on the client and
//! refreshed once the lifetime reported by WeCom has elapsed. Tokens are never
//! persisted.
//!
//! <https://developer.work.weixin.qq.com/document/path/91039>

use super::{
    api::{operation, Envelope, WeComClient, GET_ACCESS_TOKEN},
    error::WeComError,
};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::debug;

#[cfg(test)]
use mock_instant::Instant;
#[cfg(not(test))]
use std::time::Instant;

/// The identity of a single WeCom application.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    corp_id: String,
    agent_id: i64,
    secret: String,
}

impl Account {
    pub fn new<T: Into<String>, U: Into<String>>(corp_id: T, agent_id: i64, secret: U) -> Self {
        Self {
            corp_id: corp_id.into(),
            agent_id,
            secret: secret.into(),
        }
    }

    pub fn corp_id(&self) -> &str {
        &self.corp_id
    }

    pub fn agent_id(&self) -> i64 {
        self.agent_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("corp_id", &self.corp_id)
            .field("agent_id", &self.agent_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A newtype wrapper around WeCom access tokens.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AccessToken(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token along with the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: AccessToken,
    pub expires_at: Instant,
}

impl CachedToken {
    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Upper bound on how long a token is trusted, whatever lifetime WeCom
/// reports. Keeps the expiry instant representable.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// <https://developer.work.weixin.qq.com/document/path/91039>
#[derive(Debug, Deserialize)]
pub(crate) struct TokenGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, deserialize_with = "crate::de::lifetime_seconds")]
    pub expires_in: Duration,
}

impl TokenGrant {
    /// The reported lifetime, capped at [MAX_TOKEN_LIFETIME].
    fn lifetime(&self) -> Duration {
        self.expires_in.min(MAX_TOKEN_LIFETIME)
    }
}

impl WeComClient {
    /// Fetch a token unless the cached one is still valid.
    pub async fn ensure_token(&mut self) -> Result<(), WeComError> {
        let now = Instant::now();
        let is_fresh = self.token.as_ref().is_some_and(|t| t.is_valid_at(now));

        if !is_fresh {
            self.fetch_token().await?;
        }

        Ok(())
    }

    /// Unconditionally fetch a new token, caching it on success. A failed
    /// fetch leaves any previously cached token in place.
    ///
    /// A reported lifetime of zero or less yields a token that's already
    /// expired, meaning the next call will fetch again.
    pub async fn fetch_token(&mut self) -> Result<AccessToken, WeComError> {
        let res: Envelope<TokenGrant> = self
            .dispatch(operation(GET_ACCESS_TOKEN)?, None::<&()>)
            .await?;
        let grant = res.into_result()?;
        let lifetime = grant.lifetime();

        let token = AccessToken(grant.access_token);
        self.token = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        debug!(
            corp_id = self.account.corp_id(),
            expires_in = lifetime.as_secs(),
            "Refreshed WeCom access token"
        );

        Ok(token)
    }

    /// The cached token, if there is one and it hasn't expired.
    pub fn token(&self) -> Option<&AccessToken> {
        let now = Instant::now();

        self.token
            .as_ref()
            .filter(|t| t.is_valid_at(now))
            .map(|t| &t.token)
    }
}
