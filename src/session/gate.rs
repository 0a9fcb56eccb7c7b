//! Session gate
//!
//! A [`SessionToken`] records when an admin logged in. The gate holds at
//! most one token and answers whether it is still within its 24 hour
//! lifetime, dropping it once it is not.

use serde::Serialize;

use crate::clock::Clock;

/// Session lifetime in milliseconds
pub const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Proof of a successful login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    /// Login time, ms since the Unix epoch
    pub issued_at_ms: i64,
}

impl SessionToken {
    pub fn issue(now_ms: i64) -> Self {
        Self {
            issued_at_ms: now_ms,
        }
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.issued_at_ms.saturating_add(SESSION_TTL_MS)
    }

    /// Expired once more than [`SESSION_TTL_MS`] has elapsed
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.issued_at_ms) > SESSION_TTL_MS
    }
}

/// Login state for one admin client
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    token: Option<SessionToken>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session at `now_ms`
    pub fn login(&mut self, now_ms: i64) -> SessionToken {
        let token = SessionToken::issue(now_ms);
        self.token = Some(token);
        token
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.token
    }

    /// True only while a token is held and has not expired
    ///
    /// An expired token is cleared as a side effect.
    pub fn is_authenticated(&mut self, now_ms: i64) -> bool {
        match self.token {
            Some(token) if !token.is_expired(now_ms) => true,
            Some(_) => {
                tracing::info!("Admin session expired");
                self.token = None;
                false
            }
            None => false,
        }
    }

    pub fn is_authenticated_with(&mut self, clock: &dyn Clock) -> bool {
        self.is_authenticated(clock.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_no_token_is_not_authenticated() {
        let mut gate = SessionGate::new();
        assert!(!gate.is_authenticated(0));
    }

    #[test]
    fn test_valid_within_24_hours() {
        let mut gate = SessionGate::new();
        gate.login(1_000);
        assert!(gate.is_authenticated(1_000));
        assert!(gate.is_authenticated(1_000 + SESSION_TTL_MS));
    }

    #[test]
    fn test_expiry_clears_token() {
        let clock = ManualClock::new(5_000);
        let mut gate = SessionGate::new();
        gate.login(clock.now_ms());

        clock.advance(SESSION_TTL_MS + 1);
        assert!(!gate.is_authenticated_with(&clock));
        assert!(gate.token().is_none());

        // Stays logged out even if the clock is wound back
        clock.set(5_000);
        assert!(!gate.is_authenticated_with(&clock));
    }

    #[test]
    fn test_logout() {
        let mut gate = SessionGate::new();
        gate.login(0);
        gate.logout();
        assert!(!gate.is_authenticated(0));
    }

    #[test]
    fn test_token_expiry_time() {
        let token = SessionToken::issue(10);
        assert_eq!(token.expires_at_ms(), 10 + SESSION_TTL_MS);
        assert!(!token.is_expired(10 + SESSION_TTL_MS));
        assert!(token.is_expired(11 + SESSION_TTL_MS));
    }
}
