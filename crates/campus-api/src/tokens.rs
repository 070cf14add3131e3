//! Password-reset token lifecycle.
//!
//! A reset has two halves that must agree: a random secret whose digest and
//! expiry sit on the account, and a signed JWT envelope carrying the raw
//! secret with its own `exp`. Either half failing rejects the token, and
//! callers only ever learn "invalid or expired".

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use campus_db::{ResetToken, Store, UserRecord};
use campus_types::api::{RESET_AUDIENCE, ResetClaims};

use crate::mail::{Mailer, reset_email};
use crate::password::hash_password;

pub fn default_ttl() -> Duration {
    Duration::hours(1)
}

/// Outcome of a reset request. The HTTP layer answers both the same way.
#[derive(Debug)]
pub enum Issued {
    /// A token was stored and emailed. The bearer is returned for callers
    /// that need it in-process; it is never put in an HTTP response.
    Sent { bearer: String },
    UnknownEmail,
}

pub struct PasswordResets {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    base_url: String,
}

impl PasswordResets {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        secret: &str,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: default_ttl(),
            base_url: base_url.into(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Mint a token for the account registered under `email` and mail it.
    ///
    /// Replaces any outstanding token on the account. If delivery fails the
    /// new token stays stored and the error is returned.
    pub fn issue(&self, email: &str) -> Result<Issued> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<Issued> {
        let Some(user) = self.store.get_user_by_email(email)? else {
            debug!("Password reset requested for unregistered email");
            return Ok(Issued::UnknownEmail);
        };

        let secret = generate_secret();
        let expires_at = now + self.ttl;
        self.store.set_reset_token(
            user.id,
            ResetToken {
                digest: digest(&secret),
                expires_at,
            },
        )?;

        let bearer = self.seal(secret, expires_at)?;
        self.mailer
            .send(&reset_email(email, &self.reset_url(&bearer)))
            .with_context(|| format!("Failed to send password reset email for user {}", user.id))?;

        info!(user_id = user.id, "Password reset token issued");
        Ok(Issued::Sent { bearer })
    }

    /// The account a bearer token unlocks, if both halves are still valid.
    pub fn validate(&self, bearer: &str) -> Result<Option<UserRecord>> {
        self.validate_at(bearer, Utc::now())
    }

    pub fn validate_at(&self, bearer: &str, now: DateTime<Utc>) -> Result<Option<UserRecord>> {
        let Some(secret) = self.open(bearer) else {
            return Ok(None);
        };
        let user = self.store.find_by_reset_token(&digest(&secret), now)?;
        if user.is_none() {
            debug!("Reset token envelope valid but no live reset matches it");
        }
        Ok(user)
    }

    /// Set a new password through a bearer token. Returns false, changing
    /// nothing, when the token is not valid.
    pub fn complete(&self, bearer: &str, new_password: &str) -> Result<bool> {
        self.complete_at(bearer, new_password, Utc::now())
    }

    pub fn complete_at(&self, bearer: &str, new_password: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(secret) = self.open(bearer) else {
            return Ok(false);
        };
        let digest = digest(&secret);

        // Cheap check first so forged tokens never cost an Argon2 run.
        if self.store.find_by_reset_token(&digest, now)?.is_none() {
            return Ok(false);
        }

        let password_hash = hash_password(new_password)?;
        match self.store.complete_reset(&digest, now, &password_hash)? {
            Some(user) => {
                info!(user_id = user.id, "Password reset completed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn seal(&self, secret: String, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = ResetClaims {
            reset_token: secret,
            aud: RESET_AUDIENCE.to_string(),
            exp: expires_at.timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).context("Failed to sign reset token")
    }

    /// Verifies signature, audience and envelope expiry; yields the secret.
    fn open(&self, bearer: &str) -> Option<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[RESET_AUDIENCE]);

        match decode::<ResetClaims>(bearer, &self.decoding, &validation) {
            Ok(data) => Some(data.claims.reset_token),
            Err(e) => {
                debug!("Rejected reset token envelope: {}", e);
                None
            }
        }
    }

    fn reset_url(&self, bearer: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.base_url.trim_end_matches('/'),
            bearer
        )
    }
}

/// 32 bytes from the thread-local CSPRNG, hex encoded.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
