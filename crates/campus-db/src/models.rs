//! Account records as the storage layer sees them. Password and reset
//! secret are only ever held as digests here.

use chrono::{DateTime, Utc};

/// An outstanding password reset. Secret digest and expiry live and die
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub reset: Option<ResetToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}
