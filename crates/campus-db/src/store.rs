use anyhow::Result;
use chrono::{DateTime, Utc};

use campus_types::models::{ContactSubmission, NewContact};

use crate::models::{NewUser, ResetToken, UserRecord};

/// The storage contract shared by the in-memory and SQLite backends.
///
/// Every method is a single atomic step: implementations hold their lock for
/// the whole call, so the token read-modify-write operations never
/// interleave for the same account.
pub trait Store: Send + Sync {
    // -- Contact submissions --

    /// Stores a submission stamped with `submitted_at` under the next id.
    fn create_contact_at(
        &self,
        contact: NewContact,
        submitted_at: DateTime<Utc>,
    ) -> Result<ContactSubmission>;

    fn create_contact(&self, contact: NewContact) -> Result<ContactSubmission> {
        self.create_contact_at(contact, Utc::now())
    }

    fn get_contact(&self, id: i64) -> Result<Option<ContactSubmission>>;

    /// All submissions, most recent first.
    fn list_contacts(&self) -> Result<Vec<ContactSubmission>>;

    // -- Users --

    /// Fails if the username is taken.
    fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    fn get_user(&self, id: i64) -> Result<Option<UserRecord>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Returns the account with this username, creating it if absent.
    /// An existing account is left exactly as it is.
    fn ensure_user(&self, user: NewUser) -> Result<UserRecord> {
        match self.get_user_by_username(&user.username)? {
            Some(existing) => Ok(existing),
            None => self.create_user(user),
        }
    }

    // -- Password reset --

    /// Replaces any outstanding reset on the account. Returns false if the
    /// account does not exist.
    fn set_reset_token(&self, user_id: i64, token: ResetToken) -> Result<bool>;

    /// The account whose outstanding reset matches `digest` and is still live.
    fn find_by_reset_token(&self, digest: &str, now: DateTime<Utc>)
    -> Result<Option<UserRecord>>;

    /// Looks up like `find_by_reset_token` and, on a match, overwrites the
    /// password hash and clears the reset in the same step.
    fn complete_reset(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserRecord>>;
}

/// Newest first; ids break ties so the order is total.
pub(crate) fn newest_first(a: &ContactSubmission, b: &ContactSubmission) -> std::cmp::Ordering {
    b.submitted_at
        .cmp(&a.submitted_at)
        .then_with(|| b.id.cmp(&a.id))
}
