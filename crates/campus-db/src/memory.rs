use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};

use campus_types::models::{ContactSubmission, NewContact};

use crate::models::{NewUser, ResetToken, UserRecord};
use crate::store::{Store, newest_first};

/// Process-lifetime store. Holds everything until the process exits; there
/// is no eviction.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    users: BTreeMap<i64, UserRecord>,
    contacts: BTreeMap<i64, ContactSubmission>,
    next_user_id: i64,
    next_contact_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: BTreeMap::new(),
                contacts: BTreeMap::new(),
                next_user_id: 1,
                next_contact_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow!("Memory store lock poisoned: {}", e))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn live_reset_mut(&mut self, digest: &str, now: DateTime<Utc>) -> Option<&mut UserRecord> {
        self.users.values_mut().find(|user| {
            user.reset
                .as_ref()
                .is_some_and(|reset| reset.digest == digest && reset.is_live_at(now))
        })
    }
}

impl Store for MemoryStore {
    fn create_contact_at(
        &self,
        contact: NewContact,
        submitted_at: DateTime<Utc>,
    ) -> Result<ContactSubmission> {
        let mut inner = self.lock()?;
        let id = inner.next_contact_id;
        inner.next_contact_id += 1;

        let submission = ContactSubmission::from_new(id, contact, submitted_at);
        inner.contacts.insert(id, submission.clone());
        Ok(submission)
    }

    fn get_contact(&self, id: i64) -> Result<Option<ContactSubmission>> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    fn list_contacts(&self) -> Result<Vec<ContactSubmission>> {
        let mut all: Vec<ContactSubmission> = self.lock()?.contacts.values().cloned().collect();
        all.sort_by(newest_first);
        Ok(all)
    }

    fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.username == user.username) {
            bail!("Username already taken: {}", user.username);
        }

        let id = inner.next_user_id;
        inner.next_user_id += 1;

        let record = UserRecord {
            id,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            reset: None,
        };
        inner.users.insert(id, record.clone());
        Ok(record)
    }

    fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    fn set_reset_token(&self, user_id: i64, token: ResetToken) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.reset = Some(token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        let mut inner = self.lock()?;
        Ok(inner.live_reset_mut(digest, now).map(|user| user.clone()))
    }

    fn complete_reset(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserRecord>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.live_reset_mut(digest, now) else {
            return Ok(None);
        };

        user.password_hash = password_hash.to_string();
        user.reset = None;
        Ok(Some(user.clone()))
    }
}
