use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use campus_types::models::{ContactSubmission, NewContact, Subject};

use crate::models::{NewUser, ResetToken, UserRecord};
use crate::store::Store;
use crate::Database;

const USER_COLUMNS: &str = "id, username, password, email, reset_token, reset_token_expiry";

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, submitted_at";

impl Store for Database {
    // -- Contact submissions --

    fn create_contact_at(
        &self,
        contact: NewContact,
        submitted_at: DateTime<Utc>,
    ) -> Result<ContactSubmission> {
        // Stored at microsecond precision; trim first so the returned record
        // matches what a later read yields.
        let submitted_at = submitted_at.trunc_subsecs(6);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contact_submissions (name, email, phone, subject, message, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &contact.name,
                    &contact.email,
                    &contact.phone,
                    contact.subject.as_str(),
                    &contact.message,
                    to_db_time(submitted_at),
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(ContactSubmission::from_new(id, contact, submitted_at))
        })
    }

    fn get_contact(&self, id: i64) -> Result<Option<ContactSubmission>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM contact_submissions WHERE id = ?1", CONTACT_COLUMNS);
            let row = conn.query_row(&sql, [id], contact_from_row).optional()?;
            Ok(row)
        })
    }

    fn list_contacts(&self) -> Result<Vec<ContactSubmission>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM contact_submissions ORDER BY submitted_at DESC, id DESC",
                CONTACT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], contact_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Users --

    fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, email) VALUES (?1, ?2, ?3)",
                (&user.username, &user.password_hash, &user.email),
            )?;
            Ok(UserRecord {
                id: conn.last_insert_rowid(),
                username: user.username,
                password_hash: user.password_hash,
                email: user.email,
                reset: None,
            })
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    // -- Password reset --

    fn set_reset_token(&self, user_id: i64, token: ResetToken) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET reset_token = ?1, reset_token_expiry = ?2 WHERE id = ?3",
                rusqlite::params![&token.digest, to_db_time(token.expires_at), user_id],
            )?;
            Ok(updated == 1)
        })
    }

    fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| query_live_reset(conn, digest, now))
    }

    fn complete_reset(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserRecord>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut user) = query_live_reset(&tx, digest, now)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE users SET password = ?1, reset_token = NULL, reset_token_expiry = NULL
                 WHERE id = ?2",
                rusqlite::params![password_hash, user.id],
            )?;
            tx.commit()?;

            user.password_hash = password_hash.to_string();
            user.reset = None;
            Ok(Some(user))
        })
    }
}

/// Fixed-width RFC 3339 so that text comparison in SQL matches time order.
fn to_db_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_db_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<ContactSubmission> {
    let subject: String = row.get(4)?;
    let submitted_at: String = row.get(6)?;

    Ok(ContactSubmission {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        subject: subject
            .parse::<Subject>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        message: row.get(5)?,
        submitted_at: parse_db_time(6, &submitted_at)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let digest: Option<String> = row.get(4)?;
    let expiry: Option<String> = row.get(5)?;

    let reset = match (digest, expiry) {
        (Some(digest), Some(raw)) => Some(ResetToken {
            digest,
            expires_at: parse_db_time(5, &raw)?,
        }),
        _ => None,
    };

    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        reset,
    })
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    condition: &str,
    param: P,
) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, condition);
    let row = conn.query_row(&sql, [param], user_from_row).optional()?;
    Ok(row)
}

fn query_live_reset(
    conn: &Connection,
    digest: &str,
    now: DateTime<Utc>,
) -> Result<Option<UserRecord>> {
    let sql = format!(
        "SELECT {} FROM users WHERE reset_token = ?1 AND reset_token_expiry > ?2 LIMIT 1",
        USER_COLUMNS
    );
    let row = conn
        .query_row(&sql, rusqlite::params![digest, to_db_time(now)], user_from_row)
        .optional()?;
    Ok(row)
}
