use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Database: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                username            TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                email               TEXT,
                reset_token         TEXT,
                reset_token_expiry  TEXT,
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((reset_token IS NULL) = (reset_token_expiry IS NULL))
            );

            CREATE INDEX idx_users_email ON users(email);
            CREATE INDEX idx_users_reset_token ON users(reset_token);

            CREATE TABLE contact_submissions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL,
                phone           TEXT,
                subject         TEXT NOT NULL,
                message         TEXT NOT NULL,
                submitted_at    TEXT NOT NULL
            );

            CREATE INDEX idx_contact_submissions_submitted
                ON contact_submissions(submitted_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
