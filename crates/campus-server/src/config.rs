use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use campus_api::mail::SmtpSettings;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "galeeleeway_secret_key",
];

pub enum StorageKind {
    Memory,
    Sqlite(PathBuf),
}

pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub storage: StorageKind,
    pub base_url: String,
    pub admin: AdminSeed,
    pub smtp: Option<SmtpSettings>,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset and empty are the same.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("CAMPUS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CAMPUS_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port: u16 = or("CAMPUS_PORT", "5000")
            .parse()
            .context("CAMPUS_PORT must be a port number")?;

        let storage = match or("CAMPUS_STORAGE", "memory").as_str() {
            "memory" => StorageKind::Memory,
            "sqlite" => StorageKind::Sqlite(or("CAMPUS_DB_PATH", "campus.db").into()),
            other => bail!("CAMPUS_STORAGE must be 'memory' or 'sqlite', got '{}'", other),
        };

        let admin = AdminSeed {
            username: or("CAMPUS_ADMIN_USERNAME", "admin"),
            password: get("CAMPUS_ADMIN_PASSWORD")
                .context("CAMPUS_ADMIN_PASSWORD must be set")?,
            email: get("CAMPUS_ADMIN_EMAIL"),
        };

        let smtp = match get("CAMPUS_SMTP_HOST") {
            Some(host) => {
                let username = get("CAMPUS_SMTP_USERNAME").unwrap_or_default();
                Some(SmtpSettings {
                    host,
                    port: or("CAMPUS_SMTP_PORT", "587")
                        .parse()
                        .context("CAMPUS_SMTP_PORT must be a port number")?,
                    from: get("CAMPUS_MAIL_FROM").unwrap_or_else(|| username.clone()),
                    password: get("CAMPUS_SMTP_PASSWORD").unwrap_or_default(),
                    username,
                })
            }
            None => None,
        };

        Ok(Self {
            host: or("CAMPUS_HOST", "0.0.0.0"),
            port,
            jwt_secret,
            storage,
            base_url: or("CAMPUS_BASE_URL", "http://localhost:5000"),
            admin,
            smtp,
            static_dir: get("CAMPUS_STATIC_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("CAMPUS_JWT_SECRET", "a-real-secret"),
        ("CAMPUS_ADMIN_PASSWORD", "s3cret!"),
    ];

    #[test]
    fn defaults() {
        let cfg = config(&REQUIRED).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 5000);
        assert!(matches!(cfg.storage, StorageKind::Memory));
        assert_eq!(cfg.base_url, "http://localhost:5000");
        assert_eq!(cfg.admin.username, "admin");
        assert_eq!(cfg.admin.email, None);
        assert!(cfg.smtp.is_none());
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(config(&[("CAMPUS_ADMIN_PASSWORD", "x")]).is_err());
        assert!(
            config(&[
                ("CAMPUS_JWT_SECRET", "dev-secret-change-me"),
                ("CAMPUS_ADMIN_PASSWORD", "x"),
            ])
            .is_err()
        );
    }

    #[test]
    fn admin_password_is_required() {
        assert!(config(&[("CAMPUS_JWT_SECRET", "a-real-secret")]).is_err());
        assert!(
            config(&[
                ("CAMPUS_JWT_SECRET", "a-real-secret"),
                ("CAMPUS_ADMIN_PASSWORD", "  "),
            ])
            .is_err()
        );
    }

    #[test]
    fn sqlite_and_smtp() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CAMPUS_STORAGE", "sqlite"),
            ("CAMPUS_DB_PATH", "/var/lib/campus/campus.db"),
            ("CAMPUS_SMTP_HOST", "smtp.gmail.com"),
            ("CAMPUS_SMTP_USERNAME", "office@example.com"),
            ("CAMPUS_SMTP_PASSWORD", "app-password"),
        ]);
        let cfg = config(&vars).unwrap();

        match cfg.storage {
            StorageKind::Sqlite(path) => assert_eq!(path, PathBuf::from("/var/lib/campus/campus.db")),
            StorageKind::Memory => panic!("expected sqlite"),
        }
        let smtp = cfg.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from, "office@example.com");
    }

    #[test]
    fn bad_values_are_errors() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("CAMPUS_STORAGE", "postgres"));
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("CAMPUS_PORT", "eighty"));
        assert!(config(&vars).is_err());
    }
}
