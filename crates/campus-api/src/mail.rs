use std::time::Duration;

use anyhow::{Context, Result};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// The link the recipient is expected to follow, kept for log-only
    /// delivery.
    pub link: Option<String>,
}

/// Out-of-band delivery channel. Reports failure once; callers do not retry.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        // 465 speaks TLS from the first byte; anything else upgrades with STARTTLS.
        let builder = if settings.port == 465 {
            SmtpTransport::relay(&settings.host)
        } else {
            SmtpTransport::starttls_relay(&settings.host)
        }
        .with_context(|| format!("Failed to create SMTP transport for {}", settings.host))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from = settings
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid from address: {}", settings.from))?;

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient address: {}", email.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .context("Failed to build email")?;

        self.transport.send(&message).context("SMTP delivery failed")?;
        info!("Email sent to {}", email.to);
        Ok(())
    }
}

/// Stand-in when no SMTP server is configured: the email is written to the
/// log instead of being delivered.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            link = email.link.as_deref().unwrap_or("-"),
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}

pub const RESET_EMAIL_SUBJECT: &str = "Password Reset - Galeeleeway Educational Institute";

pub fn reset_email(to: &str, reset_url: &str) -> OutgoingEmail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #3b82f6;">Password Reset Request</h2>
  <p>You requested a password reset for your Galeeleeway Educational Institute admin account.</p>
  <p>Click the button below to reset your password. This link will expire in 1 hour.</p>
  <div style="margin: 30px 0;">
    <a href="{url}" style="background-color: #3b82f6; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">Reset Password</a>
  </div>
  <p>If you didn't request this password reset, please ignore this email or contact support.</p>
  <p>Thank you,<br>Galeeleeway Educational Institute Team</p>
</div>"#,
        url = reset_url
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: RESET_EMAIL_SUBJECT.to_string(),
        html,
        link: Some(reset_url.to_string()),
    }
}
