use async_trait::async_trait;
use thiserror::Error;

use crate::entity::user;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

/// An email queued for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    pub fn verification(user: &user::Model, token: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Verify your email address".into(),
            body: format!(
                "Hi {}, confirm your email address by opening \
                 /api/v1/auth/verify-email?token={token}",
                user.name
            ),
        }
    }

    pub fn welcome(user: &user::Model) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Welcome to Cinelog".into(),
            body: format!(
                "Hi {}, your account @{} is ready. Start logging movies!",
                user.name, user.username
            ),
        }
    }

    pub fn new_login_alert(user: &user::Model, ip: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: "New login to your account".into(),
            body: format!(
                "Hi {}, we noticed a login from a new address: {ip}. \
                 If this wasn't you, reset your password.",
                user.name
            ),
        }
    }

    pub fn password_reset(user: &user::Model, code: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Your password reset code".into(),
            body: format!(
                "Hi {}, your password reset code is {code} . It expires in 1 hour.",
                user.name
            ),
        }
    }

    pub fn password_changed(user: &user::Model) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Your password was changed".into(),
            body: format!(
                "Hi {}, your password was just changed. If this wasn't you, \
                 contact support immediately.",
                user.name
            ),
        }
    }

    pub fn email_changed(user: &user::Model, old_email: &str, new_email: &str) -> Self {
        Self {
            to: old_email.to_string(),
            subject: "Your email address was changed".into(),
            body: format!(
                "Hi {}, the email on your account changed from {old_email} to {new_email}.",
                user.name
            ),
        }
    }
}

/// Delivery seam for all outbound mail.
///
/// The server only ever talks to this trait; the default implementation logs
/// instead of speaking SMTP so the auth flows stay testable without a mail
/// provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError>;
}

/// Logs outbound mail through `tracing` instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        tracing::info!(to = %email.to, subject = %email.subject, "outgoing email");
        tracing::debug!("email body: {}", email.body);
        Ok(())
    }
}
