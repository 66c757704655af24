// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound email (password reset links).

use crate::config::SmtpConfig;
use crate::error::AppError;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, Mutex};

/// A message captured instead of being sent.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

enum Transport {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from_address: String,
    },
    /// Keeps messages in memory
    Capture(Mutex<Vec<SentMail>>),
    /// No SMTP host configured; every send fails.
    Unconfigured,
}

#[derive(Clone)]
pub struct Mailer {
    transport: Arc<Transport>,
}

impl Mailer {
    /// Build an SMTP mailer, or an unconfigured one when `config` is `None`.
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, AppError> {
        let Some(config) = config else {
            tracing::warn!("SMTP_HOST not set; password reset emails cannot be sent");
            return Ok(Self {
                transport: Arc::new(Transport::Unconfigured),
            });
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("SMTP relay setup failed: {}", e)))?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: Arc::new(Transport::Smtp {
                transport: builder.build(),
                from_address: config.from_address.clone(),
            }),
        })
    }

    /// Mailer that records messages for inspection.
    pub fn capturing() -> Self {
        Self {
            transport: Arc::new(Transport::Capture(Mutex::new(Vec::new()))),
        }
    }

    /// Mailer whose sends always fail.
    pub fn unconfigured() -> Self {
        Self {
            transport: Arc::new(Transport::Unconfigured),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        match self.transport.as_ref() {
            Transport::Smtp {
                transport,
                from_address,
            } => {
                let from = from_address
                    .parse()
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Bad from address: {}", e)))?;
                let to_mailbox = to
                    .parse()
                    .map_err(|_| AppError::Validation(format!("Invalid email address: {}", to)))?;

                let message = Message::builder()
                    .from(from)
                    .to(to_mailbox)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Email build failed: {}", e)))?;

                transport.send(message).await.map_err(|e| {
                    tracing::error!(error = %e, "SMTP send failed");
                    AppError::Unavailable("Email could not be sent".to_string())
                })?;

                tracing::info!(to, subject, "Email sent");
                Ok(())
            }
            Transport::Capture(outbox) => {
                let mut outbox = outbox
                    .lock()
                    .map_err(|_| AppError::Internal(anyhow::anyhow!("Outbox lock poisoned")))?;
                outbox.push(SentMail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    body,
                });
                Ok(())
            }
            Transport::Unconfigured => Err(AppError::Unavailable(
                "Email delivery is not configured".to_string(),
            )),
        }
    }

    /// Messages captured so far. Empty for other transports.
    pub fn outbox(&self) -> Vec<SentMail> {
        match self.transport.as_ref() {
            Transport::Capture(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Reset link emailed to the user.
pub fn reset_password_email(frontend_url: &str, raw_token: &str, ttl_minutes: i64) -> String {
    let link = format!(
        "{}/reset-password/{}",
        frontend_url.trim_end_matches('/'),
        raw_token
    );
    format!(
        "You requested a password reset.\n\n\
         Open the link below to choose a new password:\n{}\n\n\
         The link expires in {} minutes. If you did not request this, ignore this email.\n",
        link, ttl_minutes
    )
}
