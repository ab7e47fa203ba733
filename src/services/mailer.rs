use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::Config;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailKind {
    /// Six-digit signup code, valid 24 hours.
    SignupCode { code: String },
    /// Password reset link, valid 1 hour.
    PasswordReset { link: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub kind: EmailKind,
}

impl OutgoingEmail {
    pub fn signup_code(to: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            kind: EmailKind::SignupCode {
                code: code.to_string(),
            },
        }
    }

    pub fn password_reset(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            kind: EmailKind::PasswordReset {
                link: link.to_string(),
            },
        }
    }

    pub fn subject(&self) -> &'static str {
        match self.kind {
            EmailKind::SignupCode { .. } => "Verify Your Email Address",
            EmailKind::PasswordReset { .. } => "Reset Your Password",
        }
    }

    pub fn text(&self) -> String {
        match &self.kind {
            EmailKind::SignupCode { code } => format!(
                "Thanks for signing up! To complete your registration, enter this verification code in the app:\n\n\
                 {}\n\n\
                 This code will expire in 24 hours for security reasons.\n\
                 If you didn't create an account, you can safely ignore this email.",
                code
            ),
            EmailKind::PasswordReset { link } => format!(
                "We received a request to reset your password. Open the link below to choose a new one:\n\n\
                 {}\n\n\
                 This link will expire in 1 hour for your security.\n\
                 If you didn't request this password reset, please ignore this email.",
                link
            ),
        }
    }

    pub fn html(&self) -> String {
        let body = match &self.kind {
            EmailKind::SignupCode { code } => format!(
                r#"<h1 style="color: #333; font-size: 28px;">Welcome!</h1>
<p>Thanks for signing up! We're excited to have you on board.</p>
<p>To complete your registration, please enter this verification code in the app:</p>
<div style="background: #f4f4f4; border-radius: 8px; padding: 24px; text-align: center;">
  <span style="font-size: 32px; font-weight: bold; letter-spacing: 6px; font-family: monospace;">{code}</span>
</div>
<p>This code will expire in 24 hours for security reasons.</p>
<p style="color: #8898aa; font-size: 14px;">If you didn't create an account, you can safely ignore this email.</p>"#,
                code = html_escape(code)
            ),
            EmailKind::PasswordReset { link } => format!(
                r#"<h1 style="color: #333; font-size: 28px;">Reset Your Password</h1>
<p>We received a request to reset your password. Click the button below to create a new password:</p>
<div style="margin: 32px 0; text-align: center;">
  <a href="{link}" style="background-color: #5469d4; border-radius: 8px; color: #fff; font-weight: bold; text-decoration: none; padding: 14px 36px;">Reset My Password</a>
</div>
<p style="text-align: center;">This link will expire in 1 hour for your security.</p>
<p style="color: #8898aa; font-size: 14px;">If you didn't request this password reset, please ignore this email. Your password will remain unchanged.</p>"#,
                link = html_escape(link)
            ),
        };

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n\
             <body style=\"font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background-color: #f6f9fc;\">\n\
             <div style=\"max-width: 600px; margin: 0 auto; background-color: #ffffff; padding: 20px 40px 48px;\">\n\
             {}\n<p>Best regards,<br>The Team</p>\n</div>\n</body>\n</html>",
            body
        )
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Delivers through the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = email.subject()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject(),
                "html": email.html(),
                "text": email.text(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Used when no API key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = email.subject(), "Mail delivery disabled, message not sent");
        debug!(body = %email.text(), "Undelivered message body");
        Ok(())
    }
}

/// Keeps every message in memory so tests and demos can read codes back.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|email| match email.kind {
            EmailKind::SignupCode { code } if email.to == to => Some(code),
            _ => None,
        })
    }

    pub fn last_reset_link_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|email| match email.kind {
            EmailKind::PasswordReset { link } if email.to == to => Some(link),
            _ => None,
        })
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.clone());
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key, &config.mail_from)),
        None => Arc::new(LogMailer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_signup_email_contains_code_and_expiry() {
        let email = OutgoingEmail::signup_code("jane@x.com", "042917");
        assert_eq!(email.subject(), "Verify Your Email Address");
        assert!(email.html().contains("042917"));
        assert!(email.text().contains("expire in 24 hours"));
    }

    #[test]
    fn test_reset_link_is_escaped() {
        let email = OutgoingEmail::password_reset("jane@x.com", "https://site/auth/reset?token=a&b=\"c\"");
        assert_eq!(email.subject(), "Reset Your Password");
        assert!(email.html().contains("token=a&amp;b=&quot;c&quot;"));
        assert!(email.text().contains("expire in 1 hour"));
    }

    #[tokio::test]
    async fn test_memory_mailer_returns_latest_code() {
        let mailer = MemoryMailer::new();
        mailer.send(&OutgoingEmail::signup_code("a@x.com", "111111")).await.unwrap();
        mailer.send(&OutgoingEmail::signup_code("b@x.com", "222222")).await.unwrap();
        mailer.send(&OutgoingEmail::signup_code("a@x.com", "333333")).await.unwrap();

        assert_eq!(mailer.last_code_for("a@x.com").as_deref(), Some("333333"));
        assert_eq!(mailer.last_code_for("c@x.com"), None);
        assert_eq!(mailer.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_resend_mailer_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test", "Site <hello@example.com>")
            .with_endpoint(&format!("{}/emails", server.uri()));

        mailer
            .send(&OutgoingEmail::signup_code("jane@x.com", "123456"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resend_mailer_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let mailer = ResendMailer::new("re_test", "bad").with_endpoint(&server.uri());
        let err = mailer
            .send(&OutgoingEmail::signup_code("jane@x.com", "123456"))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Rejected { status: 422, .. }));
    }
}
