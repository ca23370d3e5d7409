//! Outgoing mail.
//!
//! Flows never send mail inline. They put an [`OutgoingEmail`] on the bounded
//! [`EmailQueue`] and move on; a single worker task drains the queue through a
//! [`Notifier`]. When the queue is full the new message is dropped: the token
//! it carries stays valid and the user can ask for another link.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use classmark_config::EmailConfig;
use classmark_core::AppError;

use crate::metrics::track_email_dropped;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}

/// Sends through one pooled async SMTP transport built at startup.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Uses STARTTLS relay with credentials when `SMTP_USERNAME` is set,
    /// otherwise a plain connection (local catchers such as MailHog).
    pub fn new(config: &EmailConfig) -> Result<Self, AppError> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| AppError::internal_error(format!("Invalid FROM_EMAIL: {}", e)))?;

        let builder = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::internal_error(format!("Invalid SMTP relay: {}", e)))?
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
        };

        Ok(Self {
            transport: builder.port(config.smtp_port).build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, html_body))]
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html_body.to_string()),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::internal_error(format!("SMTP delivery failed: {}", e)))?;
        Ok(())
    }
}

/// Logs mail instead of sending it. Used when SMTP is disabled.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        info!(recipient, subject, bytes = html_body.len(), "Email not sent, SMTP disabled");
        Ok(())
    }
}

/// SMTP when `SMTP_ENABLED`, else [`LogNotifier`]. A broken SMTP setup
/// falls back to logging.
pub fn build_notifier(config: &EmailConfig) -> Arc<dyn Notifier> {
    if !config.enabled {
        return Arc::new(LogNotifier);
    }
    match SmtpNotifier::new(config) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            error!(error = ?e.error, "SMTP notifier unavailable, logging emails instead");
            Arc::new(LogNotifier)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailQueueError {
    #[error("email queue is full")]
    Full,
    #[error("email worker has stopped")]
    Closed,
}

#[derive(Clone, Debug)]
pub struct EmailQueue {
    sender: mpsc::Sender<OutgoingEmail>,
}

impl EmailQueue {
    /// A queue and the receiving end the worker drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutgoingEmail>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Creates the queue and spawns its worker.
    pub fn start(capacity: usize, notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = Self::channel(capacity);
        let worker = tokio::spawn(run_email_worker(receiver, notifier));
        (queue, worker)
    }

    /// Queues `email` without waiting.
    pub fn enqueue(&self, email: OutgoingEmail) -> Result<(), EmailQueueError> {
        match self.sender.try_send(email) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                track_email_dropped();
                warn!(recipient = %dropped.recipient, "Email queue full, dropping message");
                Err(EmailQueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(recipient = %dropped.recipient, "Email worker stopped, dropping message");
                Err(EmailQueueError::Closed)
            }
        }
    }
}

/// Sends queued mail until every [`EmailQueue`] handle is dropped.
pub async fn run_email_worker(
    mut receiver: mpsc::Receiver<OutgoingEmail>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some(email) = receiver.recv().await {
        match notifier
            .send(&email.recipient, &email.subject, &email.html_body)
            .await
        {
            Ok(()) => debug!(recipient = %email.recipient, "Email sent"),
            Err(e) => {
                error!(recipient = %email.recipient, error = ?e.error, "Failed to send email")
            }
        }
    }
    debug!("Email worker stopped");
}

pub mod templates {
    use super::OutgoingEmail;

    const FOOTER: &str = "Sent automatically by Classmark. Replies are not read.";

    fn layout(accent: &str, title: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="margin:0;background:#eef1f5;font-family:Helvetica,Arial,sans-serif;">
  <div style="max-width:560px;margin:24px auto;background:#fff;
              border-top:6px solid {accent};border-radius:6px;">
    <div style="padding:28px 32px;color:#444;font-size:15px;line-height:1.6;">
      <p style="margin:0 0 4px;color:{accent};font-weight:bold;letter-spacing:1px;">CLASSMARK</p>
      <h2 style="margin:0 0 18px;color:#222;">{title}</h2>
      {content}
    </div>
    <div style="padding:14px 32px;border-top:1px solid #e3e6ea;color:#999;font-size:12px;">
      {FOOTER}
    </div>
  </div>
</body>
</html>"#
        )
    }

    fn link_button(label: &str, link: &str) -> String {
        format!(
            r#"<p style="margin:24px 0;"><a href="{link}"
        style="background:#3949ab;color:#fff;padding:12px 28px;
               border-radius:4px;text-decoration:none;"
        >{label}</a></p>
      <p style="font-size:13px;word-break:break-all;">
        Or paste this address into your browser: {link}
      </p>"#
        )
    }

    pub fn password_reset(
        recipient: &str,
        name: &str,
        link: &str,
        ttl_minutes: i64,
    ) -> OutgoingEmail {
        let content = format!(
            "<p>Hi <strong>{name}</strong>,</p>\
             <p>We received a request to reset your password. \
             Use the link below to choose a new one.</p>\
             {}\
             <p><strong>This link expires in {ttl_minutes} minutes and works once.</strong></p>\
             <p>If you didn't request this, you can ignore this email.</p>",
            link_button("Reset Password", link)
        );
        OutgoingEmail {
            recipient: recipient.to_string(),
            subject: "Password Reset Request".to_string(),
            html_body: layout("#4F46E5", "Password Reset Request", &content),
        }
    }

    pub fn password_changed(recipient: &str, name: &str) -> OutgoingEmail {
        let content = format!(
            "<p>Hi <strong>{name}</strong>,</p>\
             <p>Your password has been changed and every signed-in session was signed out.</p>\
             <p><strong>If you didn't make this change, \
             contact your school administrator immediately.</strong></p>"
        );
        OutgoingEmail {
            recipient: recipient.to_string(),
            subject: "Password Changed".to_string(),
            html_body: layout("#10B981", "Password Changed", &content),
        }
    }

    pub fn student_login(
        recipient: &str,
        name: &str,
        link: &str,
        ttl_minutes: i64,
    ) -> OutgoingEmail {
        let content = format!(
            "<p>Hi <strong>{name}</strong>,</p>\
             <p>Use the link below to sign in to Classmark.</p>\
             {}\
             <p><strong>This link expires in {ttl_minutes} minutes and works once.</strong></p>",
            link_button("Sign In", link)
        );
        OutgoingEmail {
            recipient: recipient.to_string(),
            subject: "Your Classmark sign-in link".to_string(),
            html_body: layout("#4F46E5", "Sign In", &content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient: &str, _: &str, _: &str) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(recipient.to_string());
            Ok(())
        }
    }

    fn email(to: &str) -> OutgoingEmail {
        templates::password_changed(to, "Ada Lovelace")
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (queue, mut receiver) = EmailQueue::channel(1);
        assert!(queue.enqueue(email("first@school.edu")).is_ok());
        assert_eq!(queue.enqueue(email("second@school.edu")), Err(EmailQueueError::Full));

        assert_eq!(receiver.try_recv().unwrap().recipient, "first@school.edu");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_closed_queue() {
        let (queue, receiver) = EmailQueue::channel(4);
        drop(receiver);
        assert_eq!(queue.enqueue(email("a@school.edu")), Err(EmailQueueError::Closed));
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = EmailQueue::start(8, notifier.clone());
        queue.enqueue(email("a@school.edu")).unwrap();
        queue.enqueue(email("b@school.edu")).unwrap();
        drop(queue);
        worker.await.unwrap();

        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["a@school.edu".to_string(), "b@school.edu".to_string()]
        );
    }

    #[test]
    fn test_reset_template_contains_link() {
        let email = templates::password_reset(
            "t@school.edu",
            "Ada Lovelace",
            "http://localhost:5173/teacher/reset-password?token=abc",
            60,
        );
        assert_eq!(email.recipient, "t@school.edu");
        assert!(email.html_body.contains("reset-password?token=abc"));
        assert!(email.html_body.contains("60 minutes"));
    }
}
