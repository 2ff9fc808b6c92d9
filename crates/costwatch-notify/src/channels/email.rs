use crate::error::{NotifyError, Result};
use crate::Notifier;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: String,
}

/// Sends one HTML message per call, addressed to every recipient at once.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl EmailNotifier {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        if settings.host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("smtp host is empty".to_string()));
        }
        let sender = parse_mailbox(&settings.sender)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?
            .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    fn build_message(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }
        Ok(builder.body(html_body.to_string())?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()> {
        if recipients.is_empty() {
            tracing::warn!(subject, "No recipients, e-mail skipped");
            return Ok(());
        }
        let email = self.build_message(recipients, subject, html_body)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        tracing::info!(recipients = recipients.len(), subject, "E-mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            sender: "costs@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn message_is_html_and_addressed_to_all_recipients() {
        let notifier = EmailNotifier::new(&settings()).unwrap();
        let msg = notifier
            .build_message(
                &["a@example.com".to_string(), "b@example.com".to_string()],
                "Weekly",
                "<p>hi</p>",
            )
            .unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        let to_line = raw.lines().find(|l| l.starts_with("To: ")).unwrap();
        assert!(to_line.contains("a@example.com"));
        assert!(to_line.contains("b@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("Subject: Weekly"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected() {
        let notifier = EmailNotifier::new(&settings()).unwrap();
        let err = notifier
            .build_message(&["not-an-address".to_string()], "s", "b")
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidAddress { .. }));
    }

    #[test]
    fn invalid_sender_or_host_is_rejected() {
        let mut s = settings();
        s.sender = "nope".to_string();
        assert!(matches!(
            EmailNotifier::new(&s),
            Err(NotifyError::InvalidAddress { .. })
        ));

        let mut s = settings();
        s.host = " ".to_string();
        assert!(matches!(
            EmailNotifier::new(&s),
            Err(NotifyError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_no_op() {
        let notifier = EmailNotifier::new(&settings()).unwrap();
        notifier.send(&[], "s", "b").await.unwrap();
    }
}
