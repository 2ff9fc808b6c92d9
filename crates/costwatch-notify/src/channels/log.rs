use crate::error::Result;
use crate::Notifier;
use async_trait::async_trait;

/// Stand-in used when SMTP is not configured: reports are logged, not sent.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()> {
        tracing::warn!(
            recipients = ?recipients,
            subject,
            body_len = html_body.len(),
            "SMTP not configured, e-mail not sent"
        );
        Ok(())
    }
}
