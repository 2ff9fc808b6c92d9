//! E-mail delivery for cost reports.
//!
//! [`Notifier`] is the seam the weekly job talks to. [`EmailNotifier`] sends
//! HTML mail over SMTP; [`LogNotifier`] stands in when SMTP is not
//! configured. [`ReportRenderer`] turns analysis results into the HTML bodies.

pub mod channels;
pub mod error;
pub mod report_template;

use async_trait::async_trait;

pub use channels::{EmailNotifier, LogNotifier, SmtpSettings};
pub use error::{NotifyError, Result};
pub use report_template::{AdminReportParams, ReportRenderer};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivery mechanism name (`"smtp"`, `"log"`).
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// Sends one HTML message to all `recipients`. An empty list is a no-op.
    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()>;
}
