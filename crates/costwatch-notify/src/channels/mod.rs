pub mod email;
pub mod log;

pub use email::{EmailNotifier, SmtpSettings};
pub use log::LogNotifier;
