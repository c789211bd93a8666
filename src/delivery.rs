//! Report delivery
//!
//! Mails a generated report as a PDF attachment over an authenticated
//! STARTTLS SMTP session.

use std::fmt;
use std::fs;
use std::path::Path;

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::info;

use crate::report::REPORT_FILE_NAME;

pub const SUBJECT: &str = "Medical Diagnostic Report";
pub const BODY: &str = "Attached is your medical diagnostic report.";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("Invalid attachment type: {0}")]
    ContentType(String),

    #[error("Could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Could not read report: {0}")]
    Io(#[from] std::io::Error),
}

/// SMTP account used as the sender
#[derive(Clone, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.trim().parse().map_err(|source| DeliveryError::Address {
        address: address.to_string(),
        source,
    })
}

/// The report email: fixed subject and body, one recipient, one PDF attachment
pub fn build_message(from: &str, to: &str, pdf: Vec<u8>) -> Result<Message, DeliveryError> {
    let pdf_type =
        ContentType::parse("application/pdf").map_err(|e| DeliveryError::ContentType(e.to_string()))?;
    let attachment = Attachment::new(REPORT_FILE_NAME.to_string()).body(pdf, pdf_type);

    let message = Message::builder()
        .from(mailbox(from)?)
        .to(mailbox(to)?)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(attachment),
        )?;
    Ok(message)
}

pub struct ReportMailer {
    settings: SmtpSettings,
}

impl ReportMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Send the PDF at `pdf_path` to `recipient`. Blocks until the server answers.
    pub fn send_report(&self, recipient: &str, pdf_path: &Path) -> Result<(), DeliveryError> {
        let pdf = fs::read(pdf_path)?;
        let message = build_message(&self.settings.username, recipient, pdf)?;

        let credentials = Credentials::new(self.settings.username.clone(), self.settings.password.clone());
        let transport = SmtpTransport::starttls_relay(&self.settings.host)?
            .port(self.settings.port)
            .credentials(credentials)
            .build();

        transport.send(&message)?;
        info!(recipient, host = %self.settings.host, "report emailed");
        Ok(())
    }
}
