//! Report generation
//!
//! Layout of the medical report and its rendering to PDF.

pub mod document;
pub mod layout;
pub mod pdf;

use thiserror::Error;

pub use document::{Align, Document, DrawOp, FontStyle, Page, Rgb};
pub use layout::{
    create_report, AnswerField, Banner, Column, LayoutDescriptor, PageGeometry, PatientField,
    ReportRenderer, SectionSpec, VitalField,
};
pub use pdf::{render_pdf, write_pdf};

/// Fixed name of the generated report, also used for the email attachment
pub const REPORT_FILE_NAME: &str = "medical_report.pdf";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Layout error: {0}")]
    Layout(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Could not write report: {0}")]
    Io(#[from] std::io::Error),
}
