//! Report generation tools
//!
//! One form submission in, one medical report PDF out. Saving the submission
//! and emailing the PDF happen after the PDF is written and never undo it.

use serde::Serialize;
use tracing::{info, warn};

use crate::clinical::{assess, check_range, to_paragraph, Comment, Flag};
use crate::config::AppConfig;
use crate::db::Database;
use crate::delivery::ReportMailer;
use crate::models::{
    PatientDetails, QuestionnaireAnswers, QuestionnaireEntries, ReportData, ResponseRecord,
    VitalEntries, VitalsReading,
};
use crate::report::{create_report, render_pdf, write_pdf, LayoutDescriptor};

use super::auth::Session;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub file_path: String,
    pub pages: usize,
    pub bmi: Option<f64>,
    pub comments: Vec<Comment>,
    pub paragraph: String,
    /// None when the submission could not be saved
    pub record_id: Option<i64>,
    pub emailed_to: Option<String>,
    /// Non-fatal problems with saving or delivery
    pub warnings: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub bmi: Option<f64>,
    pub comments: Vec<Comment>,
    pub paragraph: String,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub value: String,
    pub range: String,
    pub flag: Flag,
    /// Text printed in the FLAG column
    pub marker: &'static str,
}

// ============================================================================
// Tools
// ============================================================================

/// Validate raw form values into report data
pub fn build_report_data(
    patient: PatientDetails,
    vitals: VitalEntries,
    answers: &QuestionnaireEntries,
) -> Result<ReportData, String> {
    let answers = QuestionnaireAnswers::from_entries(answers).map_err(|e| e.to_string())?;
    Ok(ReportData {
        patient,
        reading: VitalsReading::new(vitals),
        answers,
    })
}

/// Comments for a reading without producing a report
pub fn classify_vitals(
    vitals: VitalEntries,
    answers: &QuestionnaireEntries,
) -> Result<ClassificationResponse, String> {
    let answers = QuestionnaireAnswers::from_entries(answers).map_err(|e| e.to_string())?;
    let reading = VitalsReading::new(vitals);
    let comments = assess(&reading, &answers);

    Ok(ClassificationResponse {
        bmi: reading.bmi(),
        paragraph: to_paragraph(&comments),
        comments,
    })
}

pub fn flag_value(value: &str, range: &str) -> FlagResponse {
    let flag = check_range(value, range);
    FlagResponse {
        value: value.to_string(),
        range: range.to_string(),
        flag,
        marker: flag.as_str(),
    }
}

/// Lay out, write, save and optionally email one report
pub fn generate_report(
    db: &Database,
    config: &AppConfig,
    session: &Session,
    data: ReportData,
) -> Result<GenerateReportResponse, String> {
    let comments = assess(&data.reading, &data.answers);
    let paragraph = to_paragraph(&comments);

    let layout = LayoutDescriptor::standard(config.banner());
    let document = create_report(&data, &layout).map_err(|e| e.to_string())?;
    let bytes = render_pdf(&document).map_err(|e| e.to_string())?;

    let path = config.report_output_path();
    write_pdf(&bytes, &path).map_err(|e| e.to_string())?;
    info!(
        path = %path.display(),
        operator = %session.username,
        findings = comments.len(),
        "report generated"
    );

    let mut warnings = Vec::new();

    let record_id = match db.with_conn(|conn| ResponseRecord::create(conn, &session.username, &data)) {
        Ok(id) => {
            info!(record_id = id, "submission saved");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, "submission not saved");
            warnings.push(format!("Submission not saved: {}", e));
            None
        }
    };

    let mut emailed_to = None;
    if let Some(recipient) = data.patient.recipient() {
        match &config.smtp {
            Some(settings) => {
                match ReportMailer::new(settings.clone()).send_report(recipient, &path) {
                    Ok(()) => emailed_to = Some(recipient.to_string()),
                    Err(e) => {
                        warn!(recipient, error = %e, "report not emailed");
                        warnings.push(format!("Email not sent: {}", e));
                    }
                }
            }
            None => {
                warn!(recipient, "SMTP not configured, report not emailed");
                warnings.push("Email not sent: SMTP is not configured".to_string());
            }
        }
    }

    let message = match (&emailed_to, warnings.is_empty()) {
        (Some(to), true) => format!("Report generated and emailed to {}", to),
        (None, true) => "Report generated".to_string(),
        (_, false) => format!("Report generated with {} warning(s)", warnings.len()),
    };

    Ok(GenerateReportResponse {
        success: true,
        file_path: path.display().to_string(),
        pages: document.page_count(),
        bmi: data.reading.bmi(),
        comments,
        paragraph,
        record_id,
        emailed_to,
        warnings,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Database,
        config: AppConfig,
        session: Session,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<&str, String> = [
            ("MHM_DATABASE_PATH", dir.path().join("mhm.db").display().to_string()),
            ("MHM_OUTPUT_DIR", dir.path().join("out").display().to_string()),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned(), dir.path());
        let db = Database::open(&config.database_path).unwrap();

        crate::tools::auth::register_user(&db, "nurse", "pw", "pw").unwrap();
        let session = crate::tools::auth::login(&db, "nurse", "pw").unwrap();

        Fixture { _dir: dir, db, config, session }
    }

    fn abnormal_vitals() -> VitalEntries {
        VitalEntries {
            weight: "92.5".to_string(),
            height: "170".to_string(),
            temperature: "101".to_string(),
            o2_level: "90".to_string(),
            pulse_rate: "110".to_string(),
            blood_pressure: "150/95".to_string(),
        }
    }

    #[test]
    fn test_classify_vitals_paragraph() {
        let response = classify_vitals(abnormal_vitals(), &QuestionnaireEntries::default()).unwrap();
        assert_eq!(response.bmi, Some(32.0));
        assert_eq!(response.comments.len(), 5);
        assert_eq!(
            response.paragraph,
            "The patient is obese, the patient has high blood pressure, the patient has a fever, \
             the patient has low SpO2 (possible hypoxemia), and the patient has tachycardia (high pulse rate)."
        );
        assert_eq!(response.paragraph.matches(", ").count(), 4);
    }

    #[test]
    fn test_classify_vitals_rejects_unknown_answer() {
        let answers = QuestionnaireEntries {
            hearing: "Sometimes".to_string(),
            ..Default::default()
        };
        assert!(classify_vitals(VitalEntries::default(), &answers).is_err());
    }

    #[test]
    fn test_flag_value_tool() {
        let response = flag_value("150/95", "90/60 - 140/90");
        assert_eq!(response.flag, Flag::OutOfRange);
        assert_eq!(response.marker, "Out of range");
    }

    #[test]
    fn test_same_submission_renders_identical_pdf() {
        let data = build_report_data(
            PatientDetails {
                patient_name: "John Doe".to_string(),
                collection_date: "15/04/2025".to_string(),
                ..Default::default()
            },
            abnormal_vitals(),
            &QuestionnaireEntries::default(),
        )
        .unwrap();
        let layout = LayoutDescriptor::standard(Default::default());

        let first = render_pdf(&create_report(&data, &layout).unwrap()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = render_pdf(&create_report(&data, &layout).unwrap()).unwrap();

        assert_eq!(first.len(), second.len());
        assert!(first == second, "report bytes differ between identical calls");
    }

    #[test]
    fn test_generate_report_writes_and_saves() {
        let f = fixture();
        let data = build_report_data(
            PatientDetails {
                patient_name: "John Doe".to_string(),
                collection_date: "15/04/2025".to_string(),
                ..Default::default()
            },
            abnormal_vitals(),
            &QuestionnaireEntries::default(),
        )
        .unwrap();

        let response = generate_report(&f.db, &f.config, &f.session, data).unwrap();

        assert!(response.success);
        assert!(response.warnings.is_empty());
        assert_eq!(response.emailed_to, None);
        let bytes = std::fs::read(&response.file_path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let record = f
            .db
            .with_conn(|conn| ResponseRecord::get_by_id(conn, response.record_id.unwrap()))
            .unwrap()
            .unwrap();
        assert_eq!(record.submitted_by.as_deref(), Some("nurse"));
        assert_eq!(record.collection_date.as_deref(), Some("2025-04-15"));
    }

    #[test]
    fn test_storage_failure_is_only_a_warning() {
        let f = fixture();
        f.db.with_conn(|conn| Ok(conn.execute_batch("DROP TABLE responses")?)).unwrap();

        let data = build_report_data(PatientDetails::default(), abnormal_vitals(), &QuestionnaireEntries::default()).unwrap();
        let response = generate_report(&f.db, &f.config, &f.session, data).unwrap();

        assert_eq!(response.record_id, None);
        assert_eq!(response.warnings.len(), 1);
        assert!(response.warnings[0].starts_with("Submission not saved"));
        assert!(std::path::Path::new(&response.file_path).exists());
    }

    #[test]
    fn test_email_without_smtp_is_only_a_warning() {
        let f = fixture();
        let patient = PatientDetails {
            email: Some("patient@example.com".to_string()),
            ..Default::default()
        };
        let data = build_report_data(patient, VitalEntries::default(), &QuestionnaireEntries::default()).unwrap();
        let response = generate_report(&f.db, &f.config, &f.session, data).unwrap();

        assert_eq!(response.emailed_to, None);
        assert_eq!(response.warnings, vec!["Email not sent: SMTP is not configured".to_string()]);
        assert!(response.record_id.is_some());
        assert_eq!(response.paragraph, "No significant abnormalities detected.");
    }
}
