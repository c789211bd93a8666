//! Submission model
//!
//! Patient details, the record handed to the report renderer, and the persisted
//! `responses` row written once per form submission.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

use super::questionnaire::{Question, QuestionnaireAnswers};
use super::vitals::VitalsReading;

/// Identity block of the intake form. Missing values are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientDetails {
    /// As entered; normalised separately for storage
    pub collection_date: String,
    pub report_date: String,
    pub report_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub patient_name: String,
    pub patient_age_gender: String,
    pub patient_referee: String,
    pub patient_phone: String,
    /// Optional recipient for the generated PDF
    pub email: Option<String>,
}

impl PatientDetails {
    /// Recipient address, if one was given
    pub fn recipient(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Everything a report is rendered from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub patient: PatientDetails,
    pub reading: VitalsReading,
    pub answers: QuestionnaireAnswers,
}

/// Parse the date formats accepted on the form into a calendar date
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }

    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.date_naive())
        .ok()
}

/// A stored submission
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub id: i64,
    pub submitted_by: Option<String>,
    pub collection_date: Option<String>,
    pub report_date: Option<String>,
    pub report_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub patient_name: String,
    pub patient_age_gender: String,
    pub patient_referee: String,
    pub patient_phone: String,
    pub email: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    /// Weight and height exactly as entered
    pub weight_raw: String,
    pub height_raw: String,
    pub bmi: Option<f64>,
    pub pulse_rate: String,
    pub blood_pressure: String,
    pub o2_level: String,
    pub temperature: String,
    /// (question field, answer) in question order
    pub answers: Vec<(String, String)>,
    pub created_at: String,
}

impl ResponseRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let answers = Question::ALL
            .iter()
            .map(|q| Ok((q.as_str().to_string(), row.get::<_, String>(q.as_str())?)))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Self {
            id: row.get("id")?,
            submitted_by: row.get("submitted_by")?,
            collection_date: row.get("collection_date")?,
            report_date: row.get("report_date")?,
            report_id: row.get("report_id")?,
            patient_id: row.get("patient_id")?,
            patient_name: row.get("patient_name")?,
            patient_age_gender: row.get("patient_age_gender")?,
            patient_referee: row.get("patient_referee")?,
            patient_phone: row.get("patient_phone")?,
            email: row.get("email")?,
            weight: row.get("weight")?,
            height: row.get("height")?,
            weight_raw: row.get("weight_raw")?,
            height_raw: row.get("height_raw")?,
            bmi: row.get("bmi")?,
            pulse_rate: row.get("pulse_rate")?,
            blood_pressure: row.get("blood_pressure")?,
            o2_level: row.get("o2_level")?,
            temperature: row.get("temperature")?,
            answers,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert one submission and return its row id
    pub fn create(conn: &Connection, submitted_by: &str, data: &ReportData) -> DbResult<i64> {
        let patient = &data.patient;
        let entries = data.reading.entries();
        let answer = |q: Question| data.answers.get(q).unwrap_or("");

        let collection_date = parse_date(&patient.collection_date).map(|d| d.to_string());
        let report_date = parse_date(&patient.report_date).map(|d| d.to_string());

        conn.execute(
            r#"
            INSERT INTO responses (
                submitted_by, collection_date, report_date, report_id, patient_id,
                patient_name, patient_age_gender, patient_referee, patient_phone, email,
                weight, height, bmi, pulse_rate, blood_pressure, o2_level, temperature,
                vision, breathing, hearing, skin_condition, oral_health, urine_color,
                hair_loss, nail_changes, cataract, disabilities, weight_raw, height_raw
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
            )
            "#,
            params![
                submitted_by,
                collection_date,
                report_date,
                patient.report_id,
                patient.patient_id,
                patient.patient_name,
                patient.patient_age_gender,
                patient.patient_referee,
                patient.patient_phone,
                patient.recipient(),
                data.reading.weight_kg(),
                data.reading.height_cm(),
                data.reading.bmi(),
                entries.pulse_rate.trim(),
                entries.blood_pressure.trim(),
                entries.o2_level.trim(),
                entries.temperature.trim(),
                answer(Question::Vision),
                answer(Question::Breathing),
                answer(Question::Hearing),
                answer(Question::SkinCondition),
                answer(Question::OralHealth),
                answer(Question::UrineColor),
                answer(Question::HairLoss),
                answer(Question::NailChanges),
                answer(Question::Cataract),
                answer(Question::Disabilities),
                entries.weight.trim(),
                entries.height.trim(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM responses WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{QuestionnaireEntries, VitalEntries};

    fn sample_data() -> ReportData {
        let answers = QuestionnaireAnswers::from_entries(&QuestionnaireEntries {
            hair_loss: "Yes, mild hair loss".to_string(),
            vision: "Yes".to_string(),
            ..Default::default()
        })
        .unwrap();

        ReportData {
            patient: PatientDetails {
                collection_date: "15/04/2025".to_string(),
                report_date: "not a date".to_string(),
                report_id: Some(1001),
                patient_id: Some(5001),
                patient_name: "John Doe".to_string(),
                email: Some("  ".to_string()),
                ..Default::default()
            },
            reading: VitalsReading::new(VitalEntries {
                weight: "70".to_string(),
                height: "175".to_string(),
                blood_pressure: "120/80".to_string(),
                ..Default::default()
            }),
            answers,
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 15);
        assert_eq!(parse_date("2025-04-15"), expected);
        assert_eq!(parse_date("15-04-2025"), expected);
        assert_eq!(parse_date("15/04/2025"), expected);
        assert_eq!(parse_date("2025/04/15"), expected);
        assert_eq!(parse_date("2025-04-15T09:30:00Z"), expected);
        assert_eq!(parse_date("April"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_create_and_read_back() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let id = ResponseRecord::create(&conn, "nurse", &sample_data()).unwrap();
        let record = ResponseRecord::get_by_id(&conn, id).unwrap().unwrap();

        assert_eq!(record.submitted_by.as_deref(), Some("nurse"));
        assert_eq!(record.collection_date.as_deref(), Some("2025-04-15"));
        assert_eq!(record.report_date, None);
        assert_eq!(record.patient_id, Some(5001));
        assert_eq!(record.email, None);
        assert_eq!(record.bmi, Some(22.9));
        assert_eq!(record.blood_pressure, "120/80");
        assert_eq!(record.answers.len(), Question::ALL.len());
        assert!(record.answers.contains(&("hair_loss".to_string(), "Yes, mild hair loss".to_string())));
        assert!(record.answers.contains(&("cataract".to_string(), String::new())));
    }

    #[test]
    fn test_unparseable_weight_keeps_raw_text() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let mut data = sample_data();
        data.reading = VitalsReading::new(VitalEntries {
            weight: " heavy ".to_string(),
            height: "175".to_string(),
            ..Default::default()
        });
        let id = ResponseRecord::create(&conn, "nurse", &data).unwrap();
        let record = ResponseRecord::get_by_id(&conn, id).unwrap().unwrap();

        assert_eq!(record.weight, None);
        assert_eq!(record.weight_raw, "heavy");
        assert_eq!(record.height, Some(175.0));
        assert_eq!(record.height_raw, "175");
        assert_eq!(record.bmi, None);
    }

    #[test]
    fn test_get_missing_record() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert!(ResponseRecord::get_by_id(&conn, 42).unwrap().is_none());
    }
}
