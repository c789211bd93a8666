//! MHM Status Tool
//!
//! Runtime status of the service and the usage guide served to assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Report generation instructions for AI assistants
pub const REPORT_INSTRUCTIONS: &str = r#"
# MHM Report Generation Instructions

This guide explains how to turn one intake form into a medical diagnostic report
using the Mobile Health Measurement (MHM) tools.

## Sessions

Every report is generated on behalf of a logged-in operator.

1. `register_user` once per operator (username, password, confirm_password)
2. `login` at the start of a session
3. `generate_report` as many times as needed
4. `logout` when done

Calling `generate_report` without a session fails with "Not logged in".

---

## Form Fields

### Patient details (all optional, missing values print as blanks)
- `collection_date`, `report_date`: YYYY-MM-DD, DD-MM-YYYY, DD/MM/YYYY or YYYY/MM/DD.
  The report prints them as entered; storage normalises them to YYYY-MM-DD.
- `report_id`, `patient_id`: integers
- `patient_name`, `patient_age_gender` (e.g. "45/M"), `patient_referee`, `patient_phone`
- `email`: when given, the PDF is mailed to this address

### Vitals (numbers or text, units optional)
| Field | Unit | Example |
|-------|------|---------|
| weight | kg | 70 |
| height | cm | 175 |
| temperature | °F | 98.6 |
| o2_level | % | 97 |
| pulse_rate | bpm | 72 |
| blood_pressure | mmHg | "120/80" |

BMI is always computed from weight and height. It cannot be supplied.

A value that cannot be read (e.g. "12O/80", "hot") is not an error: the report
carries an "invalid ... reading" comment for that vital and every other vital is
still assessed.

### Questionnaire
Answers must be one of the listed options (case-insensitive). Leave a question
out to record it as unanswered. Call `report_instructions` or read the error
message of a rejected answer for the full option lists.

---

## What the report contains

1. Banner, collection/report dates, patient block
2. Body Vitals table: VITALS, RESULT, FLAG, REF. RANGE, UNIT
   FLAG is "Out of range", "Invalid input" or blank
3. General Health Questions table
4. Comments: every finding joined into one paragraph, or
   "No significant abnormalities detected."

The PDF is always written to `<output_dir>/medical_report.pdf` and replaces the
previous report.

---

## Failures that do not stop a report

- Saving the submission to the database
- Emailing the PDF (also skipped when SMTP is not configured)

Both are returned in `warnings`; the PDF is still generated.

---

## Checking values without a report

- `classify_vitals`: the comments and paragraph for a set of vitals and answers
- `flag_value`: one value against one reference range, e.g. ("150/95", "90/60 - 140/90")
"#;

/// Runtime status of the MHM service
#[derive(Debug, Clone, Serialize)]
pub struct MhmStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Where reports are written
    pub report_path: String,
    pub email_enabled: bool,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    report_path: PathBuf,
    email_enabled: bool,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, report_path: PathBuf, email_enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            report_path,
            email_enabled,
        }
    }

    pub fn get_status(&self) -> MhmStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MhmStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            report_path: self.report_path.display().to_string(),
            email_enabled: self.email_enabled,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
