//! MHM MCP Server Implementation
//!
//! Implements the MCP server with all MHM tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::models::{PatientDetails, QuestionnaireEntries, VitalEntries};
use crate::tools::auth::{self, AuthError, Session};
use crate::tools::reports;
use crate::tools::status::StatusTracker;

/// MHM MCP Service
#[derive(Clone)]
pub struct MhmService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    config: Arc<AppConfig>,
    tool_router: ToolRouter<MhmService>,
    /// Logged-in operator of this connection
    session: Arc<std::sync::Mutex<Option<Session>>>,
}

impl MhmService {
    pub fn new(config: AppConfig, database: Database) -> Self {
        let tracker = StatusTracker::new(
            config.database_path.clone(),
            config.report_output_path(),
            config.smtp.is_some(),
        );
        Self {
            status_tracker: Arc::new(Mutex::new(tracker)),
            database,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
            session: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    fn set_session(&self, session: Option<Session>) -> Result<(), McpError> {
        let mut slot = self
            .session
            .lock()
            .map_err(|_| McpError::internal_error("Session state poisoned", None))?;
        *slot = session;
        Ok(())
    }

    fn current_session(&self) -> Result<Session, McpError> {
        let slot = self
            .session
            .lock()
            .map_err(|_| McpError::internal_error("Session state poisoned", None))?;
        slot.clone()
            .ok_or_else(|| McpError::invalid_request(AuthError::NotLoggedIn.to_string(), None))
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Argon2, SQLite, PDF rendering and SMTP all block
async fn run_blocking<T, F>(f: F) -> Result<T, McpError>
where
    F: FnOnce() -> Result<T, McpError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| McpError::internal_error(format!("Task failed: {}", e), None))?
}

fn auth_error(e: AuthError) -> McpError {
    match e {
        AuthError::Db(_) | AuthError::Hash(_) => McpError::internal_error(e.to_string(), None),
        _ => McpError::invalid_params(e.to_string(), None),
    }
}

// ============================================================================
// Response Structs
// ============================================================================

#[derive(Debug, Serialize)]
struct RegisterUserResponse {
    success: bool,
    username: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    session: Session,
    message: String,
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    success: bool,
    message: String,
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// A form value given either as a number or as text
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    fn into_text(self) -> String {
        match self {
            FormValue::Number(n) => n.to_string(),
            FormValue::Text(s) => s,
        }
    }
}

fn text(value: Option<FormValue>) -> String {
    value.map(FormValue::into_text).unwrap_or_default()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RegisterUserParams {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct PatientParams {
    /// YYYY-MM-DD, DD-MM-YYYY, DD/MM/YYYY or YYYY/MM/DD
    pub collection_date: Option<String>,
    pub report_date: Option<String>,
    pub report_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub patient_name: Option<String>,
    /// e.g. "45/M"
    pub patient_age_gender: Option<String>,
    /// Referring doctor
    pub patient_referee: Option<String>,
    pub patient_phone: Option<String>,
    /// Recipient of the PDF
    pub email: Option<String>,
}

impl From<PatientParams> for PatientDetails {
    fn from(p: PatientParams) -> Self {
        Self {
            collection_date: p.collection_date.unwrap_or_default(),
            report_date: p.report_date.unwrap_or_default(),
            report_id: p.report_id,
            patient_id: p.patient_id,
            patient_name: p.patient_name.unwrap_or_default(),
            patient_age_gender: p.patient_age_gender.unwrap_or_default(),
            patient_referee: p.patient_referee.unwrap_or_default(),
            patient_phone: p.patient_phone.unwrap_or_default(),
            email: p.email,
        }
    }
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct VitalsParams {
    /// kg
    pub weight: Option<FormValue>,
    /// cm
    pub height: Option<FormValue>,
    /// °F
    pub temperature: Option<FormValue>,
    /// SpO2 in %
    pub o2_level: Option<FormValue>,
    /// bpm
    pub pulse_rate: Option<FormValue>,
    /// "systolic/diastolic" in mmHg
    pub blood_pressure: Option<FormValue>,
}

impl From<VitalsParams> for VitalEntries {
    fn from(p: VitalsParams) -> Self {
        Self {
            weight: text(p.weight),
            height: text(p.height),
            pulse_rate: text(p.pulse_rate),
            blood_pressure: text(p.blood_pressure),
            o2_level: text(p.o2_level),
            temperature: text(p.temperature),
        }
    }
}

/// Questionnaire answers; each must be one of the question's options
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct AnswersParams {
    /// Yes / No / Not Sure
    pub vision: Option<String>,
    /// No difficulty / Often, even at rest / Occasionally, during physical activity / Only during certain conditions
    pub breathing: Option<String>,
    /// No / Yes, in one ear / Yes, in both ears / Not Sure
    pub hearing: Option<String>,
    /// Not Sure / Yes, mild / Yes, moderate / Yes, severe
    pub skin_condition: Option<String>,
    /// No issues / Bleeding gums / Bad breath / Frequent mouth ulcers / Tooth pain or sensitivity
    pub oral_health: Option<String>,
    /// Clear / Pale yellow / Dark yellow / Brownish/red (seek medical attention)
    pub urine_color: Option<String>,
    /// No / Yes, mild hair loss / Yes, moderate hair loss / Yes, severe hair loss
    pub hair_loss: Option<String>,
    /// No / Yes, white spots / Yes, yellowing / Yes, dark streaks
    pub nail_changes: Option<String>,
    /// No / Yes, diagnosed by a doctor / Yes, not diagnosed yet
    pub cataract: Option<String>,
    /// No / Yes, partial mobility issues / Yes, require walking aids / Yes, fully dependent on assistance
    pub disabilities: Option<String>,
}

impl From<AnswersParams> for QuestionnaireEntries {
    fn from(p: AnswersParams) -> Self {
        Self {
            vision: p.vision.unwrap_or_default(),
            breathing: p.breathing.unwrap_or_default(),
            hearing: p.hearing.unwrap_or_default(),
            skin_condition: p.skin_condition.unwrap_or_default(),
            oral_health: p.oral_health.unwrap_or_default(),
            urine_color: p.urine_color.unwrap_or_default(),
            hair_loss: p.hair_loss.unwrap_or_default(),
            nail_changes: p.nail_changes.unwrap_or_default(),
            cataract: p.cataract.unwrap_or_default(),
            disabilities: p.disabilities.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClassifyVitalsParams {
    #[serde(default)]
    pub vitals: VitalsParams,
    #[serde(default)]
    pub answers: AnswersParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FlagValueParams {
    /// e.g. "98%", "72 bpm", "150/95"
    pub value: String,
    /// e.g. "94-100%", "60-100", "90/60 - 140/90"
    pub range: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateReportParams {
    #[serde(default)]
    pub patient: PatientParams,
    #[serde(default)]
    pub vitals: VitalsParams,
    #[serde(default)]
    pub answers: AnswersParams,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl MhmService {
    // --- Status ---

    #[tool(description = "Get the current status of the MHM service including build info, database status, report path and process information")]
    async fn mhm_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        json_result(&status)
    }

    #[tool(description = "Get instructions for producing a medical report: session flow, form fields, questionnaire options and what the PDF contains. Call this before the first report.")]
    fn report_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::REPORT_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(REPORT_INSTRUCTIONS)]))
    }

    // --- Session ---

    #[tool(description = "Register a new operator account")]
    async fn register_user(&self, Parameters(p): Parameters<RegisterUserParams>) -> Result<CallToolResult, McpError> {
        let database = self.database.clone();
        let user = run_blocking(move || {
            auth::register_user(&database, &p.username, &p.password, &p.confirm_password)
                .map_err(auth_error)
        })
        .await?;
        json_result(&RegisterUserResponse {
            success: true,
            message: format!("User '{}' registered. You can now log in.", user.username),
            username: user.username,
        })
    }

    #[tool(description = "Log in as an operator. Required before generate_report.")]
    async fn login(&self, Parameters(p): Parameters<LoginParams>) -> Result<CallToolResult, McpError> {
        let database = self.database.clone();
        let session =
            run_blocking(move || auth::login(&database, &p.username, &p.password).map_err(auth_error))
                .await?;
        self.set_session(Some(session.clone()))?;
        json_result(&LoginResponse {
            success: true,
            message: format!("Logged in as {}", session.username),
            session,
        })
    }

    #[tool(description = "Log out the current operator")]
    fn logout(&self) -> Result<CallToolResult, McpError> {
        let previous = self.current_session().ok();
        self.set_session(None)?;
        if let Some(session) = &previous {
            info!(username = %session.username, "logout");
        }
        json_result(&LogoutResponse {
            success: true,
            message: match previous {
                Some(session) => format!("Logged out {}", session.username),
                None => "No active session".to_string(),
            },
        })
    }

    // --- Classification ---

    #[tool(description = "Classify vitals and questionnaire answers without generating a report. Returns BMI, each comment with its source and severity, and the joined paragraph.")]
    fn classify_vitals(&self, Parameters(p): Parameters<ClassifyVitalsParams>) -> Result<CallToolResult, McpError> {
        let result = reports::classify_vitals(p.vitals.into(), &p.answers.into())
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Check one value against a reference range as printed in the report's FLAG column. Returns 'Out of range', '' or 'Invalid input'.")]
    fn flag_value(&self, Parameters(p): Parameters<FlagValueParams>) -> Result<CallToolResult, McpError> {
        json_result(&reports::flag_value(&p.value, &p.range))
    }

    // --- Reports ---

    #[tool(description = "Generate the medical diagnostic report PDF for one intake form. Requires login. Saves the submission and emails the PDF when an email is given; failures of either are returned as warnings.")]
    async fn generate_report(&self, Parameters(p): Parameters<GenerateReportParams>) -> Result<CallToolResult, McpError> {
        let session = self.current_session()?;
        let data = reports::build_report_data(p.patient.into(), p.vitals.into(), &p.answers.into())
            .map_err(|e| McpError::invalid_params(e, None))?;

        let database = self.database.clone();
        let config = Arc::clone(&self.config);
        let result = run_blocking(move || {
            reports::generate_report(&database, &config, &session, data)
                .map_err(|e| McpError::internal_error(e, None))
        })
        .await?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MhmService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mhm".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Mobile Health Measurement".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Mobile Health Measurement (MHM) - patient intake and medical diagnostic reports. \
                 IMPORTANT: Call report_instructions before the first report. \
                 Session: register_user, login, logout. \
                 Reports: generate_report (requires login). \
                 Checks: classify_vitals, flag_value. \
                 Status: mhm_status."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use std::collections::HashMap;

    fn service(dir: &tempfile::TempDir) -> MhmService {
        let vars: HashMap<&str, String> = [
            ("MHM_DATABASE_PATH", dir.path().join("mhm.db").display().to_string()),
            ("MHM_OUTPUT_DIR", dir.path().join("out").display().to_string()),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned(), dir.path());
        let database = Database::open(&config.database_path).unwrap();
        MhmService::new(config, database)
    }

    fn empty_form() -> Parameters<GenerateReportParams> {
        Parameters(serde_json::from_str("{}").unwrap())
    }

    #[tokio::test]
    async fn test_generate_report_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);

        let err = service.generate_report(empty_form()).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(err.message, AuthError::NotLoggedIn.to_string());
        assert!(!service.config.report_output_path().exists());
    }

    #[tokio::test]
    async fn test_login_then_logout_gates_reports() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);

        let register: RegisterUserParams = serde_json::from_str(
            r#"{"username": "nurse", "password": "pw", "confirm_password": "pw"}"#,
        )
        .unwrap();
        service.register_user(Parameters(register)).await.unwrap();
        let login: LoginParams =
            serde_json::from_str(r#"{"username": "nurse", "password": "pw"}"#).unwrap();
        service.login(Parameters(login)).await.unwrap();

        service.generate_report(empty_form()).await.unwrap();
        assert!(service.config.report_output_path().exists());

        service.logout().unwrap();
        let err = service.generate_report(empty_form()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn test_form_value_accepts_numbers_and_text() {
        let vitals: VitalsParams = serde_json::from_str(
            r#"{"temperature": 101.0, "o2_level": "90", "pulse_rate": 110, "blood_pressure": "150/95"}"#,
        )
        .unwrap();
        let entries: VitalEntries = vitals.into();
        assert_eq!(entries.temperature, "101");
        assert_eq!(entries.o2_level, "90");
        assert_eq!(entries.pulse_rate, "110");
        assert_eq!(entries.blood_pressure, "150/95");
        assert_eq!(entries.weight, "");
    }

    #[test]
    fn test_generate_report_params_default_to_empty() {
        let p: GenerateReportParams = serde_json::from_str("{}").unwrap();
        let patient: PatientDetails = p.patient.into();
        assert_eq!(patient, PatientDetails::default());
    }
}
