//! Data models
//!
//! Form values, validated readings and the rows they are stored as.

mod questionnaire;
mod submission;
mod user;
mod vitals;

pub use questionnaire::{
    Question, QuestionnaireAnswer, QuestionnaireAnswers, QuestionnaireEntries, ValidationError,
};
pub use submission::{parse_date, PatientDetails, ReportData, ResponseRecord};
pub use user::User;
pub use vitals::{calculate_bmi, VitalEntries, VitalKind, VitalsReading};
