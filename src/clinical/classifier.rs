//! Vitals classifier
//!
//! Turns a reading and the questionnaire answers into plain-language comments.
//! Each metric is judged on its own; a malformed value produces an
//! "invalid ... reading" comment for that metric only and an empty value
//! produces nothing.

use std::fmt;

use serde::Serialize;

use crate::models::{Question, QuestionnaireAnswers, VitalKind, VitalsReading};

use super::measure::{parse_measurement, parse_pair};

// ============================================================================
// Thresholds
// ============================================================================

pub const BMI_UNDERWEIGHT_BELOW: f64 = 18.5;
pub const BMI_OVERWEIGHT_FROM: f64 = 25.0;
pub const BMI_OBESE_FROM: f64 = 30.0;

pub const SYSTOLIC_LOW_BELOW: f64 = 90.0;
pub const DIASTOLIC_LOW_BELOW: f64 = 60.0;
pub const SYSTOLIC_HIGH_ABOVE: f64 = 120.0;
pub const DIASTOLIC_HIGH_ABOVE: f64 = 80.0;

/// °F
pub const TEMPERATURE_LOW_BELOW: f64 = 97.8;
pub const TEMPERATURE_HIGH_ABOVE: f64 = 99.1;

pub const SPO2_LOW_BELOW: f64 = 94.0;
pub const SPO2_MAX: f64 = 100.0;

pub const PULSE_LOW_BELOW: f64 = 60.0;
pub const PULSE_HIGH_ABOVE: f64 = 100.0;

// ============================================================================
// Comment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    High,
    Invalid,
    /// Needs a doctor now
    Urgent,
    /// Needs a closer look
    Inspect,
}

/// What a comment is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum CommentSource {
    Vital(VitalKind),
    Question(Question),
}

/// One finding, rendered into the report narrative only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub source: CommentSource,
    pub severity: Severity,
    pub text: String,
}

impl Comment {
    fn vital(kind: VitalKind, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            source: CommentSource::Vital(kind),
            severity,
            text: text.into(),
        }
    }

    fn invalid(kind: VitalKind, label: &str) -> Self {
        Self::vital(kind, Severity::Invalid, format!("invalid {} reading", label))
    }
}

impl AsRef<str> for Comment {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// Numeric vitals
// ============================================================================

/// Comments for BMI, blood pressure, temperature, SpO2 and pulse, in that order
pub fn classify_numeric(reading: &VitalsReading) -> Vec<Comment> {
    [
        classify_bmi(reading),
        classify_blood_pressure(reading.raw(VitalKind::BloodPressure)),
        classify_temperature(reading.raw(VitalKind::Temperature)),
        classify_spo2(reading.raw(VitalKind::OxygenSaturation)),
        classify_pulse(reading.raw(VitalKind::PulseRate)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn classify_bmi(reading: &VitalsReading) -> Option<Comment> {
    let entries = reading.entries();
    if entries.weight.trim().is_empty() || entries.height.trim().is_empty() {
        return None;
    }

    let Some(bmi) = reading.bmi() else {
        return Some(Comment::invalid(VitalKind::Bmi, "BMI"));
    };

    let (severity, text) = if bmi < BMI_UNDERWEIGHT_BELOW {
        (Severity::Low, "the patient is underweight")
    } else if bmi < BMI_OVERWEIGHT_FROM {
        return None;
    } else if bmi < BMI_OBESE_FROM {
        (Severity::High, "the patient is overweight")
    } else {
        (Severity::High, "the patient is obese")
    };
    Some(Comment::vital(VitalKind::Bmi, severity, text))
}

fn classify_blood_pressure(raw: &str) -> Option<Comment> {
    if raw.trim().is_empty() {
        return None;
    }

    let Some((systolic, diastolic)) = parse_pair(raw) else {
        return Some(Comment::invalid(VitalKind::BloodPressure, "blood pressure"));
    };

    if systolic < SYSTOLIC_LOW_BELOW || diastolic < DIASTOLIC_LOW_BELOW {
        Some(Comment::vital(
            VitalKind::BloodPressure,
            Severity::Low,
            "the patient has low blood pressure",
        ))
    } else if systolic > SYSTOLIC_HIGH_ABOVE || diastolic > DIASTOLIC_HIGH_ABOVE {
        Some(Comment::vital(
            VitalKind::BloodPressure,
            Severity::High,
            "the patient has high blood pressure",
        ))
    } else {
        None
    }
}

/// Shared shape of the single-number metrics
struct Band {
    kind: VitalKind,
    label: &'static str,
    low_below: f64,
    high_above: f64,
    low_text: &'static str,
    high_text: &'static str,
}

const TEMPERATURE_BAND: Band = Band {
    kind: VitalKind::Temperature,
    label: "temperature",
    low_below: TEMPERATURE_LOW_BELOW,
    high_above: TEMPERATURE_HIGH_ABOVE,
    low_text: "the patient has a low body temperature",
    high_text: "the patient has a fever",
};

const SPO2_BAND: Band = Band {
    kind: VitalKind::OxygenSaturation,
    label: "SpO2",
    low_below: SPO2_LOW_BELOW,
    high_above: SPO2_MAX,
    low_text: "the patient has low SpO2 (possible hypoxemia)",
    high_text: "the patient has abnormally high SpO2",
};

const PULSE_BAND: Band = Band {
    kind: VitalKind::PulseRate,
    label: "pulse rate",
    low_below: PULSE_LOW_BELOW,
    high_above: PULSE_HIGH_ABOVE,
    low_text: "the patient has bradycardia (low pulse rate)",
    high_text: "the patient has tachycardia (high pulse rate)",
};

impl Band {
    fn classify(&self, raw: &str) -> Option<Comment> {
        if raw.trim().is_empty() {
            return None;
        }

        let Some(value) = parse_measurement(raw) else {
            return Some(Comment::invalid(self.kind, self.label));
        };

        if value < self.low_below {
            Some(Comment::vital(self.kind, Severity::Low, self.low_text))
        } else if value > self.high_above {
            Some(Comment::vital(self.kind, Severity::High, self.high_text))
        } else {
            None
        }
    }
}

fn classify_temperature(raw: &str) -> Option<Comment> {
    TEMPERATURE_BAND.classify(raw)
}

fn classify_spo2(raw: &str) -> Option<Comment> {
    SPO2_BAND.classify(raw)
}

fn classify_pulse(raw: &str) -> Option<Comment> {
    PULSE_BAND.classify(raw)
}

// ============================================================================
// Questionnaire
// ============================================================================

/// Options of one question that warrant a comment
struct SubjectiveRule {
    question: Question,
    /// Body area named in the comment
    area: &'static str,
    urgent: &'static [&'static str],
    inspect: &'static [&'static str],
}

const SUBJECTIVE_RULES: [SubjectiveRule; 5] = [
    SubjectiveRule {
        question: Question::HairLoss,
        area: "hair",
        urgent: &["Yes, severe hair loss"],
        inspect: &["Yes, mild hair loss", "Yes, moderate hair loss"],
    },
    SubjectiveRule {
        question: Question::NailChanges,
        area: "nail",
        urgent: &["Yes, dark streaks"],
        inspect: &["Yes, white spots", "Yes, yellowing"],
    },
    SubjectiveRule {
        question: Question::UrineColor,
        area: "urinary",
        urgent: &["Brownish/red (seek medical attention)"],
        inspect: &["Dark yellow"],
    },
    SubjectiveRule {
        question: Question::OralHealth,
        area: "mouth",
        urgent: &["Bleeding gums", "Frequent mouth ulcers"],
        inspect: &["Bad breath", "Tooth pain or sensitivity"],
    },
    SubjectiveRule {
        question: Question::Breathing,
        area: "respiratory",
        urgent: &["Often, even at rest"],
        inspect: &[
            "Occasionally, during physical activity",
            "Only during certain conditions",
        ],
    },
];

impl SubjectiveRule {
    fn classify(&self, answer: &str) -> Option<Comment> {
        let (severity, text) = if self.urgent.contains(&answer) {
            (
                Severity::Urgent,
                format!("the doctor needs to urgently look at the patient's {} condition", self.area),
            )
        } else if self.inspect.contains(&answer) {
            (
                Severity::Inspect,
                format!("deeper inspection is required for the patient's {} condition", self.area),
            )
        } else {
            return None;
        };

        Some(Comment {
            source: CommentSource::Question(self.question),
            severity,
            text,
        })
    }
}

/// Comments for hair loss, nail changes, urine colour, oral health and breathing
pub fn classify_subjective(answers: &QuestionnaireAnswers) -> Vec<Comment> {
    SUBJECTIVE_RULES
        .iter()
        .filter_map(|rule| rule.classify(answers.get(rule.question)?))
        .collect()
}

/// Numeric comments followed by questionnaire comments
pub fn assess(reading: &VitalsReading, answers: &QuestionnaireAnswers) -> Vec<Comment> {
    let mut comments = classify_numeric(reading);
    comments.extend(classify_subjective(answers));
    comments
}
