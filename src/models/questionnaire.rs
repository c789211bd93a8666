//! Questionnaire model
//!
//! The fixed set of self-report health questions and their closed option sets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    Vision,
    Breathing,
    Hearing,
    SkinCondition,
    OralHealth,
    UrineColor,
    HairLoss,
    NailChanges,
    Cataract,
    Disabilities,
}

impl Question {
    /// Order in which questions are asked and printed
    pub const ALL: [Question; 10] = [
        Question::Vision,
        Question::Breathing,
        Question::Hearing,
        Question::SkinCondition,
        Question::OralHealth,
        Question::UrineColor,
        Question::HairLoss,
        Question::NailChanges,
        Question::Cataract,
        Question::Disabilities,
    ];

    /// Column / field name
    pub fn as_str(&self) -> &'static str {
        match self {
            Question::Vision => "vision",
            Question::Breathing => "breathing",
            Question::Hearing => "hearing",
            Question::SkinCondition => "skin_condition",
            Question::OralHealth => "oral_health",
            Question::UrineColor => "urine_color",
            Question::HairLoss => "hair_loss",
            Question::NailChanges => "nail_changes",
            Question::Cataract => "cataract",
            Question::Disabilities => "disabilities",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Question::Vision => "Can you see clearly without glasses?",
            Question::Breathing => "Do you experience difficulty in breathing?",
            Question::Hearing => "Do you have any difficulty in hearing?",
            Question::SkinCondition => "Do you have any visible skin conditions?",
            Question::OralHealth => "Do you experience any mouth conditions?",
            Question::UrineColor => "What is your usual urine colour?",
            Question::HairLoss => "Have you noticed significant hair loss recently?",
            Question::NailChanges => "Have you noticed any unusual changes in your nail colour?",
            Question::Cataract => "Have you been diagnosed with or noticed signs of cataract?",
            Question::Disabilities => "Do you have any physical disabilities?",
        }
    }

    /// Valid responses; the first one is the form default
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            Question::Vision => &["Yes", "No", "Not Sure"],
            Question::Breathing => &[
                "No difficulty",
                "Often, even at rest",
                "Occasionally, during physical activity",
                "Only during certain conditions",
            ],
            Question::Hearing => &["No", "Yes, in one ear", "Yes, in both ears", "Not Sure"],
            Question::SkinCondition => &["Not Sure", "Yes, mild", "Yes, moderate", "Yes, severe"],
            Question::OralHealth => &[
                "No issues",
                "Bleeding gums",
                "Bad breath",
                "Frequent mouth ulcers",
                "Tooth pain or sensitivity",
            ],
            Question::UrineColor => &[
                "Clear",
                "Pale yellow",
                "Dark yellow",
                "Brownish/red (seek medical attention)",
            ],
            Question::HairLoss => &[
                "No",
                "Yes, mild hair loss",
                "Yes, moderate hair loss",
                "Yes, severe hair loss",
            ],
            Question::NailChanges => &["No", "Yes, white spots", "Yes, yellowing", "Yes, dark streaks"],
            Question::Cataract => &["No", "Yes, diagnosed by a doctor", "Yes, not diagnosed yet"],
            Question::Disabilities => &[
                "No",
                "Yes, partial mobility issues",
                "Yes, require walking aids",
                "Yes, fully dependent on assistance",
            ],
        }
    }

    /// Canonical option for a response, ignoring case and surrounding whitespace
    pub fn match_option(&self, response: &str) -> Option<&'static str> {
        let response = response.trim();
        self.options()
            .iter()
            .copied()
            .find(|option| option.eq_ignore_ascii_case(response))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{response}' is not a valid answer to \"{question}\" (expected one of: {options})")]
    UnknownOption {
        question: &'static str,
        response: String,
        options: String,
    },
}

/// Raw questionnaire responses keyed by field name. Empty means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireEntries {
    pub vision: String,
    pub breathing: String,
    pub hearing: String,
    pub skin_condition: String,
    pub oral_health: String,
    pub urine_color: String,
    pub hair_loss: String,
    pub nail_changes: String,
    pub cataract: String,
    pub disabilities: String,
}

impl QuestionnaireEntries {
    pub fn get(&self, question: Question) -> &str {
        match question {
            Question::Vision => &self.vision,
            Question::Breathing => &self.breathing,
            Question::Hearing => &self.hearing,
            Question::SkinCondition => &self.skin_condition,
            Question::OralHealth => &self.oral_health,
            Question::UrineColor => &self.urine_color,
            Question::HairLoss => &self.hair_loss,
            Question::NailChanges => &self.nail_changes,
            Question::Cataract => &self.cataract,
            Question::Disabilities => &self.disabilities,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionnaireAnswer {
    pub question: Question,
    /// None when unanswered
    pub selected: Option<&'static str>,
}

/// Validated answers, always one per question in `Question::ALL` order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionnaireAnswers {
    answers: Vec<QuestionnaireAnswer>,
}

impl QuestionnaireAnswers {
    pub fn from_entries(entries: &QuestionnaireEntries) -> Result<Self, ValidationError> {
        let answers = Question::ALL
            .iter()
            .map(|&question| {
                let response = entries.get(question).trim();
                if response.is_empty() {
                    return Ok(QuestionnaireAnswer { question, selected: None });
                }
                match question.match_option(response) {
                    Some(option) => Ok(QuestionnaireAnswer { question, selected: Some(option) }),
                    None => Err(ValidationError::UnknownOption {
                        question: question.prompt(),
                        response: response.to_string(),
                        options: question.options().join(" | "),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { answers })
    }

    /// All questions unanswered
    pub fn unanswered() -> Self {
        Self {
            answers: Question::ALL
                .iter()
                .map(|&question| QuestionnaireAnswer { question, selected: None })
                .collect(),
        }
    }

    pub fn get(&self, question: Question) -> Option<&'static str> {
        self.answers
            .iter()
            .find(|a| a.question == question)
            .and_then(|a| a.selected)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionnaireAnswer> {
        self.answers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_question_has_options() {
        for question in Question::ALL {
            assert!(question.options().len() >= 3, "{:?}", question);
        }
    }

    #[test]
    fn test_match_option_is_case_insensitive() {
        assert_eq!(Question::HairLoss.match_option(" yes, severe hair loss "), Some("Yes, severe hair loss"));
        assert_eq!(Question::HairLoss.match_option("bald"), None);
    }

    #[test]
    fn test_from_entries_keeps_question_order() {
        let entries = QuestionnaireEntries {
            urine_color: "Dark yellow".to_string(),
            vision: "Yes".to_string(),
            ..Default::default()
        };
        let answers = QuestionnaireAnswers::from_entries(&entries).unwrap();
        let order: Vec<Question> = answers.iter().map(|a| a.question).collect();
        assert_eq!(order, Question::ALL.to_vec());
        assert_eq!(answers.get(Question::UrineColor), Some("Dark yellow"));
        assert_eq!(answers.get(Question::Hearing), None);
    }

    #[test]
    fn test_from_entries_rejects_unknown_option() {
        let entries = QuestionnaireEntries {
            nail_changes: "Purple".to_string(),
            ..Default::default()
        };
        let err = QuestionnaireAnswers::from_entries(&entries).unwrap_err();
        assert!(err.to_string().contains("Purple"));
        assert!(err.to_string().contains("Yes, dark streaks"));
    }
}
