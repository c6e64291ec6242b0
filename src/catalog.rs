//! Questionnaire catalog — immutable definitions validated at load time.
//!
//! Loaded once at process start and shared read-only thereafter. Every
//! definition is checked for contiguous, non-overlapping interpretation
//! bands covering the full reachable score range; a bad definition fails
//! fast instead of silently misclassifying a score later.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::extract;

/// How answers to a questionnaire are scored.
///
/// The valid answer range is a property of the definition, never of engine
/// code, so a yes/no instrument can't accidentally be validated against a
/// Likert range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseScale {
    Likert { min: u32, max: u32 },
    YesNo,
}

impl ResponseScale {
    /// Maximum score a single answer can contribute.
    pub fn max_per_question(&self) -> u32 {
        match self {
            Self::Likert { max, .. } => *max,
            Self::YesNo => 1,
        }
    }

    /// Parse one answer utterance against this scale.
    pub fn parse_answer(&self, utterance: &str) -> Option<u32> {
        match self {
            Self::Likert { min, max } => extract::extract_likert(utterance, *min, *max),
            Self::YesNo => extract::extract_yes_no(utterance),
        }
    }
}

/// A closed score interval mapped to a clinical severity label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretationBand {
    pub low: u32,
    pub high: u32,
    pub label: String,
}

/// One questionnaire: questions, scale, and interpretation bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
    /// Catalog key, e.g. "depression". Matches the externally supplied
    /// identified-concern label that selects this questionnaire.
    pub id: String,
    /// Instrument name shown to the user, e.g. "PHQ-9".
    pub display_name: String,
    /// Instruction line read out before the first question.
    pub instruction: String,
    pub questions: Vec<String>,
    pub scale: ResponseScale,
    /// Scale reminder appended to every question, e.g. "(0=Not at all, ...)".
    pub scale_hint: String,
    pub bands: Vec<InterpretationBand>,
}

impl QuestionnaireDefinition {
    /// Maximum total score reachable by answering every question.
    pub fn max_total(&self) -> u32 {
        self.questions.len() as u32 * self.scale.max_per_question()
    }

    /// Resolve a total score to its severity label.
    ///
    /// Lookup is a linear scan for the first band whose closed interval
    /// contains the score. A miss means the definition bypassed validation
    /// and is a configuration bug, reported loudly.
    pub fn interpret(&self, score: u32) -> Result<&str, CatalogError> {
        self.bands
            .iter()
            .find(|band| band.low <= score && score <= band.high)
            .map(|band| band.label.as_str())
            .ok_or_else(|| CatalogError::UncoveredScore {
                id: self.id.clone(),
                score,
            })
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.questions.is_empty() {
            return Err(CatalogError::NoQuestions {
                id: self.id.clone(),
            });
        }
        if self.bands.is_empty() {
            return Err(CatalogError::NoBands {
                id: self.id.clone(),
            });
        }

        let first = &self.bands[0];
        if first.low != 0 {
            return Err(CatalogError::BandStart {
                id: self.id.clone(),
                start: first.low,
            });
        }

        let mut expected = 0u32;
        for band in &self.bands {
            if band.low > band.high {
                return Err(CatalogError::BandInverted {
                    id: self.id.clone(),
                    label: band.label.clone(),
                    low: band.low,
                    high: band.high,
                });
            }
            if band.low != expected {
                return Err(CatalogError::BandDiscontinuity {
                    id: self.id.clone(),
                    label: band.label.clone(),
                    low: band.low,
                    expected,
                });
            }
            expected = band.high + 1;
        }

        let end = self.bands[self.bands.len() - 1].high;
        if end != self.max_total() {
            return Err(CatalogError::BandShortfall {
                id: self.id.clone(),
                end,
                max: self.max_total(),
            });
        }

        Ok(())
    }
}

/// The read-only questionnaire catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    questionnaires: BTreeMap<String, QuestionnaireDefinition>,
}

impl Catalog {
    /// Build a catalog from definitions, validating each one.
    pub fn new(definitions: Vec<QuestionnaireDefinition>) -> Result<Self, CatalogError> {
        let mut questionnaires = BTreeMap::new();
        for definition in definitions {
            definition.validate()?;
            let id = definition.id.clone();
            if questionnaires.insert(id.clone(), definition).is_some() {
                return Err(CatalogError::DuplicateId { id });
            }
        }
        Ok(Self { questionnaires })
    }

    /// The built-in PHQ-9 / GAD-7 / DAST-10 catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_definitions())
    }

    /// Load from a JSON file (an array of definitions).
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let definitions: Vec<QuestionnaireDefinition> = serde_json::from_str(&raw)?;
        Self::new(definitions)
    }

    /// Load the catalog: a file override if configured and present, else the
    /// built-in defaults. A missing file falls back with a warning; a file
    /// that exists but fails to parse or validate is a fatal error.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) if path.exists() => {
                let catalog = Self::from_file(path)?;
                info!(path = %path.display(), count = catalog.len(), "Loaded questionnaire catalog from file");
                Ok(catalog)
            }
            Some(path) => {
                warn!(path = %path.display(), "Catalog file not found, using built-in questionnaires");
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    /// Look up a questionnaire by id.
    pub fn get(&self, id: &str) -> Result<&QuestionnaireDefinition, CatalogError> {
        self.questionnaires
            .get(id)
            .ok_or_else(|| CatalogError::UnknownQuestionnaire(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.questionnaires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questionnaires.is_empty()
    }

    /// Definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &QuestionnaireDefinition> {
        self.questionnaires.values()
    }
}

const LIKERT_HINT: &str =
    "(0=Not at all, 1=Several days, 2=More than half the days, 3=Nearly every day)";

fn builtin_definitions() -> Vec<QuestionnaireDefinition> {
    let likert = ResponseScale::Likert { min: 0, max: 3 };

    let phq9 = QuestionnaireDefinition {
        id: "depression".into(),
        display_name: "PHQ-9".into(),
        instruction: "Over the last 2 weeks, how often have you been bothered by any of the \
                      following problems?"
            .into(),
        questions: vec![
            "Little interest or pleasure in doing things?".into(),
            "Feeling down, depressed, or hopeless?".into(),
            "Trouble falling or staying asleep, or sleeping too much?".into(),
            "Feeling tired or having little energy?".into(),
            "Poor appetite or overeating?".into(),
            "Feeling bad about yourself - or that you are a failure or have let yourself or \
             your family down?"
                .into(),
            "Trouble concentrating on things, such as reading the newspaper or watching \
             television?"
                .into(),
            "Moving or speaking so slowly that other people could have noticed? Or the \
             opposite - being so fidgety or restless that you have been moving a lot more \
             than usual?"
                .into(),
            "Thoughts that you would be better off dead, or of hurting yourself in some way?".into(),
        ],
        scale: likert,
        scale_hint: LIKERT_HINT.into(),
        bands: vec![
            band(0, 4, "Minimal depression"),
            band(5, 9, "Mild depression"),
            band(10, 14, "Moderate depression"),
            band(15, 19, "Moderately severe depression"),
            band(20, 27, "Severe depression"),
        ],
    };

    let gad7 = QuestionnaireDefinition {
        id: "anxiety".into(),
        display_name: "GAD-7".into(),
        instruction: "Over the last 2 weeks, how often have you been bothered by the following \
                      problems?"
            .into(),
        questions: vec![
            "Feeling nervous, anxious, or on edge?".into(),
            "Not being able to stop or control worrying?".into(),
            "Worrying too much about different things?".into(),
            "Trouble relaxing?".into(),
            "Being so restless that it's hard to sit still?".into(),
            "Becoming easily annoyed or irritable?".into(),
            "Feeling afraid as if something awful might happen?".into(),
        ],
        scale: likert,
        scale_hint: LIKERT_HINT.into(),
        bands: vec![
            band(0, 4, "Minimal anxiety"),
            band(5, 9, "Mild anxiety"),
            band(10, 14, "Moderate anxiety"),
            band(15, 21, "Severe anxiety"),
        ],
    };

    let dast10 = QuestionnaireDefinition {
        id: "substance_abuse".into(),
        display_name: "DAST-10".into(),
        instruction: "The following questions are about drug use in the past year. Answer Yes \
                      or No."
            .into(),
        questions: vec![
            "Have you used drugs other than those required for medical reasons?".into(),
            "Do you abuse more than one drug at a time?".into(),
            "Are you unable to stop using drugs when you want to?".into(),
            "Have you ever had blackouts or flashbacks as a result of drug use?".into(),
            "Do you ever feel bad or guilty about your drug use?".into(),
            "Does your spouse (or parents) ever complain about your involvement with drugs?".into(),
            "Have you neglected your family because of your use of drugs?".into(),
            "Have you engaged in illegal activities in order to obtain drugs?".into(),
            "Have you ever experienced withdrawal symptoms when you stopped taking drugs?".into(),
            "Have you had medical problems as a result of your drug use?".into(),
        ],
        scale: ResponseScale::YesNo,
        scale_hint: "(0=No, 1=Yes)".into(),
        bands: vec![
            band(0, 0, "No problem indicated"),
            band(1, 2, "Low level of drug abuse"),
            band(3, 5, "Moderate level of drug abuse"),
            band(6, 8, "Substantial level of drug abuse"),
            band(9, 10, "Severe level of drug abuse"),
        ],
    };

    vec![phq9, gad7, dast10]
}

fn band(low: u32, high: u32, label: &str) -> InterpretationBand {
    InterpretationBand {
        low,
        high,
        label: label.into(),
    }
}
