//! Profile collection machine.
//!
//! Sequences through the demographic fields age → gender → location →
//! ethnicity under explicit consent, one utterance per call. Status is
//! always derived from `(consent, fields)` and never stored, so the caller's
//! persisted blob cannot drift out of sync with it.

use serde::{Deserialize, Serialize};

use crate::consent::{self, Consent, ConsentDecision};
use crate::error::StateError;
use crate::extract::{self, Gender};

/// Consent question asked before any profile data is collected.
pub const CONSENT_PROMPT: &str = "To help me tailor recommendations, may I collect some basic \
     profile information (age, gender, location, ethnicity)? Please say 'yes' or 'no'.";

const SKIP: &str = "skip";
const SKIP_ALL: &str = "skip all";

/// The demographic fields, in the fixed order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Age,
    Gender,
    Location,
    Ethnicity,
}

impl FieldName {
    pub const ORDER: [FieldName; 4] = [
        FieldName::Age,
        FieldName::Gender,
        FieldName::Location,
        FieldName::Ethnicity,
    ];

    /// The question asked for this field, re-emitted verbatim on invalid input.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Age => "What is your age? You can say 'skip'.",
            Self::Gender => {
                "What is your gender (e.g., Male, Female, Non-binary)? You can say 'skip'."
            }
            Self::Location => {
                "Which district in Bhutan are you located in (e.g., Thimphu, Paro)? You can \
                 say 'skip'."
            }
            Self::Ethnicity => {
                "What is your ethnicity (e.g., Drukpa, Lhotshampa)? You can say 'skip'."
            }
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Location => "location",
            Self::Ethnicity => "ethnicity",
        };
        write!(f, "{s}")
    }
}

/// A typed value collected for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Age(u32),
    Gender(Gender),
    Location(String),
    Ethnicity(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Age(age) => write!(f, "{age}"),
            Self::Gender(gender) => write!(f, "{gender}"),
            Self::Location(location) => write!(f, "{location}"),
            Self::Ethnicity(ethnicity) => write!(f, "{ethnicity}"),
        }
    }
}

/// One demographic attribute awaiting or holding a collected value.
///
/// `answered && value.is_none()` means explicitly skipped, which is distinct
/// from "not yet asked" (`answered == false`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub name: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    pub answered: bool,
}

impl FieldSlot {
    fn empty(name: FieldName) -> Self {
        Self {
            name,
            value: None,
            answered: false,
        }
    }
}

/// Resumable state of the profile collection machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileState {
    pub consent: Consent,
    pub fields: Vec<FieldSlot>,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileState {
    /// Fresh state: consent undecided, no field asked yet.
    pub fn new() -> Self {
        Self {
            consent: Consent::Undecided,
            fields: FieldName::ORDER.iter().map(|f| FieldSlot::empty(*f)).collect(),
        }
    }

    /// Derive the machine status. Pure function of `(consent, fields)`.
    pub fn status(&self) -> ProfileStatus {
        match self.consent {
            Consent::Denied => ProfileStatus::ConsentDenied,
            Consent::Undecided => ProfileStatus::ConsentPending,
            Consent::Granted => match self.fields.iter().find(|slot| !slot.answered) {
                Some(slot) => ProfileStatus::FieldPending(slot.name),
                None if self.fields.iter().all(|slot| slot.value.is_none()) => {
                    ProfileStatus::SkippedAll
                }
                None => ProfileStatus::Complete,
            },
        }
    }

    /// Check the caller-supplied blob against the machine's structural
    /// invariants before processing a turn.
    fn validate(&self) -> Result<(), StateError> {
        if self.fields.len() != FieldName::ORDER.len() {
            return Err(StateError::Malformed(format!(
                "expected {} field slots, found {}",
                FieldName::ORDER.len(),
                self.fields.len()
            )));
        }
        for (slot, expected) in self.fields.iter().zip(FieldName::ORDER) {
            if slot.name != expected {
                return Err(StateError::Malformed(format!(
                    "field slots out of order: expected {expected}, found {}",
                    slot.name
                )));
            }
            if !slot.answered && slot.value.is_some() {
                return Err(StateError::Malformed(format!(
                    "field {} holds a value but is not marked answered",
                    slot.name
                )));
            }
        }
        Ok(())
    }

    fn slot_mut(&mut self, name: FieldName) -> &mut FieldSlot {
        self.fields
            .iter_mut()
            .find(|slot| slot.name == name)
            .expect("validated state holds every field")
    }
}

/// Status of the profile machine, derived per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    ConsentPending,
    FieldPending(FieldName),
    Complete,
    SkippedAll,
    ConsentDenied,
}

impl ProfileStatus {
    /// Terminal statuses accept no further turns for this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::SkippedAll | Self::ConsentDenied)
    }
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConsentPending => write!(f, "consent_pending"),
            Self::FieldPending(field) => write!(f, "{field}_pending"),
            Self::Complete => write!(f, "complete"),
            Self::SkippedAll => write!(f, "skipped_all"),
            Self::ConsentDenied => write!(f, "consent_denied"),
        }
    }
}

/// Outcome of one profile turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStep {
    pub state: ProfileState,
    pub status: ProfileStatus,
    /// Question to put to the user next; present exactly when pending.
    pub next_question: Option<String>,
    /// Acknowledgement or terminal summary; empty on a pure re-prompt.
    pub message: String,
}

/// Process one user utterance against the profile machine.
///
/// Exactly one transition per call. Unparseable input is not an error: the
/// same question comes back with no state change. A turn against a terminal
/// state is a caller error, except that repeating "skip all" on an already
/// skipped-all session is an idempotent no-op.
pub fn step(mut state: ProfileState, utterance: &str) -> Result<ProfileStep, StateError> {
    state.validate()?;
    let normalized = utterance.trim().to_lowercase();
    let entry_status = state.status();

    // "skip all" short-circuits from any live state, before any field parsing.
    if normalized == SKIP_ALL {
        if entry_status == ProfileStatus::SkippedAll {
            return Ok(ProfileStep {
                state,
                status: ProfileStatus::SkippedAll,
                next_question: None,
                message: "All profile questions were already skipped.".into(),
            });
        }
        if entry_status.is_terminal() {
            return Err(StateError::TerminalSession {
                status: entry_status.to_string(),
            });
        }
        state.consent = Consent::Granted;
        for slot in &mut state.fields {
            if !slot.answered {
                slot.value = None;
                slot.answered = true;
            }
        }
        return Ok(ProfileStep {
            state,
            status: ProfileStatus::SkippedAll,
            next_question: None,
            message: "All profile questions skipped.".into(),
        });
    }

    if entry_status.is_terminal() {
        return Err(StateError::TerminalSession {
            status: entry_status.to_string(),
        });
    }

    match entry_status {
        ProfileStatus::ConsentPending => Ok(apply_consent(state, utterance)),
        ProfileStatus::FieldPending(field) => Ok(apply_field(state, field, &normalized, utterance)),
        // Terminal statuses were handled above.
        _ => unreachable!("non-pending live status"),
    }
}

fn apply_consent(mut state: ProfileState, utterance: &str) -> ProfileStep {
    match consent::decide(utterance) {
        ConsentDecision::Granted => {
            state.consent = Consent::Granted;
            ProfileStep {
                state,
                status: ProfileStatus::FieldPending(FieldName::Age),
                next_question: Some(FieldName::Age.prompt().into()),
                message: "Thank you. Let's go through a few quick questions.".into(),
            }
        }
        ConsentDecision::Denied => {
            state.consent = Consent::Denied;
            ProfileStep {
                state,
                status: ProfileStatus::ConsentDenied,
                next_question: None,
                message: "That's perfectly fine. I won't collect any profile information.".into(),
            }
        }
        ConsentDecision::Unresolved => ProfileStep {
            state,
            status: ProfileStatus::ConsentPending,
            next_question: Some(CONSENT_PROMPT.into()),
            message: String::new(),
        },
    }
}

fn apply_field(
    mut state: ProfileState,
    field: FieldName,
    normalized: &str,
    utterance: &str,
) -> ProfileStep {
    let message = if normalized == SKIP {
        let slot = state.slot_mut(field);
        slot.value = None;
        slot.answered = true;
        format!("{} skipped.", capitalize(&field.to_string()))
    } else if let Some(value) = extract_field(field, utterance) {
        let message = format!("Noted {field}: {value}.");
        let slot = state.slot_mut(field);
        slot.value = Some(value);
        slot.answered = true;
        message
    } else {
        // Expected re-prompt: identical question, no progress, no error.
        return ProfileStep {
            state,
            status: ProfileStatus::FieldPending(field),
            next_question: Some(field.prompt().into()),
            message: String::new(),
        };
    };

    let status = state.status();
    let next_question = match status {
        ProfileStatus::FieldPending(next) => Some(next.prompt().to_string()),
        _ => None,
    };
    let message = match status {
        ProfileStatus::Complete => format!("{message} Profile collection complete."),
        ProfileStatus::SkippedAll => {
            format!("{message} Profile collection complete. All details were skipped.")
        }
        _ => message,
    };

    ProfileStep {
        state,
        status,
        next_question,
        message,
    }
}

fn extract_field(field: FieldName, utterance: &str) -> Option<FieldValue> {
    match field {
        FieldName::Age => extract::extract_age(utterance).map(FieldValue::Age),
        FieldName::Gender => extract::extract_gender(utterance).map(FieldValue::Gender),
        FieldName::Location => extract::extract_location(utterance).map(FieldValue::Location),
        FieldName::Ethnicity => extract::extract_ethnicity(utterance).map(FieldValue::Ethnicity),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
