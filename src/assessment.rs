//! Questionnaire engine.
//!
//! Drives one questionnaire instance through consent, per-question scoring,
//! and completion. The caller round-trips [`AssessmentState`] between turns;
//! every entry re-checks the `scores.len() == current_index` invariant so a
//! corrupted blob aborts the turn instead of corrupting collected answers.

use serde::{Deserialize, Serialize};

use crate::catalog::QuestionnaireDefinition;
use crate::consent::{self, Consent, ConsentDecision};
use crate::error::{Error, StateError};

const SKIP: &str = "skip";

/// Status of the questionnaire engine.
///
/// `Error` never arises from a well-formed state transition; it is the wire
/// status the turn adapter reports for aborted turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    ConsentPending,
    QuestionPending,
    Complete,
    Skipped,
    ConsentDenied,
    Error,
}

impl AssessmentStatus {
    /// Terminal statuses freeze the session; a new one needs a fresh state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skipped | Self::ConsentDenied)
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConsentPending => "consent_pending",
            Self::QuestionPending => "question_pending",
            Self::Complete => "complete",
            Self::Skipped => "skipped",
            Self::ConsentDenied => "consent_denied",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Resumable state of one questionnaire session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentState {
    /// Key into the catalog.
    pub questionnaire_id: String,
    pub consent: Consent,
    /// 0-based index of the question currently awaiting an answer;
    /// -1 before consent is resolved.
    pub current_index: i64,
    /// One score per answered question, in question order.
    pub scores: Vec<u32>,
    pub status: AssessmentStatus,
}

impl AssessmentState {
    /// Fresh session for the given questionnaire.
    pub fn new(questionnaire_id: impl Into<String>) -> Self {
        Self {
            questionnaire_id: questionnaire_id.into(),
            consent: Consent::Undecided,
            current_index: -1,
            scores: Vec::new(),
            status: AssessmentStatus::ConsentPending,
        }
    }

    /// Check a caller-supplied blob against the machine's invariants.
    fn validate(&self, definition: &QuestionnaireDefinition) -> Result<(), StateError> {
        if self.questionnaire_id != definition.id {
            return Err(StateError::Malformed(format!(
                "state is for questionnaire {}, definition is {}",
                self.questionnaire_id, definition.id
            )));
        }

        let n = definition.questions.len() as i64;
        match self.consent {
            Consent::Undecided | Consent::Denied => {
                if self.current_index != -1 || !self.scores.is_empty() {
                    return Err(StateError::Malformed(format!(
                        "consent is {} but answers were recorded",
                        self.consent
                    )));
                }
            }
            Consent::Granted => {
                if self.current_index < 0 || self.current_index > n {
                    return Err(StateError::Malformed(format!(
                        "current index {} outside 0..={n}",
                        self.current_index
                    )));
                }
                if self.scores.len() as i64 != self.current_index {
                    return Err(StateError::Inconsistent {
                        scores: self.scores.len(),
                        index: self.current_index,
                    });
                }
                let max = definition.scale.max_per_question();
                if let Some(score) = self.scores.iter().find(|s| **s > max) {
                    return Err(StateError::Malformed(format!(
                        "recorded score {score} exceeds scale maximum {max}"
                    )));
                }
            }
        }

        let expected = self.expected_status(n);
        if self.status != expected {
            return Err(StateError::Malformed(format!(
                "stored status {} does not match state (expected {expected})",
                self.status
            )));
        }
        Ok(())
    }

    // Skipped and ConsentDenied are genuine input history; everything else
    // must agree with (consent, current_index).
    fn expected_status(&self, n: i64) -> AssessmentStatus {
        match (self.status, self.consent) {
            (AssessmentStatus::Skipped, Consent::Granted) => AssessmentStatus::Skipped,
            (_, Consent::Denied) => AssessmentStatus::ConsentDenied,
            (_, Consent::Undecided) => AssessmentStatus::ConsentPending,
            (_, Consent::Granted) if self.current_index == n => AssessmentStatus::Complete,
            (_, Consent::Granted) => AssessmentStatus::QuestionPending,
        }
    }
}

/// Outcome of one questionnaire turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentStep {
    pub state: AssessmentState,
    pub status: AssessmentStatus,
    /// Instrument display name, e.g. "PHQ-9". Structured so callers never
    /// have to parse it out of the message text.
    pub assessment_name: String,
    /// Question to put to the user next; present exactly when pending.
    pub next_question: Option<String>,
    /// Acknowledgement or terminal summary; empty on a pure re-prompt.
    pub message: String,
    /// Present only at `Complete`.
    pub total_score: Option<u32>,
    /// Present only at `Complete`.
    pub interpretation: Option<String>,
}

impl AssessmentStep {
    fn pending(state: AssessmentState, question: String, message: String) -> Self {
        Self {
            status: state.status,
            state,
            assessment_name: String::new(),
            next_question: Some(question),
            message,
            total_score: None,
            interpretation: None,
        }
    }

    fn terminal(state: AssessmentState, message: String) -> Self {
        Self {
            status: state.status,
            state,
            assessment_name: String::new(),
            next_question: None,
            message,
            total_score: None,
            interpretation: None,
        }
    }
}

/// Process one user utterance against a questionnaire session.
///
/// Exactly one transition per call. Out-of-range or non-numeric answers do
/// not advance the index; the same question is re-emitted with the scale
/// reminder. "skip" abandons the questionnaire (terminal `Skipped`).
pub fn step(
    mut state: AssessmentState,
    definition: &QuestionnaireDefinition,
    utterance: &str,
) -> Result<AssessmentStep, Error> {
    state.validate(definition)?;

    if state.status.is_terminal() {
        return Err(StateError::TerminalSession {
            status: state.status.to_string(),
        }
        .into());
    }

    let mut result = match state.status {
        AssessmentStatus::ConsentPending => apply_consent(state, definition, utterance),
        AssessmentStatus::QuestionPending => apply_answer(state, definition, utterance)?,
        // Terminal statuses were handled above; Error is never stored.
        _ => {
            return Err(
                StateError::Malformed(format!("unexpected status {}", state.status)).into(),
            );
        }
    };
    result.assessment_name = definition.display_name.clone();
    Ok(result)
}

fn consent_prompt(definition: &QuestionnaireDefinition) -> String {
    format!(
        "Would you like to take a brief {} questionnaire ({} questions) to help me understand \
         how you've been feeling? Please say 'yes' or 'no'.",
        definition.display_name,
        definition.questions.len()
    )
}

fn question_prompt(definition: &QuestionnaireDefinition, index: usize) -> String {
    format!(
        "{} question {} of {}: {} {}",
        definition.display_name,
        index + 1,
        definition.questions.len(),
        definition.questions[index],
        definition.scale_hint
    )
}

fn apply_consent(
    mut state: AssessmentState,
    definition: &QuestionnaireDefinition,
    utterance: &str,
) -> AssessmentStep {
    match consent::decide(utterance) {
        ConsentDecision::Granted => {
            state.consent = Consent::Granted;
            state.current_index = 0;
            state.status = AssessmentStatus::QuestionPending;
            let message = format!(
                "Okay, let's begin the {} questionnaire. {}",
                definition.display_name, definition.instruction
            );
            AssessmentStep::pending(state, question_prompt(definition, 0), message)
        }
        ConsentDecision::Denied => {
            state.consent = Consent::Denied;
            state.status = AssessmentStatus::ConsentDenied;
            let message = format!(
                "You chose not to take the {} questionnaire. That's perfectly fine.",
                definition.display_name
            );
            AssessmentStep::terminal(state, message)
        }
        ConsentDecision::Unresolved => {
            let question = consent_prompt(definition);
            AssessmentStep::pending(state, question, String::new())
        }
    }
}

fn apply_answer(
    mut state: AssessmentState,
    definition: &QuestionnaireDefinition,
    utterance: &str,
) -> Result<AssessmentStep, Error> {
    let index = state.current_index as usize;

    if utterance.trim().to_lowercase() == SKIP {
        state.status = AssessmentStatus::Skipped;
        let message = format!(
            "You chose to skip the {} questionnaire. That's fine.",
            definition.display_name
        );
        return Ok(AssessmentStep::terminal(state, message));
    }

    let Some(score) = definition.scale.parse_answer(utterance) else {
        // Expected re-prompt: same question with the scale reminder, no progress.
        let question = format!(
            "Please answer using the scale {}. {}",
            definition.scale_hint,
            question_prompt(definition, index)
        );
        return Ok(AssessmentStep::pending(state, question, String::new()));
    };

    state.scores.push(score);
    state.current_index += 1;

    if state.current_index as usize == definition.questions.len() {
        // Total score is computed exactly once, at this transition.
        let total: u32 = state.scores.iter().sum();
        let interpretation = definition.interpret(total)?.to_string();
        state.status = AssessmentStatus::Complete;
        let message = format!(
            "Thank you for completing the {} questionnaire. Your total score is {total}: \
             {interpretation}.",
            definition.display_name
        );
        let mut step = AssessmentStep::terminal(state, message);
        step.total_score = Some(total);
        step.interpretation = Some(interpretation);
        Ok(step)
    } else {
        let question = question_prompt(definition, state.current_index as usize);
        Ok(AssessmentStep::pending(state, question, String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::CatalogError;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn started(definition: &QuestionnaireDefinition) -> AssessmentState {
        let result = step(AssessmentState::new(&definition.id), definition, "yes").unwrap();
        assert_eq!(result.status, AssessmentStatus::QuestionPending);
        result.state
    }

    #[test]
    fn fresh_state_asks_for_consent() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();
        let result = step(AssessmentState::new("depression"), phq9, "tell me more").unwrap();
        assert_eq!(result.status, AssessmentStatus::ConsentPending);
        assert!(result.next_question.unwrap().contains("PHQ-9"));
        assert_eq!(result.state.current_index, -1);
    }

    #[test]
    fn consent_grant_starts_at_question_one() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();
        let result = step(AssessmentState::new("depression"), phq9, "yes").unwrap();
        assert_eq!(result.status, AssessmentStatus::QuestionPending);
        assert_eq!(result.state.current_index, 0);
        let question = result.next_question.unwrap();
        assert!(question.contains("question 1 of 9"));
        assert!(question.contains("Little interest or pleasure"));
        assert!(result.message.contains("Over the last 2 weeks"));
    }

    #[test]
    fn consent_denied_is_terminal() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();
        let result = step(AssessmentState::new("depression"), phq9, "no").unwrap();
        assert_eq!(result.status, AssessmentStatus::ConsentDenied);

        let reentry = step(result.state, phq9, "yes");
        assert!(matches!(
            reentry,
            Err(Error::State(StateError::TerminalSession { .. }))
        ));
    }

    #[test]
    fn scores_length_tracks_index_at_every_step() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let mut state = started(gad7);
        for (i, answer) in ["1", "2", "3", "0", "1", "2"].iter().enumerate() {
            let result = step(state, gad7, answer).unwrap();
            assert_eq!(result.status, AssessmentStatus::QuestionPending);
            state = result.state;
            assert_eq!(state.current_index, i as i64 + 1);
            assert_eq!(state.scores.len() as i64, state.current_index);
        }
    }

    #[test]
    fn spec_scenario_gad7_moderate() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let mut state = started(gad7);
        let answers = ["1", "2", "3", "0", "1", "2", "3"];
        let mut last = None;
        for answer in answers {
            let result = step(state, gad7, answer).unwrap();
            state = result.state.clone();
            last = Some(result);
        }
        let last = last.unwrap();
        assert_eq!(last.status, AssessmentStatus::Complete);
        assert_eq!(last.total_score, Some(12));
        assert_eq!(last.interpretation.as_deref(), Some("Moderate anxiety"));
        assert!(last.next_question.is_none());
        assert_eq!(state.scores, vec![1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn boundary_totals_land_in_adjacent_bands() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();

        // Nine answers summing to 4, then to 5.
        for (answers, expected) in [
            (["1", "1", "1", "1", "0", "0", "0", "0", "0"], "Minimal depression"),
            (["1", "1", "1", "1", "1", "0", "0", "0", "0"], "Mild depression"),
        ] {
            let mut state = started(phq9);
            let mut last = None;
            for answer in answers {
                let result = step(state, phq9, answer).unwrap();
                state = result.state.clone();
                last = Some(result);
            }
            assert_eq!(last.unwrap().interpretation.as_deref(), Some(expected));
        }
    }

    #[test]
    fn invalid_answers_reemit_identical_question() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();
        let state = started(phq9);

        let mut questions = Vec::new();
        let mut state = state;
        for bad in ["abc", "-1", "99"] {
            let result = step(state, phq9, bad).unwrap();
            assert_eq!(result.status, AssessmentStatus::QuestionPending);
            assert_eq!(result.state.current_index, 0);
            assert!(result.state.scores.is_empty());
            questions.push(result.next_question.unwrap());
            state = result.state;
        }
        assert_eq!(questions[0], questions[1]);
        assert_eq!(questions[1], questions[2]);
        assert!(questions[0].contains(&phq9.scale_hint));
    }

    #[test]
    fn yes_no_scale_rejects_likert_answers() {
        let catalog = catalog();
        let dast = catalog.get("substance_abuse").unwrap();
        let state = started(dast);

        let rejected = step(state.clone(), dast, "3").unwrap();
        assert_eq!(rejected.state.current_index, 0);

        let accepted = step(state, dast, "yes").unwrap();
        assert_eq!(accepted.state.scores, vec![1]);
    }

    #[test]
    fn dast_full_run_scores_yes_answers() {
        let catalog = catalog();
        let dast = catalog.get("substance_abuse").unwrap();
        let mut state = started(dast);
        let answers = ["yes", "no", "no", "yes", "n", "y", "0", "1", "no", "no"];
        let mut last = None;
        for answer in answers {
            let result = step(state, dast, answer).unwrap();
            state = result.state.clone();
            last = Some(result);
        }
        let last = last.unwrap();
        assert_eq!(last.total_score, Some(4));
        assert_eq!(
            last.interpretation.as_deref(),
            Some("Moderate level of drug abuse")
        );
    }

    #[test]
    fn skip_mid_questionnaire_is_terminal() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let state = started(gad7);
        let state = step(state, gad7, "2").unwrap().state;

        let result = step(state, gad7, "skip").unwrap();
        assert_eq!(result.status, AssessmentStatus::Skipped);
        // Collected scores survive the skip.
        assert_eq!(result.state.scores, vec![2]);

        let reentry = step(result.state, gad7, "1");
        assert!(matches!(
            reentry,
            Err(Error::State(StateError::TerminalSession { .. }))
        ));
    }

    #[test]
    fn inconsistent_scores_index_is_rejected() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let mut state = started(gad7);
        state.scores.push(2);
        // current_index still 0 but one score recorded.
        let result = step(state, gad7, "1");
        assert!(matches!(
            result,
            Err(Error::State(StateError::Inconsistent { scores: 1, index: 0 }))
        ));
    }

    #[test]
    fn mismatched_definition_is_rejected() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let state = AssessmentState::new("depression");
        assert!(matches!(
            step(state, gad7, "yes"),
            Err(Error::State(StateError::Malformed(_)))
        ));
    }

    #[test]
    fn drifted_stored_status_is_rejected() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();
        let mut state = started(gad7);
        state.status = AssessmentStatus::Complete;
        assert!(matches!(
            step(state, gad7, "1"),
            Err(Error::State(StateError::Malformed(_)))
        ));
    }

    #[test]
    fn uncovered_score_surfaces_as_catalog_error() {
        let definition = QuestionnaireDefinition {
            id: "broken".into(),
            display_name: "BROKEN".into(),
            instruction: "".into(),
            questions: vec!["Only question?".into()],
            scale: crate::catalog::ResponseScale::Likert { min: 0, max: 3 },
            scale_hint: "(0-3)".into(),
            // Deliberately bypasses Catalog::new validation.
            bands: vec![crate::catalog::InterpretationBand {
                low: 0,
                high: 1,
                label: "Low".into(),
            }],
        };
        let state = started(&definition);
        let result = step(state, &definition, "3");
        assert!(matches!(
            result,
            Err(Error::Catalog(CatalogError::UncoveredScore { score: 3, .. }))
        ));
    }

    #[test]
    fn every_step_carries_instrument_name() {
        let catalog = catalog();
        let phq9 = catalog.get("depression").unwrap();

        let pending = step(AssessmentState::new("depression"), phq9, "hm").unwrap();
        assert_eq!(pending.assessment_name, "PHQ-9");

        let denied = step(AssessmentState::new("depression"), phq9, "no").unwrap();
        assert_eq!(denied.assessment_name, "PHQ-9");

        let running = started(phq9);
        let answered = step(running, phq9, "2").unwrap();
        assert_eq!(answered.assessment_name, "PHQ-9");
    }

    #[test]
    fn state_serde_roundtrip_across_statuses() {
        let catalog = catalog();
        let gad7 = catalog.get("anxiety").unwrap();

        let fresh = AssessmentState::new("anxiety");
        let denied = step(fresh.clone(), gad7, "no").unwrap().state;
        let running = started(gad7);
        let mid = step(running.clone(), gad7, "2").unwrap().state;
        let skipped = step(mid.clone(), gad7, "skip").unwrap().state;
        let mut complete = started(gad7);
        for answer in ["1", "2", "3", "0", "1", "2", "3"] {
            complete = step(complete, gad7, answer).unwrap().state;
        }
        assert_eq!(complete.status, AssessmentStatus::Complete);

        for state in [fresh, denied, running, mid, skipped, complete] {
            let json = serde_json::to_string(&state).unwrap();
            let parsed: AssessmentState = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, state);
        }
    }
}
