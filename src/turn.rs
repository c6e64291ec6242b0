//! Turn adapter — the externally-facing contract.
//!
//! One call processes exactly one user utterance: deserialize the prior
//! state blob, run one transition on the active machine, reserialize, and
//! return. Nothing is retained between calls and errors are never thrown
//! across the boundary; every failure class comes back as the `error`
//! status with the prior state echoed unchanged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assessment::{self, AssessmentState};
use crate::catalog::Catalog;
use crate::error::{Error, StateError};
use crate::profile::{self, ProfileState};

/// Which collection flow a turn is directed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Profile,
    Assessment,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::Assessment => write!(f, "assessment"),
        }
    }
}

/// One user turn as submitted by the orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub utterance: String,
    pub flow: Flow,
    /// Catalog key; required when `flow` is assessment and `prior_state`
    /// is empty (a fresh session).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    /// State blob returned by the previous turn, absent on the first turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<serde_json::Value>,
}

/// Result of one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    /// State blob to hand back unchanged on the next turn.
    pub state: serde_json::Value,
    /// Outbound message (next question, acknowledgement, or summary).
    pub message: String,
    /// Stable snake_case status identifier for the caller to branch on.
    pub status: String,
    /// True only when the active machine reached a terminal status.
    pub done: bool,
    /// Instrument display name, e.g. "PHQ-9"; present on assessment turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

/// Process one turn. Pure: no retries, no loops, no I/O.
pub fn process_turn(catalog: &Catalog, request: &TurnRequest) -> TurnResponse {
    let response = match request.flow {
        Flow::Profile => profile_turn(request),
        Flow::Assessment => assessment_turn(catalog, request),
    };
    match response {
        Ok(response) => {
            debug!(flow = %request.flow, status = %response.status, done = response.done, "Turn processed");
            response
        }
        Err(error) => {
            warn!(flow = %request.flow, %error, "Turn aborted");
            error_response(request, &error)
        }
    }
}

/// All §7 failure classes surface here: the diagnostic becomes the message,
/// the prior state is echoed back unchanged, and the session is not closed.
fn error_response(request: &TurnRequest, error: &Error) -> TurnResponse {
    TurnResponse {
        state: request
            .prior_state
            .clone()
            .unwrap_or(serde_json::Value::Null),
        message: error.to_string(),
        status: "error".into(),
        done: false,
        assessment_name: None,
        total_score: None,
        interpretation: None,
    }
}

fn profile_turn(request: &TurnRequest) -> Result<TurnResponse, Error> {
    let state = match &request.prior_state {
        Some(value) => serde_json::from_value::<ProfileState>(value.clone())
            .map_err(|e| StateError::Malformed(e.to_string()))?,
        None => ProfileState::new(),
    };

    let step = profile::step(state, &request.utterance)?;
    let state = serde_json::to_value(&step.state)
        .map_err(|e| StateError::Malformed(e.to_string()))?;

    Ok(TurnResponse {
        state,
        message: outbound(&step.message, step.next_question.as_deref()),
        status: step.status.to_string(),
        done: step.status.is_terminal(),
        assessment_name: None,
        total_score: None,
        interpretation: None,
    })
}

fn assessment_turn(catalog: &Catalog, request: &TurnRequest) -> Result<TurnResponse, Error> {
    let state = match &request.prior_state {
        Some(value) => serde_json::from_value::<AssessmentState>(value.clone())
            .map_err(|e| StateError::Malformed(e.to_string()))?,
        None => {
            let id = request
                .assessment_id
                .as_deref()
                .ok_or(StateError::MissingAssessmentId)?;
            AssessmentState::new(id)
        }
    };

    if let Some(requested) = request.assessment_id.as_deref() {
        if requested != state.questionnaire_id {
            return Err(StateError::Malformed(format!(
                "assessment id {requested} does not match prior state ({})",
                state.questionnaire_id
            ))
            .into());
        }
    }

    let definition = catalog.get(&state.questionnaire_id)?;
    let step = assessment::step(state, definition, &request.utterance)?;
    let state = serde_json::to_value(&step.state)
        .map_err(|e| StateError::Malformed(e.to_string()))?;

    Ok(TurnResponse {
        state,
        message: outbound(&step.message, step.next_question.as_deref()),
        status: step.status.to_string(),
        done: step.status.is_terminal(),
        assessment_name: Some(step.assessment_name),
        total_score: step.total_score,
        interpretation: step.interpretation,
    })
}

fn outbound(message: &str, next_question: Option<&str>) -> String {
    match next_question {
        Some(question) if message.is_empty() => question.to_string(),
        Some(question) => format!("{message} {question}"),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn turn(
        catalog: &Catalog,
        flow: Flow,
        utterance: &str,
        assessment_id: Option<&str>,
        prior_state: Option<serde_json::Value>,
    ) -> TurnResponse {
        process_turn(
            catalog,
            &TurnRequest {
                utterance: utterance.into(),
                flow,
                assessment_id: assessment_id.map(String::from),
                prior_state,
            },
        )
    }

    #[test]
    fn fresh_profile_turn_with_yes_moves_to_age() {
        let catalog = catalog();
        let response = turn(&catalog, Flow::Profile, "yes", None, None);
        assert_eq!(response.status, "age_pending");
        assert!(!response.done);
        assert!(response.message.contains("What is your age?"));
    }

    #[test]
    fn state_blob_round_trips_between_turns() {
        let catalog = catalog();
        let first = turn(&catalog, Flow::Profile, "yes", None, None);
        let second = turn(&catalog, Flow::Profile, "25", None, Some(first.state));
        assert_eq!(second.status, "gender_pending");
        assert!(second.message.contains("Noted age: 25."));

        // The returned blob is accepted unchanged as the next prior state.
        let reserialized: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&second.state).unwrap()).unwrap();
        let third = turn(&catalog, Flow::Profile, "skip", None, Some(reserialized));
        assert_eq!(third.status, "location_pending");
    }

    #[test]
    fn profile_terminal_reentry_reports_error_status() {
        let catalog = catalog();
        let skipped = turn(&catalog, Flow::Profile, "skip all", None, None);
        assert_eq!(skipped.status, "skipped_all");
        assert!(skipped.done);

        let reentry = turn(&catalog, Flow::Profile, "25", None, Some(skipped.state.clone()));
        assert_eq!(reentry.status, "error");
        assert!(!reentry.done);
        assert!(reentry.message.contains("already ended"));
        // State echoed back unchanged.
        assert_eq!(reentry.state, skipped.state);
    }

    #[test]
    fn malformed_profile_blob_reports_error() {
        let catalog = catalog();
        let bad = serde_json::json!({"consent": "granted", "fields": "oops"});
        let response = turn(&catalog, Flow::Profile, "yes", None, Some(bad.clone()));
        assert_eq!(response.status, "error");
        assert!(response.message.contains("Malformed prior state"));
        assert_eq!(response.state, bad);
    }

    #[test]
    fn fresh_assessment_requires_id() {
        let catalog = catalog();
        let response = turn(&catalog, Flow::Assessment, "yes", None, None);
        assert_eq!(response.status, "error");
        assert!(response.message.contains("Missing assessment id"));
        assert_eq!(response.state, serde_json::Value::Null);
    }

    #[test]
    fn unknown_assessment_id_reports_error() {
        let catalog = catalog();
        let response = turn(&catalog, Flow::Assessment, "yes", Some("sleep"), None);
        assert_eq!(response.status, "error");
        assert!(response.message.contains("Unknown questionnaire id: sleep"));
    }

    #[test]
    fn assessment_consent_and_first_question() {
        let catalog = catalog();
        let response = turn(&catalog, Flow::Assessment, "yes", Some("anxiety"), None);
        assert_eq!(response.status, "question_pending");
        assert!(response.message.contains("GAD-7 question 1 of 7"));
    }

    #[test]
    fn assessment_completes_with_score_and_interpretation() {
        let catalog = catalog();
        let mut response = turn(&catalog, Flow::Assessment, "yes", Some("anxiety"), None);
        for answer in ["1", "2", "3", "0", "1", "2", "3"] {
            response = turn(
                &catalog,
                Flow::Assessment,
                answer,
                None,
                Some(response.state),
            );
        }
        assert_eq!(response.status, "complete");
        assert!(response.done);
        assert_eq!(response.total_score, Some(12));
        assert_eq!(response.interpretation.as_deref(), Some("Moderate anxiety"));
        assert_eq!(response.assessment_name.as_deref(), Some("GAD-7"));
    }

    #[test]
    fn assessment_turns_carry_instrument_name() {
        let catalog = catalog();
        let pending = turn(&catalog, Flow::Assessment, "hm", Some("anxiety"), None);
        assert_eq!(pending.assessment_name.as_deref(), Some("GAD-7"));

        let started = turn(&catalog, Flow::Assessment, "yes", Some("anxiety"), None);
        assert_eq!(started.assessment_name.as_deref(), Some("GAD-7"));

        // Profile turns have no instrument.
        let profile = turn(&catalog, Flow::Profile, "yes", None, None);
        assert_eq!(profile.assessment_name, None);
    }

    #[test]
    fn assessment_id_mismatch_with_prior_state_is_error() {
        let catalog = catalog();
        let started = turn(&catalog, Flow::Assessment, "yes", Some("anxiety"), None);
        let response = turn(
            &catalog,
            Flow::Assessment,
            "1",
            Some("depression"),
            Some(started.state),
        );
        assert_eq!(response.status, "error");
        assert!(response.message.contains("does not match prior state"));
    }

    #[test]
    fn invalid_answer_keeps_pending_and_not_done() {
        let catalog = catalog();
        let started = turn(&catalog, Flow::Assessment, "yes", Some("depression"), None);
        let response = turn(&catalog, Flow::Assessment, "abc", None, Some(started.state.clone()));
        assert_eq!(response.status, "question_pending");
        assert!(!response.done);
        assert_eq!(response.state, started.state);
    }
}
