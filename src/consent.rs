//! Consent gate shared by both collection flows.
//!
//! Neither machine may advance past consent without an explicit signal:
//! anything that is not a clear grant or denial is `Unresolved`, and the
//! calling machine re-asks the same question verbatim.

use serde::{Deserialize, Serialize};

/// Recorded consent state, persisted inside both machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consent {
    #[default]
    Undecided,
    Granted,
    Denied,
}

/// Classification of a single consent utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Granted,
    Denied,
    Unresolved,
}

const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "consent"];
const NEGATION_TOKENS: &[&str] = &["no"];
const NEGATION_PHRASES: &[&str] = &["do not consent", "don't consent"];

/// Classify a free-text utterance as a consent decision.
///
/// Negation phrases are checked before affirmative tokens: "do not consent"
/// contains the token "consent" and must never grant.
pub fn decide(utterance: &str) -> ConsentDecision {
    let normalized = utterance.trim().to_lowercase();

    if NEGATION_PHRASES.iter().any(|p| normalized.contains(p)) {
        return ConsentDecision::Denied;
    }

    let tokens: Vec<&str> = normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.iter().any(|t| NEGATION_TOKENS.contains(t)) {
        ConsentDecision::Denied
    } else if tokens.iter().any(|t| AFFIRMATIVE_TOKENS.contains(t)) {
        ConsentDecision::Granted
    } else {
        ConsentDecision::Unresolved
    }
}

impl std::fmt::Display for Consent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Undecided => "undecided",
            Self::Granted => "granted",
            Self::Denied => "denied",
        };
        write!(f, "{s}")
    }
}
