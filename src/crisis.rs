//! Pre-engine crisis screen.
//!
//! Runs before either collection flow gets the utterance. A match
//! short-circuits the turn so the caller can respond with emergency
//! resources immediately instead of continuing data collection. Keyword
//! matching is a backstop, not a diagnosis; the orchestration layer may
//! run richer detection upstream.

use regex::Regex;
use tracing::debug;

/// Mental health helplines in Bhutan, offered whenever a crisis rule fires.
pub const HELPLINES: &str = "\
If you are in immediate danger, please reach out now:
- National Mental Health Program Hotline: 1717 (24/7)
- JDWNRH Psychiatry Department: +975-2-322137
- Youth HelpLine: 1769 / 1768
You don't have to go through this alone.";

/// A single crisis rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct CrisisRule {
    /// Human-readable pattern description.
    pub pattern: String,
    /// Compiled regex for matching.
    pub regex: Regex,
    /// Why this rule triggers.
    pub reason: String,
}

/// A crisis rule that matched an utterance.
#[derive(Debug, Clone)]
pub struct CrisisMatch {
    pub reason: String,
    /// Emergency resources to put in front of the user.
    pub helplines: &'static str,
}

/// Keyword/regex crisis screen.
pub struct CrisisScreen {
    rules: Vec<CrisisRule>,
}

impl CrisisScreen {
    /// Create a screen with the default crisis patterns.
    pub fn default_rules() -> Self {
        let rules = vec![
            CrisisRule {
                pattern: "suicide/self-harm phrasing".into(),
                regex: Regex::new(
                    r"(?i)\b(suicide|suicidal|kill (myself|me)|end (my|it all)|want to die|better off dead|hurt (myself|me)|self[- ]?harm)\b",
                )
                .unwrap(),
                reason: "self-harm language".into(),
            },
            CrisisRule {
                pattern: "hopelessness phrasing".into(),
                regex: Regex::new(r"(?i)\bno reason to (live|go on)\b").unwrap(),
                reason: "acute hopelessness".into(),
            },
            CrisisRule {
                pattern: "emergency phrasing".into(),
                regex: Regex::new(r"(?i)\b(emergency|immediate danger)\b").unwrap(),
                reason: "emergency language".into(),
            },
        ];
        Self { rules }
    }

    /// Create an empty screen (for testing).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom crisis rule.
    pub fn add_rule(&mut self, pattern: &str, reason: &str) -> Result<(), regex::Error> {
        self.rules.push(CrisisRule {
            pattern: pattern.into(),
            regex: Regex::new(pattern)?,
            reason: reason.into(),
        });
        Ok(())
    }

    /// Screen an utterance against all rules.
    ///
    /// Returns `Some(CrisisMatch)` on the first matching rule (the turn
    /// should short-circuit), `None` to fall through to the engine.
    pub fn screen(&self, utterance: &str) -> Option<CrisisMatch> {
        for rule in &self.rules {
            if rule.regex.is_match(utterance) {
                debug!(rule = %rule.pattern, reason = %rule.reason, "Utterance matched crisis rule");
                return Some(CrisisMatch {
                    reason: rule.reason.clone(),
                    helplines: HELPLINES,
                });
            }
        }
        None
    }
}

impl Default for CrisisScreen {
    fn default() -> Self {
        Self::default_rules()
    }
}
