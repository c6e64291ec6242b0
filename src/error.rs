//! Error types for the DrukCare engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Questionnaire catalog errors.
///
/// Band-shape violations are fatal at load time; `UncoveredScore` can only
/// fire if a definition bypassed validation, and is surfaced loudly rather
/// than defaulting to an empty interpretation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown questionnaire id: {0}")]
    UnknownQuestionnaire(String),

    #[error("Questionnaire {id} has no questions")]
    NoQuestions { id: String },

    #[error("Questionnaire {id} has no interpretation bands")]
    NoBands { id: String },

    #[error("Questionnaire {id}: first interpretation band starts at {start}, expected 0")]
    BandStart { id: String, start: u32 },

    #[error("Questionnaire {id}: band \"{label}\" starts at {low}, expected {expected}")]
    BandDiscontinuity {
        id: String,
        label: String,
        low: u32,
        expected: u32,
    },

    #[error("Questionnaire {id}: band \"{label}\" has low {low} greater than high {high}")]
    BandInverted {
        id: String,
        label: String,
        low: u32,
        high: u32,
    },

    #[error("Questionnaire {id}: bands end at {end} but the maximum reachable score is {max}")]
    BandShortfall { id: String, end: u32, max: u32 },

    #[error("Questionnaire {id}: duplicate id in catalog")]
    DuplicateId { id: String },

    #[error("Questionnaire {id}: no interpretation band covers score {score}")]
    UncoveredScore { id: String, score: u32 },

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-supplied state violations.
///
/// These abort the turn with the prior state echoed back unchanged; the
/// engine never guesses a recovery for a corrupted blob.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Malformed prior state: {0}")]
    Malformed(String),

    #[error("Inconsistent assessment state: {scores} scores recorded but current index is {index}")]
    Inconsistent { scores: usize, index: i64 },

    #[error("Session already ended with status {status}")]
    TerminalSession { status: String },

    #[error("Missing assessment id for a fresh assessment session")]
    MissingAssessmentId,
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
