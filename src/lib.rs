//! DrukCare — conversational data-collection and assessment engine.
//!
//! Two deterministic, resumable state machines (demographic profile
//! collection and clinical questionnaire administration) behind a
//! single-turn adapter. All continuation data round-trips through the
//! caller as a serialized state blob; nothing is held between calls.

pub mod assessment;
pub mod catalog;
pub mod config;
pub mod consent;
pub mod crisis;
pub mod error;
pub mod extract;
pub mod profile;
pub mod server;
pub mod turn;
