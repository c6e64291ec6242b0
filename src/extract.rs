//! Free-text extractors for profile fields and questionnaire answers.
//!
//! Each extractor is a narrow pure function `&str -> Option<T>`. Matching is
//! keyword/regex based and inherently fuzzy; keeping it behind this seam
//! means the strategy can be swapped without touching the state machines.
//! `None` always means "re-ask the same question", never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Inclusive age range accepted by [`extract_age`].
pub const AGE_MIN: u32 = 0;
pub const AGE_MAX: u32 = 120;

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Extract an age from phrasings like "my age is 30", "I am 30 years old",
/// or a bare "30". Takes the first integer token; out-of-range values are
/// rejected (back to the same prompt).
pub fn extract_age(utterance: &str) -> Option<u32> {
    let m = AGE_RE.find(utterance)?;
    let age: u32 = m.as_str().parse().ok()?;
    (AGE_MIN..=AGE_MAX).contains(&age).then_some(age)
}

/// Gender options offered by the profile flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::NonBinary => "Non-binary",
        };
        write!(f, "{s}")
    }
}

/// Match a gender keyword anywhere in the utterance.
///
/// Longest keywords first: "female" and "non-binary" both contain "male".
pub fn extract_gender(utterance: &str) -> Option<Gender> {
    let normalized = utterance.to_lowercase();
    if ["non-binary", "non binary", "nonbinary"]
        .iter()
        .any(|k| normalized.contains(k))
    {
        Some(Gender::NonBinary)
    } else if normalized.contains("female") {
        Some(Gender::Female)
    } else if normalized.contains("male") {
        Some(Gender::Male)
    } else {
        None
    }
}

/// Gazetteer of accepted place names: the 20 dzongkhags plus Phuentsholing.
pub const LOCATIONS: &[&str] = &[
    "bumthang",
    "chhukha",
    "dagana",
    "gasa",
    "haa",
    "lhuentse",
    "mongar",
    "paro",
    "pemagatshel",
    "phuentsholing",
    "punakha",
    "samdrup jongkhar",
    "samtse",
    "sarpang",
    "thimphu",
    "trashigang",
    "trashiyangtse",
    "trongsa",
    "tsirang",
    "wangdue phodrang",
    "zhemgang",
];

/// Accepted ethnicity names.
pub const ETHNICITIES: &[&str] = &[
    "brokpa",
    "drukpa",
    "kheng",
    "lepcha",
    "lhotshampa",
    "nepalese",
    "ngalop",
    "sharchop",
];

/// Match a place name from the gazetteer as a substring of the utterance.
/// Returns the canonical capitalized form.
pub fn extract_location(utterance: &str) -> Option<String> {
    match_gazetteer(utterance, LOCATIONS)
}

/// Match an ethnicity from the fixed enumeration.
pub fn extract_ethnicity(utterance: &str) -> Option<String> {
    match_gazetteer(utterance, ETHNICITIES)
}

fn match_gazetteer(utterance: &str, entries: &[&str]) -> Option<String> {
    let normalized = utterance.to_lowercase();
    entries
        .iter()
        .find(|entry| normalized.contains(*entry))
        .map(|entry| capitalize_words(entry))
}

fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a Likert answer: the whole (trimmed) utterance must be an integer
/// within `min..=max`. "-1", "99" and non-numeric input are rejected.
pub fn extract_likert(utterance: &str, min: u32, max: u32) -> Option<u32> {
    let value: i64 = utterance.trim().parse().ok()?;
    let value: u32 = value.try_into().ok()?;
    (min..=max).contains(&value).then_some(value)
}

/// Parse a yes/no answer as a 0/1 score. Accepts the words and the digits;
/// anything else is rejected rather than silently scored as "no".
pub fn extract_yes_no(utterance: &str) -> Option<u32> {
    match utterance.trim().to_lowercase().as_str() {
        "yes" | "y" | "1" => Some(1),
        "no" | "n" | "0" => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_from_common_phrasings() {
        assert_eq!(extract_age("25"), Some(25));
        assert_eq!(extract_age("my age is 30"), Some(30));
        assert_eq!(extract_age("I am 42 years old"), Some(42));
    }

    #[test]
    fn age_takes_first_integer_token() {
        assert_eq!(extract_age("I turned 29 on the 14th"), Some(29));
    }

    #[test]
    fn age_boundaries() {
        assert_eq!(extract_age("0"), Some(0));
        assert_eq!(extract_age("120"), Some(120));
        assert_eq!(extract_age("121"), None);
        assert_eq!(extract_age("I am 300 years old"), None);
    }

    #[test]
    fn age_rejects_non_numeric() {
        assert_eq!(extract_age("none of your business"), None);
        assert_eq!(extract_age(""), None);
    }

    #[test]
    fn gender_keywords() {
        assert_eq!(extract_gender("I am male"), Some(Gender::Male));
        assert_eq!(extract_gender("Female"), Some(Gender::Female));
        assert_eq!(extract_gender("non-binary"), Some(Gender::NonBinary));
        assert_eq!(extract_gender("non binary"), Some(Gender::NonBinary));
    }

    #[test]
    fn female_is_not_matched_as_male() {
        assert_eq!(extract_gender("I'm a female"), Some(Gender::Female));
    }

    #[test]
    fn gender_unknown() {
        assert_eq!(extract_gender("prefer not to say"), None);
    }

    #[test]
    fn location_substring_match_is_case_insensitive() {
        assert_eq!(extract_location("I live in Thimphu"), Some("Thimphu".into()));
        assert_eq!(extract_location("PARO"), Some("Paro".into()));
        assert_eq!(
            extract_location("samdrup jongkhar area"),
            Some("Samdrup Jongkhar".into())
        );
    }

    #[test]
    fn location_outside_gazetteer() {
        assert_eq!(extract_location("London"), None);
    }

    #[test]
    fn ethnicity_match() {
        assert_eq!(extract_ethnicity("I am Drukpa"), Some("Drukpa".into()));
        assert_eq!(extract_ethnicity("lhotshampa"), Some("Lhotshampa".into()));
        assert_eq!(extract_ethnicity("martian"), None);
    }

    #[test]
    fn likert_in_range() {
        for value in 0..=3 {
            assert_eq!(extract_likert(&value.to_string(), 0, 3), Some(value));
        }
        assert_eq!(extract_likert(" 2 ", 0, 3), Some(2));
    }

    #[test]
    fn likert_rejects_out_of_range_and_garbage() {
        assert_eq!(extract_likert("-1", 0, 3), None);
        assert_eq!(extract_likert("4", 0, 3), None);
        assert_eq!(extract_likert("99", 0, 3), None);
        assert_eq!(extract_likert("abc", 0, 3), None);
        assert_eq!(extract_likert("2.5", 0, 3), None);
    }

    #[test]
    fn yes_no_variants() {
        assert_eq!(extract_yes_no("yes"), Some(1));
        assert_eq!(extract_yes_no("Y"), Some(1));
        assert_eq!(extract_yes_no("1"), Some(1));
        assert_eq!(extract_yes_no("No"), Some(0));
        assert_eq!(extract_yes_no("n"), Some(0));
        assert_eq!(extract_yes_no("0"), Some(0));
    }

    #[test]
    fn yes_no_rejects_everything_else() {
        assert_eq!(extract_yes_no("sometimes"), None);
        assert_eq!(extract_yes_no("2"), None);
        assert_eq!(extract_yes_no(""), None);
    }
}
