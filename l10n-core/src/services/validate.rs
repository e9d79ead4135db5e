use crate::model::validation::{ValidationFailure, ValidationResult, ValidationWarning};
use crate::services::placeholder;

/// Sources shorter than this are too small for a meaningful length ratio.
const MIN_RATIO_SOURCE_CHARS: usize = 10;

/// Accept-or-reject gate for provider output.
#[derive(Debug, Clone)]
pub struct Validator {
    pub max_length_ratio: f64,
    pub source_locale: String,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_length_ratio: 3.0,
            source_locale: "en".to_string(),
        }
    }
}

impl Validator {
    pub fn new(max_length_ratio: f64, source_locale: &str) -> Self {
        Self {
            max_length_ratio,
            source_locale: source_locale.to_string(),
        }
    }

    /// Rules run in order and the first hard failure wins:
    /// empty or echoed output, then the token multiset, then length.
    pub fn validate(
        &self,
        source: &str,
        candidate: &str,
        tokens: &[String],
        target_locale: &str,
    ) -> ValidationResult {
        let candidate_trim = candidate.trim();

        if candidate_trim.is_empty() {
            return ValidationResult::failed(ValidationFailure::Empty);
        }

        if candidate_trim == source.trim()
            && !target_locale.eq_ignore_ascii_case(&self.source_locale)
            && !echo_allowed(source)
        {
            return ValidationResult::failed(ValidationFailure::Echo);
        }

        let expected = placeholder::count(tokens.iter().map(String::as_str));
        let actual = placeholder::token_counts(candidate);
        let details = placeholder::diff_tokens(&expected, &actual);
        if !details.is_empty() {
            return ValidationResult::failed(ValidationFailure::PlaceholderMismatch { details });
        }

        let mut result = ValidationResult::default();
        if let Some(ratio) = self.length_anomaly(source, candidate_trim) {
            result
                .warnings
                .push(ValidationWarning::LengthAnomaly { ratio });
        }
        result
    }

    fn length_anomaly(&self, source: &str, candidate: &str) -> Option<f64> {
        let src = source.trim().chars().count();
        if src < MIN_RATIO_SOURCE_CHARS {
            return None;
        }
        let ratio = candidate.chars().count() as f64 / src as f64;
        (ratio > self.max_length_ratio || ratio < 1.0 / self.max_length_ratio).then_some(ratio)
    }
}

/// Strings with nothing to translate may come back unchanged.
fn echo_allowed(source: &str) -> bool {
    placeholder::is_pure_placeholder(source)
        || !placeholder::strip_tokens(source)
            .chars()
            .any(char::is_alphabetic)
}
