use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard failures: the candidate is neither cached nor merged.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValidationFailure {
    #[error("translation is empty")]
    Empty,

    #[error("translation is identical to the source text")]
    Echo,

    #[error("placeholder mismatch ({})", .details.join(", "))]
    PlaceholderMismatch { details: Vec<String> },
}

/// Soft findings: logged and reported, the key is still merged.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValidationWarning {
    #[error("length anomaly: translation is {ratio:.2}x the source length")]
    LengthAnomaly { ratio: f64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub failure: Option<ValidationFailure>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failed(failure: ValidationFailure) -> Self {
        Self {
            failure: Some(failure),
            warnings: Vec::new(),
        }
    }
}
