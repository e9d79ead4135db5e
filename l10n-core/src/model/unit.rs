use serde::{Deserialize, Serialize};

/// One key queued for translation in the current run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub key: String,

    pub source_text: String,

    #[serde(default)]
    pub reference_text: Option<String>,

    #[serde(default)]
    pub draft_text: Option<String>,

    pub target_locale: String,
}

impl TranslationUnit {
    pub fn new(
        key: impl Into<String>,
        source_text: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_text: source_text.into(),
            reference_text: None,
            draft_text: None,
            target_locale: target_locale.into(),
        }
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference_text = reference.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_draft(mut self, draft: Option<String>) -> Self {
        self.draft_text = draft.filter(|d| !d.trim().is_empty());
        self
    }
}

/// How much context a request carries.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// Source text only; bootstrapping the first locale.
    #[default]
    Single,
    /// Source text plus an already translated reference locale.
    Dual,
}

/// Coarse role of a string inferred from its key.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Button,
    Title,
    Error,
    Label,
    Tooltip,
    Text,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Button => "button",
            Intent::Title => "title",
            Intent::Error => "error",
            Intent::Label => "label",
            Intent::Tooltip => "tooltip",
            Intent::Text => "text",
        }
    }
}
