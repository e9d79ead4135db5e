use serde::Serialize;
use serde_json::json;

use crate::model::unit::{Intent, ReferenceMode, TranslationUnit};
use crate::services::context::PromptContext;
use crate::services::intent;
use crate::services::placeholder::{self, Protector};

const NAMESPACE_PREFIXES: [&str; 3] = ["common.", "pages.", "components."];

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Everything needed to ask a provider for one key and to check the answer.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub unit: TranslationUnit,
    /// Mode actually used for this key.
    pub mode: ReferenceMode,
    /// Dual mode was asked for but the reference had no text for this key.
    pub fell_back: bool,
    pub intent: Intent,
    /// Placeholder tokens of the source text, in order of appearance.
    pub tokens: Vec<String>,
    /// Source text with tokens replaced by sentinels, as sent to the provider.
    pub protected_source: String,
    pub protector: Protector,
    pub messages: Vec<ChatMessage>,
}

impl TranslationRequest {
    pub fn key(&self) -> &str {
        &self.unit.key
    }

    /// Reference text that participates in the cache fingerprint.
    pub fn fingerprint_reference(&self) -> Option<&str> {
        match self.mode {
            ReferenceMode::Dual => self.unit.reference_text.as_deref(),
            ReferenceMode::Single => None,
        }
    }

    /// Maps the provider's answer back to real tokens.
    pub fn restore(&self, candidate: &str) -> String {
        self.protector.unprotect(candidate)
    }
}

pub struct RequestBuilder<'a> {
    context: &'a PromptContext,
    locale: String,
    language_name: String,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(context: &'a PromptContext, locale: &str, language_name: &str) -> Self {
        Self {
            context,
            locale: locale.to_string(),
            language_name: language_name.to_string(),
        }
    }

    pub fn build(&self, unit: &TranslationUnit, mode: ReferenceMode) -> TranslationRequest {
        let has_reference = unit.reference_text.is_some();
        let (effective, fell_back) = match mode {
            ReferenceMode::Dual if !has_reference => (ReferenceMode::Single, true),
            other => (other, false),
        };

        let mut protector = Protector::new();
        let protected_source = protector.protect(&unit.source_text);
        let protected_reference = match effective {
            ReferenceMode::Dual => unit.reference_text.as_deref().map(|r| protector.protect(r)),
            ReferenceMode::Single => None,
        };
        let protected_draft = unit.draft_text.as_deref().map(|d| protector.protect(d));

        let intent = intent::infer(&unit.key);

        let mut item = json!({
            "key": unit.key,
            "intent": intent.as_str(),
            "en": protected_source,
        });
        if let Some(r) = &protected_reference {
            item["reference"] = json!(r);
        }
        if let Some(d) = &protected_draft {
            item["existing_translation"] = json!(d);
        }

        let payload = json!({
            "target_locale": self.locale,
            "target_language_name": self.language_name,
            "glossary": self.context.glossary,
            "examples": self.context.examples,
            "item": item,
            "instructions": self.instructions(effective, protected_draft.is_some()),
        });

        let messages = vec![
            ChatMessage::new("system", self.context.system_prompt.clone()),
            ChatMessage::new("user", payload.to_string()),
        ];

        TranslationRequest {
            unit: unit.clone(),
            mode: effective,
            fell_back,
            intent,
            tokens: placeholder::extract_tokens(&unit.source_text),
            protected_source,
            protector,
            messages,
        }
    }

    fn instructions(&self, mode: ReferenceMode, has_draft: bool) -> String {
        let mut parts = Vec::new();

        match mode {
            ReferenceMode::Dual => {
                parts.push(format!(
                    "Translate `en` to {} using BOTH the English (`en`) text and the \
                     verified `reference` translation.",
                    self.language_name
                ));
                parts.push(
                    "Use the reference to understand UI context, tone and terminology."
                        .to_string(),
                );
            }
            ReferenceMode::Single => {
                parts.push(format!(
                    "Translate `en` to {} using the English (`en`) text.",
                    self.language_name
                ));
            }
        }

        if has_draft {
            parts.push(
                "`existing_translation` is an earlier draft: reuse what is correct and fix \
                 the rest."
                    .to_string(),
            );
        }

        parts.push(
            "Keep placeholders such as __PH_0__ exactly as provided in the source.".to_string(),
        );
        parts.push(r#"Return a JSON object: {"translation": "<text>"}."#.to_string());

        parts.join(" ")
    }
}

/// Values copied verbatim instead of being translated.
pub fn is_passthrough(key: &str, value: &str) -> bool {
    value.is_empty()
        || value == key
        || NAMESPACE_PREFIXES.iter().any(|p| value.starts_with(p))
        || placeholder::is_pure_placeholder(value)
}
