//! Static prompt context: system prompt, glossary and few-shot examples.
//!
//! Glossary and few-shot files are produced by a separate bootstrap step;
//! this module only reads them and turns them into text and examples that
//! can be dropped into a request as-is.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::model::mapping::LocaleMapping;
use crate::services::intent;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional software localizer. \
Translate user interface strings into <<TARGET_LANGUAGE_NAME>> (<<TARGET_LOCALE>>). \
Match the tone of a modern product UI, prefer established terminology, keep \
translations concise, and never alter placeholder markers.";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FewShotExample {
    pub key: String,
    pub intent: String,
    pub en: String,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub system_prompt: String,
    pub glossary: String,
    pub examples: Vec<FewShotExample>,
}

impl PromptContext {
    pub fn load(
        system_prompt_path: Option<&Path>,
        glossary_path: Option<&Path>,
        fewshot_path: Option<&Path>,
        locale: &str,
        language_name: &str,
        source: &LocaleMapping,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            system_prompt: load_system_prompt(system_prompt_path, locale, language_name)?,
            glossary: load_glossary(glossary_path)?,
            examples: load_fewshot(fewshot_path, locale, language_name, source)?,
        })
    }
}

pub fn load_system_prompt(
    path: Option<&Path>,
    locale: &str,
    language_name: &str,
) -> Result<String, PipelineError> {
    let template = match path {
        Some(p) => read(p)?,
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    };

    Ok(template
        .replace("<<TARGET_LOCALE>>", locale)
        .replace("<<TARGET_LANGUAGE_NAME>>", language_name))
}

/// JSON objects become sorted `term => translation` lines; anything else
/// is inserted verbatim.
pub fn load_glossary(path: Option<&Path>) -> Result<String, PipelineError> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(String::new());
    };

    let text = read(path)?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => {
            let mut pairs: Vec<(String, String)> = map
                .into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, v)
                })
                .collect();
            pairs.sort();
            Ok(pairs
                .iter()
                .map(|(k, v)| format!("{k} => {v}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Ok(_) if is_json(path) => Err(PipelineError::Context {
            path: path.to_path_buf(),
            reason: "glossary must be a JSON object".into(),
        }),
        Err(e) if is_json(path) => Err(PipelineError::Context {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        _ => Ok(text.trim().to_string()),
    }
}

/// Accepts a list of `{key, en, target}` objects, an object keyed by locale
/// holding such a list, or a `{key: target}` object whose source text is
/// looked up in `source`. Unusable entries are skipped.
pub fn load_fewshot(
    path: Option<&Path>,
    locale: &str,
    language_name: &str,
    source: &LocaleMapping,
) -> Result<Vec<FewShotExample>, PipelineError> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(Vec::new());
    };

    let raw: Value = serde_json::from_str(&read(path)?).map_err(|e| PipelineError::Context {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let block = match &raw {
        Value::Object(map) => map.get(locale).unwrap_or(&raw),
        Value::Array(_) => &raw,
        _ => {
            return Err(PipelineError::Context {
                path: path.to_path_buf(),
                reason: "few-shot payload must be an object or a list".into(),
            })
        }
    };

    let candidates: Vec<(Option<String>, &Value)> = match block {
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.clone()), v)).collect(),
        _ => Vec::new(),
    };

    let target_fields = [locale.to_string(), language_name.to_lowercase(), "target".to_string()];

    let examples = candidates
        .into_iter()
        .filter_map(|(outer_key, payload)| {
            let (key, en, target) = match payload {
                Value::Object(obj) => {
                    let key = obj
                        .get("key")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .or(outer_key)?;
                    let en = obj
                        .get("en")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .or_else(|| source.get(&key).map(str::to_string))?;
                    let target = target_fields
                        .iter()
                        .find_map(|f| obj.get(f.as_str()).and_then(|v| v.as_str()))?
                        .to_string();
                    (key, en, target)
                }
                Value::String(target) => {
                    let key = outer_key?;
                    let en = source.get(&key)?.to_string();
                    (key, en, target.clone())
                }
                _ => return None,
            };

            Some(FewShotExample {
                intent: intent::infer(&key).as_str().to_string(),
                key,
                en,
                target,
            })
        })
        .collect();

    Ok(examples)
}

fn read(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|e| PipelineError::Context {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
