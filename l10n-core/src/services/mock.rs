//! Deterministic translator for tests and dry runs.
//!
//! Works on the protected source (sentinels intact), so the pipeline's
//! restore and validation steps run exactly as they do against a real model.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::services::client::Translator;
use crate::services::request::TranslationRequest;

#[derive(Debug, Clone)]
pub enum MockMode {
    /// `"Save"` becomes `"Save [es]"`.
    Suffix,
    /// Fixed translations by key; unknown keys are rejected.
    Mappings(HashMap<String, String>),
    /// Returns the source unchanged.
    Echo,
    /// Listed keys always fail with a provider error; the rest use `Suffix`.
    FailKeys(HashSet<String>),
    /// The first `n` calls are rate limited, then `Suffix`.
    RateLimitThenOk(usize),
    /// Loses every placeholder, then `Suffix`.
    DropPlaceholders,
}

pub struct MockTranslator {
    mode: MockMode,
    model: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<TranslationRequest>>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            model: "mock".to_string(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Raises `flag` once `n` calls have been made, like an operator
    /// pressing Ctrl-C mid-run.
    pub fn cancel_after(mut self, n: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((n, flag));
        self
    }

    pub fn fail_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockMode::FailKeys(keys.into_iter().map(Into::into).collect()))
    }

    /// Total calls, retries included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    /// Keys in the order their calls arrived.
    pub fn requested_keys(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.key().to_string())
            .collect()
    }

    fn suffix(request: &TranslationRequest) -> String {
        format!(
            "{} [{}]",
            request.protected_source, request.unit.target_locale
        )
    }
}

impl Translator for MockTranslator {
    fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        if let Some((after, flag)) = &self.cancel_after {
            if n >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }

        match &self.mode {
            MockMode::Suffix => Ok(Self::suffix(request)),
            MockMode::Mappings(map) => map.get(request.key()).cloned().ok_or_else(|| {
                ProviderError::Rejected(format!("no mock mapping for {}", request.key()))
            }),
            MockMode::Echo => Ok(request.protected_source.clone()),
            MockMode::FailKeys(keys) if keys.contains(request.key()) => Err(
                ProviderError::Provider(format!("simulated failure for {}", request.key())),
            ),
            MockMode::FailKeys(_) => Ok(Self::suffix(request)),
            MockMode::RateLimitThenOk(limit) if n <= *limit => {
                Err(ProviderError::RateLimited { retry_after: None })
            }
            MockMode::RateLimitThenOk(_) => Ok(Self::suffix(request)),
            MockMode::DropPlaceholders => {
                let stripped: Vec<&str> = request
                    .protected_source
                    .split_whitespace()
                    .filter(|w| !w.contains("__PH_"))
                    .collect();
                Ok(format!(
                    "{} [{}]",
                    stripped.join(" "),
                    request.unit.target_locale
                ))
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
