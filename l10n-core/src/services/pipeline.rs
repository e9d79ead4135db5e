use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, SendError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{language_name, model_version, Settings};
use crate::error::PipelineResult;
use crate::model::report::{KeyFailure, KeyWarning, RunReport};
use crate::model::unit::{ReferenceMode, TranslationUnit};
use crate::model::validation::ValidationWarning;
use crate::services::cache::{hash, FingerprintCache};
use crate::services::client::{TranslationClient, Translator};
use crate::services::context::PromptContext;
use crate::services::request::{is_passthrough, RequestBuilder, TranslationRequest};
use crate::services::retry::RetryPolicy;
use crate::services::validate::Validator;
use crate::services::{diff, locale_file, merge};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Retranslate keys that are already present and up to date.
    pub force: bool,
    /// Off means an in-memory cache that starts empty and is never saved.
    pub use_cache: bool,
    pub workers: usize,
    pub max_length_ratio: f64,
    pub source_locale: String,
    pub cache_flush_every: usize,
    pub retry: RetryPolicy,
    pub glossary_path: Option<PathBuf>,
    pub fewshot_path: Option<PathBuf>,
    pub system_prompt_path: Option<PathBuf>,
    /// Raised from outside (SIGINT) to stop handing out new keys.
    pub cancel: Arc<AtomicBool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RunOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let p = &settings.pipeline;
        Self {
            force: false,
            use_cache: true,
            workers: p.workers,
            max_length_ratio: p.max_length_ratio,
            source_locale: p.source_locale.clone(),
            cache_flush_every: p.cache_flush_every,
            retry: RetryPolicy::from_settings(&settings.provider),
            glossary_path: p.glossary_path.clone(),
            fewshot_path: p.fewshot_path.clone(),
            system_prompt_path: p.system_prompt_path.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

struct Job {
    request: TranslationRequest,
    fingerprint: String,
    source_fingerprint: String,
}

enum Outcome {
    Translated {
        key: String,
        text: String,
        warnings: Vec<ValidationWarning>,
    },
    /// Another worker stored the same fingerprint first.
    CacheHit { key: String, text: String },
    Failed(KeyFailure),
}

struct Worker<'a> {
    cache: &'a Mutex<FingerprintCache>,
    client: &'a TranslationClient<'a>,
    validator: &'a Validator,
    locale: &'a str,
    cancel: &'a AtomicBool,
}

impl Worker<'_> {
    fn process(&self, job: Job) -> Outcome {
        let key = job.request.key().to_string();

        if self.cancel.load(Ordering::SeqCst) {
            return Outcome::Failed(KeyFailure::cancelled(&key));
        }

        {
            let mut cache = self.cache.lock();
            if let Some(text) = cache.get(&job.fingerprint).map(str::to_string) {
                cache.record_source(self.locale, &key, &job.source_fingerprint);
                return Outcome::CacheHit { key, text };
            }
        }

        let raw = match self.client.translate(&job.request) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, "translation failed: {e}");
                return Outcome::Failed(KeyFailure::provider(&key, &e));
            }
        };

        let candidate = job.request.restore(&raw);
        let result = self.validator.validate(
            &job.request.unit.source_text,
            &candidate,
            &job.request.tokens,
            self.locale,
        );

        if let Some(failure) = result.failure {
            warn!(key = %key, "rejected translation: {failure}");
            return Outcome::Failed(KeyFailure::validation(&key, &failure));
        }
        for w in &result.warnings {
            warn!(key = %key, "{w}");
        }

        let text = {
            let mut cache = self.cache.lock();
            let canonical = cache.put(&job.fingerprint, &candidate);
            cache.record_source(self.locale, &key, &job.source_fingerprint);
            canonical
        };

        debug!(key = %key, "translated");
        Outcome::Translated {
            key,
            text,
            warnings: result.warnings,
        }
    }
}

/// Translates whatever `destination` is missing for `locale` and writes the
/// merged result back.
///
/// Per-key failures land in the report; only file-level problems are
/// errors. The cache is flushed before the destination is written, so a
/// failed write loses no paid translations.
#[allow(clippy::too_many_arguments)]
pub fn run(
    source: &Path,
    reference: Option<&Path>,
    draft: Option<&Path>,
    destination: &Path,
    locale: &str,
    cache_path: &Path,
    options: &RunOptions,
    translator: &dyn Translator,
) -> PipelineResult<RunReport> {
    let locale = locale.trim();
    let mut report = RunReport::new(locale);

    let source_map = locale_file::load(source)?;
    let reference_map = match reference {
        Some(p) => Some(locale_file::load(p)?),
        None => None,
    };
    let draft_map = locale_file::load_optional(draft)?;
    let destination_map = locale_file::load_optional(Some(destination))?;

    let model_version = model_version(translator.model());
    let mut cache = if options.use_cache {
        FingerprintCache::open(cache_path, &model_version, options.cache_flush_every)
    } else {
        FingerprintCache::in_memory(&model_version)
    };

    let key_diff = diff::diff(&source_map, &destination_map, &cache, locale);

    // Present keys seen for the first time get a baseline, so a later edit of
    // their source text shows up as stale.
    let mut baselined = 0usize;
    for key in key_diff.present() {
        if cache.source_record(locale, key).is_none() {
            if let Some(text) = source_map.get(key) {
                cache.record_source(locale, key, &hash::source_fingerprint(text));
                baselined += 1;
            }
        }
    }
    if baselined > 0 {
        debug!(keys = baselined, "recorded source baseline for existing translations");
    }
    let pending = key_diff.pending(options.force);
    report.skipped = source_map.len() - pending.len();

    info!(
        locale,
        keys = source_map.len(),
        missing = key_diff.missing().len(),
        stale = key_diff.stale().len(),
        pending = pending.len(),
        provider = translator.provider_name(),
        model = translator.model(),
        "starting run"
    );

    let mode = if reference_map.is_some() {
        ReferenceMode::Dual
    } else {
        ReferenceMode::Single
    };

    let language = language_name(locale);
    let context = PromptContext::load(
        options.system_prompt_path.as_deref(),
        options.glossary_path.as_deref(),
        options.fewshot_path.as_deref(),
        locale,
        &language,
        &source_map,
    )?;
    let builder = RequestBuilder::new(&context, locale, &language);

    let mut translations: HashMap<String, String> = HashMap::new();
    let mut jobs = Vec::new();

    for key in &pending {
        let Some(text) = source_map.get(key) else {
            continue;
        };
        let source_fingerprint = hash::source_fingerprint(text);

        if is_passthrough(key, text) {
            translations.insert(key.to_string(), text.to_string());
            cache.record_source(locale, key, &source_fingerprint);
            report.passthrough += 1;
            continue;
        }

        let unit = TranslationUnit::new(*key, text, locale)
            .with_reference(
                reference_map
                    .as_ref()
                    .and_then(|r| r.get(key))
                    .map(str::to_string),
            )
            .with_draft(
                non_blank(draft_map.get(key))
                    .or_else(|| non_blank(destination_map.get(key)))
                    .map(str::to_string),
            );

        let request = builder.build(&unit, mode);
        if request.fell_back {
            debug!(key = %key, "no reference text, using single-reference mode");
            report.fallbacks.push(key.to_string());
        }

        let fingerprint = cache.fingerprint(text, request.fingerprint_reference(), locale);
        if let Some(hit) = cache.get(&fingerprint) {
            translations.insert(key.to_string(), hit.to_string());
            cache.record_source(locale, key, &source_fingerprint);
            report.cache_hits += 1;
            continue;
        }

        jobs.push(Job {
            request,
            fingerprint,
            source_fingerprint,
        });
    }

    if !jobs.is_empty() {
        info!(
            jobs = jobs.len(),
            cache_hits = report.cache_hits,
            passthrough = report.passthrough,
            "calling provider"
        );
    }

    let cache = Mutex::new(cache);
    let client = TranslationClient::new(translator, options.retry);
    let validator = Validator::new(options.max_length_ratio, &options.source_locale);
    let outcomes = translate_all(
        jobs,
        &Worker {
            cache: &cache,
            client: &client,
            validator: &validator,
            locale,
            cancel: &options.cancel,
        },
        options,
    );
    let mut cache = cache.into_inner();
    report.provider_calls = client.calls();

    for outcome in outcomes {
        match outcome {
            Outcome::Translated {
                key,
                text,
                warnings,
            } => {
                report.translated += 1;
                report.warnings.extend(warnings.into_iter().map(|warning| KeyWarning {
                    key: key.clone(),
                    warning,
                }));
                translations.insert(key, text);
            }
            Outcome::CacheHit { key, text } => {
                report.cache_hits += 1;
                translations.insert(key, text);
            }
            Outcome::Failed(f) => report.failed.push(f),
        }
    }

    let order: HashMap<&str, usize> = pending.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let position = |key: &str| order.get(key).copied().unwrap_or(usize::MAX);
    report.failed.sort_by_key(|f| position(&f.key));
    report.warnings.sort_by_key(|w| position(&w.key));
    report.cancelled = options.cancelled();

    if let Err(e) = cache.flush() {
        warn!("failed to persist cache: {e}");
    }

    let merged = merge::merge(&source_map, &destination_map, &translations);
    let unchanged = destination.exists() && merged.encodes_same(&destination_map);

    if unchanged {
        debug!(path = %destination.display(), "destination already up to date");
    } else {
        merge::write(destination, &merged)?;
    }
    report.written = true;

    info!(
        locale,
        translated = report.translated,
        cache_hits = report.cache_hits,
        passthrough = report.passthrough,
        skipped = report.skipped,
        failed = report.failed.len(),
        provider_calls = report.provider_calls,
        "run finished"
    );

    Ok(report)
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Fans jobs out to at most `options.workers` threads and collects every
/// outcome. Once cancelled, jobs not yet handed out are reported as such.
fn translate_all(jobs: Vec<Job>, worker: &Worker<'_>, options: &RunOptions) -> Vec<Outcome> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let workers = options.workers.clamp(1, jobs.len());
    let (job_tx, job_rx) = bounded::<Job>(workers);
    let (out_tx, out_rx) = unbounded::<Outcome>();

    thread::scope(|s| {
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = out_tx.clone();
            s.spawn(move || {
                for job in rx {
                    if tx.send(worker.process(job)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);

        for job in jobs {
            if options.cancelled() {
                let _ = out_tx.send(Outcome::Failed(KeyFailure::cancelled(job.request.key())));
                continue;
            }
            if let Err(SendError(job)) = job_tx.send(job) {
                let _ = out_tx.send(Outcome::Failed(KeyFailure::cancelled(job.request.key())));
            }
        }

        drop(job_tx);
        drop(out_tx);
    });

    if options.cancelled() {
        warn!("run interrupted; finished work is kept, remaining keys were not translated");
    }

    out_rx.into_iter().collect()
}
