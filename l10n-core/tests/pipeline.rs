use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use l10n_core::model::report::FailureKind;
use l10n_core::services::cache;
use l10n_core::services::retry::RetryPolicy;
use l10n_core::{run, MockMode, MockTranslator, PipelineError, RunOptions, RunReport};

struct Fixture {
    dir: TempDir,
    source: PathBuf,
    dst: PathBuf,
    cache: PathBuf,
}

impl Fixture {
    fn new(source: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("en.json");
        fs::write(&source_path, serde_json::to_string_pretty(&source).unwrap()).unwrap();
        Self {
            source: source_path,
            dst: dir.path().join("es.json"),
            cache: dir.path().join(".translation_cache.json"),
            dir,
        }
    }

    fn write(&self, name: &str, value: Value) -> PathBuf {
        let p = self.dir.path().join(name);
        fs::write(&p, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        p
    }

    fn set_source(&self, value: Value) {
        fs::write(&self.source, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn set_dst(&self, value: Value) {
        fs::write(&self.dst, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn dst_json(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(&self.dst).unwrap()).unwrap()
    }

    fn run(&self, translator: &MockTranslator) -> RunReport {
        self.run_with(translator, None, &options())
    }

    fn run_with(
        &self,
        translator: &MockTranslator,
        reference: Option<&Path>,
        options: &RunOptions,
    ) -> RunReport {
        self.run_full(translator, reference, None, options)
    }

    fn run_with_draft(&self, translator: &MockTranslator, draft: &Path) -> RunReport {
        self.run_full(translator, None, Some(draft), &options())
    }

    fn run_full(
        &self,
        translator: &MockTranslator,
        reference: Option<&Path>,
        draft: Option<&Path>,
        options: &RunOptions,
    ) -> RunReport {
        run(
            &self.source,
            reference,
            draft,
            &self.dst,
            "es",
            &self.cache,
            options,
            translator,
        )
        .unwrap()
    }
}

fn options() -> RunOptions {
    RunOptions {
        retry: RetryPolicy::immediate(3),
        ..RunOptions::default()
    }
}

fn keys(value: &Value) -> Vec<String> {
    value.as_object().unwrap().keys().cloned().collect()
}

fn ten_keys() -> Value {
    let mut map = serde_json::Map::new();
    for i in 1..=10 {
        map.insert(format!("k{i}"), json!(format!("Item number {i}")));
    }
    Value::Object(map)
}

#[test]
fn test_missing_keys_are_filled() {
    let fx = Fixture::new(json!({
        "app.title": "Welcome",
        "nav.save": "Save",
        "greeting": "Hello, {name}!"
    }));
    fx.set_dst(json!({ "app.title": "Bienvenido" }));

    let report = fx.run(&MockTranslator::new(MockMode::Suffix));

    assert!(report.is_success());
    assert_eq!(report.translated, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.provider_calls, 2);

    let dst = fx.dst_json();
    assert_eq!(keys(&dst), vec!["app.title", "nav.save", "greeting"]);
    assert_eq!(dst["app.title"], "Bienvenido");
    assert_eq!(dst["nav.save"], "Save [es]");
    assert_eq!(dst["greeting"], "Hello, {name}! [es]");
}

#[test]
fn test_second_run_is_idempotent() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel", "c": "Delete account" }));

    let first = fx.run(&MockTranslator::new(MockMode::Suffix));
    assert_eq!(first.translated, 3);
    let before = fs::read(&fx.dst).unwrap();

    let mock = MockTranslator::new(MockMode::Suffix);
    let second = fx.run(&mock);
    assert_eq!(mock.calls(), 0);
    assert_eq!(second.provider_calls, 0);
    assert_eq!(second.translated, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(fs::read(&fx.dst).unwrap(), before);
}

#[test]
fn test_warm_cache_serves_a_lost_destination() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel" }));
    fx.run(&MockTranslator::new(MockMode::Suffix));
    fs::remove_file(&fx.dst).unwrap();

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    assert_eq!(mock.calls(), 0);
    assert_eq!(report.cache_hits, 2);
    assert_eq!(fx.dst_json()["a"], "Save [es]");
}

#[test]
fn test_partial_failure_keeps_the_rest() {
    let fx = Fixture::new(ten_keys());

    let mock = MockTranslator::fail_keys(["k3", "k7"]);
    let report = fx.run(&mock);

    assert_eq!(report.translated, 8);
    let failed: Vec<&str> = report.failed.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(failed, vec!["k3", "k7"]);
    assert!(report.failed.iter().all(|f| f.kind == FailureKind::Provider));
    // Three attempts for each failing key.
    assert_eq!(report.provider_calls, 8 + 2 * 3);
    assert!(report.written);
    assert!(!report.is_success());

    let dst = fx.dst_json();
    assert_eq!(dst.as_object().unwrap().len(), 8);
    assert!(dst.get("k3").is_none());
    assert_eq!(dst["k10"], "Item number 10 [es]");

    let summary = report.to_string();
    assert!(summary.contains("[fail] k3:"));
    assert!(summary.contains("[fail] k7:"));
}

#[test]
fn test_failed_keys_are_retried_next_run() {
    let fx = Fixture::new(ten_keys());
    fx.run(&MockTranslator::fail_keys(["k3", "k7"]));

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    let mut requested = mock.requested_keys();
    requested.sort();
    assert_eq!(requested, vec!["k3", "k7"]);
    assert_eq!(report.translated, 2);
    assert_eq!(keys(&fx.dst_json()).len(), 10);
}

#[test]
fn test_model_change_invalidates_cache() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel" }));
    fx.run(&MockTranslator::new(MockMode::Suffix).with_model("model-a"));
    fs::remove_file(&fx.dst).unwrap();

    let mock = MockTranslator::new(MockMode::Suffix).with_model("model-b");
    let report = fx.run(&mock);
    assert_eq!(report.cache_hits, 0);
    assert_eq!(mock.calls(), 2);

    let stats = cache::inspect(&fx.cache).unwrap();
    assert_eq!(stats.model_version, "model-b:v1");
    assert_eq!(stats.count, 2);
}

#[test]
fn test_dual_reference_falls_back_per_key() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel" }));
    let reference = fx.write("ru.json", json!({ "a": "Сохранить" }));

    let report = fx.run_with(
        &MockTranslator::new(MockMode::Suffix),
        Some(&reference),
        &options(),
    );

    assert!(report.is_success());
    assert_eq!(report.translated, 2);
    assert_eq!(report.fallbacks, vec!["b"]);
    assert_eq!(fx.dst_json()["b"], "Cancel [es]");
}

#[test]
fn test_placeholder_mismatch_is_not_merged_or_cached() {
    let fx = Fixture::new(json!({ "a": "Hello {name}", "b": "Plain text" }));

    let report = fx.run(&MockTranslator::new(MockMode::DropPlaceholders));
    assert_eq!(report.translated, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "a");
    assert_eq!(report.failed[0].kind, FailureKind::PlaceholderMismatch);
    assert!(fx.dst_json().get("a").is_none());
    assert_eq!(cache::inspect(&fx.cache).unwrap().count, 1);

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    assert_eq!(mock.requested_keys(), vec!["a"]);
    assert_eq!(report.translated, 1);
    assert_eq!(fx.dst_json()["a"], "Hello {name} [es]");
}

#[test]
fn test_echo_is_rejected() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "{count}" }));

    let report = fx.run(&MockTranslator::new(MockMode::Echo));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::Echo);
    assert_eq!(report.passthrough, 1);
    assert_eq!(fx.dst_json()["b"], "{count}");
}

#[test]
fn test_changed_source_text_is_retranslated() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel" }));
    fx.run(&MockTranslator::new(MockMode::Suffix));

    fx.set_source(json!({ "a": "Save changes", "b": "Cancel" }));
    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);

    assert_eq!(mock.requested_keys(), vec!["a"]);
    assert_eq!(report.translated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(fx.dst_json()["a"], "Save changes [es]");
}

#[test]
fn test_force_retranslates_but_uses_cache() {
    let fx = Fixture::new(json!({ "a": "Save" }));
    fx.run(&MockTranslator::new(MockMode::Suffix));

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run_with(
        &mock,
        None,
        &RunOptions {
            force: true,
            ..options()
        },
    );
    assert_eq!(report.skipped, 0);
    assert_eq!(report.cache_hits, 1);
    assert_eq!(mock.calls(), 0);
}

#[test]
fn test_no_cache_calls_provider_and_leaves_no_file() {
    let fx = Fixture::new(json!({ "a": "Save" }));

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run_with(
        &mock,
        None,
        &RunOptions {
            use_cache: false,
            ..options()
        },
    );
    assert_eq!(report.translated, 1);
    assert!(!fx.cache.exists());
}

#[test]
fn test_orphan_destination_keys_survive() {
    let fx = Fixture::new(json!({ "a": "Save" }));
    fx.set_dst(json!({ "legacy.key": "viejo" }));

    fx.run(&MockTranslator::new(MockMode::Suffix));

    let dst = fx.dst_json();
    assert_eq!(keys(&dst), vec!["a", "legacy.key"]);
    assert_eq!(dst["legacy.key"], "viejo");
}

#[test]
fn test_write_error_keeps_cache() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Cancel" }));
    let blocker = fx.write("blocker", json!({}));
    let bad_dst = blocker.join("es.json");

    let err = run(
        &fx.source,
        None,
        None,
        &bad_dst,
        "es",
        &fx.cache,
        &options(),
        &MockTranslator::new(MockMode::Suffix),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Write(_)));
    assert_eq!(cache::inspect(&fx.cache).unwrap().count, 2);

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    assert_eq!(mock.calls(), 0);
    assert_eq!(report.cache_hits, 2);
}

#[test]
fn test_missing_source_is_fatal() {
    let fx = Fixture::new(json!({}));
    fs::remove_file(&fx.source).unwrap();

    let err = run(
        &fx.source,
        None,
        None,
        &fx.dst,
        "es",
        &fx.cache,
        &options(),
        &MockTranslator::new(MockMode::Suffix),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Load(_)));
    assert!(!fx.dst.exists());
}

#[test]
fn test_cancel_before_start_still_writes_passthrough() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "common.ok", "c": "Cancel" }));
    let opts = options();
    opts.cancel.store(true, Ordering::SeqCst);

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run_with(&mock, None, &opts);

    assert!(report.cancelled);
    assert_eq!(mock.calls(), 0);
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed.iter().all(|f| f.kind == FailureKind::Cancelled));
    assert_eq!(keys(&fx.dst_json()), vec!["b"]);
}

#[test]
fn test_cancel_mid_run_keeps_finished_work() {
    let fx = Fixture::new(ten_keys());
    let flag = Arc::new(AtomicBool::new(false));
    let opts = RunOptions {
        workers: 1,
        cancel: flag.clone(),
        ..options()
    };

    let mock = MockTranslator::new(MockMode::Suffix).cancel_after(2, flag);
    let report = fx.run_with(&mock, None, &opts);

    assert!(report.cancelled);
    assert_eq!(report.translated, 2);
    assert_eq!(report.failed.len(), 8);
    assert_eq!(keys(&fx.dst_json()), vec!["k1", "k2"]);
    assert_eq!(cache::inspect(&fx.cache).unwrap().count, 2);
}

#[test]
fn test_rate_limits_are_retried() {
    let fx = Fixture::new(json!({ "a": "Save" }));

    let report = fx.run_with(
        &MockTranslator::new(MockMode::RateLimitThenOk(2)),
        None,
        &RunOptions {
            retry: RetryPolicy::immediate(5),
            ..options()
        },
    );
    assert!(report.is_success());
    assert_eq!(report.provider_calls, 3);
}

#[test]
fn test_identical_sources_share_one_cache_entry() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Save", "c": "Save" }));

    let report = fx.run(&MockTranslator::new(MockMode::Suffix));
    assert_eq!(report.merged(), 3);

    let dst = fx.dst_json();
    assert_eq!(dst["a"], dst["b"]);
    assert_eq!(dst["b"], dst["c"]);
    assert_eq!(cache::inspect(&fx.cache).unwrap().count, 1);
}

#[test]
fn test_nested_source_writes_nested_destination() {
    let fx = Fixture::new(json!({
        "home": { "title": "Welcome", "cta": "Start now" },
        "footer": { "links": ["About us", "Contact"] }
    }));

    let report = fx.run(&MockTranslator::new(MockMode::Suffix));
    assert_eq!(report.translated, 4);

    let dst = fx.dst_json();
    assert_eq!(dst["home"]["title"], "Welcome [es]");
    assert_eq!(dst["footer"]["links"][1], "Contact [es]");
}

#[test]
fn test_fixed_mappings() {
    let fx = Fixture::new(json!({ "a": "Save", "b": "Welcome back, {name}" }));
    let map: HashMap<String, String> = [
        ("a".to_string(), "Guardar".to_string()),
        ("b".to_string(), "Bienvenido de nuevo, {name}".to_string()),
    ]
    .into();

    let report = fx.run(&MockTranslator::new(MockMode::Mappings(map)));
    assert!(report.is_success());
    assert_eq!(
        fx.dst_json(),
        json!({ "a": "Guardar", "b": "Bienvenido de nuevo, {name}" })
    );
}

fn user_payload(mock: &MockTranslator, index: usize) -> Value {
    serde_json::from_str(&mock.requests()[index].messages[1].content).unwrap()
}

#[test]
fn test_edit_after_first_sight_is_detected() {
    let fx = Fixture::new(json!({ "save": "Save" }));
    fx.set_dst(json!({ "save": "Guardar" }));

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    assert_eq!(mock.calls(), 0);
    assert_eq!(report.skipped, 1);

    fx.set_source(json!({ "save": "Delete account permanently" }));
    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run(&mock);
    assert_eq!(mock.requested_keys(), vec!["save"]);
    assert_eq!(report.translated, 1);
    assert_eq!(fx.dst_json()["save"], "Delete account permanently [es]");
}

#[test]
fn test_edit_is_detected_across_a_model_change() {
    let fx = Fixture::new(json!({ "save": "Save" }));
    fx.run(&MockTranslator::new(MockMode::Suffix).with_model("model-a"));

    fx.set_source(json!({ "save": "Save all" }));
    let mock = MockTranslator::new(MockMode::Suffix).with_model("model-b");
    let report = fx.run(&mock);
    assert_eq!(report.translated, 1);
    assert_eq!(fx.dst_json()["save"], "Save all [es]");
}

#[test]
fn test_draft_file_is_offered_as_hint() {
    let fx = Fixture::new(json!({ "save": "Save", "cancel": "Cancel" }));
    let draft = fx.write("es.draft.json", json!({ "save": "Guardar (borrador)" }));

    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run_with_draft(&mock, &draft);

    // A draft informs the request; it never replaces the call.
    assert_eq!(report.translated, 2);
    assert_eq!(mock.calls(), 2);
    let idx = mock
        .requested_keys()
        .iter()
        .position(|k| k == "save")
        .unwrap();
    assert_eq!(
        mock.requests()[idx].unit.draft_text.as_deref(),
        Some("Guardar (borrador)")
    );
    assert_eq!(
        user_payload(&mock, idx)["item"]["existing_translation"],
        "Guardar (borrador)"
    );
    assert_eq!(fx.dst_json()["save"], "Save [es]");
}

#[test]
fn test_stale_key_falls_back_to_destination_hint() {
    let fx = Fixture::new(json!({ "save": "Save" }));
    fx.set_dst(json!({ "save": "Guardar" }));
    let draft = fx.write("es.draft.json", json!({ "save": "   " }));
    fx.run_with_draft(&MockTranslator::new(MockMode::Suffix), &draft);

    fx.set_source(json!({ "save": "Save draft" }));
    let mock = MockTranslator::new(MockMode::Suffix);
    let report = fx.run_with_draft(&mock, &draft);

    assert_eq!(report.translated, 1);
    assert_eq!(mock.requests()[0].unit.draft_text.as_deref(), Some("Guardar"));
    assert_eq!(user_payload(&mock, 0)["item"]["existing_translation"], "Guardar");
}

#[test]
fn test_nested_layout_round_trips() {
    let fx = Fixture::new(json!({
        "limits": { "max": 10, "enabled": true },
        "app": { "v1.0": "Version one" },
        "empty": {},
        "greet": "Hello there"
    }));

    let report = fx.run(&MockTranslator::new(MockMode::Suffix));
    assert!(report.is_success());
    assert_eq!(report.translated, 2);

    let dst = fx.dst_json();
    assert_eq!(
        dst,
        json!({
            "limits": { "max": 10, "enabled": true },
            "app": { "v1.0": "Version one [es]" },
            "empty": {},
            "greet": "Hello there [es]"
        })
    );
    assert_eq!(keys(&dst), vec!["limits", "app", "empty", "greet"]);

    let before = fs::read(&fx.dst).unwrap();
    let mock = MockTranslator::new(MockMode::Suffix);
    fx.run(&mock);
    assert_eq!(mock.calls(), 0);
    assert_eq!(fs::read(&fx.dst).unwrap(), before);
}
