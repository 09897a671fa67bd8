use std::collections::HashSet;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use serde_json::{Value, json};
use tessera::application::overlay::ConfigOverlay;
use tessera::application::repos::SettingsRepo;
use tessera::application::store::SettingsStore;
use tessera::domain::types::SettingFormat;
use tessera::infra::memory::InMemorySettingsRepo;
use tessera::infra::overlay::InMemoryOverlay;
use tessera::infra::telemetry;

#[tokio::test]
async fn store_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let repo = Arc::new(InMemorySettingsRepo::new());
    repo.seed("ui.theme", Some("dark"), SettingFormat::String);
    repo.seed("app::broken", Some("[1,"), SettingFormat::Json);

    let overlay: Arc<dyn ConfigOverlay> = Arc::new(InMemoryOverlay::with_entries([(
        "mail.driver",
        json!("smtp"),
    )]));
    let settings_repo: Arc<dyn SettingsRepo> = repo.clone();
    let store = SettingsStore::open(settings_repo, overlay)
        .await
        .expect("store opens");

    // cache hit, cache miss answered by the overlay
    assert_eq!(
        store.get("ui.theme", Value::Null).await.expect("get"),
        json!("dark")
    );
    assert_eq!(
        store.get("mail.driver", Value::Null).await.expect("get"),
        json!("smtp")
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "tessera_settings_cache_hit_total",
        "tessera_settings_cache_miss_total",
        "tessera_settings_overlay_hit_total",
        "tessera_settings_load_total",
        "tessera_settings_rejected_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
