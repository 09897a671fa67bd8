//! End-to-end behaviour of the settings store over the in-memory repository.

use std::sync::Arc;

use serde_json::{Value, json};
use tessera::application::overlay::ConfigOverlay;
use tessera::application::repos::SettingsRepo;
use tessera::application::site::SiteSettings;
use tessera::application::store::{SettingsStore, StoreError};
use tessera::domain::types::SettingFormat;
use tessera::infra::memory::InMemorySettingsRepo;
use tessera::infra::overlay::InMemoryOverlay;

fn store_over(repo: &Arc<InMemorySettingsRepo>) -> SettingsStore {
    let repo: Arc<dyn SettingsRepo> = repo.clone();
    let overlay: Arc<dyn ConfigOverlay> = Arc::new(InMemoryOverlay::new());
    SettingsStore::new(repo, overlay)
}

#[tokio::test]
async fn string_value_round_trips_through_storage() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store.set("ui.theme", "dark").await.expect("set");

    let record = store
        .persisted("ui.theme")
        .await
        .expect("read record")
        .expect("record stored");
    assert_eq!(record.name, "ui.theme");
    assert_eq!(record.value.as_deref(), Some("dark"));
    assert_eq!(record.format, SettingFormat::String);

    assert_eq!(
        store.get("ui.theme", "light").await.expect("get"),
        json!("dark")
    );
}

#[tokio::test]
async fn structured_value_is_stored_as_json() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store
        .set("app::flags", json!(["beta", "trial"]))
        .await
        .expect("set");

    let record = store
        .persisted("app::flags")
        .await
        .expect("read record")
        .expect("record stored");
    assert_eq!(record.value.as_deref(), Some(r#"["beta","trial"]"#));
    assert_eq!(record.format, SettingFormat::Json);

    assert_eq!(
        store.get("app::flags", Value::Null).await.expect("get"),
        json!(["beta", "trial"])
    );
}

#[tokio::test]
async fn persisted_values_survive_a_fresh_store() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let values = [
        ("mail.port", json!(587)),
        ("mail.secure", json!(true)),
        ("billing::plans.default", json!({"name": "basic", "seats": 3})),
        ("ui.tagline", json!("")),
        ("ui.empty", Value::Null),
    ];

    let writer = store_over(&repo);
    for (key, value) in &values {
        writer.set(key, value.clone()).await.expect("set");
    }

    let reader = store_over(&repo);
    for (key, value) in &values {
        assert_eq!(
            reader.get(key, "missing").await.expect("get"),
            *value,
            "value for {key}"
        );
    }
}

#[tokio::test]
async fn temporary_values_are_not_persisted() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store
        .set_temp("session.token", "abc")
        .await
        .expect("set_temp");
    assert_eq!(
        store.get("session.token", Value::Null).await.expect("get"),
        json!("abc")
    );
    assert!(repo.is_empty());

    let fresh = store_over(&repo);
    assert_eq!(
        fresh.get("session.token", "none").await.expect("get"),
        json!("none")
    );

    store.refresh().await.expect("refresh");
    assert_eq!(
        store.get("session.token", "none").await.expect("get"),
        json!("none")
    );
}

#[tokio::test]
async fn forget_removes_cache_and_storage() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store.set("ui.theme", "dark").await.expect("set");
    assert!(store.forget("ui.theme").await.expect("forget"));

    assert_eq!(
        store.get("ui.theme", "light").await.expect("get"),
        json!("light")
    );
    assert!(store.persisted("ui.theme").await.expect("read").is_none());
    assert!(!store.forget("ui.theme").await.expect("forget again"));
}

#[tokio::test]
async fn has_tracks_writes() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    assert!(!store.has("ui.theme").await.expect("has"));
    store.set("ui.theme", "dark").await.expect("set");
    assert!(store.has("ui.theme").await.expect("has"));
}

#[tokio::test]
async fn group_key_returns_collection_or_group_value() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store.set("ui.theme", "dark").await.expect("set");
    store.set("ui.font", "serif").await.expect("set");
    assert_eq!(
        store.get("ui", Value::Null).await.expect("get"),
        json!({"font": "serif", "theme": "dark"})
    );

    store.set("ui", "compact").await.expect("set group value");
    assert_eq!(
        store.get("ui", Value::Null).await.expect("get"),
        json!("compact")
    );
    assert_eq!(
        store.get("ui.theme", Value::Null).await.expect("get"),
        json!("dark")
    );
}

#[tokio::test]
async fn load_runs_once_when_records_exist() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    repo.seed("ui.theme", Some("dark"), SettingFormat::String);
    let store = store_over(&repo);

    let first = store.load().await.expect("first load");
    let second = store.load().await.expect("second load");

    assert_eq!(first.fetched, 1);
    assert!(!first.already_loaded);
    assert!(second.already_loaded);
    assert_eq!(repo.list_calls(), 1);
}

#[tokio::test]
async fn load_retries_while_storage_is_empty() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store.load().await.expect("first load");
    store.load().await.expect("second load");

    assert_eq!(repo.list_calls(), 2);
}

#[tokio::test]
async fn malformed_record_is_skipped_at_load() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    repo.seed("app::broken", Some("{not json"), SettingFormat::Json);
    repo.seed("ui.theme", Some("dark"), SettingFormat::String);
    let store = store_over(&repo);

    let report = store.load().await.expect("load");

    assert_eq!(report.fetched, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(
        store.get("ui.theme", Value::Null).await.expect("get"),
        json!("dark")
    );
    assert!(!store.has("app::broken").await.expect("has"));
}

#[tokio::test]
async fn overlay_answers_misses_unless_blank() {
    let repo: Arc<dyn SettingsRepo> = Arc::new(InMemorySettingsRepo::new());
    let overlay: Arc<dyn ConfigOverlay> = Arc::new(InMemoryOverlay::with_entries([
        ("mail.driver", json!("smtp")),
        ("mail.host", json!("")),
        ("mail.aliases", json!([])),
    ]));
    let store = SettingsStore::new(repo, overlay);

    assert_eq!(
        store.get("mail.driver", Value::Null).await.expect("get"),
        json!("smtp")
    );
    assert_eq!(
        store.get("mail.host", "localhost").await.expect("get"),
        json!("localhost")
    );
    assert_eq!(
        store.get("mail.aliases", "none").await.expect("get"),
        json!("none")
    );
}

#[tokio::test]
async fn writes_are_mirrored_into_the_overlay() {
    let repo: Arc<dyn SettingsRepo> = Arc::new(InMemorySettingsRepo::new());
    let overlay = Arc::new(InMemoryOverlay::new());
    let store = SettingsStore::new(repo, overlay.clone());

    store.set("ui.theme", "dark").await.expect("set");
    assert_eq!(overlay.get("ui.theme"), Some(json!("dark")));

    store.forget("ui.theme").await.expect("forget");
    assert_eq!(overlay.get("ui.theme"), None);
}

#[tokio::test]
async fn typed_reads_deserialize_values() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = store_over(&repo);

    store.set("mail.port", 587).await.expect("set");

    let port: Option<u16> = store.get_as("mail.port").await.expect("typed read");
    assert_eq!(port, Some(587));

    let err = store
        .get_as::<bool>("mail.port")
        .await
        .expect_err("wrong type");
    assert!(matches!(err, StoreError::Conversion { .. }));
}

#[tokio::test]
async fn persistence_failures_propagate() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    repo.set_unavailable(true);
    let store = store_over(&repo);

    let err = store
        .get("ui.theme", Value::Null)
        .await
        .expect_err("storage is down");
    assert!(matches!(err, StoreError::Repo(_)));
}

#[tokio::test]
async fn concurrent_writers_do_not_lose_updates() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = Arc::new(store_over(&repo));

    let handles: Vec<_> = (0..16)
        .map(|index| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .set(&format!("bulk.item{index}"), index)
                    .await
                    .expect("concurrent set");
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task completes");
    }

    let all = store.all().await.expect("all");
    assert_eq!(all.get("bulk").map(|items| items.len()), Some(16));
    assert_eq!(repo.len(), 16);
}

#[tokio::test]
async fn site_settings_share_the_store_cache() {
    let repo = Arc::new(InMemorySettingsRepo::new());
    let store = Arc::new(store_over(&repo));
    let mut site = SiteSettings::new(Arc::clone(&store));

    site.set_page_title("Home").await.expect("set title");
    site.set_multiple([("nav.primary", json!(["home", "about"]))])
        .await
        .expect("set nav");
    site.register_macro("title_upper", |view| {
        json!(view.get_str("page_title").unwrap_or_default().to_uppercase())
    });

    assert_eq!(
        store.get("site::page_title", Value::Null).await.expect("get"),
        json!("Home")
    );
    assert_eq!(
        site.call_macro("title_upper").await.expect("macro"),
        json!("HOME")
    );
    assert_eq!(
        site.get("nav.primary", Value::Null).await.expect("get"),
        json!(["home", "about"])
    );
    assert!(repo.is_empty());
}
