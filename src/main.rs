use std::{process, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tessera::{
    application::{
        error::AppError, overlay::ConfigOverlay, repos::SettingsRepo, site::SiteSettings,
        store::SettingsStore,
    },
    config,
    infra::{db::PostgresRepositories, error::InfraError, overlay::InMemoryOverlay, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?error.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?error.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let pool = connect(&settings.database).await?;

    if let config::Command::Migrate = cli_args.command {
        return run_migrations(&pool).await;
    }

    let store = Arc::new(open_store(&settings, pool).await?);

    match cli_args.command {
        config::Command::Get(args) => {
            let default = args.default.as_deref().map(parse_loose).unwrap_or(Value::Null);
            print_json(&store.get(&args.key, default).await?)
        }
        config::Command::Has(args) => print_json(&store.has(&args.key).await?),
        config::Command::Set(args) => {
            let value = if args.json {
                serde_json::from_str(&args.value).map_err(|err| {
                    AppError::validation(format!("value for `{}` is not JSON: {err}", args.key))
                })?
            } else {
                Value::String(args.value)
            };
            store.set(&args.key, value).await?;
            info!(target = "tessera::cli", setting = %args.key, "Setting stored");
            Ok(())
        }
        config::Command::Forget(args) => print_json(&store.forget(&args.key).await?),
        config::Command::List => print_json(&store.all().await?),
        config::Command::Site(args) => {
            let site = SiteSettings::with_namespace(store, settings.site.namespace);
            let default = args.default.as_deref().map(parse_loose).unwrap_or(Value::Null);
            print_json(&site.get(&args.key, default).await?)
        }
        config::Command::Migrate => Ok(()),
    }
}

async fn connect(database: &config::DatabaseSettings) -> Result<PgPool, AppError> {
    let url = database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url is required (set TESSERA__DATABASE__URL)")
    })?;

    PostgresRepositories::connect(url, database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "tessera::cli", "Migrations applied");
    Ok(())
}

async fn open_store(settings: &config::Settings, pool: PgPool) -> Result<SettingsStore, AppError> {
    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let repo: Arc<dyn SettingsRepo> = Arc::new(repositories);
    let overlay: Arc<dyn ConfigOverlay> = Arc::new(InMemoryOverlay::with_entries(
        settings.overlay.defaults.clone(),
    ));

    let store = SettingsStore::open(repo, overlay).await?;
    Ok(store)
}

/// Interpret a command-line value as JSON, falling back to a plain string.
fn parse_loose(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
