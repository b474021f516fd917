use std::{process, sync::Arc};

use instock_nav::{
    application::{
        error::AppError,
        invalidation::InvalidationReport,
        layered_nav::LayeredNavConfig,
        wiring::{LayeredNav, LayeredNavDeps},
    },
    cache::{CacheConfig, MemoryTransientStore, TransientStore},
    config::{self, CacheBackend, Command},
    domain::types::ATTRIBUTE_TAXONOMY_PREFIX,
    infra::{
        db::{PostgresRepositories, PostgresTransientStore},
        error::InfraError,
        telemetry,
    },
};
use serde_json::json;
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, causes = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, causes = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let repositories = init_repositories(&settings).await?;

    if let Command::Migrate = cli_args.command {
        PostgresRepositories::run_migrations(repositories.pool())
            .await
            .map_err(InfraError::from)?;
        info!("Migrations applied");
        return Ok(());
    }

    let module = build_module(repositories, &settings).await;

    match cli_args.command {
        Command::Filter(args) => {
            if !args.attribute.starts_with(ATTRIBUTE_TAXONOMY_PREFIX) {
                return Err(AppError::validation(format!(
                    "attribute `{}` is not an attribute taxonomy (expected `{ATTRIBUTE_TAXONOMY_PREFIX}<name>`)",
                    args.attribute
                )));
            }
            let outcome = module
                .evaluate(&args.candidates, &args.attribute, args.term)
                .await;
            debug!(source = ?outcome.source, "Filter evaluated");
            let ids: Vec<i64> = outcome.ids.iter().map(|id| id.get()).collect();
            println!("{}", json!({ "ids": ids }));
        }
        Command::StockSet(args) => print_report(module.on_stock_set(args.product).await),
        Command::VariationsSaved(args) => {
            print_report(module.on_variations_saved(args.product).await)
        }
        Command::ProductSaved(args) => print_report(module.on_product_saved(args.product).await),
        Command::OrderReduced(args) => {
            print_report(module.on_order_stock_reduced(args.order).await)
        }
        Command::Deactivate => print_report(module.on_deactivated().await),
        Command::Migrate => {}
    }

    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(InfraError::from)?;
    Ok(repositories)
}

async fn build_module(repositories: PostgresRepositories, settings: &config::Settings) -> LayeredNav {
    let cache_config = CacheConfig::from(&settings.cache);

    let transients: Arc<dyn TransientStore> = match cache_config.backend {
        CacheBackend::Memory => Arc::new(MemoryTransientStore::new(&cache_config)),
        CacheBackend::Postgres => {
            let store = PostgresTransientStore::new(repositories.clone());
            match store.purge_expired().await {
                Ok(purged) => debug!(purged, "Expired transients purged"),
                Err(err) => warn!(error = %err, "Failed to purge expired transients"),
            }
            Arc::new(store)
        }
    };

    let repositories = Arc::new(repositories);
    let deps = LayeredNavDeps {
        catalog: repositories.clone(),
        orders: repositories.clone(),
        settings: repositories,
        transients,
    };

    LayeredNav::wire(
        deps,
        cache_config,
        LayeredNavConfig::from(&settings.layered_nav),
    )
    .await
}

fn print_report(report: InvalidationReport) {
    info!(
        entries = report.entries,
        keys_cleared = report.keys_cleared,
        short_circuited = report.short_circuited,
        "Invalidation finished"
    );
    println!(
        "{}",
        json!({
            "entries": report.entries,
            "keys_cleared": report.keys_cleared,
            "short_circuited": report.short_circuited,
        })
    );
}
