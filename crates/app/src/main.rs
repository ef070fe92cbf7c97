use std::{sync::Arc, time::Duration};

use engine::{
    BlobCache, CbrFeed, CurrencyResolver, Engine, MemoryCache, Money, RedisCache,
    ReportAggregator,
};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio_util::sync::CancellationToken;

mod settings;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spendbot={level},telegram_bot={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(
        Engine::builder()
            .database(db)
            .default_limit(Money::new(settings.limits.default_minor))
            .build()
            .await?,
    );

    let cache: Arc<dyn BlobCache> = match &settings.cache.redis_url {
        Some(url) => {
            tracing::info!("Using redis report cache...");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            tracing::info!("Using in-memory report cache...");
            Arc::new(MemoryCache::new())
        }
    };
    let reports = Arc::new(ReportAggregator::new(
        engine.clone(),
        cache,
        settings.cache.policy,
    )
    .with_rounding(settings.cache.rounding));

    let feed = Arc::new(CbrFeed::new(settings.currency.feed_url.clone(), FEED_TIMEOUT)?);
    let resolver = Arc::new(
        CurrencyResolver::new(engine.clone(), feed)
            .with_refresh_timeout(settings.currency.refresh_timeout())
            .with_timezone(settings.currency.timezone)
            .with_timing(settings.currency.rate_timing),
    );

    let shutdown = CancellationToken::new();

    tasks.spawn(engine::run_refresh_ticker(
        resolver.clone(),
        settings.currency.refresh_interval(),
        shutdown.clone(),
    ));

    if let Some(telegram) = settings.telegram {
        tracing::info!("Found telegram settings...");
        match telegram_bot::Bot::builder()
            .token(&telegram.token)
            .lanes(telegram.lanes)
            .event_timeout(telegram.event_timeout())
            .engine(engine)
            .resolver(resolver)
            .reports(reports)
            .build()
        {
            Ok(bot) => {
                tasks.spawn(bot.run(shutdown.clone()));
            }
            Err(err) => tracing::error!("failed to initialize telegram bot: {err}"),
        }
    } else {
        tracing::warn!("no telegram settings, only refreshing rates");
    }

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            return;
        }
        tracing::info!("shutting down...");
        signal.cancel();
    });

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::error!("task failed: {err}");
        }
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
