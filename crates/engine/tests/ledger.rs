use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CachePolicy, Currency, DEFAULT_CATEGORY, Engine, EngineError, InteractionState, MemoryCache,
    Money, RangeRounding, ReportAggregator, ReportPeriod, ReportRange,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn missing_expense_is_absent_not_an_error() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(engine.expense(1, 42).await.unwrap(), None);
}

#[tokio::test]
async fn ensure_then_single_write_keeps_other_defaults() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

    let created = engine.ensure_expense(1, 42, now).await.unwrap();
    assert_eq!(created.sum, Money::ZERO);
    assert_eq!(created.category, DEFAULT_CATEGORY);
    assert_eq!(created.date, now);

    engine.write_category(1, 42, "Food").await.unwrap();

    let stored = engine.expense(1, 42).await.unwrap().unwrap();
    assert_eq!(stored.category, "Food");
    assert_eq!(stored.sum, Money::ZERO);
    assert_eq!(stored.date, now);
}

#[tokio::test]
async fn ensure_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

    engine.ensure_expense(1, 42, now).await.unwrap();
    engine.write_sum(1, 42, Money::new(1250)).await.unwrap();

    let later = now + TimeDelta::hours(3);
    let again = engine.ensure_expense(1, 42, later).await.unwrap();
    assert_eq!(again.sum, Money::new(1250));
    assert_eq!(again.date, now);
}

#[tokio::test]
async fn same_message_id_for_two_users_are_distinct_expenses() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc::now();

    engine.ensure_expense(1, 42, now).await.unwrap();
    engine.ensure_expense(2, 42, now).await.unwrap();
    engine.write_sum(2, 42, Money::new(500)).await.unwrap();

    assert_eq!(engine.expense(1, 42).await.unwrap().unwrap().sum, Money::ZERO);
    assert_eq!(
        engine.expense(2, 42).await.unwrap().unwrap().sum,
        Money::new(500)
    );
}

#[tokio::test]
async fn delete_removes_the_expense() {
    let (engine, _db) = engine_with_db().await;
    engine.ensure_expense(1, 42, Utc::now()).await.unwrap();

    engine.delete_expense(1, 42).await.unwrap();
    assert_eq!(engine.expense(1, 42).await.unwrap(), None);
    // Deleting twice is harmless.
    engine.delete_expense(1, 42).await.unwrap();
}

#[tokio::test]
async fn month_total_matches_month_and_year() {
    let (engine, _db) = engine_with_db().await;
    let october = Utc.with_ymd_and_hms(2026, 10, 5, 12, 0, 0).unwrap();
    let last_october = Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap();
    let november = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();

    for (id, date, sum) in [
        (1, october, 1000),
        (2, october, 250),
        (3, last_october, 7000),
        (4, november, 9000),
    ] {
        engine.ensure_expense(1, id, date).await.unwrap();
        engine.write_sum(1, id, Money::new(sum)).await.unwrap();
    }
    engine.ensure_expense(2, 5, october).await.unwrap();
    engine.write_sum(2, 5, Money::new(333)).await.unwrap();

    assert_eq!(engine.month_total(1, 10, 2026).await.unwrap(), Money::new(1250));
    assert_eq!(engine.month_total(1, 10, 2025).await.unwrap(), Money::new(7000));
    assert_eq!(engine.month_total(1, 11, 2026).await.unwrap(), Money::new(9000));
    assert_eq!(engine.month_total(1, 12, 2026).await.unwrap(), Money::ZERO);
}

#[tokio::test]
async fn overflowing_totals_are_errors() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let october = Utc.with_ymd_and_hms(2026, 10, 5, 12, 0, 0).unwrap();
    let huge = Money::new(i64::MAX / 2 + 1);

    for id in [1, 2] {
        engine.ensure_expense(1, id, october).await.unwrap();
        engine.write_sum(1, id, huge).await.unwrap();
    }

    assert!(matches!(
        engine.month_total(1, 10, 2026).await,
        Err(EngineError::Overflow(_))
    ));
    assert!(matches!(
        engine.check_monthly_limit(1, october).await,
        Err(EngineError::Overflow(_))
    ));

    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::Permanent,
    );
    assert!(matches!(
        reports.report_for(1, ReportPeriod::Week, october).await,
        Err(EngineError::Overflow(_))
    ));
}

#[tokio::test]
async fn interaction_state_defaults_to_idle_and_is_replaced() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(
        engine.interaction_state(1).await.unwrap(),
        InteractionState::Idle
    );

    engine
        .set_interaction_state(1, InteractionState::EditingSum(10))
        .await
        .unwrap();
    engine
        .set_interaction_state(1, InteractionState::EditingDate(11))
        .await
        .unwrap();
    assert_eq!(
        engine.interaction_state(1).await.unwrap(),
        InteractionState::EditingDate(11)
    );

    engine
        .set_interaction_state(1, InteractionState::Idle)
        .await
        .unwrap();
    assert_eq!(
        engine.interaction_state(1).await.unwrap(),
        InteractionState::Idle
    );
}

#[tokio::test]
async fn display_currency_defaults_to_base_and_survives_state_writes() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(engine.display_currency(1).await.unwrap(), Currency::BASE);

    engine.set_display_currency(1, Currency::Usd).await.unwrap();
    engine
        .set_interaction_state(1, InteractionState::EditingLimit)
        .await
        .unwrap();
    assert_eq!(engine.display_currency(1).await.unwrap(), Currency::Usd);
    assert_eq!(
        engine.interaction_state(1).await.unwrap(),
        InteractionState::EditingLimit
    );
}

#[tokio::test]
async fn limit_check_creates_default_ceiling() {
    let (engine, _db) = engine_with_db().await;
    let date = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
    assert_eq!(engine.monthly_limit(1, 4).await.unwrap(), None);

    engine.ensure_expense(1, 1, date).await.unwrap();
    engine.write_sum(1, 1, Money::new(500)).await.unwrap();
    let check = engine.check_monthly_limit(1, date).await.unwrap();

    assert_eq!(check.month, 4);
    assert_eq!(check.ceiling, engine.default_limit());
    assert_eq!(check.total, Money::new(500));
    assert!(!check.exceeded());
    assert_eq!(
        engine.monthly_limit(1, 4).await.unwrap(),
        Some(engine.default_limit())
    );
}

#[tokio::test]
async fn limit_check_reports_every_write_past_the_ceiling() {
    let (engine, _db) = engine_with_db().await;
    let date = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
    engine.set_monthly_limit(1, 4, Money::new(1000)).await.unwrap();

    let mut exceeded = Vec::new();
    for (id, sum) in [(1, 600), (2, 400), (3, 100)] {
        engine.ensure_expense(1, id, date).await.unwrap();
        engine.write_sum(1, id, Money::new(sum)).await.unwrap();
        exceeded.push(engine.check_monthly_limit(1, date).await.unwrap().exceeded());
    }
    assert_eq!(exceeded, vec![false, true, true]);
}

#[tokio::test]
async fn limit_rejects_invalid_month() {
    let (engine, _db) = engine_with_db().await;
    assert!(engine.set_monthly_limit(1, 13, Money::new(1)).await.is_err());
    assert!(engine.set_monthly_limit(1, 0, Money::new(1)).await.is_err());
    assert!(engine.set_monthly_limit(1, 5, Money::new(-1)).await.is_err());
    assert_eq!(engine.monthly_limit(1, 5).await.unwrap(), None);
}

#[tokio::test]
async fn custom_default_limit_is_used() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .default_limit(Money::new(42))
        .build()
        .await
        .unwrap();

    let check = engine.check_monthly_limit(1, Utc::now()).await.unwrap();
    assert_eq!(check.ceiling, Money::new(42));
}

#[tokio::test]
async fn permanent_report_cache_serves_stale_totals() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::Permanent,
    );
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

    engine.ensure_expense(1, 1, now).await.unwrap();
    engine.write_sum(1, 1, Money::new(1000)).await.unwrap();
    engine.write_category(1, 1, "Food").await.unwrap();

    let range = ReportRange::ending_at(ReportPeriod::Week, now).unwrap();
    let first = reports.report(1, range).await.unwrap();
    assert_eq!(first.totals.get("Food"), Some(&Money::new(1000)));

    engine.ensure_expense(1, 2, now).await.unwrap();
    engine.write_sum(1, 2, Money::new(500)).await.unwrap();
    reports.ledger_written(1).await.unwrap();

    let second = reports.report(1, range).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn invalidating_report_cache_recomputes_after_write() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::InvalidateOnWrite,
    );
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

    engine.ensure_expense(1, 1, now).await.unwrap();
    engine.write_sum(1, 1, Money::new(1000)).await.unwrap();
    let first = reports.report_for(1, ReportPeriod::Month, now).await.unwrap();
    assert_eq!(first.total().unwrap(), Money::new(1000));

    engine.ensure_expense(1, 2, now).await.unwrap();
    engine.write_sum(1, 2, Money::new(500)).await.unwrap();
    reports.ledger_written(1).await.unwrap();

    let second = reports.report_for(1, ReportPeriod::Month, now).await.unwrap();
    assert_eq!(second.totals.get(DEFAULT_CATEGORY), Some(&Money::new(1500)));
}

#[tokio::test]
async fn exact_shortcut_ranges_move_with_now() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::Permanent,
    );
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let eight_days_ago = now - TimeDelta::days(8);
    let later = now + TimeDelta::hours(1);

    engine.ensure_expense(1, 1, eight_days_ago).await.unwrap();
    engine.write_sum(1, 1, Money::new(400)).await.unwrap();
    let first = reports.report_for(1, ReportPeriod::Week, now).await.unwrap();
    assert!(first.is_empty());

    engine.ensure_expense(1, 2, later).await.unwrap();
    engine.write_sum(1, 2, Money::new(300)).await.unwrap();
    reports.ledger_written(1).await.unwrap();

    // An hour later is a different range, so even a permanent cache misses.
    let second = reports.report_for(1, ReportPeriod::Week, later).await.unwrap();
    assert_eq!(second.total().unwrap(), Money::new(300));
}

#[tokio::test]
async fn whole_day_shortcuts_share_the_cached_report() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::Permanent,
    )
    .with_rounding(RangeRounding::WholeDays);
    let morning = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();

    let first = reports.report_for(1, ReportPeriod::Week, morning).await.unwrap();
    engine.ensure_expense(1, 1, morning).await.unwrap();
    engine.write_sum(1, 1, Money::new(300)).await.unwrap();
    reports.ledger_written(1).await.unwrap();

    let second = reports.report_for(1, ReportPeriod::Week, evening).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn report_groups_by_category_inside_the_range() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let reports = ReportAggregator::new(
        engine.clone(),
        Arc::new(MemoryCache::new()),
        CachePolicy::Permanent,
    );
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let long_ago = now - TimeDelta::days(400);

    for (id, date, category, sum) in [
        (1, now, "Food", 100),
        (2, now, "Food", 50),
        (3, now, "Taxi", 70),
        (4, long_ago, "Food", 9999),
    ] {
        engine.ensure_expense(1, id, date).await.unwrap();
        engine.write_sum(1, id, Money::new(sum)).await.unwrap();
        engine.write_category(1, id, category).await.unwrap();
    }

    let report = reports.report_for(1, ReportPeriod::Year, now).await.unwrap();
    assert_eq!(report.totals.len(), 2);
    assert_eq!(report.totals["Food"], Money::new(150));
    assert_eq!(report.totals["Taxi"], Money::new(70));

    let other_user = reports.report_for(2, ReportPeriod::Year, now).await.unwrap();
    assert!(other_user.is_empty());
}
