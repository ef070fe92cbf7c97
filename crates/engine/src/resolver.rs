//! Currency rate resolution.
//!
//! A lookup that misses the store takes the refresh lock, fetches the feed
//! for the requested day and retries the lookup once. The background ticker
//! goes through the same lock, so at most one upstream fetch runs at a time.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tokio::{sync::Mutex, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{Currency, CurrencyRate, Engine, EngineError, RateFeed, ResultEngine};

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(3);

/// Which day's rate converts an expense for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTiming {
    /// Today's rate, whatever the expense date.
    #[default]
    CallTime,
    /// The rate of the day the expense is dated.
    ExpenseDate,
}

pub struct CurrencyResolver {
    engine: Arc<Engine>,
    feed: Arc<dyn RateFeed>,
    refresh_lock: Mutex<()>,
    refresh_timeout: Duration,
    timezone: Tz,
    timing: RateTiming,
}

impl CurrencyResolver {
    pub fn new(engine: Arc<Engine>, feed: Arc<dyn RateFeed>) -> Self {
        Self {
            engine,
            feed,
            refresh_lock: Mutex::new(()),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            timezone: chrono_tz::Europe::Moscow,
            timing: RateTiming::default(),
        }
    }

    /// Deadline of one refresh, independent of the caller's deadline.
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Time zone that decides what "today" is.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_timing(mut self, timing: RateTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> RateTiming {
        self.timing
    }

    /// Calendar day of `now` in the configured time zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Day whose rate converts an expense dated `expense_date`.
    pub fn rate_date_for(&self, expense_date: DateTime<Utc>, now: DateTime<Utc>) -> NaiveDate {
        match self.timing {
            RateTiming::CallTime => self.today(now),
            RateTiming::ExpenseDate => self.today(expense_date),
        }
    }

    /// Rate of `currency` on `date`, refreshing the store once on a miss.
    pub async fn resolve_rate(&self, currency: Currency, date: NaiveDate) -> ResultEngine<i64> {
        if let Some(rate) = self.engine.rate(currency, date).await? {
            return Ok(rate.rate);
        }

        tracing::debug!(%currency, %date, "rate missing, refreshing");
        self.refresh_missing(currency, date).await?;

        match self.engine.rate(currency, date).await? {
            Some(rate) => Ok(rate.rate),
            None => Err(EngineError::RateUnavailable {
                code: currency.code().to_string(),
                date,
            }),
        }
    }

    /// Unconditional refresh of `date`. Returns how many rates were stored.
    pub async fn refresh(&self, date: NaiveDate) -> ResultEngine<usize> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store(date).await
    }

    async fn refresh_missing(&self, currency: Currency, date: NaiveDate) -> ResultEngine<()> {
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have stored it while we waited for the lock.
        if self.engine.rate(currency, date).await?.is_some() {
            return Ok(());
        }
        self.fetch_and_store(date).await.map(|_| ())
    }

    /// Must be called with the refresh lock held.
    async fn fetch_and_store(&self, date: NaiveDate) -> ResultEngine<usize> {
        tokio::time::timeout(self.refresh_timeout, self.store_feed(date))
            .await
            .map_err(|_| EngineError::Timeout(format!("rate refresh for {date}")))?
    }

    async fn store_feed(&self, date: NaiveDate) -> ResultEngine<usize> {
        let quotes = self.feed.fetch(date).await?;

        let mut stored = 0;
        for quote in quotes {
            let Ok(currency) = Currency::try_from(quote.code.as_str()) else {
                continue;
            };
            if !Currency::TRACKED.contains(&currency) {
                continue;
            }
            if quote.value <= 0 {
                tracing::warn!(code = %quote.code, value = quote.value, "skipping non-positive rate");
                continue;
            }
            self.engine
                .upsert_rate(&CurrencyRate {
                    currency,
                    base: Currency::BASE,
                    rate: quote.value,
                    date,
                })
                .await?;
            stored += 1;
        }

        self.engine.upsert_rate(&CurrencyRate::identity(date)).await?;
        stored += 1;

        tracing::info!(%date, stored, "currency rates refreshed");
        Ok(stored)
    }
}

/// Refreshes today's rates right away and then every `period` until
/// `shutdown` fires. Failures are logged and the next tick proceeds.
pub async fn run_refresh_ticker(
    resolver: Arc<CurrencyResolver>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let today = resolver.today(Utc::now());
        if let Err(err) = resolver.refresh(today).await {
            tracing::warn!(%today, "scheduled rate refresh failed: {err}");
        }
    }

    tracing::info!("rate ticker stopped");
}
