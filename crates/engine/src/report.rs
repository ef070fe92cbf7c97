//! Per-category spending reports, memoized in a [`BlobCache`].
//!
//! The cache key is the user plus the exact range bounds. With
//! [`CachePolicy::Permanent`] an entry is never recomputed, so a report can
//! lag behind the ledger. [`CachePolicy::InvalidateOnWrite`] keeps an index
//! of the keys cached for each user and drops them on every ledger write.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Days, Months, NaiveTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::{BlobCache, Engine, EngineError, Money, ResultEngine, UserId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    Permanent,
    InvalidateOnWrite,
}

/// How the week/month/year shortcuts pick their bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeRounding {
    /// Exactly one period back from the request time.
    #[default]
    Exact,
    /// Widened to whole days, so same-day requests share a cache entry.
    WholeDays,
}

/// Shortcut ranges ending now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportPeriod {
    Week,
    Month,
    Year,
}

/// Inclusive report bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ResultEngine<Self> {
        if start > end {
            return Err(EngineError::InvalidInput(format!(
                "report range starts after it ends: {start} > {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `[now - period, now]`, months and years by calendar arithmetic.
    pub fn ending_at(period: ReportPeriod, now: DateTime<Utc>) -> ResultEngine<Self> {
        let start = match period {
            ReportPeriod::Week => now.checked_sub_days(Days::new(7)),
            ReportPeriod::Month => now.checked_sub_months(Months::new(1)),
            ReportPeriod::Year => now.checked_sub_months(Months::new(12)),
        }
        .ok_or_else(|| EngineError::InvalidInput(format!("no {period:?} before {now}")))?;
        Self::new(start, now)
    }

    /// [`ReportRange::ending_at`] widened to whole UTC days: midnight of the
    /// first day up to the last second of today. Two calls on the same day
    /// yield the same bounds.
    pub fn whole_days(period: ReportPeriod, now: DateTime<Utc>) -> ResultEngine<Self> {
        let exact = Self::ending_at(period, now)?;
        let start = exact.start.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = now.date_naive().and_time(NaiveTime::MIN).and_utc() + TimeDelta::days(1)
            - TimeDelta::seconds(1);
        Self::new(start, end)
    }

    fn cache_key(&self, user_id: UserId) -> String {
        format!(
            "{user_id}_{}_{}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// Category totals in base minor units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub range: ReportRange,
    pub totals: BTreeMap<String, Money>,
}

impl Report {
    pub fn total(&self) -> ResultEngine<Money> {
        Money::checked_sum(self.totals.values().copied(), "totalling a report")
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

pub struct ReportAggregator {
    engine: Arc<Engine>,
    cache: Arc<dyn BlobCache>,
    policy: CachePolicy,
    rounding: RangeRounding,
}

impl ReportAggregator {
    pub fn new(engine: Arc<Engine>, cache: Arc<dyn BlobCache>, policy: CachePolicy) -> Self {
        Self {
            engine,
            cache,
            policy,
            rounding: RangeRounding::default(),
        }
    }

    pub fn with_rounding(mut self, rounding: RangeRounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Report for the exact range, from the cache when an entry exists.
    pub async fn report(&self, user_id: UserId, range: ReportRange) -> ResultEngine<Report> {
        let key = range.cache_key(user_id);

        if let Some(bytes) = self.cache.get(&key).await? {
            tracing::debug!(user_id, %key, "report cache hit");
            let totals = serde_json::from_slice(&bytes)?;
            return Ok(Report { range, totals });
        }

        let totals = self
            .engine
            .category_totals(user_id, range.start, range.end)
            .await?;
        self.cache.set(&key, serde_json::to_vec(&totals)?).await?;
        if self.policy == CachePolicy::InvalidateOnWrite {
            self.remember_key(user_id, key).await?;
        }

        Ok(Report { range, totals })
    }

    /// Shortcut report whose bounds are recomputed from `now`.
    pub async fn report_for(
        &self,
        user_id: UserId,
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ResultEngine<Report> {
        let range = match self.rounding {
            RangeRounding::Exact => ReportRange::ending_at(period, now)?,
            RangeRounding::WholeDays => ReportRange::whole_days(period, now)?,
        };
        self.report(user_id, range).await
    }

    /// Hook for every ledger write of `user_id`. A no-op unless the policy
    /// invalidates on write.
    pub async fn ledger_written(&self, user_id: UserId) -> ResultEngine<()> {
        if self.policy != CachePolicy::InvalidateOnWrite {
            return Ok(());
        }

        let index = index_key(user_id);
        let keys = self.cached_keys(&index).await?;
        for key in &keys {
            self.cache.delete(key).await?;
        }
        self.cache.delete(&index).await?;
        if !keys.is_empty() {
            tracing::debug!(user_id, dropped = keys.len(), "report cache invalidated");
        }
        Ok(())
    }

    async fn remember_key(&self, user_id: UserId, key: String) -> ResultEngine<()> {
        let index = index_key(user_id);
        let mut keys = self.cached_keys(&index).await?;
        if !keys.contains(&key) {
            keys.push(key);
            self.cache.set(&index, serde_json::to_vec(&keys)?).await?;
        }
        Ok(())
    }

    async fn cached_keys(&self, index: &str) -> ResultEngine<Vec<String>> {
        match self.cache.get(index).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }
}

fn index_key(user_id: UserId) -> String {
    format!("{user_id}_report_keys")
}
