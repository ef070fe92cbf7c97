//! Expense tracking core.
//!
//! The engine owns everything that has to be persisted or computed for the
//! bot: the expense ledger, the per-user interaction state, currency rates
//! and their refresh protocol, cached category reports and monthly limits.
//! It knows nothing about the chat transport.

pub use cache::{BlobCache, MemoryCache, RedisCache};
pub use currency::Currency;
pub use error::EngineError;
pub use expenses::{DEFAULT_CATEGORY, Expense};
pub use feed::{CbrFeed, QuotedRate, RateFeed, parse_comma_rate};
pub use limits::{DEFAULT_MONTHLY_LIMIT, LimitCheck};
pub use money::Money;
pub use ops::{Engine, EngineBuilder};
pub use rates::CurrencyRate;
pub use report::{CachePolicy, RangeRounding, Report, ReportAggregator, ReportPeriod, ReportRange};
pub use resolver::{CurrencyResolver, RateTiming, run_refresh_ticker};
pub use users::InteractionState;

mod cache;
mod currency;
mod error;
mod expenses;
mod feed;
mod limits;
mod money;
mod ops;
mod rates;
mod report;
mod resolver;
mod users;

/// Opaque user identifier handed over by the transport.
pub type UserId = i64;

/// Expense identifier. Reuses the id of the message carrying the edit keyboard.
pub type ExpenseId = i32;

type ResultEngine<T> = Result<T, EngineError>;
