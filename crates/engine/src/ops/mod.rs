use sea_orm::DatabaseConnection;

use crate::{DEFAULT_MONTHLY_LIMIT, Money, ResultEngine};

mod expenses;
mod limits;
mod rates;
mod users;

/// Storage facade over the expense ledger, user state, rates and limits.
///
/// Every operation is a single statement or a short read-then-write; nothing
/// spans more than one table in a transaction.
#[derive(Debug, Clone)]
pub struct Engine {
    database: DatabaseConnection,
    default_limit: Money,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Ceiling assigned to a month that has none yet.
    pub fn default_limit(&self) -> Money {
        self.default_limit
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    default_limit: Option<Money>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default monthly ceiling (base minor units).
    pub fn default_limit(mut self, limit: Money) -> EngineBuilder {
        self.default_limit = Some(limit);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            default_limit: self.default_limit.unwrap_or(DEFAULT_MONTHLY_LIMIT),
        })
    }
}
