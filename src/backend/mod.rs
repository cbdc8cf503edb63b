//! Remote data collaborator: ordered reads with embedded relations and a
//! subscription that fires on inserts.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::AppError;

pub mod mock;
pub mod seed;

pub use mock::MockBackend;

/// Called with every record inserted into the subscribed table.
pub type InsertHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Case-insensitive substring match on a string column.
    Contains(String, String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// `record[field] = <row of table whose id == record[foreign_key]>`
#[derive(Clone, Debug, PartialEq)]
pub struct Embed {
    pub field: String,
    pub table: String,
    pub foreign_key: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub embed: Vec<Embed>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn contains(mut self, column: &str, needle: &str) -> Self {
        self.filters
            .push(Filter::Contains(column.to_string(), needle.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn embed(mut self, field: &str, table: &str, foreign_key: &str) -> Self {
        self.embed.push(Embed {
            field: field.to_string(),
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Unsubscribe handle. Dropping it unsubscribes as well.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

pub trait Backend: Clone + Send + Sync + 'static {
    fn query(
        &self,
        table: &str,
        query: Query,
    ) -> impl Future<Output = Result<Vec<Value>, AppError>> + Send;

    fn insert(
        &self,
        table: &str,
        record: Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send;

    fn subscribe(&self, table: &str, on_insert: InsertHandler) -> Subscription;
}
