use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    backend::{Backend, Embed, Filter, InsertHandler, Order, Query, Subscription},
    error::AppError,
};

/// In-memory stand-in for the remote backend, holding the hard-coded data
/// the app ships with.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

#[derive(Clone)]
struct HandlerEntry {
    id: u64,
    handler: InsertHandler,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let backend = Self::new();
        super::seed::populate(&backend);
        backend
    }

    /// Replaces a whole table without notifying subscribers.
    pub fn put_table(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.inner.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.insert(table.to_string(), rows);
    }

    pub fn row_count(&self, table: &str) -> usize {
        let tables = self.inner.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(table).map_or(0, Vec::len)
    }

    /// While offline every query and insert fails.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, AtomicOrdering::SeqCst);
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        let handlers = self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(table).map_or(0, Vec::len)
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.inner.offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Backend("backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    async fn query(&self, table: &str, query: Query) -> Result<Vec<Value>, AppError> {
        self.ensure_online()?;

        let tables = self.inner.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        for embed in &query.embed {
            for row in rows.iter_mut() {
                embed_relation(row, embed, &tables);
            }
        }

        debug!("mock backend: query {} -> {} rows", table, rows.len());
        Ok(rows)
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, AppError> {
        self.ensure_online()?;

        let Value::Object(mut fields) = record else {
            return Err(AppError::UnprocessableEntity(
                "Records must be JSON objects".to_string(),
            ));
        };
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let record = Value::Object(fields);

        {
            let mut tables = self.inner.tables.write().unwrap_or_else(PoisonError::into_inner);
            tables
                .entry(table.to_string())
                .or_default()
                .push(record.clone());
        }

        // Handlers run after the write lock is released so they may query.
        let entries = {
            let handlers = self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers.get(table).cloned().unwrap_or_default()
        };
        for entry in entries {
            (entry.handler)(&record);
        }

        debug!("mock backend: insert into {}", table);
        Ok(record)
    }

    fn subscribe(&self, table: &str, on_insert: InsertHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        {
            let mut handlers = self.inner.handlers.write().unwrap_or_else(PoisonError::into_inner);
            handlers.entry(table.to_string()).or_default().push(HandlerEntry {
                id,
                handler: on_insert,
            });
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let table = table.to_string();
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut handlers = inner.handlers.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(entries) = handlers.get_mut(&table) {
                entries.retain(|entry| entry.id != id);
            }
        })
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, expected) => row.get(column) == Some(expected),
        Filter::Contains(column, needle) => row
            .get(column)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
    }
}

fn compare_rows(a: &Value, b: &Value, order: &Order) -> Ordering {
    // Rows missing the column sort last in either direction.
    match (a.get(&order.column), b.get(&order.column)) {
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            if order.descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn embed_relation(row: &mut Value, embed: &Embed, tables: &HashMap<String, Vec<Value>>) {
    let related = row.get(&embed.foreign_key).and_then(|key| {
        tables
            .get(&embed.table)
            .and_then(|rows| rows.iter().find(|candidate| candidate.get("id") == Some(key)))
            .cloned()
    });
    if let Some(fields) = row.as_object_mut() {
        fields.insert(embed.field.clone(), related.unwrap_or(Value::Null));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn backend() -> MockBackend {
        let backend = MockBackend::new();
        backend.put_table(
            "users",
            vec![
                json!({ "id": "u1", "name": "Mira Vale", "role": "artist" }),
                json!({ "id": "u2", "name": "Oko Beats", "role": "producer" }),
            ],
        );
        backend.put_table(
            "posts",
            vec![
                json!({ "id": "p1", "user_id": "u1", "created_at": "2024-05-01T10:00:00Z" }),
                json!({ "id": "p2", "user_id": "u2", "created_at": "2024-05-03T10:00:00Z" }),
                json!({ "id": "p3", "user_id": "u1", "created_at": "2024-05-02T10:00:00Z" }),
            ],
        );
        backend
    }

    #[tokio::test]
    async fn query_orders_limits_and_embeds() {
        let backend = backend();
        let rows = backend
            .query(
                "posts",
                Query::new()
                    .order_by("created_at", true)
                    .embed("user", "users", "user_id")
                    .limit(2),
            )
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
        assert_eq!(rows[0]["user"]["name"], "Oko Beats");
        assert_eq!(rows[1]["user"]["name"], "Mira Vale");
    }

    #[tokio::test]
    async fn filters_match_exactly_or_by_substring() {
        let backend = backend();
        let rows = backend
            .query("posts", Query::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = backend
            .query("users", Query::new().contains("name", "BEAT"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "u2");
    }

    #[tokio::test]
    async fn unknown_table_is_empty() {
        let rows = backend().query("nope", Query::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn insert_notifies_until_unsubscribed() {
        let backend = backend();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let subscription = backend.subscribe(
            "posts",
            Arc::new(move |_: &Value| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        );
        assert_eq!(backend.subscriber_count("posts"), 1);

        let record = backend
            .insert("posts", json!({ "user_id": "u2" }))
            .await
            .unwrap();
        assert!(record["id"].is_string());
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 1);

        subscription.unsubscribe();
        assert_eq!(backend.subscriber_count("posts"), 0);
        backend
            .insert("posts", json!({ "user_id": "u2" }))
            .await
            .unwrap();
        assert_eq!(seen.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(backend.row_count("posts"), 5);
    }

    #[tokio::test]
    async fn dropping_the_handle_unsubscribes() {
        let backend = backend();
        {
            let _subscription = backend.subscribe("posts", Arc::new(|_: &Value| {}));
            assert_eq!(backend.subscriber_count("posts"), 1);
        }
        assert_eq!(backend.subscriber_count("posts"), 0);
    }

    #[tokio::test]
    async fn offline_backend_fails_reads_and_writes() {
        let backend = backend();
        backend.set_offline(true);
        assert!(matches!(
            backend.query("posts", Query::new()).await,
            Err(AppError::Backend(_))
        ));
        assert!(backend.insert("posts", json!({})).await.is_err());
        assert_eq!(backend.row_count("posts"), 3);
    }

    #[tokio::test]
    async fn non_object_records_are_rejected() {
        assert!(matches!(
            backend().insert("posts", json!([1, 2])).await,
            Err(AppError::UnprocessableEntity(_))
        ));
    }
}
