use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    backend::{Backend, Query},
    stories::Role,
};

/// A creator card on the discovery page.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub role: Role,
    pub verified: bool,
    pub followers: u64,
    #[serde(default)]
    pub monthly_earnings_cents: u64,
}

/// Query parameters for the discovery page
#[derive(Clone, Debug, Default)]
pub struct DiscoverQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Most-followed creators matching the query. Backend failures degrade to an
/// empty page.
pub async fn discover<B: Backend>(backend: &B, params: &DiscoverQuery) -> Vec<Creator> {
    let mut query = Query::new().order_by("followers", true);
    if let Some(role) = params.role {
        query = query.eq("role", json!(role));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.contains("name", search);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }

    match backend.query("users", query).await {
        Ok(records) => records
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect(),
        Err(e) => {
            warn!("discover: failed to load creators: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn ranks_creators_by_followers() {
        let backend = MockBackend::seeded();
        let creators = discover(&backend, &DiscoverQuery::default()).await;
        assert_eq!(creators.len(), 5);
        assert!(creators.windows(2).all(|w| w[0].followers >= w[1].followers));
        assert_eq!(creators[0].username, "miravale");
    }

    #[tokio::test]
    async fn filters_by_role_and_search() {
        let backend = MockBackend::seeded();
        let producers = discover(
            &backend,
            &DiscoverQuery {
                role: Some(Role::Producer),
                ..DiscoverQuery::default()
            },
        )
        .await;
        assert_eq!(producers.len(), 2);
        assert!(producers.iter().all(|c| c.role == Role::Producer));

        let found = discover(
            &backend,
            &DiscoverQuery {
                search: Some("  marsh ".to_string()),
                limit: Some(3),
                ..DiscoverQuery::default()
            },
        )
        .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Lena Marsh");
    }

    #[tokio::test]
    async fn offline_backend_yields_an_empty_page() {
        let backend = MockBackend::seeded();
        backend.set_offline(true);
        assert!(discover(&backend, &DiscoverQuery::default()).await.is_empty());
    }
}
