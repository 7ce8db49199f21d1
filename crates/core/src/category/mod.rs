//! Category Resolver (§4.5): loads a business's active categories and
//! offers exact/substring name resolution plus an LLM-presentable listing.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ledgerstream_shared::types::{BusinessId, CategoryId};
use moka::sync::Cache;
use thiserror::Error;

/// A category as consumed by the resolver; a thin projection of the full
/// `Category` entity (§3).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub category_type: String,
}

/// Errors raised by the Category Resolver.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category storage error: {0}")]
    Storage(String),
}

impl From<CategoryError> for ledgerstream_shared::AppError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::Storage(msg) => Self::Database(msg),
        }
    }
}

/// Repository seam: loads a business's active categories.
pub trait CategoryRepository: Send + Sync {
    fn list_active_categories(
        &self,
        business_id: BusinessId,
    ) -> impl Future<Output = Result<Vec<CategoryRef>, CategoryError>> + Send;
}

/// TTL, per §5: the category list is read-mostly and may be cached with
/// a short TTL (≤ 60s).
const CACHE_TTL_SECS: u64 = 60;

/// Resolves category names/aliases to `CategoryId`s, scoped per business
/// and cached briefly to avoid a repository round trip per LLM call.
pub struct CategoryResolver<R: CategoryRepository> {
    repo: Arc<R>,
    cache: Cache<BusinessId, Arc<Vec<CategoryRef>>>,
}

impl<R: CategoryRepository> CategoryResolver<R> {
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
                .build(),
        }
    }

    async fn categories(&self, business_id: BusinessId) -> Result<Arc<Vec<CategoryRef>>, CategoryError> {
        if let Some(cached) = self.cache.get(&business_id) {
            return Ok(cached);
        }
        let fresh = Arc::new(self.repo.list_active_categories(business_id).await?);
        self.cache.insert(business_id, fresh.clone());
        Ok(fresh)
    }

    /// A newline-separated listing suitable for inclusion in an LLM prompt.
    pub async fn list_for_prompt(&self, business_id: BusinessId) -> Result<String, CategoryError> {
        let categories = self.categories(business_id).await?;
        let mut listing = String::new();
        for category in categories.iter() {
            let _ = writeln!(listing, "- {} ({})", category.name, category.category_type);
        }
        Ok(listing)
    }

    /// Resolves a category name or alias to its id. Exact case-insensitive
    /// match first; else the first category in a symmetric substring
    /// match. Never returns a category from a different business (the
    /// list itself is already scoped to `business_id`).
    pub async fn resolve(
        &self,
        business_id: BusinessId,
        name_or_alias: &str,
    ) -> Result<Option<CategoryId>, CategoryError> {
        let categories = self.categories(business_id).await?;
        let needle = name_or_alias.to_lowercase();

        if let Some(exact) = categories
            .iter()
            .find(|c| c.name.to_lowercase() == needle)
        {
            return Ok(Some(exact.id));
        }

        let substring_match = categories.iter().find(|c| {
            let hay = c.name.to_lowercase();
            hay.contains(&needle) || needle.contains(&hay)
        });

        Ok(substring_match.map(|c| c.id))
    }
}
