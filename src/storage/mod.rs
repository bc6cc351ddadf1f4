pub mod jsonl;
pub mod mongo;
pub mod product;

pub use jsonl::JsonlStore;
pub use mongo::MongoStore;
pub use product::{Product, ProductFilter};

use async_trait::async_trait;

/// The (skip, limit) slice of a filtered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}

/// Storage failure. Display carries the underlying driver message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("{0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Read access to the product collection
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Number of products matching `filter`
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Matching products in storage order, restricted to `window`
    async fn find(&self, filter: &ProductFilter, window: PageWindow) -> Result<Vec<Product>, StoreError>;

    /// First product whose code equals `code`
    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    /// Round trip to the backing store
    async fn ping(&self) -> Result<(), StoreError>;
}
