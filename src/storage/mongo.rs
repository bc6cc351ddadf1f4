use super::{PageWindow, Product, ProductFilter, ProductStore, StoreError};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::info;

const FALLBACK_DATABASE: &str = "test";

/// Product collection backed by MongoDB
pub struct MongoStore {
    client: Client,
    database: String,
    collection: Collection<Document>,
    timeout: Duration,
}

impl MongoStore {
    /// Build a client for `uri`. No I/O happens until the first operation.
    ///
    /// The database is `database` when given, otherwise the one named in the
    /// connection string, otherwise `test`.
    pub async fn connect(
        uri: &str,
        database: Option<&str>,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let default_database = options.default_database.clone();
        let client = Client::with_options(options)?;

        let database = database
            .map(str::to_string)
            .or(default_database)
            .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

        info!(database = %database, collection = %collection, "MongoDB client created");

        let collection = client.database(&database).collection::<Document>(collection);
        Ok(Self {
            client,
            database,
            collection,
            timeout,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        Ok(self.collection.count_documents(filter_document(filter)).await?)
    }

    async fn find(&self, filter: &ProductFilter, window: PageWindow) -> Result<Vec<Product>, StoreError> {
        let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
        let cursor = self
            .collection
            .find(filter_document(filter))
            .skip(window.skip)
            .limit(limit)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(decode_product).collect()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        self.collection
            .find_one(filter_document(&ProductFilter::by_code(code)))
            .await?
            .map(decode_product)
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let database = self.client.database(&self.database);
        let command = database.run_command(doc! { "ping": 1 });
        tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| StoreError::Unavailable(format!("no reply from MongoDB within {:?}", self.timeout)))??;
        Ok(())
    }
}

/// Translate a filter into a MongoDB query document
pub fn filter_document(filter: &ProductFilter) -> Document {
    let mut query = Document::new();
    if let Some(code) = &filter.code {
        query.insert("code", code.as_str());
    }
    if let Some(name) = &filter.name {
        query.insert("product_name", substring_pattern(name));
    }
    if let Some(brand) = &filter.brand {
        query.insert("brands", substring_pattern(brand));
    }
    query
}

fn substring_pattern(needle: &str) -> Document {
    doc! { "$regex": escape_regex(needle), "$options": "i" }
}

/// Escape PCRE metacharacters so the input is matched literally
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Decode a stored document, flattening `_id` to its string form
fn decode_product(mut document: Document) -> Result<Product, StoreError> {
    let id = document.remove("_id").map(|id| match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    });
    let mut product: Product = mongodb::bson::from_document(document)?;
    product.id = id;
    Ok(product)
}
