use super::{PageWindow, Product, ProductFilter, ProductStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// In-memory product collection loaded from a JSON Lines dump.
///
/// One product object per line; blank lines are skipped. Storage order is
/// file order.
pub struct JsonlStore {
    products: Vec<Product>,
}

impl JsonlStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open product dump {:?}", path))?;

        let mut products = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let product: Product = serde_json::from_str(&line)
                .with_context(|| format!("Invalid product on line {} of {:?}", index + 1, path))?;
            products.push(product);
        }

        let store = Self { products };
        if store.is_empty() {
            warn!("Product dump {:?} is empty", path);
        }
        info!(products = store.len(), "Loaded product dump");

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn matching<'a>(&'a self, filter: &'a ProductFilter) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |p| filter.matches(p))
    }
}

#[async_trait]
impl ProductStore for JsonlStore {
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        Ok(self.matching(filter).count() as u64)
    }

    async fn find(&self, filter: &ProductFilter, window: PageWindow) -> Result<Vec<Product>, StoreError> {
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(self.matching(filter).skip(skip).take(limit).cloned().collect())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .products
            .iter()
            .find(|p| p.code.as_deref() == Some(code))
            .cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn numbered(count: usize) -> JsonlStore {
        JsonlStore::new(
            (1..=count)
                .map(|i| Product {
                    code: Some(format!("{:04}", i)),
                    product_name: Some(format!("Product {}", i)),
                    ..Product::default()
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn window_slices_in_storage_order() {
        let store = numbered(12);
        let filter = ProductFilter::default();
        assert_eq!(store.count(&filter).await.unwrap(), 12);

        let page = store.find(&filter, PageWindow { skip: 5, limit: 5 }).await.unwrap();
        let codes: Vec<_> = page.iter().filter_map(|p| p.code.as_deref()).collect();
        assert_eq!(codes, ["0006", "0007", "0008", "0009", "0010"]);

        let tail = store.find(&filter, PageWindow { skip: 10, limit: 5 }).await.unwrap();
        assert_eq!(tail.len(), 2);

        let past_end = store.find(&filter, PageWindow { skip: 50, limit: 5 }).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn find_by_code_returns_first_match() {
        let mut products = numbered(3).products;
        products.push(Product {
            code: Some("0002".to_string()),
            product_name: Some("Duplicate".to_string()),
            ..Product::default()
        });
        let store = JsonlStore::new(products);

        let found = store.find_by_code("0002").await.unwrap().unwrap();
        assert_eq!(found.product_name.as_deref(), Some("Product 2"));
        assert!(store.find_by_code("9999").await.unwrap().is_none());
    }

    #[test]
    fn load_reads_one_product_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"code":"1","product_name":"Chocolate Bar","nutriments":{{"fat":30.5}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"code":"2","brands":"Acme"}}"#).unwrap();

        let store = JsonlStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.products[0].nutriments, Some(serde_json::json!({"fat": 30.5})));
    }

    #[tokio::test]
    async fn load_keeps_imported_shapes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"code":3017620422003,"product_name":"Nutella","nutriscore_grade":"e","labels_tags":["en:no-gluten"]}}"#).unwrap();

        let store = JsonlStore::load(file.path()).unwrap();
        let product = store.find_by_code("3017620422003").await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(product).unwrap(),
            serde_json::json!({
                "code": "3017620422003",
                "product_name": "Nutella",
                "nutriscore_grade": "e",
                "labels_tags": ["en:no-gluten"]
            })
        );
    }

    #[test]
    fn load_reports_the_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"code":"1"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = JsonlStore::load(file.path()).err().unwrap();
        assert!(err.to_string().contains("line 2"));
    }
}
