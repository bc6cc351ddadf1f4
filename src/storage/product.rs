use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A catalog entry as stored by the ingestion pipeline.
///
/// Every field is optional. Scalar values in the text fields are read as
/// strings, and fields not listed here pass through unchanged in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub brands: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub ingredients_text: Option<String>,
    /// Nutrient name to value, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutriments: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept strings, numbers and booleans; null reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected a text value, got {}", other))),
    }
}

/// Field predicates for a product query. `None` leaves the field unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact match on `code`
    pub code: Option<String>,
    /// Case-insensitive substring of `product_name`
    pub name: Option<String>,
    /// Case-insensitive substring of `brands`
    pub brand: Option<String>,
}

impl ProductFilter {
    /// Build a filter from raw query values; empty strings count as absent.
    pub fn new(code: Option<String>, name: Option<String>, brand: Option<String>) -> Self {
        Self {
            code: non_empty(code),
            name: non_empty(name),
            brand: non_empty(brand),
        }
    }

    pub fn by_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Evaluate the filter against a product held in memory
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(code) = &self.code {
            if product.code.as_deref() != Some(code.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !contains_ignore_case(product.product_name.as_deref(), name) {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            if !contains_ignore_case(product.brands.as_deref(), brand) {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}
