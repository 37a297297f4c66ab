//! Item catalog boundary.
//!
//! The market's item catalog is an external GraphQL service whose payloads
//! are loosely typed: objects are tagged by `__typename`, ids may arrive as
//! strings or numbers, most fields are nullable. [`parse_catalog_items`]
//! validates such payloads and converts them into strict [`Item`]s before
//! they can reach a cache. Anything that fails validation is skipped.
//!
//! [`ItemCatalog`] is the seam the fallback recognizer searches through;
//! [`SnapshotCatalog`] implements it over an in-memory item list.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::types::Item;

/// Searchable source of market items.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// Catalog name for logging/debugging.
    fn name(&self) -> &str;

    /// Items whose name matches `query`, best first, at most `limit`.
    async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<Item>>;
}

// ============================================================================
// Payload validation
// ============================================================================

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum CatalogPayload {
    Item(RawItem),
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    icon_link: Option<String>,
    #[serde(default)]
    base_price: Option<f64>,
    #[serde(default)]
    avg24h_price: Option<f64>,
}

impl RawItem {
    fn into_item(self) -> Option<Item> {
        let id = match self.id? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if id.is_empty() || name.is_empty() {
            return None;
        }
        let short_name = self
            .short_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| name.clone());
        Some(Item {
            id,
            name,
            short_name,
            icon_link: self.icon_link.filter(|l| !l.is_empty()),
            base_price: self.base_price.and_then(price),
            avg_24h_price: self.avg24h_price.and_then(price),
        })
    }
}

fn price(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.round() as i64)
}

/// Validate a catalog payload and extract its items.
///
/// Accepts a bare array, `{ "items": [...] }`, or a GraphQL envelope
/// `{ "data": { "items": [...] } }`. Objects without `__typename` are
/// treated as items. Fails only when the text is not JSON at all.
pub fn parse_catalog_items(json: &str) -> Result<Vec<Item>> {
    let value: Value = serde_json::from_str(json)?;
    let list = match value {
        Value::Array(list) => list,
        Value::Object(mut root) => {
            let holder = match root.remove("data") {
                Some(Value::Object(data)) => data,
                _ => root,
            };
            match holder.get("items") {
                Some(Value::Array(list)) => list.clone(),
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    let mut items = Vec::with_capacity(list.len());
    for mut raw in list {
        if let Value::Object(ref mut obj) = raw {
            obj.entry("__typename")
                .or_insert_with(|| Value::String("Item".to_string()));
        }
        match serde_json::from_value::<CatalogPayload>(raw) {
            Ok(CatalogPayload::Item(raw)) => match raw.into_item() {
                Some(item) => items.push(item),
                None => debug!("skipping catalog item without id or name"),
            },
            Ok(CatalogPayload::Unknown) => {}
            Err(e) => debug!(error = %e, "skipping malformed catalog entry"),
        }
    }
    Ok(items)
}

// ============================================================================
// Name matching
// ============================================================================

/// Lower-case, whitespace-separated tokens of a name or query.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == '_' || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// How well `query` names `item`, in `[0, 1]`.
///
/// An exact (case-insensitive) name or short-name match scores 1. Otherwise
/// the score is the fraction of query tokens that appear among the item's
/// name and short-name tokens.
pub(crate) fn match_score(query: &str, item: &Item) -> f64 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }
    if item.name.to_lowercase() == query || item.short_name.to_lowercase() == query {
        return 1.0;
    }
    let wanted = tokens(&query);
    let mut have = tokens(&item.name);
    have.extend(tokens(&item.short_name));
    let found = wanted.iter().filter(|t| have.contains(t)).count();
    found as f64 / wanted.len() as f64
}

// ============================================================================
// Snapshot catalog
// ============================================================================

/// In-memory catalog over a fixed item list.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    items: Vec<Item>,
}

impl SnapshotCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Build from a raw catalog payload (see [`parse_catalog_items`]).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(parse_catalog_items(json)?))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemCatalog for SnapshotCatalog {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn search_items(&self, query: &str, limit: usize) -> Result<Vec<Item>> {
        let mut scored: Vec<(f64, &Item)> = self
            .items
            .iter()
            .map(|item| (match_score(query, item), item))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect())
    }
}
