//! Catalog item types

use serde::{Deserialize, Serialize};

/// A validated market item, as stored in the text-search cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_24h_price: Option<i64>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            short_name: name.clone(),
            name,
            icon_link: None,
            base_price: None,
            avg_24h_price: None,
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = short_name.into();
        self
    }

    pub fn with_icon_link(mut self, link: impl Into<String>) -> Self {
        self.icon_link = Some(link.into());
        self
    }

    pub fn with_prices(mut self, base: Option<i64>, avg_24h: Option<i64>) -> Self {
        self.base_price = base;
        self.avg_24h_price = avg_24h;
        self
    }
}

/// The identifying subset of an [`Item`] carried by a recognition result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
}

impl ItemRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            short_name: name.clone(),
            name,
            icon_link: None,
        }
    }
}

impl From<&Item> for ItemRef {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            short_name: item.short_name.clone(),
            icon_link: item.icon_link.clone(),
        }
    }
}
