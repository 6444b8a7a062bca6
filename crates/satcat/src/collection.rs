//! Collections: catalog nodes carrying aggregate metadata (extent,
//! summaries, shared properties, item-asset schema) that descendant items
//! fall back to when a field is absent locally.

use crate::catalog::Catalog;
use crate::document::{Document, Linked};
use crate::error::Result;
use crate::item::Item;
use crate::store::Store;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::sync::Arc;

static EMPTY_MAP: Lazy<Map<String, Value>> = Lazy::new(Map::new);

#[derive(Debug, Clone)]
pub struct Collection {
    cat: Catalog,
}

impl Linked for Collection {
    fn doc(&self) -> &Document {
        self.cat.doc()
    }

    fn doc_mut(&mut self) -> &mut Document {
        self.cat.doc_mut()
    }
}

impl Collection {
    pub fn open(store: Arc<dyn Store>, location: &str) -> Result<Self> {
        Ok(Self::from_catalog(Catalog::open(store, location)?))
    }

    pub fn from_catalog(cat: Catalog) -> Self {
        Self { cat }
    }

    pub fn from_value(store: Arc<dyn Store>, value: Value) -> Result<Self> {
        let data = match value {
            Value::Object(map) => map,
            other => {
                return Err(crate::error::Error::Parse {
                    location: "<memory>".to_string(),
                    reason: format!("collection is not a JSON object: {other}"),
                });
            }
        };
        Ok(Self::from_catalog(Catalog::new(Document::new(store, data)?)))
    }

    pub fn as_catalog(&self) -> &Catalog {
        &self.cat
    }

    /// Insert an item beneath this collection; see [`Catalog::add_item`].
    pub fn add_item(&mut self, item: &mut Item, path_template: &str) -> Result<()> {
        self.cat.add_item(item, path_template)
    }

    // Derived accessors: a missing field yields the default, never an error.

    fn str_field(&self, key: &str) -> &str {
        self.doc().data().get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.str_field("title")
    }

    pub fn version(&self) -> &str {
        self.str_field("version")
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.doc()
            .data()
            .get("keywords")
            .and_then(Value::as_array)
            .map(|kw| kw.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn license(&self) -> Option<&str> {
        self.doc().data().get("license").and_then(Value::as_str)
    }

    pub fn providers(&self) -> &[Value] {
        self.doc()
            .data()
            .get("providers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn extent(&self) -> Option<&Value> {
        self.doc().data().get("extent")
    }

    pub fn summaries(&self) -> &Map<String, Value> {
        self.doc()
            .data()
            .get("summaries")
            .and_then(Value::as_object)
            .unwrap_or(&EMPTY_MAP)
    }

    /// Shared properties inherited by descendant items.
    pub fn properties(&self) -> &Map<String, Value> {
        self.doc().properties().unwrap_or(&EMPTY_MAP)
    }

    /// Per-asset schema (band definitions and friends) for items of this
    /// collection.
    pub fn item_assets(&self) -> &Map<String, Value> {
        self.doc()
            .data()
            .get("item_assets")
            .and_then(Value::as_object)
            .unwrap_or(&EMPTY_MAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use serde_json::json;

    fn collection() -> Collection {
        Collection::from_value(
            FileStore::shared(),
            json!({
                "id": "landsat-8-l1",
                "title": "Landsat 8",
                "keywords": ["landsat", "earth observation"],
                "license": "PDDL-1.0",
                "extent": {"spatial": [-180.0, -90.0, 180.0, 90.0]},
                "properties": {"eo:platform": "landsat-8"},
                "summaries": {"gsd": [30]}
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let c = collection();
        assert_eq!(c.title(), "Landsat 8");
        assert_eq!(c.keywords(), ["landsat", "earth observation"]);
        assert_eq!(c.license(), Some("PDDL-1.0"));
        assert!(c.extent().is_some());
        assert_eq!(c.summaries()["gsd"], json!([30]));
        assert_eq!(c.properties()["eo:platform"], "landsat-8");
    }

    #[test]
    fn test_defaults_when_absent() {
        let c = Collection::from_value(FileStore::shared(), json!({"id": "bare"})).unwrap();
        assert_eq!(c.title(), "");
        assert_eq!(c.version(), "");
        assert!(c.keywords().is_empty());
        assert_eq!(c.license(), None);
        assert!(c.providers().is_empty());
        assert_eq!(c.extent(), None);
        assert!(c.summaries().is_empty());
        assert!(c.properties().is_empty());
        assert!(c.item_assets().is_empty());
    }
}
