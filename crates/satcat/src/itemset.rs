//! In-memory sets of items with their inline collection records, for bulk
//! export, filtering, and downloads. No new resolution logic lives here;
//! everything delegates to [`Item`] and [`Collection`].

use crate::collection::Collection;
use crate::document::Linked;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::store::Store;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::catalog::STAC_VERSION;

#[derive(Debug, Clone)]
pub struct ItemSet {
    store: Arc<dyn Store>,
    items: Vec<Item>,
    collections: Vec<Collection>,
}

impl ItemSet {
    /// Assemble a set, wiring each item's cached collection from the
    /// inline `collection` id on the item record.
    pub fn new(store: Arc<dyn Store>, items: Vec<Item>, collections: Vec<Collection>) -> Self {
        for item in &items {
            let id = item.doc().data().get("collection").and_then(Value::as_str);
            if let Some(id) = id
                && let Some(collection) = collections.iter().find(|c| c.id() == id)
            {
                item.set_collection(collection.clone());
            }
        }
        Self {
            store,
            items,
            collections,
        }
    }

    /// Open a FeatureCollection-shaped document: a `features` array of
    /// items plus an optional `collections` array.
    pub fn open(store: Arc<dyn Store>, location: &str) -> Result<Self> {
        let bytes = store.fetch(location)?;
        let data: Value = serde_json::from_slice(&bytes).map_err(|e| Error::Parse {
            location: location.to_string(),
            reason: e.to_string(),
        })?;

        let features = data
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Parse {
                location: location.to_string(),
                reason: "missing 'features' array".to_string(),
            })?;
        let items = features
            .iter()
            .map(|f| Item::from_value(store.clone(), f.clone()))
            .collect::<Result<Vec<_>>>()?;

        let collections = data
            .get("collections")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .map(|c| Collection::from_value(store.clone(), c.clone()))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self::new(store, items, collections))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id() == id)
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Sorted, deduplicated dates across the set.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = self
            .items
            .iter()
            .map(Item::date)
            .collect::<Result<Vec<_>>>()?;
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// Distinct values of a property across the set, first-seen order.
    pub fn values(&self, key: &str) -> Vec<Value> {
        let mut seen = Vec::new();
        for item in &self.items {
            if let Some(value) = item.field(key)
                && !seen.contains(value)
            {
                seen.push(value.clone());
            }
        }
        seen
    }

    /// Distinct values of a property among items on a specific date.
    pub fn values_on(&self, key: &str, date: NaiveDate) -> Vec<Value> {
        let mut seen = Vec::new();
        for item in &self.items {
            if item.date().ok() != Some(date) {
                continue;
            }
            if let Some(value) = item.field(key)
                && !seen.contains(value)
            {
                seen.push(value.clone());
            }
        }
        seen
    }

    /// Keep only items whose `key` property matches one of `values`.
    pub fn filter(&mut self, key: &str, values: &[Value]) {
        self.items
            .retain(|item| item.field(key).is_some_and(|v| values.contains(v)));
    }

    /// The set as a single FeatureCollection document.
    pub fn geojson(&self, id: &str, description: &str) -> Value {
        json!({
            "id": id,
            "description": description,
            "stac_version": STAC_VERSION,
            "stac_extensions": ["single-file-stac"],
            "type": "FeatureCollection",
            "features": self.items.iter().map(|i| Value::Object(i.doc().data().clone())).collect::<Vec<_>>(),
            "collections": self.collections.iter().map(|c| Value::Object(c.doc().data().clone())).collect::<Vec<_>>(),
            "links": []
        })
    }

    /// Export the set to a single file.
    pub fn save(&self, location: &str) -> Result<()> {
        let bytes = serde_json::to_vec(&self.geojson("STAC", "Single file STAC"))?;
        self.store.store(location, &bytes)
    }

    /// Download one asset per item; items whose asset fails or is missing
    /// are skipped.
    pub fn download(&self, key: &str, overwrite: bool) -> Result<Vec<String>> {
        let mut downloaded = Vec::new();
        for item in &self.items {
            if let Some(filename) = item.download(key, overwrite)? {
                downloaded.push(filename);
            }
        }
        Ok(downloaded)
    }

    /// Download several assets per item.
    pub fn download_assets(
        &self,
        keys: Option<&[&str]>,
        overwrite: bool,
    ) -> Result<Vec<Vec<String>>> {
        let mut downloaded = Vec::new();
        for item in &self.items {
            let filenames = item.download_assets(keys, overwrite)?;
            if !filenames.is_empty() {
                downloaded.push(filenames);
            }
        }
        Ok(downloaded)
    }
}
