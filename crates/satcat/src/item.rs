//! Items: terminal documents representing one data record. An item
//! resolves fields against its owning collection when they are absent
//! locally, and its assets can be addressed by key or by common band name.

use crate::collection::Collection;
use crate::document::{Document, Linked};
use crate::error::{Error, Result};
use crate::href;
use crate::store::Store;
use crate::template::{self, FieldResolver};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

static EMPTY_MAP: Lazy<Map<String, Value>> = Lazy::new(Map::new);

const DEFAULT_PATH_TEMPLATE: &str = "${date}";
const DEFAULT_FILENAME_TEMPLATE: &str = "${id}";

#[derive(Debug, Clone)]
pub struct Item {
    doc: Document,
    path_template: String,
    filename_template: String,
    // resolved-once caches; reset only on reconstruction
    collection: OnceCell<Collection>,
    assets_by_band: OnceCell<HashMap<String, String>>,
}

impl Linked for Item {
    fn doc(&self) -> &Document {
        &self.doc
    }

    fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

impl Item {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            collection: OnceCell::new(),
            assets_by_band: OnceCell::new(),
        }
    }

    pub fn open(store: Arc<dyn Store>, location: &str) -> Result<Self> {
        Ok(Self::new(Document::open(store, location)?))
    }

    pub fn from_value(store: Arc<dyn Store>, value: Value) -> Result<Self> {
        let data = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::Parse {
                    location: "<memory>".to_string(),
                    reason: format!("item is not a JSON object: {other}"),
                });
            }
        };
        Ok(Self::new(Document::new(store, data)?))
    }

    /// Directory template used by [`Item::download`] targets.
    pub fn with_path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = template.into();
        self
    }

    /// Filename template used by [`Item::download`] targets.
    pub fn with_filename_template(mut self, template: impl Into<String>) -> Self {
        self.filename_template = template.into();
        self
    }

    /// The owning collection, opened from the `collection` link on first
    /// use and cached. Zero links is `Ok(None)`; more than one is a
    /// modeling error.
    pub fn collection(&self) -> Result<Option<&Collection>> {
        if let Some(collection) = self.collection.get() {
            return Ok(Some(collection));
        }
        let links = self.doc.links(Some("collection"));
        match links.len() {
            0 => Ok(None),
            1 => {
                let collection = self
                    .collection
                    .get_or_try_init(|| Collection::open(self.doc.store().clone(), &links[0]))?;
                Ok(Some(collection))
            }
            count => Err(Error::MultipleLinks {
                rel: "collection".to_string(),
                count,
            }),
        }
    }

    /// Pre-wire an owned collection, as bulk sets do when the collection
    /// record arrives inline rather than behind a link.
    pub fn set_collection(&self, collection: Collection) {
        let _ = self.collection.set(collection);
    }

    pub fn properties(&self) -> &Map<String, Value> {
        self.doc.properties().unwrap_or(&EMPTY_MAP)
    }

    /// A property of this item, falling back to the owning collection's
    /// properties when absent locally. `None` when neither has it (or no
    /// collection is resolvable).
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.doc.field(key).or_else(|| {
            self.collection()
                .ok()
                .flatten()
                .and_then(|c| c.properties().get(key))
        })
    }

    /// The item's parsed `datetime` property.
    pub fn datetime(&self) -> Result<NaiveDateTime> {
        let raw = self
            .field("datetime")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Timestamp("item has no 'datetime' property".to_string()))?
            .replace('/', "-");
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.fZ")
            .map_err(|e| Error::Timestamp(format!("'{raw}': {e}")))
    }

    pub fn date(&self) -> Result<NaiveDate> {
        Ok(self.datetime()?.date())
    }

    pub fn geometry(&self) -> Option<&Value> {
        self.doc.data().get("geometry")
    }

    pub fn bbox(&self) -> Option<&Value> {
        self.doc.data().get("bbox")
    }

    /// Band definitions, from the item's own properties or the owning
    /// collection's.
    pub fn eo_bands(&self) -> &[Value] {
        self.properties()
            .get("eo:bands")
            .or_else(|| {
                self.collection()
                    .ok()
                    .flatten()
                    .and_then(|c| c.properties().get("eo:bands"))
            })
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn assets(&self) -> &Map<String, Value> {
        self.doc
            .data()
            .get("assets")
            .and_then(Value::as_object)
            .unwrap_or(&EMPTY_MAP)
    }

    /// Common band name → asset key, for assets whose band list resolves
    /// to exactly one named band.
    fn assets_by_common_name(&self) -> &HashMap<String, String> {
        self.assets_by_band.get_or_init(|| {
            let bands = self.eo_bands();
            let mut by_name = HashMap::new();
            for (key, asset) in self.assets() {
                let indexes = asset.get("eo:bands").and_then(Value::as_array);
                let Some(indexes) = indexes else { continue };
                if indexes.len() != 1 {
                    continue;
                }
                if let Some(idx) = indexes[0].as_u64()
                    && let Some(band) = bands.get(idx as usize)
                    && let Some(name) = band.get("common_name").and_then(Value::as_str)
                {
                    by_name.insert(name.to_string(), key.clone());
                }
            }
            by_name
        })
    }

    /// The asset under `key`, or under the common band name `key` maps to.
    /// A miss is reported, not raised, so bulk downloads keep going.
    pub fn asset(&self, key: &str) -> Option<&Value> {
        if let Some(asset) = self.assets().get(key) {
            return Some(asset);
        }
        if let Some(asset_key) = self.assets_by_common_name().get(key) {
            return self.assets().get(asset_key);
        }
        warn!("no such asset ({key})");
        None
    }

    /// Download one asset to `{path_template}/{filename_template}_{key}{ext}`.
    ///
    /// An existing target is reused unless `overwrite` is set. Transfer
    /// failures are logged and yield `Ok(None)` so that bulk downloads are
    /// not aborted by one bad asset; template failures propagate.
    pub fn download(&self, key: &str, overwrite: bool) -> Result<Option<String>> {
        let Some(asset) = self.asset(key) else {
            return Ok(None);
        };
        let Some(asset_href) = asset.get("href").and_then(Value::as_str) else {
            warn!("asset ({key}) has no href");
            return Ok(None);
        };
        let source = self.doc.resolve(asset_href);

        let dir = template::expand(&self.path_template, self)?;
        let name = template::expand(&self.filename_template, self)?;
        let target = format!(
            "{}{}_{}{}",
            if dir.is_empty() { String::new() } else { format!("{dir}/") },
            name,
            key,
            href::extension(&source)
        );

        if self.doc.store().exists(&target) && !overwrite {
            return Ok(Some(target));
        }
        let transfer = self
            .doc
            .store()
            .fetch(&source)
            .and_then(|bytes| self.doc.store().store(&target, &bytes));
        match transfer {
            Ok(()) => Ok(Some(target)),
            Err(e) => {
                error!("unable to download {source}: {e}");
                Ok(None)
            }
        }
    }

    /// Download several assets (all of them when `keys` is `None`),
    /// skipping any that fail.
    pub fn download_assets(&self, keys: Option<&[&str]>, overwrite: bool) -> Result<Vec<String>> {
        let keys: Vec<String> = match keys {
            Some(keys) => keys.iter().map(|k| k.to_string()).collect(),
            None => self.assets().keys().cloned().collect(),
        };
        let mut downloaded = Vec::new();
        for key in keys {
            if let Some(filename) = self.download(&key, overwrite)? {
                downloaded.push(filename);
            }
        }
        Ok(downloaded)
    }
}

impl FieldResolver for Item {
    /// The template lookup chain: `id`, the date-derived pseudo-fields,
    /// then item/collection properties.
    fn get(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id().to_string()),
            "date" => self.date().ok().map(|d| d.to_string()),
            "year" => self.date().ok().map(|d| d.year().to_string()),
            "month" => self.date().ok().map(|d| format!("{:02}", d.month())),
            "day" => self.date().ok().map(|d| format!("{:02}", d.day())),
            _ => match self.field(name)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
        }
    }
}
