//! The base persisted entity: an identified JSON object with a link list
//! and an optional storage location.
//!
//! Catalogs, collections, and items are thin wrappers around [`Document`];
//! the shared link/persist behavior is exposed to them through the
//! [`Linked`] trait rather than an inheritance chain.

use crate::error::{Error, Result};
use crate::href;
use crate::link::Link;
use crate::store::Store;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Document {
    store: Arc<dyn Store>,
    data: Map<String, Value>,
    location: Option<String>,
}

impl Document {
    /// Wrap an in-memory JSON object. Fails unless the object carries a
    /// string `id`; a missing `links` array is created empty.
    pub fn new(store: Arc<dyn Store>, mut data: Map<String, Value>) -> Result<Self> {
        match data.get("id").and_then(Value::as_str) {
            Some(_) => {}
            None => {
                return Err(Error::Parse {
                    location: "<memory>".to_string(),
                    reason: "missing string 'id'".to_string(),
                });
            }
        }
        data.entry("links".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        Ok(Self {
            store,
            data,
            location: None,
        })
    }

    /// Fetch and parse the document at `location`.
    pub fn open(store: Arc<dyn Store>, location: &str) -> Result<Self> {
        let bytes = store.fetch(location)?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| Error::Parse {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        let Value::Object(data) = value else {
            return Err(Error::Parse {
                location: location.to_string(),
                reason: "not a JSON object".to_string(),
            });
        };
        let mut doc = Self::new(store, data).map_err(|e| match e {
            Error::Parse { reason, .. } => Error::Parse {
                location: location.to_string(),
                reason,
            },
            other => other,
        })?;
        doc.location = Some(location.to_string());
        Ok(doc)
    }

    pub fn id(&self) -> &str {
        // guaranteed at construction
        self.data.get("id").and_then(Value::as_str).unwrap_or("")
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The document's property sub-map, empty when absent.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.data.get("properties").and_then(Value::as_object)
    }

    /// A named property, or `None` when absent. Never fails; only
    /// structural accesses like `id` are required to exist.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.properties().and_then(|props| props.get(key))
    }

    /// The typed link list (raw hrefs, no resolution).
    pub fn link_list(&self) -> Vec<Link> {
        self.data
            .get("links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| serde_json::from_value(l.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn set_link_list(&mut self, links: Vec<Link>) {
        let value = links
            .into_iter()
            .map(|l| serde_json::to_value(l).expect("link serialization is infallible"))
            .collect();
        self.data.insert("links".to_string(), Value::Array(value));
    }

    /// Resolve an href per the location invariant: relative hrefs are
    /// interpreted against the directory of this document's location;
    /// without a location they are returned raw.
    pub fn resolve(&self, link_href: &str) -> String {
        match &self.location {
            Some(loc) if !href::is_absolute(link_href) => {
                href::join(&href::dirname(loc), link_href)
            }
            _ => link_href.to_string(),
        }
    }

    /// Hrefs of links with the given rel (all links when `rel` is `None`),
    /// resolved when this document has a location.
    pub fn links(&self, rel: Option<&str>) -> Vec<String> {
        self.link_list()
            .iter()
            .filter(|l| rel.is_none_or(|r| l.rel == r))
            .map(|l| self.resolve(&l.href))
            .collect()
    }

    /// Append a link unless an identical `(rel, href)` pair already exists.
    pub fn add_link(&mut self, rel: &str, link_href: &str, media_type: Option<&str>, title: Option<&str>) {
        let mut links = self.link_list();
        if links.iter().any(|l| l.rel == rel && l.href == link_href) {
            return;
        }
        links.push(Link {
            rel: rel.to_string(),
            href: link_href.to_string(),
            media_type: media_type.map(str::to_string),
            title: title.map(str::to_string),
        });
        self.set_link_list(links);
    }

    /// Drop the hierarchy links (`self`, `root`, `parent`, `child`, `item`,
    /// `collection`), keeping every other rel. Used before re-attaching a
    /// document elsewhere in a tree or publishing it.
    pub fn strip_structural_links(&mut self) {
        let links = self
            .link_list()
            .into_iter()
            .filter(|l| !l.is_structural())
            .collect();
        self.set_link_list(links);
    }

    /// The resolved href of a rel expected at most once (`root`, `parent`,
    /// `collection`). More than one is a modeling error.
    pub fn single_link(&self, rel: &str) -> Result<Option<String>> {
        let mut links = self.links(Some(rel));
        match links.len() {
            0 => Ok(None),
            1 => Ok(links.pop()),
            count => Err(Error::MultipleLinks {
                rel: rel.to_string(),
                count,
            }),
        }
    }

    /// The location of this tree's root: the resolved `root` link, or this
    /// document's own location when it is the root itself.
    pub fn root_location(&self) -> Result<String> {
        if let Some(root) = self.single_link("root")? {
            return Ok(root);
        }
        self.location
            .clone()
            .ok_or(Error::NoLocation("save the document before resolving its root"))
    }

    /// Serialize to the given location (or the current one). Sets the
    /// location when a new one is passed.
    pub fn persist(&mut self, location: Option<&str>) -> Result<()> {
        let target = match location.or(self.location.as_deref()) {
            Some(loc) => loc.to_string(),
            None => return Err(Error::NoLocation("no location set, pass one to persist")),
        };
        let bytes = serde_json::to_vec(&Value::Object(self.data.clone()))?;
        self.store.store(&target, &bytes)?;
        self.location = Some(target);
        Ok(())
    }

    /// Rewrite the `self` link to `{endpoint}/{path relative to the tree's
    /// root}` and persist. All other links are left untouched.
    pub fn publish(&mut self, endpoint: &str) -> Result<()> {
        let location = self
            .location
            .clone()
            .ok_or(Error::NoLocation("save the document before publishing"))?;
        let root_dir = href::dirname(&self.root_location()?);
        let rel = href::relative_to(&location, &root_dir);
        let self_href = format!("{}/{}", endpoint.trim_end_matches('/'), rel);

        let mut links: Vec<Link> = self
            .link_list()
            .into_iter()
            .filter(|l| l.rel != "self")
            .collect();
        links.insert(0, Link::new("self", self_href));
        self.set_link_list(links);
        self.persist(None)
    }
}

/// Shared document behavior for the typed wrappers. Implementors expose
/// their inner [`Document`]; everything else is provided.
pub trait Linked {
    fn doc(&self) -> &Document;
    fn doc_mut(&mut self) -> &mut Document;

    fn id(&self) -> &str {
        self.doc().id()
    }

    fn location(&self) -> Option<&str> {
        self.doc().location()
    }

    fn links(&self, rel: Option<&str>) -> Vec<String> {
        self.doc().links(rel)
    }

    fn add_link(&mut self, rel: &str, link_href: &str, media_type: Option<&str>, title: Option<&str>) {
        self.doc_mut().add_link(rel, link_href, media_type, title);
    }

    fn strip_structural_links(&mut self) {
        self.doc_mut().strip_structural_links();
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.doc().field(key)
    }

    fn persist(&mut self, location: Option<&str>) -> Result<()> {
        self.doc_mut().persist(location)
    }
}

impl Linked for Document {
    fn doc(&self) -> &Document {
        self
    }

    fn doc_mut(&mut self) -> &mut Document {
        self
    }
}
