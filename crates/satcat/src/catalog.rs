//! Catalog nodes: documents that organize other documents via `child` and
//! `item` links, plus the insertion protocol that grows a tree in place.

use crate::collection::Collection;
use crate::document::{Document, Linked};
use crate::error::{Error, Result};
use crate::href;
use crate::item::Item;
use crate::store::Store;
use crate::template;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Version tag written into every catalog this library creates.
pub const STAC_VERSION: &str = "1.0.0";

/// A document acting as an internal tree node. The "catalog" identity is
/// structural (it carries `child`/`item` links), not a separate tag.
#[derive(Debug, Clone)]
pub struct Catalog {
    doc: Document,
}

impl Linked for Catalog {
    fn doc(&self) -> &Document {
        &self.doc
    }

    fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

impl Catalog {
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }

    pub fn open(store: Arc<dyn Store>, location: &str) -> Result<Self> {
        Ok(Self::new(Document::open(store, location)?))
    }

    /// A fresh in-memory catalog with no links and no location.
    pub fn create(store: Arc<dyn Store>, id: &str, description: &str) -> Self {
        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(id.to_string()));
        data.insert(
            "stac_version".to_string(),
            Value::String(STAC_VERSION.to_string()),
        );
        data.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
        data.insert("links".to_string(), Value::Array(Vec::new()));
        Self::new(Document::new(store, data).expect("fresh catalog data carries an id"))
    }

    pub fn description(&self) -> &str {
        self.doc
            .data()
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn root(&self) -> Result<Option<Catalog>> {
        match self.doc.single_link("root")? {
            Some(href) => Ok(Some(Catalog::open(self.doc.store().clone(), &href)?)),
            None => Ok(None),
        }
    }

    pub fn parent(&self) -> Result<Option<Catalog>> {
        match self.doc.single_link("parent")? {
            Some(href) => Ok(Some(Catalog::open(self.doc.store().clone(), &href)?)),
            None => Ok(None),
        }
    }

    /// Direct sub-catalogs, in link insertion order. Lazy: each child is
    /// opened only when the iterator reaches it.
    pub fn children(&self) -> Children {
        Children {
            store: self.doc.store().clone(),
            hrefs: self.links(Some("child")).into_iter(),
        }
    }

    /// Every descendant catalog.
    ///
    /// The yield order is deliberate and load-bearing: for each child, its
    /// grandchildren (each followed by that grandchild's own descendants)
    /// come first, then the child itself. Downstream counts and listings
    /// depend on this exact sequence.
    pub fn catalogs(&self) -> Catalogs {
        let mut queue = VecDeque::new();
        queue.push_back(CatalogTask::Recurse(self.clone()));
        Catalogs {
            store: self.doc.store().clone(),
            queue,
        }
    }

    /// Descendant collections, stopping at the first collection found on
    /// each path. Collections are assumed not to nest; one below another is
    /// not discovered.
    pub fn collections(&self) -> Collections {
        Collections {
            store: self.doc.store().clone(),
            queue: self.links(Some("child")).into(),
        }
    }

    /// Every item in this subtree: directly linked items first, then each
    /// child's items recursively.
    pub fn items(&self) -> Items {
        let mut queue: VecDeque<ItemTask> = self
            .links(Some("item"))
            .into_iter()
            .map(ItemTask::Leaf)
            .collect();
        queue.extend(self.links(Some("child")).into_iter().map(ItemTask::Node));
        Items {
            store: self.doc.store().clone(),
            queue,
        }
    }

    /// Attach `child` beneath this catalog as `{child.id}/catalog.json`.
    pub fn add_catalog(&mut self, child: &mut Catalog) -> Result<()> {
        self.add_catalog_as(child, "catalog")
    }

    /// Attach `child` beneath this catalog as `{child.id}/{basename}.json`:
    /// a `child` link is added here, the child's structural links are
    /// replaced with fresh relative `root`/`parent` links, and both sides
    /// are persisted.
    pub fn add_catalog_as(&mut self, child: &mut Catalog, basename: &str) -> Result<()> {
        let location = self
            .location()
            .ok_or(Error::NoLocation("save catalog before adding sub-catalogs"))?
            .to_string();
        let dir = href::dirname(&location);
        let child_href = format!("{}/{}.json", child.id(), basename);
        let child_location = href::join(&dir, &child_href);
        let child_dir = href::dirname(&child_location);
        let root_location = self.doc.root_location()?;

        self.add_link("child", &child_href, None, None);
        self.persist(None)?;

        child.strip_structural_links();
        child.add_link("root", &href::relative_to(&root_location, &child_dir), None, None);
        child.add_link("parent", &href::relative_to(&location, &child_dir), None, None);
        child.persist(Some(&child_location))?;
        debug!(child = child.id(), location = %child_location, "added sub-catalog");
        Ok(())
    }

    /// Insert `item` beneath this catalog at the path `path_template`
    /// expands to (plus `.json`), synthesizing any missing intermediate
    /// catalogs along the way and reusing ones that already exist.
    ///
    /// The item's structural links are replaced with fresh `root`,
    /// `parent`, and `collection` links; `collection` points at the
    /// catalog this was invoked on, so call it on a [`Collection`] for
    /// that link to mean anything.
    pub fn add_item(&mut self, item: &mut Item, path_template: &str) -> Result<()> {
        let location = self
            .location()
            .ok_or(Error::NoLocation("save catalog before adding items"))?
            .to_string();
        let dir = href::dirname(&location);
        let expanded = template::expand(path_template, &*item)?;
        let item_location = href::join(&dir, &format!("{expanded}.json"));
        let item_dir = href::dirname(&item_location);
        let root_location = self.doc.root_location()?;

        // Walk the intermediate segments, descending into existing
        // sub-catalogs and synthesizing the missing suffix.
        let segments: Vec<&str> = expanded.split('/').filter(|s| !s.is_empty()).collect();
        let template_segments: Vec<&str> =
            path_template.split('/').filter(|s| !s.is_empty()).collect();
        let mut node = self.clone();
        for (i, segment) in segments
            .iter()
            .enumerate()
            .take(segments.len().saturating_sub(1))
        {
            let node_location = node
                .location()
                .ok_or(Error::NoLocation("intermediate catalog was never saved"))?
                .to_string();
            let candidate = href::join(
                &href::dirname(&node_location),
                &format!("{segment}/catalog.json"),
            );
            if node.doc.store().exists(&candidate) {
                node = Catalog::open(node.doc.store().clone(), &candidate)?;
            } else {
                let label = template_segments
                    .get(i)
                    .and_then(|t| template::placeholders(t).into_iter().next())
                    .unwrap_or(segment);
                let mut sub = Catalog::create(
                    node.doc.store().clone(),
                    segment,
                    &format!("{label} catalog"),
                );
                node.add_catalog(&mut sub)?;
                node = sub;
            }
        }

        let node_location = node
            .location()
            .ok_or(Error::NoLocation("containing catalog was never saved"))?
            .to_string();
        node.add_link(
            "item",
            &href::relative_to(&item_location, &href::dirname(&node_location)),
            None,
            None,
        );
        node.persist(None)?;

        item.strip_structural_links();
        item.add_link("root", &href::relative_to(&root_location, &item_dir), None, None);
        item.add_link("parent", &href::relative_to(&node_location, &item_dir), None, None);
        item.add_link("collection", &href::relative_to(&location, &item_dir), None, None);
        item.persist(Some(&item_location))?;
        debug!(item = item.id(), location = %item_location, "added item");

        // the walk may have written a child link into our own file
        self.doc = Document::open(self.doc.store().clone(), &location)?;
        Ok(())
    }

    /// Rewrite every `self` link in this subtree to sit under `endpoint`,
    /// visiting this node, its direct items, then each child recursively.
    /// `root` and `parent` links are left untouched.
    pub fn publish(&mut self, endpoint: &str) -> Result<()> {
        self.doc.publish(endpoint)?;
        for link_href in self.links(Some("item")) {
            let mut item = Item::open(self.doc.store().clone(), &link_href)?;
            item.doc_mut().publish(endpoint)?;
        }
        for child in self.children() {
            child?.publish(endpoint)?;
        }
        Ok(())
    }
}

// ============================================================================
// Traversal iterators
// ============================================================================

/// Lazily opened direct children. See [`Catalog::children`].
pub struct Children {
    store: Arc<dyn Store>,
    hrefs: std::vec::IntoIter<String>,
}

impl Iterator for Children {
    type Item = Result<Catalog>;

    fn next(&mut self) -> Option<Self::Item> {
        let link_href = self.hrefs.next()?;
        Some(Catalog::open(self.store.clone(), &link_href))
    }
}

enum CatalogTask {
    /// Expand a node's children.
    Recurse(Catalog),
    /// Open a child, then queue its grandchildren ahead of emitting it.
    Child(String),
    /// Open a grandchild, emit it, and queue its own descent.
    Grandchild(String),
    /// Emit an already-opened catalog.
    Emit(Catalog),
}

/// Work-queue iterator behind [`Catalog::catalogs`]. The first open error
/// is yielded and the iterator fuses.
pub struct Catalogs {
    store: Arc<dyn Store>,
    queue: VecDeque<CatalogTask>,
}

impl Iterator for Catalogs {
    type Item = Result<Catalog>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.queue.pop_front()? {
                CatalogTask::Recurse(cat) => {
                    for link_href in cat.links(Some("child")).into_iter().rev() {
                        self.queue.push_front(CatalogTask::Child(link_href));
                    }
                }
                CatalogTask::Child(link_href) => {
                    match Catalog::open(self.store.clone(), &link_href) {
                        Ok(child) => {
                            self.queue.push_front(CatalogTask::Emit(child.clone()));
                            for grand in child.links(Some("child")).into_iter().rev() {
                                self.queue.push_front(CatalogTask::Grandchild(grand));
                            }
                        }
                        Err(e) => {
                            self.queue.clear();
                            return Some(Err(e));
                        }
                    }
                }
                CatalogTask::Grandchild(link_href) => {
                    match Catalog::open(self.store.clone(), &link_href) {
                        Ok(grand) => {
                            self.queue.push_front(CatalogTask::Recurse(grand.clone()));
                            return Some(Ok(grand));
                        }
                        Err(e) => {
                            self.queue.clear();
                            return Some(Err(e));
                        }
                    }
                }
                CatalogTask::Emit(cat) => return Some(Ok(cat)),
            }
        }
    }
}

/// Depth-first walk behind [`Catalog::collections`]; does not descend
/// below a found collection.
pub struct Collections {
    store: Arc<dyn Store>,
    queue: VecDeque<String>,
}

impl Iterator for Collections {
    type Item = Result<Collection>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let link_href = self.queue.pop_front()?;
            match Catalog::open(self.store.clone(), &link_href) {
                Ok(cat) => {
                    if cat.doc().data().contains_key("extent") {
                        return Some(Ok(Collection::from_catalog(cat)));
                    }
                    for child in cat.links(Some("child")).into_iter().rev() {
                        self.queue.push_front(child);
                    }
                }
                Err(e) => {
                    self.queue.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

enum ItemTask {
    Leaf(String),
    Node(String),
}

/// Pre-order item walk behind [`Catalog::items`].
pub struct Items {
    store: Arc<dyn Store>,
    queue: VecDeque<ItemTask>,
}

impl Iterator for Items {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.queue.pop_front()? {
                ItemTask::Leaf(link_href) => {
                    return Some(Item::open(self.store.clone(), &link_href));
                }
                ItemTask::Node(link_href) => {
                    match Catalog::open(self.store.clone(), &link_href) {
                        Ok(cat) => {
                            for child in cat.links(Some("child")).into_iter().rev() {
                                self.queue.push_front(ItemTask::Node(child));
                            }
                            for leaf in cat.links(Some("item")).into_iter().rev() {
                                self.queue.push_front(ItemTask::Leaf(leaf));
                            }
                        }
                        Err(e) => {
                            self.queue.clear();
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn root_catalog(temp: &TempDir) -> Catalog {
        let mut cat = Catalog::create(FileStore::shared(), "root", "root catalog");
        let loc = temp.path().join("catalog.json").display().to_string();
        cat.persist(Some(&loc)).unwrap();
        cat
    }

    fn sub(id: &str) -> Catalog {
        Catalog::create(FileStore::shared(), id, &format!("{id} catalog"))
    }

    #[test]
    fn test_add_catalog_requires_location() {
        let mut root = Catalog::create(FileStore::shared(), "root", "unsaved");
        let mut child = sub("a");
        let err = root.add_catalog(&mut child).unwrap_err();
        assert!(matches!(err, Error::NoLocation(_)));
    }

    #[test]
    fn test_add_catalog_links() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        let mut child = sub("a");
        child.add_link("license", "https://example.com/LICENSE", None, None);
        root.add_catalog(&mut child).unwrap();

        assert_eq!(root.links(Some("child")).len(), 1);
        let child_loc = temp.path().join("a/catalog.json").display().to_string();
        assert_eq!(child.location(), Some(child_loc.as_str()));

        let reopened = Catalog::open(FileStore::shared(), &child_loc).unwrap();
        let root_loc = temp.path().join("catalog.json").display().to_string();
        assert_eq!(reopened.links(Some("root")), vec![root_loc.clone()]);
        assert_eq!(reopened.links(Some("parent")), vec![root_loc]);
        // non-structural links survive the re-attach
        assert_eq!(reopened.links(Some("license")).len(), 1);
    }

    #[test]
    fn test_children_lazy_and_ordered() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        root.add_catalog(&mut sub("b")).unwrap();
        root.add_catalog(&mut sub("a")).unwrap();

        let ids: Vec<String> = root
            .children()
            .map(|c| c.unwrap().id().to_string())
            .collect();
        // insertion order, not sorted
        assert_eq!(ids, ["b", "a"]);

        // re-iteration is well-defined: links are stable in memory
        assert_eq!(root.children().count(), 2);
    }

    #[test]
    fn test_catalogs_traversal_order() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        let mut a = sub("a");
        root.add_catalog(&mut a).unwrap();
        root.add_catalog(&mut sub("b")).unwrap();
        let mut a1 = sub("a1");
        a.add_catalog(&mut a1).unwrap();
        a1.add_catalog(&mut sub("a1x")).unwrap();

        let ids: Vec<String> = root
            .catalogs()
            .map(|c| c.unwrap().id().to_string())
            .collect();
        // grandchildren (and their subtrees) come before their direct
        // parent among siblings
        assert_eq!(ids, ["a1", "a1x", "a", "b"]);
    }

    #[test]
    fn test_collections_stop_at_first() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);

        let mut plain = sub("plain");
        root.add_catalog(&mut plain).unwrap();

        let mut coll_doc = sub("coll");
        coll_doc
            .doc_mut()
            .data_mut()
            .insert("extent".to_string(), json!({"spatial": [0, 0, 1, 1]}));
        plain.add_catalog(&mut coll_doc).unwrap();

        // a collection nested below a collection is not discovered
        let mut nested = sub("nested");
        nested
            .doc_mut()
            .data_mut()
            .insert("extent".to_string(), json!({"spatial": [0, 0, 1, 1]}));
        coll_doc.add_catalog(&mut nested).unwrap();

        let ids: Vec<String> = root
            .collections()
            .map(|c| c.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, ["coll"]);
    }

    #[test]
    fn test_add_item_synthesizes_intermediates() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);

        let mut item = test_item();
        root.add_item(&mut item, "${collection}/${date}/${id}").unwrap();

        // exactly two intermediate sub-catalogs plus the item file
        assert!(temp.path().join("L8/catalog.json").exists());
        assert!(temp.path().join("L8/2020-06-11/catalog.json").exists());
        assert!(temp.path().join("L8/2020-06-11/X.json").exists());

        let item_loc = temp.path().join("L8/2020-06-11/X.json").display().to_string();
        assert_eq!(item.location(), Some(item_loc.as_str()));

        // the intermediate catalog descriptions name the template fields
        let l8 = Catalog::open(
            FileStore::shared(),
            &temp.path().join("L8/catalog.json").display().to_string(),
        )
        .unwrap();
        assert_eq!(l8.description(), "collection catalog");

        // item links point back up the tree
        let reopened = Item::open(FileStore::shared(), &item_loc).unwrap();
        let root_loc = temp.path().join("catalog.json").display().to_string();
        assert_eq!(reopened.links(Some("root")), vec![root_loc.clone()]);
        assert_eq!(reopened.links(Some("collection")), vec![root_loc]);
        assert_eq!(
            reopened.links(Some("parent")),
            vec![temp.path().join("L8/2020-06-11/catalog.json").display().to_string()]
        );
    }

    #[test]
    fn test_root_and_parent_navigation() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        let mut a = sub("a");
        root.add_catalog(&mut a).unwrap();
        let mut a1 = sub("a1");
        a.add_catalog(&mut a1).unwrap();

        let a1_loc = temp.path().join("a/a1/catalog.json").display().to_string();
        let leaf = Catalog::open(FileStore::shared(), &a1_loc).unwrap();
        assert_eq!(leaf.parent().unwrap().unwrap().id(), "a");
        assert_eq!(leaf.root().unwrap().unwrap().id(), "root");

        // a fresh root has neither link
        assert!(root.root().unwrap().is_none());
        assert!(root.parent().unwrap().is_none());
    }

    #[test]
    fn test_add_item_labels_mixed_segments() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);

        let mut item = test_item();
        root.add_item(&mut item, "sat-${collection}/${date}/${id}").unwrap();

        assert!(temp.path().join("sat-L8/2020-06-11/X.json").exists());
        let mid = Catalog::open(
            FileStore::shared(),
            &temp.path().join("sat-L8/catalog.json").display().to_string(),
        )
        .unwrap();
        // the description names the segment's placeholder, not the raw text
        assert_eq!(mid.description(), "collection catalog");
    }

    #[test]
    fn test_add_item_reinsert_is_safe() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);

        let mut item = test_item();
        root.add_item(&mut item, "${collection}/${date}/${id}").unwrap();
        let mut again = test_item();
        root.add_item(&mut again, "${collection}/${date}/${id}").unwrap();

        // no duplicate sub-catalogs, no duplicate links
        assert_eq!(root.links(Some("child")).len(), 1);
        let leaf = Catalog::open(
            FileStore::shared(),
            &temp
                .path()
                .join("L8/2020-06-11/catalog.json")
                .display()
                .to_string(),
        )
        .unwrap();
        assert_eq!(leaf.links(Some("item")).len(), 1);
        assert_eq!(root.items().count(), 1);
    }

    #[test]
    fn test_items_walks_subtree() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        let mut item = test_item();
        root.add_item(&mut item, "${collection}/${date}/${id}").unwrap();

        let ids: Vec<String> = root.items().map(|i| i.unwrap().id().to_string()).collect();
        assert_eq!(ids, ["X"]);
    }

    #[test]
    fn test_publish_rewrites_self_links_only() {
        let temp = TempDir::new().unwrap();
        let mut root = root_catalog(&temp);
        let mut item = test_item();
        root.add_item(&mut item, "${collection}/${date}/${id}").unwrap();

        root.publish("https://host/base").unwrap();

        let root_loc = temp.path().join("catalog.json").display().to_string();
        let reopened = Catalog::open(FileStore::shared(), &root_loc).unwrap();
        assert_eq!(
            reopened.links(Some("self")),
            vec!["https://host/base/catalog.json"]
        );

        let leaf_loc = temp
            .path()
            .join("L8/2020-06-11/catalog.json")
            .display()
            .to_string();
        let leaf = Catalog::open(FileStore::shared(), &leaf_loc).unwrap();
        assert_eq!(
            leaf.links(Some("self")),
            vec!["https://host/base/L8/2020-06-11/catalog.json"]
        );
        // root/parent links are untouched
        assert_eq!(leaf.links(Some("root")), vec![root_loc.clone()]);

        let item_loc = temp.path().join("L8/2020-06-11/X.json").display().to_string();
        let published = Item::open(FileStore::shared(), &item_loc).unwrap();
        assert_eq!(
            published.links(Some("self")),
            vec!["https://host/base/L8/2020-06-11/X.json"]
        );
        assert_eq!(published.links(Some("root")), vec![root_loc]);

        // publishing twice replaces, never stacks, the self link
        let mut again = Catalog::open(FileStore::shared(), &leaf_loc).unwrap();
        again.publish("https://other/endpoint").unwrap();
        let republished = Catalog::open(FileStore::shared(), &leaf_loc).unwrap();
        assert_eq!(republished.links(Some("self")).len(), 1);
    }

    fn test_item() -> Item {
        Item::from_value(
            FileStore::shared(),
            json!({
                "id": "X",
                "properties": {
                    "datetime": "2020-06-11T00:00:00.000Z",
                    "collection": "L8"
                },
                "links": [],
                "assets": {}
            }),
        )
        .unwrap()
    }
}
