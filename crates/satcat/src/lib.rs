//! Static JSON catalogs of self-describing documents connected by typed,
//! directional links.
//!
//! A catalog tree is a set of individually addressable JSON documents:
//! [`Catalog`] nodes organize [`Collection`]s and [`Item`]s via
//! `child`/`item` links whose hrefs are relative to each document's own
//! location. The library keeps those links coherent while trees are grown
//! in place ([`Catalog::add_catalog`], [`Catalog::add_item`]) and when a
//! tree is published to a new endpoint ([`Catalog::publish`]).
//!
//! Storage is behind the [`Store`] trait; the filesystem backend ships
//! here, HTTP and signed object storage live in `satcat-remote`.
//!
//! # Example: grow a tree and publish it
//!
//! ```
//! use satcat::{Catalog, FileStore, Item, Linked};
//! use serde_json::json;
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let root_loc = temp.path().join("catalog.json").display().to_string();
//!
//! let mut root = Catalog::create(FileStore::shared(), "demo", "A demo catalog");
//! root.persist(Some(&root_loc)).unwrap();
//!
//! let mut item = Item::from_value(
//!     FileStore::shared(),
//!     json!({
//!         "id": "X",
//!         "properties": {"datetime": "2020-06-11T00:00:00.000Z", "collection": "L8"},
//!     }),
//! )
//! .unwrap();
//! root.add_item(&mut item, "${collection}/${date}/${id}").unwrap();
//! root.publish("https://host/base").unwrap();
//!
//! assert_eq!(item.id(), "X");
//! assert_eq!(root.items().count(), 1);
//! ```

mod catalog;
mod collection;
mod document;
mod error;
pub mod href;
mod item;
mod itemset;
mod link;
mod store;
pub mod template;

pub use catalog::{Catalog, Catalogs, Children, Collections, Items, STAC_VERSION};
pub use collection::Collection;
pub use document::{Document, Linked};
pub use error::{Error, Result};
pub use item::Item;
pub use itemset::ItemSet;
pub use link::{Link, STRUCTURAL_RELS};
pub use store::{FileStore, Store};
pub use template::{FieldResolver, expand, placeholders};
