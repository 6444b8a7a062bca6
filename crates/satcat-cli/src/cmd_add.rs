use anyhow::{Context, Result};
use satcat::{Catalog, Linked};
use satcat_remote::AnyStore;

pub fn run(root: &str, id: &str, description: &str) -> Result<()> {
    let store = AnyStore::shared();
    let mut parent = Catalog::open(store.clone(), root).with_context(|| format!("opening {root}"))?;
    let mut child = Catalog::create(store, id, description);
    parent
        .add_catalog(&mut child)
        .with_context(|| format!("adding {id} beneath {root}"))?;
    if let Some(location) = child.location() {
        println!("{location}");
    }
    Ok(())
}
