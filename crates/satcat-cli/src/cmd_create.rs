use anyhow::{Context, Result};
use satcat::{Catalog, Linked};
use satcat_remote::AnyStore;

pub fn run(id: &str, description: &str, filename: &str) -> Result<()> {
    let mut catalog = Catalog::create(AnyStore::shared(), id, description);
    catalog
        .persist(Some(filename))
        .with_context(|| format!("writing {filename}"))?;
    println!("{filename}");
    Ok(())
}
