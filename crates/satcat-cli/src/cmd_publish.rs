use anyhow::{Context, Result};
use satcat::Catalog;
use satcat_remote::AnyStore;

pub fn run(catalog: &str, endpoint: &str) -> Result<()> {
    let mut root = Catalog::open(AnyStore::shared(), catalog)
        .with_context(|| format!("opening {catalog}"))?;
    root.publish(endpoint)
        .with_context(|| format!("publishing {catalog} to {endpoint}"))?;
    Ok(())
}
