mod cmd_add;
mod cmd_create;
mod cmd_publish;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "satcat")]
#[command(about = "Create, grow, and publish hierarchical JSON catalogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter directive (e.g. "debug", "satcat=trace")
    #[arg(long, global = true, default_value = "warn")]
    log: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new root catalog
    Create {
        /// Catalog id
        id: String,

        /// Catalog description
        description: String,

        /// Where to write the root document
        #[arg(long, default_value = "catalog.json")]
        filename: String,
    },
    /// Add a sub-catalog beneath an existing catalog
    Add {
        /// Location of the parent catalog document
        root: String,

        /// New sub-catalog id
        id: String,

        /// New sub-catalog description
        description: String,
    },
    /// Rewrite self links across a catalog tree for an endpoint
    Publish {
        /// Location of the catalog document to publish
        catalog: String,

        /// Endpoint URL the tree will be served from
        endpoint: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log.parse()?))
        .init();

    match cli.command {
        Commands::Create {
            id,
            description,
            filename,
        } => cmd_create::run(&id, &description, &filename),
        Commands::Add {
            root,
            id,
            description,
        } => cmd_add::run(&root, &id, &description),
        Commands::Publish { catalog, endpoint } => cmd_publish::run(&catalog, &endpoint),
    }
}
