use std::path::PathBuf;

use clap::Parser;
use foodgram_sdk::{
    actions::{import_catalogue, CatalogueKind},
    postgres::PgStore,
    Config,
};
use tracing_subscriber::EnvFilter;

/// Applies pending migrations, then bulk-loads ingredient and tag catalogues from JSON files.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON array of `{ "name", "measurement_unit" }` objects
    #[arg(long)]
    ingredients: Option<PathBuf>,

    /// JSON array of `{ "name", "color", "slug" }` objects
    #[arg(long)]
    tags: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    let store = PgStore::connect(&config).await?;
    store.migrate().await?;

    for (kind, path) in [
        (CatalogueKind::Ingredients, args.ingredients),
        (CatalogueKind::Tags, args.tags),
    ] {
        let Some(path) = path else { continue };

        let json = tokio::fs::read_to_string(&path).await?;
        let count = import_catalogue(kind, &json, &store).await?;
        log::info!("Loaded {count} entries from {}", path.display());
    }

    Ok(())
}
