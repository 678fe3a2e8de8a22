use std::path::Path;

use crate::cards::{pokemontcg, Catalog};

pub const CACHE_FILE: &str = "cards_cache.json";

/// Load the cached card database. A missing file yields an empty catalog.
pub async fn load(file: &Path) -> Result<Catalog, String> {
    if !file.exists() {
        tracing::debug!("No card cache at {}, starting empty.", file.display());
        return Ok(Catalog::new());
    }

    let raw = tokio::fs::read(file).await.map_err(|e| e.to_string())?;
    serde_json::from_slice(&raw).map_err(|e| format!("Malformed card cache {}: {e}", file.display()))
}

pub async fn save(file: &Path, catalog: &Catalog) -> Result<(), String> {
    let raw = serde_json::to_vec_pretty(catalog).map_err(|e| e.to_string())?;
    tokio::fs::write(file, raw)
        .await
        .map_err(|e| e.to_string())
}

/// Load the catalog from the cache in the data directory, fetching any of the
/// requested sets which aren't cached yet, then fill in missing card images.
pub async fn load_catalog(
    data: &Path,
    sets: &[String],
    api_key: Option<&str>,
) -> Result<Catalog, String> {
    tokio::fs::create_dir_all(data)
        .await
        .map_err(|e| e.to_string())?;
    let file = data.join(CACHE_FILE);
    let mut catalog = load(&file).await?;

    let client = pokemontcg::client()?;
    for set_id in sets {
        if catalog.has_set(set_id) {
            tracing::debug!("Set {set_id} found in cache.");
            continue;
        }

        let cards = pokemontcg::fetch_set(&client, set_id, api_key).await?;
        catalog.add_set(set_id, cards);
        save(&file, &catalog).await?;
        tracing::debug!("Saved set {set_id} to {}.", file.display());
    }

    let downloaded = pokemontcg::download_images(&client, catalog.cards(), data).await;
    if downloaded > 0 {
        tracing::info!("Downloaded {downloaded} card images.");
    }

    Ok(catalog)
}
