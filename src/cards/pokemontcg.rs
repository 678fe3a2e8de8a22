use std::path::Path;

use bytes::Buf;
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::cards::Card;

const API_ROOT: &str = "https://api.pokemontcg.io/v2";
const PAGE_SIZE: usize = 250;
const CONCURRENT_DOWNLOADS: usize = 10;
const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub fn client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| e.to_string())
}

async fn get_bytes(
    client: &reqwest::Client,
    uri: &str,
    api_key: Option<&str>,
) -> Result<bytes::Bytes, String> {
    let mut request = client.get(uri);
    if let Some(key) = api_key {
        request = request.header("X-Api-Key", key);
    }

    request
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|e| e.to_string())?
        .bytes()
        .await
        .map_err(|e| e.to_string())
}

fn decode_json<T: DeserializeOwned>(bytes: bytes::Bytes) -> Result<T, String> {
    serde_json::de::from_reader(bytes.reader()).map_err(|e| e.to_string())
}

#[derive(serde::Deserialize, Debug)]
struct ApiCardImages {
    small: Option<String>,
    large: Option<String>,
}

impl ApiCardImages {
    fn choose(self) -> Option<String> {
        self.large.or(self.small)
    }
}

#[derive(serde::Deserialize, Debug)]
struct ApiCard {
    /// Card ID, set ID and number, e.g. swsh12pt5-152.
    id: String,

    name: String,

    /// Rarity tier name. Absent for some promotional cards.
    rarity: Option<String>,

    images: Option<ApiCardImages>,
}

impl ApiCard {
    fn to_card(self) -> Option<Card> {
        if !Card::valid_id(&self.id) {
            tracing::warn!("Skipping card with invalid ID: {:?}", self.id);
            return None;
        }

        Some(Card::new(
            self.id,
            self.name,
            self.rarity.unwrap_or_else(|| "Common".to_string()),
            self.images.and_then(ApiCardImages::choose),
        ))
    }
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiPage {
    data: Vec<ApiCard>,
    total_count: Option<usize>,
}

/// Fetch the metadata for every card in a set, following pagination.
pub async fn fetch_set(
    client: &reqwest::Client,
    set_id: &str,
    api_key: Option<&str>,
) -> Result<Vec<Card>, String> {
    tracing::debug!("Fetching card metadata for set {set_id}.");

    let mut cards = Vec::new();
    let mut seen = 0;
    let mut page = 1;
    loop {
        let uri = format!("{API_ROOT}/cards?q=set.id:{set_id}&pageSize={PAGE_SIZE}&page={page}");
        let resp: ApiPage = decode_json(get_bytes(client, &uri, api_key).await?)?;
        let fetched = resp.data.len();
        seen += fetched;
        cards.extend(resp.data.into_iter().filter_map(ApiCard::to_card));

        let total = resp.total_count.unwrap_or(seen);
        if fetched == 0 || seen >= total {
            break;
        }
        page += 1;
    }

    tracing::debug!("Fetched {} cards for set {set_id}.", cards.len());
    Ok(cards)
}

async fn download_image(
    client: &reqwest::Client,
    uri: &str,
    path: &Path,
) -> Result<(), String> {
    let raw = get_bytes(client, uri, None).await?;
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| e.to_string())
}

/// Download images for all cards whose image isn't in the cache yet. Failed
/// downloads are logged and skipped. Returns the number of images fetched.
pub async fn download_images<'a, I>(client: &reqwest::Client, cards: I, data: &Path) -> usize
where
    I: IntoIterator<Item = &'a Card>,
{
    let missing: Vec<(&str, &str, std::path::PathBuf)> = cards
        .into_iter()
        .filter_map(|card| {
            if !Card::valid_id(card.id()) {
                tracing::warn!("Not downloading image for invalid card ID: {:?}", card.id());
                return None;
            }
            let path = data.join(Card::image_locator(card.id()));
            if path.exists() {
                None
            } else {
                Some((card.id(), card.image_url()?, path))
            }
        })
        .collect();

    if missing.is_empty() {
        return 0;
    }

    if let Err(e) = tokio::fs::create_dir_all(data.join("images")).await {
        tracing::warn!("Failed to create image cache directory: {e}");
        return 0;
    }

    tracing::info!("Downloading {} card images.", missing.len());
    stream::iter(missing)
        .map(|(id, uri, path)| async move {
            match download_image(client, uri, &path).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Failed to download image for {id}: {e}");
                    false
                }
            }
        })
        .buffer_unordered(CONCURRENT_DOWNLOADS)
        .filter(|ok| std::future::ready(*ok))
        .count()
        .await
}
