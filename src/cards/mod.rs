use std::collections::HashMap;

pub mod cache;
pub mod pokemontcg;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Card {
    id: String,
    name: String,
    rarity: String,

    /// Local image locator, relative to the data directory.
    image: String,

    /// Remote source of the image. Only needed to fill the image cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
}

impl Card {
    pub fn new(id: String, name: String, rarity: String, image_url: Option<String>) -> Self {
        let image = Self::image_locator(&id);
        Self {
            id,
            name,
            rarity,
            image,
            image_url,
        }
    }

    /// Card IDs are used as image file names, so only set ID and number
    /// characters are allowed: ASCII letters, digits and '-'.
    pub fn valid_id(id: &str) -> bool {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }

    /// Where the image for a card with this ID lives in the image cache.
    pub fn image_locator(id: &str) -> String {
        format!("images/{id}.png")
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rarity(&self) -> &str {
        &self.rarity
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[cfg(test)]
    pub fn sample(id: &str, rarity: &str) -> Self {
        Self::new(
            id.to_string(),
            format!("Card {id}"),
            rarity.to_string(),
            Some(format!("https://example.com/{id}.png")),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CardSet {
    /// Map from rarity tier to the IDs of the set's cards of that tier.
    rarity_pools: HashMap<String, Vec<String>>,
}

/// All known cards, plus the rarity pools of each set they were loaded from.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    #[serde(rename = "all_cards")]
    cards: HashMap<String, Card>,
    sets: HashMap<String, CardSet>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set to the catalog, building its rarity pools. Adding a set
    /// that is already present replaces its pools.
    pub fn add_set(&mut self, set_id: &str, cards: Vec<Card>) {
        let mut set = CardSet::default();
        for card in cards {
            let pool = set.rarity_pools.entry(card.rarity.clone()).or_default();
            if !pool.contains(&card.id) {
                pool.push(card.id.clone());
            }
            self.cards.insert(card.id.clone(), card);
        }
        self.sets.insert(set_id.to_string(), set);
    }

    pub fn card_info(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    /// IDs of the cards of a rarity in a set. Unknown sets and rarities are
    /// empty.
    pub fn rarity_pool(&self, set_id: &str, rarity: &str) -> &[String] {
        self.sets
            .get(set_id)
            .and_then(|set| set.rarity_pools.get(rarity))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_set(&self, set_id: &str) -> bool {
        self.sets.contains_key(set_id)
    }

    pub fn sets(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn size(&self) -> usize {
        self.cards.len()
    }
}

#[cfg(test)]
mod test {
    use super::{Card, Catalog};

    #[test]
    fn test_add_set() {
        let mut catalog = Catalog::new();
        catalog.add_set(
            "base",
            vec![
                Card::sample("b-1", "Common"),
                Card::sample("b-2", "Common"),
                Card::sample("b-3", "Rare"),
            ],
        );

        assert!(catalog.has_set("base"));
        assert_eq!(catalog.size(), 3);
        assert_eq!(catalog.rarity_pool("base", "Common"), &["b-1", "b-2"]);
        assert_eq!(catalog.rarity_pool("base", "Rare"), &["b-3"]);
        assert_eq!(catalog.card_info("b-3").unwrap().rarity(), "Rare");
    }

    #[test]
    fn test_missing_lookups() {
        let mut catalog = Catalog::new();
        catalog.add_set("base", vec![Card::sample("b-1", "Common")]);

        assert!(catalog.card_info("nope").is_none());
        assert!(catalog.rarity_pool("base", "Rare Secret").is_empty());
        assert!(catalog.rarity_pool("gallery", "Common").is_empty());
    }

    #[test]
    fn test_duplicate_ids_pooled_once() {
        let mut catalog = Catalog::new();
        catalog.add_set(
            "base",
            vec![Card::sample("b-1", "Common"), Card::sample("b-1", "Common")],
        );
        assert_eq!(catalog.rarity_pool("base", "Common").len(), 1);
    }

    #[test]
    fn test_readd_replaces_pools() {
        let mut catalog = Catalog::new();
        catalog.add_set("base", vec![Card::sample("b-1", "Common")]);
        catalog.add_set("base", vec![Card::sample("b-2", "Rare")]);

        assert!(catalog.rarity_pool("base", "Common").is_empty());
        assert_eq!(catalog.rarity_pool("base", "Rare"), &["b-2"]);
    }

    #[test]
    fn test_valid_id() {
        assert!(Card::valid_id("swsh12pt5-152"));
        assert!(Card::valid_id("swsh12pt5gg-GG01"));
        assert!(!Card::valid_id(""));
        assert!(!Card::valid_id("../../etc/passwd"));
        assert!(!Card::valid_id("swsh12pt5/1"));
        assert!(!Card::valid_id("swsh12pt5-1.png"));
    }

    #[test]
    fn test_image_locator() {
        let card = Card::sample("swsh12pt5-1", "Common");
        assert_eq!(card.image(), "images/swsh12pt5-1.png");
        assert_eq!(card.image_url(), Some("https://example.com/swsh12pt5-1.png"));
    }
}
