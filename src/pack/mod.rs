use std::fmt::Display;

pub mod generator;
pub mod handlers;
pub mod rarity;
pub mod session;

#[derive(Debug, Clone, PartialEq)]
pub enum PackError {
    /// A set was drawn or requested which has no rarity table.
    UnknownSubset(String),

    /// A weight table was empty, negative, non-finite or summed to zero.
    InvalidWeights { subset: Option<String>, reason: String },

    /// A card ID present in a rarity pool has no card record.
    MissingCard(String),
}

impl Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::UnknownSubset(set) => write!(f, "No rarity table for set: {set}"),
            PackError::InvalidWeights {
                subset: Some(set),
                reason,
            } => write!(f, "Invalid rarity weights for set {set}: {reason}"),
            PackError::InvalidWeights {
                subset: None,
                reason,
            } => write!(f, "Invalid set weights: {reason}"),
            PackError::MissingCard(id) => {
                write!(f, "Card {id} is in a rarity pool but not in the catalog")
            }
        }
    }
}

impl std::error::Error for PackError {}

/// Pack generation settings. The defaults describe Crown Zenith booster packs.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub cards_per_pack: usize,

    /// Relative likelihood of each card coming from each set. Order is kept
    /// so that seeded packs are reproducible.
    pub set_weights: Vec<(String, f64)>,

    /// Per set, relative likelihood of each rarity.
    pub rarity_tables: Vec<(String, Vec<(String, f64)>)>,

    /// Rarities from most common to rarest.
    pub rarity_order: Vec<String>,

    /// Rarity whose pools are filtered by `excluded_cards`.
    pub excluded_rarity: String,

    /// Card IDs never pulled at `excluded_rarity`.
    pub excluded_cards: Vec<String>,
}

fn table(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
    entries.iter().map(|(k, w)| (k.to_string(), *w)).collect()
}

impl Default for PackConfig {
    fn default() -> Self {
        PackConfig {
            cards_per_pack: 5,
            set_weights: table(&[("swsh12pt5", 0.933), ("swsh12pt5gg", 0.067)]),
            rarity_tables: vec![
                (
                    "swsh12pt5".to_string(),
                    table(&[
                        ("Common", 0.622),
                        ("Uncommon", 0.100),
                        ("Rare", 0.033),
                        ("Rare Holo", 0.092),
                        ("Radiant Rare", 0.020),
                        ("Rare Holo VSTAR", 0.05),
                        ("Rare Holo V", 0.035),
                        ("Rare Holo VMAX", 0.025),
                        ("Rare Ultra", 0.015),
                        ("Rare Secret", 0.008),
                    ]),
                ),
                (
                    "swsh12pt5gg".to_string(),
                    table(&[
                        ("Trainer Gallery Rare Holo", 0.405),
                        ("Rare Holo V", 0.074),
                        ("Rare Holo VMAX", 0.305),
                        ("Rare Ultra", 0.155),
                        ("Rare Holo VSTAR", 0.036),
                        ("Rare Secret", 0.025),
                    ]),
                ),
            ],
            rarity_order: [
                "Common",
                "Uncommon",
                "Rare",
                "Rare Holo",
                "Radiant Rare",
                "Trainer Gallery Rare Holo",
                "Rare Holo V",
                "Rare Holo VMAX",
                "Rare Holo VSTAR",
                "Rare Ultra",
                "Rare Secret",
            ]
            .map(String::from)
            .to_vec(),
            excluded_rarity: "Rare Ultra".to_string(),
            excluded_cards: (152..=159).map(|n| format!("swsh12pt5-{n}")).collect(),
        }
    }
}

impl PackConfig {
    pub fn sets(&self) -> Vec<String> {
        self.set_weights.iter().map(|(set, _)| set.clone()).collect()
    }
}
