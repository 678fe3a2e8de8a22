use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

use crate::cards::{Card, Catalog};

use super::{rarity::RarityModel, PackConfig, PackError};

pub type Pack = Vec<Card>;

/// Cards which may never be pulled at a particular rarity.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRule {
    rarity: String,
    cards: HashSet<String>,
}

impl ExclusionRule {
    pub fn new<I: IntoIterator<Item = String>>(rarity: String, cards: I) -> Self {
        Self {
            rarity,
            cards: cards.into_iter().collect(),
        }
    }

    fn excludes(&self, rarity: &str, id: &str) -> bool {
        rarity == self.rarity && self.cards.contains(id)
    }
}

pub struct PackGenerator {
    catalog: Catalog,
    rarities: RarityModel,
    exclusion: ExclusionRule,
    cards_per_pack: usize,
}

impl PackGenerator {
    pub fn new(
        catalog: Catalog,
        rarities: RarityModel,
        exclusion: ExclusionRule,
        cards_per_pack: usize,
    ) -> Self {
        Self {
            catalog,
            rarities,
            exclusion,
            cards_per_pack,
        }
    }

    pub fn from_config(catalog: Catalog, config: &PackConfig) -> Result<Self, PackError> {
        Ok(Self::new(
            catalog,
            RarityModel::from_config(config)?,
            ExclusionRule::new(
                config.excluded_rarity.clone(),
                config.excluded_cards.iter().cloned(),
            ),
            config.cards_per_pack,
        ))
    }

    pub fn cards_per_pack(&self) -> usize {
        self.cards_per_pack
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate a pack, sorted from most common to rarest. Each slot is drawn
    /// independently. Slots which land on an empty pool are left out, so the
    /// pack may be short.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Pack, PackError> {
        let mut pack = Vec::with_capacity(self.cards_per_pack);

        for _ in 0..self.cards_per_pack {
            if let Some(card) = self.draw(rng)? {
                pack.push(card.clone());
            }
        }

        Ok(self.rarities.sort_by_rarity(pack))
    }

    /// Draw a single card: choose a set, then a rarity within that set, then a
    /// card of that rarity.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<&Card>, PackError> {
        let set = self.rarities.choose_subset(rng);
        let rarity = self.rarities.table_for(set)?.choose(rng);

        let pool = self.catalog.rarity_pool(set, rarity);
        let Some(mut id) = pool.choose(rng) else {
            tracing::trace!("No {rarity} cards in {set}, skipping slot.");
            return Ok(None);
        };

        if self.exclusion.excludes(rarity, id) {
            // Redraw from the eligible cards only. Equivalent to rerolling
            // until an eligible card comes up, but terminates.
            let eligible: Vec<&String> = pool
                .iter()
                .filter(|id| !self.exclusion.excludes(rarity, id))
                .collect();
            let Some(redrawn) = eligible.choose(rng) else {
                tracing::warn!("Every {rarity} card in {set} is excluded, skipping slot.");
                return Ok(None);
            };
            id = *redrawn;
        }

        self.catalog
            .card_info(id)
            .map(Some)
            .ok_or_else(|| PackError::MissingCard(id.clone()))
    }
}
