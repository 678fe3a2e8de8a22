use std::collections::HashMap;

use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use crate::cards::Card;

use super::{PackConfig, PackError};

/// Rank given to rarities missing from the rarity order. Unknown rarities
/// sort first, before commons.
pub const UNKNOWN_TIER_RANK: usize = 0;

/// A list of items with relative weights, sampled in proportion to weight.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    items: Vec<(T, f64)>,
    index: WeightedIndex<f64>,
}

impl<T> WeightedTable<T> {
    pub fn new(items: Vec<(T, f64)>) -> Result<Self, String> {
        if let Some((_, w)) = items.iter().find(|(_, w)| !w.is_finite()) {
            return Err(format!("non-finite weight {w}"));
        }
        let index = WeightedIndex::new(items.iter().map(|(_, w)| *w)).map_err(|e| e.to_string())?;
        Ok(Self { items, index })
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.items[self.index.sample(rng)].0
    }

    pub fn entries(&self) -> &[(T, f64)] {
        &self.items
    }
}

#[derive(Debug, Clone)]
pub struct RarityModel {
    set_weights: WeightedTable<String>,
    tables: HashMap<String, WeightedTable<String>>,
    order: HashMap<String, usize>,
}

impl RarityModel {
    /// Build and validate a model. Every weighted set must have a rarity
    /// table. Ranks start at 1 so that they sort after unknown rarities.
    pub fn new(
        set_weights: Vec<(String, f64)>,
        tables: Vec<(String, Vec<(String, f64)>)>,
        order: Vec<String>,
    ) -> Result<Self, PackError> {
        let set_weights = WeightedTable::new(set_weights).map_err(|reason| {
            PackError::InvalidWeights {
                subset: None,
                reason,
            }
        })?;

        let mut built = HashMap::new();
        for (set, table) in tables {
            let table = WeightedTable::new(table).map_err(|reason| PackError::InvalidWeights {
                subset: Some(set.clone()),
                reason,
            })?;
            built.insert(set, table);
        }

        if let Some((set, _)) = set_weights
            .entries()
            .iter()
            .find(|(set, _)| !built.contains_key(set))
        {
            return Err(PackError::UnknownSubset(set.clone()));
        }

        let order = order
            .into_iter()
            .enumerate()
            .map(|(i, rarity)| (rarity, i + 1))
            .collect();

        Ok(Self {
            set_weights,
            tables: built,
            order,
        })
    }

    pub fn from_config(config: &PackConfig) -> Result<Self, PackError> {
        Self::new(
            config.set_weights.clone(),
            config.rarity_tables.clone(),
            config.rarity_order.clone(),
        )
    }

    pub fn choose_subset<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.set_weights.choose(rng)
    }

    pub fn table_for(&self, set: &str) -> Result<&WeightedTable<String>, PackError> {
        self.tables
            .get(set)
            .ok_or_else(|| PackError::UnknownSubset(set.to_string()))
    }

    /// Rank of a rarity, lower being more common.
    pub fn order(&self, rarity: &str) -> usize {
        self.order.get(rarity).copied().unwrap_or(UNKNOWN_TIER_RANK)
    }

    /// Stable sort from most common to rarest. Cards of equal rarity keep the
    /// order they were drawn in.
    pub fn sort_by_rarity(&self, mut cards: Vec<Card>) -> Vec<Card> {
        cards.sort_by_key(|card| self.order(card.rarity()));
        cards
    }
}
