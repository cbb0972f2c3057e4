//! Per-level position state
//!
//! The store is the single owner of grid inventory: which levels hold an
//! open lot, how many shares, and at what cost basis. Aggregate position and
//! realized profit are derived here and nowhere else, so reconciliation
//! against the host account has one source of truth to compare.

use crate::error::{EngineError, EngineResult};

/// One grid level and the lot (if any) bound to it.
///
/// Invariant: `shares > 0` exactly when `cost_basis` is `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSlot {
    pub price: f64,
    pub shares: u64,
    pub cost_basis: Option<f64>,
}

impl LevelSlot {
    pub fn empty(price: f64) -> Self {
        LevelSlot {
            price,
            shares: 0,
            cost_basis: None,
        }
    }

    pub fn occupied(&self) -> bool {
        self.shares > 0
    }
}

/// Ordered grid inventory plus running realized profit
#[derive(Debug, Clone)]
pub struct GridStore {
    /// Strictly ascending by price
    slots: Vec<LevelSlot>,
    realized_profit: f64,
    tick: f64,
}

impl GridStore {
    /// Build a store from strictly-increasing level prices
    pub fn from_levels(levels: &[f64], tick: f64) -> EngineResult<Self> {
        if levels.len() < 2 {
            return Err(EngineError::InvalidConfig(
                "a grid needs at least two levels".into(),
            ));
        }
        if !levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(EngineError::InvalidConfig(
                "grid levels must be strictly increasing".into(),
            ));
        }
        Ok(GridStore {
            slots: levels.iter().map(|&p| LevelSlot::empty(p)).collect(),
            realized_profit: 0.0,
            tick,
        })
    }

    pub fn slots(&self) -> &[LevelSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn lower_bound(&self) -> f64 {
        self.slots[0].price
    }

    pub fn upper_bound(&self) -> f64 {
        self.slots[self.slots.len() - 1].price
    }

    /// Binary-search a level by price, tolerant to tick rounding noise
    pub fn find(&self, price: f64) -> Option<usize> {
        let idx = self
            .slots
            .partition_point(|slot| slot.price < price - self.tick / 2.0);
        match self.slots.get(idx) {
            Some(slot) if (slot.price - price).abs() < self.tick / 2.0 => Some(idx),
            _ => None,
        }
    }

    /// Sum of shares across all levels — the engine's view of its position
    pub fn total_shares(&self) -> u64 {
        self.slots.iter().map(|s| s.shares).sum()
    }

    /// Market value of the grid inventory at `price`
    pub fn position_value(&self, price: f64) -> f64 {
        self.total_shares() as f64 * price
    }

    pub fn realized_profit(&self) -> f64 {
        self.realized_profit
    }

    /// Indices of levels holding an open lot, ascending by price
    pub fn occupied_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.occupied())
            .map(|(i, _)| i)
            .collect()
    }

    /// Bind a filled buy to a level. Must only be called after the order was
    /// acknowledged; the level must be empty.
    pub fn open_level(&mut self, idx: usize, shares: u64, cost_basis: f64) {
        let slot = &mut self.slots[idx];
        debug_assert!(!slot.occupied(), "buy bound to an occupied level");
        slot.shares = shares;
        slot.cost_basis = Some(cost_basis);
    }

    /// Clear a level after its full lot was sold and record the net profit.
    /// Returns the shares that were held.
    pub fn close_level(&mut self, idx: usize, net_profit: f64) -> u64 {
        let slot = &mut self.slots[idx];
        debug_assert!(slot.occupied(), "sell from an empty level");
        let shares = slot.shares;
        slot.shares = 0;
        slot.cost_basis = None;
        self.realized_profit += net_profit;
        shares
    }

    /// Replace the trigger set with `new_levels`, carrying open lots over.
    ///
    /// An occupied old level merges into a new level when their prices
    /// coincide at tick precision; otherwise the old slot is inserted into
    /// the new ordered set with its binding intact. Regeneration therefore
    /// changes future trigger points without ever dropping inventory or a
    /// lot's exit level.
    pub fn regenerate(&mut self, new_levels: &[f64], tick: f64) -> EngineResult<()> {
        let mut rebuilt = GridStore::from_levels(new_levels, tick)?;

        for old in self.slots.iter().filter(|s| s.occupied()) {
            match rebuilt.find(old.price) {
                Some(idx) => {
                    let target = &mut rebuilt.slots[idx];
                    debug_assert!(!target.occupied());
                    target.shares = old.shares;
                    target.cost_basis = old.cost_basis;
                }
                None => {
                    let at = rebuilt
                        .slots
                        .partition_point(|slot| slot.price < old.price);
                    rebuilt.slots.insert(at, old.clone());
                }
            }
        }

        rebuilt.realized_profit = self.realized_profit;
        *self = rebuilt;
        Ok(())
    }

    /// Verify the structural invariants. Used by tests and debug assertions.
    pub fn invariants_hold(&self) -> bool {
        let ordered = self.slots.windows(2).all(|w| w[0].price < w[1].price);
        let consistent = self
            .slots
            .iter()
            .all(|s| (s.shares > 0) == s.cost_basis.is_some());
        ordered && consistent
    }
}
