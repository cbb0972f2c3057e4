//! Trading strategies
//!
//! Every strategy implements the host callback contract: `init` once at
//! setup (fatal on bad configuration), then `on_bar` once per evaluation
//! cycle. Strategies are explicit instances owned by the caller — all state
//! lives in the struct and is mutated only inside a cycle, never in
//! process-wide globals.

pub mod grid;
pub mod ma_trend;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::adapters::Host;
use crate::config::Config;
use crate::error::EngineResult;
use crate::types::TradeRecord;

// =============================================================================
// Strategy Trait
// =============================================================================

/// The contract the host drives a strategy through
pub trait Strategy: Send + std::fmt::Debug {
    /// Strategy identifier (must match config's strategy_name)
    fn name(&self) -> &'static str;

    /// One-time setup before the first cycle. Configuration problems are
    /// fatal here; a strategy that returns an error must not be driven.
    fn init(&mut self, host: &mut dyn Host) -> EngineResult<()>;

    /// One evaluation cycle. All adapter reads happen fresh inside the
    /// call; state mutation follows order acknowledgment, never precedes it.
    fn on_bar(&mut self, host: &mut dyn Host) -> EngineResult<CycleReport>;
}

/// Why a cycle produced no evaluation at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Inside the cooldown window since the last evaluated cycle
    Cooldown,
    /// Neither a live tick nor a bar close was available
    NoPrice,
    /// Not enough history for the indicators in play
    InsufficientHistory,
    /// The account snapshot could not be fetched this cycle
    AccountUnavailable,
}

/// Outcome of one `on_bar` invocation
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Acknowledged trades this cycle, in execution order
    pub trades: Vec<TradeRecord>,
    /// Set when the cycle was skipped whole
    pub skipped: Option<SkipReason>,
    /// A risk trigger forced liquidation this cycle
    pub forced_liquidation: bool,
    /// Cumulative realized profit after this cycle
    pub realized_profit: f64,
    /// Equity (total assets + realized profit) observed this cycle
    pub equity: f64,
    /// Internal vs. host-reported position when they diverge
    pub position_drift: Option<(u64, u64)>,
}

impl CycleReport {
    pub fn skipped(reason: SkipReason) -> Self {
        CycleReport {
            skipped: Some(reason),
            ..Default::default()
        }
    }
}

// =============================================================================
// Strategy Registry
// =============================================================================

/// Factory function type for creating strategies from config
pub type StrategyFactory = fn(&Config) -> Result<Box<dyn Strategy>>;

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, StrategyFactory>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, StrategyFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("grid", grid::create as StrategyFactory);
        map.insert("ma_trend", ma_trend::create as StrategyFactory);
        RwLock::new(map)
    })
}

/// Create a strategy from configuration
pub fn create_strategy(config: &Config) -> Result<Box<dyn Strategy>> {
    let registry = get_registry().read().unwrap();

    let factory = registry.get(config.strategy_name.as_str()).ok_or_else(|| {
        let available: Vec<_> = registry.keys().copied().collect();
        anyhow::anyhow!(
            "Unknown strategy: '{}'. Available: {}",
            config.strategy_name,
            available.join(", ")
        )
    })?;

    factory(config)
}

/// Get list of available strategy names
pub fn available_strategies() -> Vec<&'static str> {
    get_registry().read().unwrap().keys().copied().collect()
}

/// Register a new strategy (for plugins or testing)
pub fn register_strategy(name: &'static str, factory: StrategyFactory) {
    get_registry().write().unwrap().insert(name, factory);
}
