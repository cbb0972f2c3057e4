//! Grid Trading Strategy Engine
//!
//! A canonical grid-trading engine plus a single-MA trend strategy, driven
//! through host-adapter traits the way an event-driven trading platform
//! invokes a script: `init` once, then one `on_bar` evaluation per cycle.
//! The host's responsibilities (market data, account state, order
//! execution) are trait seams; [`adapters::SimHost`] replays candle series
//! for paper runs and tests.
//!
//! # Example
//! ```no_run
//! use grid_strategies::adapters::SimHost;
//! use grid_strategies::strategies::create_strategy;
//! use grid_strategies::{Config, Symbol};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/grid_600900.json")?;
//!     let candles = grid_strategies::data::load_csv("data/600900_1d.csv")?;
//!     let mut host = SimHost::new(config.symbol(), candles, 100_000.0);
//!
//!     let mut strategy = create_strategy(&config)?;
//!     strategy.init(&mut host)?;
//!     while host.advance() {
//!         let report = strategy.on_bar(&mut host)?;
//!         println!("trades this cycle: {}", report.trades.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod indicators;
pub mod report;
pub mod risk;
pub mod strategies;
pub mod trend;
pub mod types;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use strategies::{CycleReport, Strategy};
pub use types::*;
