//! Scoring algorithms
//!
//! - `iforest` - batch isolation forest, the dataset-level outlier model
//! - `stats` - per-column mean/std/median and window trend classification

pub mod iforest;
pub mod stats;

pub use iforest::IsolationForest;
pub use stats::classify_trend;
