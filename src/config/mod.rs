//! Configuration module
//!
//! Sampling geometry, thresholds and timing of the recognition pipeline.

pub mod settings;

pub use settings::{ConfigError, MatcherSettings, OwnerBankSettings, Settings, TitleSettings};
