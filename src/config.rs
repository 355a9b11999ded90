//! Configuration utilities re-exported at the crate root.
//!
//! This exposes [`EngineConfig`] so applications can load settings
//! from `config/config.toml` or environment variables using
//! `EngineConfig::load()`.

pub use crate::pool::config::*;
