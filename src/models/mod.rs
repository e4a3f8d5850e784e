// src/models/mod.rs

//! Domain models for the module-of-the-week service.

mod config;
mod module;
mod selectors;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, NormalizeConfig, RefreshConfig, ServerConfig, SlackConfig,
    SourceConfig,
};
pub use module::{Module, RawModule};
pub use selectors::SiteSelectors;
