//! Shared configuration for the Extended exchange statistics collector.

pub mod config;
pub mod config_loader;

pub use config::{
    AppConfig, ChainConfig, CollectorSettings, ConfigError, HttpConfig, RetentionConfig,
    WarehouseConfig,
};
pub use config_loader::ConfigLoader;
