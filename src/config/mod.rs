//! Configuration module for Agentry
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use agentry::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Pool will rotate {} forwarding endpoints", config.proxy.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, PortalConfig, ProxyEntry};

// Re-export parser functions
pub use parser::load_config;
