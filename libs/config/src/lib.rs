//! # FIX Bridge Configuration
//!
//! Layered configuration for the FIX pricing bridge and the per-session
//! settings the FIX engine is driven with.
//!
//! ## Features
//!
//! - **Layered Loading**: TOML base file, optional environment overlay,
//!   `FIXBRIDGE_` environment variables
//! - **Startup Validation**: every setting the bridge depends on is checked
//!   once, before a session is attempted
//! - **Session Settings**: named string values with typed credentials
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_config::load_config;
//! use std::path::Path;
//!
//! let (config, credentials) = load_config(Some(Path::new("config/bridge.toml")), None)?;
//! println!("{} -> {}", credentials.session_id(), config.relay.url);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bridge_config;
pub mod session;

// Re-export commonly used types
pub use bridge_config::{
    load_config, BridgeConfig, PricingSettings, RelaySettings, SchedulerSettings,
};
pub use session::{keys, ConfigError, SessionCredentials, SessionSettings};
