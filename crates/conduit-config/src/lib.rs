//! Conduit Config
//!
//! Process configuration, read once at startup:
//!
//! ```json
//! {
//!   "log-filter": "conduit=debug",
//!   "secrets": {
//!     "openai-compatible": { "api-key": "sk-..." }
//!   }
//! }
//! ```
//!
//! `secrets` holds the injected credentials of each component, keyed by
//! definition id and then by credential field. A setup opts into them with
//! the `__USE_SECRET__` sentinel.

mod config;

pub use config::{CONFIG_ENV, ConduitConfig, ConfigError, default_data_dir};
