//! # Kudu master discovery
//!
//! Driver crate around [`kudu_client`]: it loads the layered configuration,
//! sets up tracing and renders results for the `kudu-discovery` binary.
//!
//! ## Crate Structure
//!
//! - **`config`**: Figment-based configuration (`DiscoveryConfig`) from defaults,
//!   TOML file and `KUDU_DISCOVERY_*` environment variables.
//! - **`logging`**: `tracing-subscriber` initialisation with pretty, compact or JSON output.
//! - **`report`**: Text and JSON rendering of metadata and master lists.
//!
//! The connection logic itself (address parsing, metadata rendering, the
//! deadline-bounded `ListMasters` call) lives in `kudu-client` and is
//! re-exported here.

pub mod config;
pub mod logging;
pub mod report;

pub use kudu_client;
