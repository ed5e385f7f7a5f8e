//! Master discovery client for Kudu clusters.
//!
//! This crate is the connection path of the workspace: it parses a master
//! address into a [`MasterEndpoint`], renders the connection metadata the
//! master service expects, and runs the deadline-bounded `ListMasters` call
//! through a [`MasterChannel`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use kudu_client::{ChannelConfig, MasterChannel, MasterEndpoint, TransportMode};
//!
//! # async fn run() -> kudu_client::Result<()> {
//! let mut endpoint = MasterEndpoint::new();
//! endpoint.set_master_address("kudu-master1.node.example:7051")?;
//!
//! let config = ChannelConfig::new(TransportMode::Insecure);
//! let mut channel = MasterChannel::new(endpoint, config);
//! channel.open().await?;
//! let masters = channel.list_masters(Duration::from_secs(1)).await;
//! channel.close();
//!
//! for entry in masters?.iter() {
//!     println!("{:?}", entry.registration);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod endpoint;
pub mod error;

pub use channel::{
    describe_entry, discover_masters, ChannelConfig, ChannelState, MasterChannel, MasterList,
    TransportMode,
};
pub use endpoint::{format_host_port, AddressError, MasterEndpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{ClientError, RemoteFailure, Result};

/// Re-exported wire types, so callers do not need a direct `kudu-proto` dependency.
pub use kudu_proto as proto;
