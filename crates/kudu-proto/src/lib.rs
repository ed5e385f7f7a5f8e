//! Protocol buffer messages and gRPC stubs for the Kudu master service.
//!
//! This crate contains:
//! - Generated types for the subset of the Kudu wire schema under `proto/`
//!   (`kudu`, `kudu.client`, `kudu.consensus`, `kudu.master` packages)
//! - The `MasterService` client, and with the `server` feature the server
//!   stub used by in-process fakes
//!
//! Module nesting follows the protobuf packages, since generated code refers
//! across packages with `super::` paths.

#![allow(missing_docs)] // Generated code doesn't have docs

/// Generated Kudu protocol buffer types, one module per package.
pub mod kudu {
    tonic::include_proto!("kudu");

    pub mod client {
        tonic::include_proto!("kudu.client");
    }

    pub mod consensus {
        tonic::include_proto!("kudu.consensus");
    }

    pub mod master {
        tonic::include_proto!("kudu.master");
    }
}

pub use kudu::{client, consensus, master};

// Re-export commonly used types at crate root
pub use kudu::client::ServerMetadataPb;
pub use kudu::consensus::raft_peer_pb::{MemberType, Role};
pub use kudu::master::{
    master_error_pb, ListMastersRequestPb, ListMastersResponsePb, MasterErrorPb, ServerEntryPb,
};
pub use kudu::{app_status_pb, AppStatusPb, HostPortPb, NodeInstancePb, ServerRegistrationPb};
