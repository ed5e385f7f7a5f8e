//! Rendering of command output, as text or JSON.

use kudu_client::proto::{HostPortPb, ServerEntryPb, ServerMetadataPb};
use kudu_client::{describe_entry, format_host_port, MasterList};
use serde_json::{json, Value};

fn host_ports_json(addrs: &[HostPortPb]) -> Value {
    addrs
        .iter()
        .map(|hp| json!({ "host": hp.host, "port": hp.port }))
        .collect()
}

/// Rendered connection metadata as `{location, rpc_addresses}`.
#[must_use]
pub fn metadata_json(metadata: &ServerMetadataPb) -> Value {
    json!({
        "location": metadata.location,
        "rpc_addresses": host_ports_json(&metadata.rpc_addresses),
    })
}

/// Rendered connection metadata as `key: value` lines.
#[must_use]
pub fn metadata_text(metadata: &ServerMetadataPb) -> String {
    let mut lines = vec![format!("location: {}", metadata.location())];
    lines.extend(
        metadata
            .rpc_addresses
            .iter()
            .map(|hp| format!("rpc_address: {}", format_host_port(&hp.host, hp.port))),
    );
    lines.join("\n")
}

/// One master entry, keeping every field the master sent.
#[must_use]
pub fn entry_json(entry: &ServerEntryPb) -> Value {
    let registration = entry.registration.as_ref();
    json!({
        "uuid": entry
            .instance_id
            .as_ref()
            .map(|id| String::from_utf8_lossy(&id.permanent_uuid).into_owned()),
        "role": entry.role().as_str_name(),
        "member_type": entry.member_type().as_str_name(),
        "rpc_addresses": registration.map(|r| host_ports_json(&r.rpc_addresses)),
        "http_addresses": registration.map(|r| host_ports_json(&r.http_addresses)),
        "software_version": registration.and_then(|r| r.software_version.clone()),
        "cluster_id": entry.cluster_id,
        "error": entry.error.as_ref().map(|e| e.message().to_string()),
    })
}

/// The full master list, in the order received.
#[must_use]
pub fn master_list_json(masters: &MasterList) -> Value {
    masters.iter().map(entry_json).collect()
}

/// Human-readable master list, one line per entry.
#[must_use]
pub fn master_list_text(masters: &MasterList) -> String {
    if masters.is_empty() {
        return "No masters reported".to_string();
    }
    masters
        .iter()
        .map(describe_entry)
        .collect::<Vec<_>>()
        .join("\n")
}
