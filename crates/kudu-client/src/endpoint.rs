//! Master endpoint parsing and connection metadata rendering.
//!
//! This module provides the address side of the client:
//! - [`MasterEndpoint`]: validated `host:port` pair of one master server
//! - [`AddressError`]: why an address string was rejected
//!
//! # Address Grammar
//!
//! Surrounding whitespace is trimmed, then exactly one of:
//! - `host:port` where `host` holds no `:` and is a DNS name or IPv4 literal
//!   (e.g. `kudu-master1.node.example:7051`, `127.0.0.1:7051`)
//! - `[ipv6]:port` for IPv6 literals (e.g. `[::1]:7051`); the stored host is
//!   the bare address without brackets
//!
//! `port` is a run of ASCII digits in `0..=65535`. Anything else, in
//! particular a second `:` outside brackets, is rejected instead of
//! truncated.
//!
//! # Example
//!
//! ```
//! use kudu_client::MasterEndpoint;
//!
//! let mut endpoint = MasterEndpoint::new();
//! endpoint.set_master_address("127.0.0.1:7051")?;
//!
//! let metadata = endpoint.render();
//! assert_eq!(metadata.location.as_deref(), Some("127.0.0.1"));
//! assert_eq!(metadata.rpc_addresses[0].port, 7051);
//! # Ok::<(), kudu_client::AddressError>(())
//! ```

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use kudu_proto::{HostPortPb, ServerMetadataPb};
use serde::{Deserialize, Serialize};

/// Placeholder host of a freshly created endpoint.
pub const DEFAULT_HOST: &str = "localhost";

/// Placeholder port of a freshly created endpoint.
pub const DEFAULT_PORT: u16 = 8080;

/// Address of a single master server.
///
/// Starts out as `localhost:8080` and only changes through
/// [`set_master_address`](Self::set_master_address), which either replaces
/// both fields or leaves them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MasterEndpoint {
    host: String,
    port: u16,
}

impl MasterEndpoint {
    /// Creates an endpoint pointing at the `localhost:8080` placeholder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    /// Replaces host and port with the ones parsed from `address`.
    ///
    /// On error the endpoint keeps its previous value.
    pub fn set_master_address(&mut self, address: &str) -> Result<(), AddressError> {
        let (host, port) = parse_host_port(address)?;
        self.host = host;
        self.port = port;
        Ok(())
    }

    /// Returns the host (IPv6 literals without brackets).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if the host is an IPv6 literal.
    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }

    /// Renders the server metadata message for this endpoint.
    ///
    /// The host doubles as the location label, and the address list holds
    /// this endpoint as its only entry. The returned message owns its data.
    #[must_use]
    pub fn render(&self) -> ServerMetadataPb {
        ServerMetadataPb {
            uuid: None,
            rpc_addresses: vec![HostPortPb {
                host: self.host.clone(),
                port: u32::from(self.port),
            }],
            location: Some(self.host.clone()),
        }
    }

    /// Returns the `scheme://host:port` URI used to dial this endpoint.
    #[must_use]
    pub fn uri(&self, scheme: &str) -> String {
        format!("{scheme}://{self}")
    }
}

impl Default for MasterEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MasterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_host_port(&self.host, self.port))
    }
}

impl FromStr for MasterEndpoint {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = parse_host_port(s)?;
        Ok(Self { host, port })
    }
}

impl TryFrom<String> for MasterEndpoint {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MasterEndpoint> for String {
    fn from(endpoint: MasterEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Address validation error with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    EmptyInput,
    /// Input contained non-ASCII characters
    NonAscii(String),
    /// No `:` between host and port
    MissingSeparator(String),
    /// More than one `:` outside of an IPv6 bracket
    AmbiguousSeparator(String),
    /// `[` without a matching `]`
    UnterminatedBracket(String),
    /// Host part was empty
    MissingHost,
    /// Host is not a valid DNS name or IP literal
    InvalidHost(String),
    /// Port part was empty
    MissingPort,
    /// Port contained something other than ASCII digits
    InvalidPort(String),
    /// Port does not fit in `0..=65535`
    PortOutOfRange(String),
}

impl std::error::Error for AddressError {}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Address cannot be empty"),
            Self::NonAscii(s) => write!(f, "Address '{s}' must be ASCII"),
            Self::MissingSeparator(s) => write!(f, "Address '{s}' must have the form host:port"),
            Self::AmbiguousSeparator(s) => write!(
                f,
                "Address '{s}' has more than one ':' (write IPv6 hosts as [addr]:port)"
            ),
            Self::UnterminatedBracket(s) => write!(f, "Address '{s}' has an unterminated '['"),
            Self::MissingHost => write!(f, "Address must include a host"),
            Self::InvalidHost(h) => write!(f, "Invalid host '{h}'"),
            Self::MissingPort => write!(f, "Address must include a port"),
            Self::InvalidPort(p) => write!(f, "Invalid port '{p}': expected digits only"),
            Self::PortOutOfRange(p) => write!(f, "Port {p} is out of range (0-65535)"),
        }
    }
}

/// Joins a host and port, bracketing IPv6 literals (`[::1]:7051`).
#[must_use]
pub fn format_host_port(host: &str, port: impl fmt::Display) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Split and validate a `host:port` or `[ipv6]:port` string.
fn parse_host_port(input: &str) -> Result<(String, u16), AddressError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }
    if !input.is_ascii() {
        return Err(AddressError::NonAscii(input.to_string()));
    }

    let (host, port) = if let Some(rest) = input.strip_prefix('[') {
        let (inner, after) = rest
            .split_once(']')
            .ok_or_else(|| AddressError::UnterminatedBracket(input.to_string()))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| AddressError::MissingSeparator(input.to_string()))?;
        if inner.is_empty() {
            return Err(AddressError::MissingHost);
        }
        inner
            .parse::<Ipv6Addr>()
            .map_err(|_| AddressError::InvalidHost(inner.to_string()))?;
        (inner, port)
    } else {
        let mut parts = input.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) => {
                if host.is_empty() {
                    return Err(AddressError::MissingHost);
                }
                url::Host::parse(host).map_err(|_| AddressError::InvalidHost(host.to_string()))?;
                (host, port)
            }
            (_, None, _) => return Err(AddressError::MissingSeparator(input.to_string())),
            _ => return Err(AddressError::AmbiguousSeparator(input.to_string())),
        }
    };

    Ok((host.to_string(), parse_port(port)?))
}

/// Parse a port made only of ASCII digits. `u16::from_str` alone would also
/// take a leading `+`.
fn parse_port(port: &str) -> Result<u16, AddressError> {
    if port.is_empty() {
        return Err(AddressError::MissingPort);
    }
    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidPort(port.to_string()));
    }
    port.parse::<u16>()
        .map_err(|_| AddressError::PortOutOfRange(port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_pair(endpoint: &MasterEndpoint) -> (String, u32) {
        let metadata = endpoint.render();
        assert_eq!(metadata.rpc_addresses.len(), 1);
        let addr = &metadata.rpc_addresses[0];
        (addr.host.clone(), addr.port)
    }

    #[test]
    fn test_new_uses_placeholder() {
        let endpoint = MasterEndpoint::new();
        assert_eq!(endpoint.host(), "localhost");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint, MasterEndpoint::default());
    }

    #[test]
    fn test_render_default_endpoint() {
        let metadata = MasterEndpoint::new().render();
        assert_eq!(metadata.location.as_deref(), Some("localhost"));
        assert_eq!(
            metadata.rpc_addresses,
            vec![HostPortPb {
                host: "localhost".to_string(),
                port: 8080,
            }]
        );
        assert!(metadata.uuid.is_none());
    }

    #[test]
    fn test_set_ipv4_address() {
        let mut endpoint = MasterEndpoint::new();
        endpoint.set_master_address("127.0.0.1:7051").unwrap();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 7051);

        let metadata = endpoint.render();
        assert_eq!(metadata.location.as_deref(), Some("127.0.0.1"));
        assert_eq!(rendered_pair(&endpoint), ("127.0.0.1".to_string(), 7051));
    }

    #[test]
    fn test_set_hostname_address() {
        let mut endpoint = MasterEndpoint::new();
        endpoint
            .set_master_address("kudu-master1.node.example:7051")
            .unwrap();
        let metadata = endpoint.render();
        assert_eq!(
            metadata.location.as_deref(),
            Some("kudu-master1.node.example")
        );
        assert_eq!(
            rendered_pair(&endpoint),
            ("kudu-master1.node.example".to_string(), 7051)
        );
    }

    #[test]
    fn test_port_bounds() {
        let low: MasterEndpoint = "master:0".parse().unwrap();
        assert_eq!(low.port(), 0);
        let high: MasterEndpoint = "master:65535".parse().unwrap();
        assert_eq!(high.port(), 65535);
        assert_eq!(
            "master:65536".parse::<MasterEndpoint>().unwrap_err(),
            AddressError::PortOutOfRange("65536".to_string())
        );
    }

    #[test]
    fn test_last_write_wins() {
        let mut endpoint = MasterEndpoint::new();
        endpoint.set_master_address("first:1").unwrap();
        endpoint.set_master_address("second:2").unwrap();
        assert_eq!(endpoint.to_string(), "second:2");
    }

    #[test]
    fn test_trims_whitespace() {
        let endpoint: MasterEndpoint = "  master-2:7051 \n".parse().unwrap();
        assert_eq!(endpoint.host(), "master-2");
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("", AddressError::EmptyInput),
            ("   ", AddressError::EmptyInput),
            ("localhost", AddressError::MissingSeparator("localhost".to_string())),
            (
                "a:b:7051",
                AddressError::AmbiguousSeparator("a:b:7051".to_string()),
            ),
            (
                "::1:7051",
                AddressError::AmbiguousSeparator("::1:7051".to_string()),
            ),
            (":7051", AddressError::MissingHost),
            ("master:", AddressError::MissingPort),
            ("master:http", AddressError::InvalidPort("http".to_string())),
            ("master:+7051", AddressError::InvalidPort("+7051".to_string())),
            ("master:-1", AddressError::InvalidPort("-1".to_string())),
            ("master: 7051", AddressError::InvalidPort(" 7051".to_string())),
            ("bad host:7051", AddressError::InvalidHost("bad host".to_string())),
            ("mästare:7051", AddressError::NonAscii("mästare:7051".to_string())),
        ];

        for (input, expected) in cases {
            assert_eq!(
                input.parse::<MasterEndpoint>().unwrap_err(),
                expected,
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn test_failed_set_leaves_endpoint_unchanged() {
        let mut endpoint = MasterEndpoint::new();
        endpoint.set_master_address("127.0.0.1:7051").unwrap();

        for bad in ["127.0.0.2", "127.0.0.2:port", "127.0.0.2:99999", "x:y:1"] {
            assert!(endpoint.set_master_address(bad).is_err());
            assert_eq!(endpoint.host(), "127.0.0.1");
            assert_eq!(endpoint.port(), 7051);
        }
    }

    #[test]
    fn test_ipv6_bracket_convention() {
        let endpoint: MasterEndpoint = "[::1]:7051".parse().unwrap();
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.port(), 7051);
        assert!(endpoint.is_ipv6());
        assert_eq!(endpoint.to_string(), "[::1]:7051");
        assert_eq!(endpoint.uri("http"), "http://[::1]:7051");
        assert_eq!(rendered_pair(&endpoint), ("::1".to_string(), 7051));
    }

    #[test]
    fn test_ipv6_rejections() {
        assert_eq!(
            "[::1:7051".parse::<MasterEndpoint>().unwrap_err(),
            AddressError::UnterminatedBracket("[::1:7051".to_string())
        );
        assert_eq!(
            "[::1]".parse::<MasterEndpoint>().unwrap_err(),
            AddressError::MissingSeparator("[::1]".to_string())
        );
        assert_eq!(
            "[]:7051".parse::<MasterEndpoint>().unwrap_err(),
            AddressError::MissingHost
        );
        assert_eq!(
            "[not-v6]:7051".parse::<MasterEndpoint>().unwrap_err(),
            AddressError::InvalidHost("not-v6".to_string())
        );
    }

    #[test]
    fn test_render_returns_independent_value() {
        let mut endpoint: MasterEndpoint = "master-a:7051".parse().unwrap();
        let before = endpoint.render();
        endpoint.set_master_address("master-b:7052").unwrap();
        assert_eq!(before.location.as_deref(), Some("master-a"));
        assert_eq!(before.rpc_addresses[0].port, 7051);
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let endpoint: MasterEndpoint = serde_json::from_str("\"master:7051\"").unwrap();
        assert_eq!(endpoint.port(), 7051);
        assert_eq!(serde_json::to_string(&endpoint).unwrap(), "\"master:7051\"");
        assert!(serde_json::from_str::<MasterEndpoint>("\"master\"").is_err());
    }

    #[test]
    fn test_format_host_port_brackets_ipv6() {
        assert_eq!(format_host_port("master", 7051), "master:7051");
        assert_eq!(format_host_port("::1", 7051u32), "[::1]:7051");
    }

    #[test]
    fn test_address_error_display() {
        assert_eq!(AddressError::EmptyInput.to_string(), "Address cannot be empty");
        assert!(AddressError::AmbiguousSeparator("a:b:1".to_string())
            .to_string()
            .contains("[addr]:port"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::net::Ipv4Addr;

        fn dns_name() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9]{0,15}(\\.[a-z][a-z0-9]{0,10}){0,3}"
        }

        proptest! {
            #[test]
            fn valid_dns_address_renders_its_parts(host in dns_name(), port in any::<u16>()) {
                let mut endpoint = MasterEndpoint::new();
                endpoint.set_master_address(&format!("{host}:{port}")).unwrap();

                let metadata = endpoint.render();
                prop_assert_eq!(metadata.location.as_deref(), Some(host.as_str()));
                prop_assert_eq!(
                    metadata.rpc_addresses,
                    vec![HostPortPb { host: host.clone(), port: u32::from(port) }]
                );
                prop_assert_eq!(endpoint.to_string(), format!("{host}:{port}"));
            }

            #[test]
            fn valid_ipv4_address_renders_its_parts(ip in any::<Ipv4Addr>(), port in any::<u16>()) {
                let endpoint: MasterEndpoint = format!("{ip}:{port}").parse().unwrap();
                prop_assert_eq!(rendered_pair(&endpoint), (ip.to_string(), u32::from(port)));
            }

            #[test]
            fn bracketed_ipv6_round_trips(ip in any::<Ipv6Addr>(), port in any::<u16>()) {
                let input = format!("[{ip}]:{port}");
                let endpoint: MasterEndpoint = input.parse().unwrap();
                prop_assert_eq!(endpoint.host(), ip.to_string());
                prop_assert_eq!(endpoint.port(), port);
                prop_assert_eq!(endpoint.to_string(), input);
            }

            #[test]
            fn out_of_range_port_is_rejected(host in dns_name(), port in 65_536u64..=u64::from(u32::MAX)) {
                let err = format!("{host}:{port}").parse::<MasterEndpoint>().unwrap_err();
                prop_assert_eq!(err, AddressError::PortOutOfRange(port.to_string()));
            }

            #[test]
            fn extra_separator_is_rejected(
                a in dns_name(),
                b in "[a-z0-9]{0,8}",
                port in any::<u16>(),
            ) {
                let input = format!("{a}:{b}:{port}");
                let err = input.parse::<MasterEndpoint>().unwrap_err();
                prop_assert_eq!(err, AddressError::AmbiguousSeparator(input));
            }

            #[test]
            fn failed_set_leaves_endpoint_unchanged(input in any::<String>()) {
                let mut endpoint: MasterEndpoint = "kudu-master1.node.example:7051".parse().unwrap();
                let before = endpoint.clone();

                match endpoint.set_master_address(&input) {
                    Ok(()) => prop_assert_eq!(Ok(endpoint), input.parse::<MasterEndpoint>()),
                    Err(_) => prop_assert_eq!(endpoint, before),
                }
            }
        }
    }
}
