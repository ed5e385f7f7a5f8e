//! gRPC channel to a Kudu master and the `ListMasters` call.
//!
//! # State Machine
//!
//! ```text
//! Unopened ──open()──> Open ──close()──> Closed
//!     │                  │                  ▲
//!     │            list_masters()           │
//!     └──────────────close()────────────────┘
//! ```
//!
//! `list_masters` is only valid while `Open`. `Closed` is terminal and
//! `close` may be called any number of times.

use std::fmt;
use std::time::Duration;

use kudu_proto::master::master_service_client::MasterServiceClient;
use kudu_proto::{master_error_pb, ListMastersRequestPb, MasterErrorPb, Role, ServerEntryPb};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, TimeoutExpired};

use crate::endpoint::{format_host_port, MasterEndpoint};
use crate::error::{ClientError, RemoteFailure, Result};

/// Largest deadline the `grpc-timeout` header can carry (99,999,999 hours).
const MAX_GRPC_TIMEOUT: Duration = Duration::from_secs(99_999_999 * 60 * 60);

/// How the transport to the master is secured.
///
/// Has no `Default`; a plaintext channel must be asked for as
/// [`TransportMode::Insecure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Plaintext HTTP/2 without any authentication of either side.
    Insecure,
    /// TLS with the system roots, plus an optional extra CA.
    Tls {
        /// Name to verify the server certificate against (defaults to the host).
        domain: Option<String>,
        /// Additional PEM-encoded CA certificate.
        ca_certificate_pem: Option<Vec<u8>>,
    },
}

impl TransportMode {
    /// URI scheme used when dialing with this mode.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Insecure => "http",
            Self::Tls { .. } => "https",
        }
    }

    /// Returns `true` for the unauthenticated plaintext mode.
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::Insecure)
    }
}

/// gRPC channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Transport security mode
    pub transport: TransportMode,
    /// Upper bound for establishing the connection (none by default)
    pub connect_timeout: Option<Duration>,
    /// HTTP/2 keepalive interval (how often to send keepalive pings)
    pub keepalive_interval: Option<Duration>,
    /// Keepalive timeout (how long to wait for keepalive response)
    pub keepalive_timeout: Duration,
    /// Disable Nagle's algorithm on the socket
    pub tcp_nodelay: bool,
    /// Maximum decoded response size, `None` keeps tonic's 4 MB default
    pub max_decoding_message_size: Option<usize>,
}

impl ChannelConfig {
    /// Configuration with the given transport mode and default tuning.
    #[must_use]
    pub fn new(transport: TransportMode) -> Self {
        Self {
            transport,
            connect_timeout: None,
            keepalive_interval: Some(Duration::from_secs(10)),
            keepalive_timeout: Duration::from_secs(20),
            tcp_nodelay: true,
            max_decoding_message_size: None,
        }
    }

    /// Sets an upper bound on connection establishment.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    fn build_endpoint(&self, target: &str) -> std::result::Result<Endpoint, tonic::transport::Error> {
        let mut endpoint = Endpoint::from_shared(target.to_string())?
            .tcp_nodelay(self.tcp_nodelay)
            .keep_alive_timeout(self.keepalive_timeout);

        if let Some(interval) = self.keepalive_interval {
            endpoint = endpoint.http2_keep_alive_interval(interval);
        }
        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }

        if let TransportMode::Tls {
            domain,
            ca_certificate_pem,
        } = &self.transport
        {
            let mut tls = ClientTlsConfig::new();
            if let Some(domain) = domain {
                tls = tls.domain_name(domain.clone());
            }
            if let Some(pem) = ca_certificate_pem {
                tls = tls.ca_certificate(Certificate::from_pem(pem));
            }
            endpoint = endpoint.tls_config(tls)?;
        }

        Ok(endpoint)
    }
}

/// Lifecycle state of a [`MasterChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created, not yet connected.
    Unopened,
    /// Connected and ready for calls.
    Open,
    /// Released; terminal.
    Closed,
}

impl ChannelState {
    /// Returns a short lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

enum Inner {
    Unopened,
    Open(MasterServiceClient<Channel>),
    Closed,
}

impl Inner {
    fn state(&self) -> ChannelState {
        match self {
            Self::Unopened => ChannelState::Unopened,
            Self::Open(_) => ChannelState::Open,
            Self::Closed => ChannelState::Closed,
        }
    }
}

/// Channel to one master, owning the connection for its whole lifetime.
///
/// Calls take `&mut self`, so a channel never has two exchanges in flight.
pub struct MasterChannel {
    endpoint: MasterEndpoint,
    config: ChannelConfig,
    inner: Inner,
}

impl MasterChannel {
    /// Creates an unopened channel bound to `endpoint`.
    #[must_use]
    pub fn new(endpoint: MasterEndpoint, config: ChannelConfig) -> Self {
        Self {
            endpoint,
            config,
            inner: Inner::Unopened,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.state()
    }

    /// Returns the endpoint this channel is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &MasterEndpoint {
        &self.endpoint
    }

    /// Dial the master.
    ///
    /// Waits until the transport is up, bounded only by
    /// [`ChannelConfig::connect_timeout`] when one is set. On failure the
    /// channel stays `Unopened`.
    pub async fn open(&mut self) -> Result<()> {
        if !matches!(self.inner, Inner::Unopened) {
            return Err(ClientError::InvalidState {
                operation: "open",
                state: self.state().label(),
            });
        }

        let target = self.endpoint.uri(self.config.transport.scheme());
        if self.config.transport.is_insecure() {
            tracing::warn!(
                uri = %target,
                "Opening plaintext channel: master identity is not verified and traffic is unencrypted"
            );
        }

        let endpoint = self
            .config
            .build_endpoint(&target)
            .map_err(|source| ClientError::DialFailure {
                target: target.clone(),
                source,
            })?;

        tracing::debug!(uri = %target, "MasterChannel::open() - dialing master");
        let channel = endpoint.connect().await.map_err(|source| {
            tracing::warn!(uri = %target, error = %source, "MasterChannel::open() - dial failed");
            ClientError::DialFailure {
                target: target.clone(),
                source,
            }
        })?;

        let mut client = MasterServiceClient::new(channel);
        if let Some(limit) = self.config.max_decoding_message_size {
            client = client.max_decoding_message_size(limit);
        }
        self.inner = Inner::Open(client);
        tracing::debug!(uri = %target, "MasterChannel::open() - connected");
        Ok(())
    }

    /// Ask the master for every master it knows about.
    ///
    /// The call is abandoned once `timeout` elapses; the deadline is also
    /// sent to the peer as `grpc-timeout`. Entries come back in the order
    /// the master sent them. A timed-out channel stays open.
    pub async fn list_masters(&mut self, timeout: Duration) -> Result<MasterList> {
        let client = match &mut self.inner {
            Inner::Open(client) => client,
            other => {
                return Err(ClientError::InvalidState {
                    operation: "list masters on",
                    state: other.state().label(),
                })
            }
        };

        let mut request = tonic::Request::new(ListMastersRequestPb {});
        request.set_timeout(timeout.min(MAX_GRPC_TIMEOUT));

        tracing::debug!(
            endpoint = %self.endpoint,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "MasterChannel::list_masters() - sending gRPC request"
        );

        let response = match tokio::time::timeout(timeout, client.list_masters(request)).await {
            Err(_) => {
                tracing::warn!(endpoint = %self.endpoint, ?timeout, "MasterChannel::list_masters() - deadline exceeded");
                return Err(ClientError::DeadlineExceeded(timeout));
            }
            Ok(Err(status)) if is_local_timeout(&status) => {
                tracing::warn!(endpoint = %self.endpoint, ?timeout, "MasterChannel::list_masters() - deadline exceeded");
                return Err(ClientError::DeadlineExceeded(timeout));
            }
            Ok(Err(status)) if status.code() == tonic::Code::DeadlineExceeded => {
                tracing::warn!(endpoint = %self.endpoint, ?timeout, "MasterChannel::list_masters() - peer reported deadline exceeded");
                return Err(ClientError::DeadlineExceeded(timeout));
            }
            Ok(Err(status)) => {
                tracing::warn!(endpoint = %self.endpoint, error = %status, "MasterChannel::list_masters() - gRPC request failed");
                return Err(status.into());
            }
            Ok(Ok(response)) => response.into_inner(),
        };

        if let Some(error) = response.error {
            let err = master_error(&error);
            tracing::warn!(endpoint = %self.endpoint, error = %err, "MasterChannel::list_masters() - master returned an error");
            return Err(err);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            master_count = response.masters.len(),
            "MasterChannel::list_masters() - received response"
        );
        Ok(MasterList::new(response.masters))
    }

    /// Release the connection. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if matches!(self.inner, Inner::Open(_)) {
            tracing::debug!(endpoint = %self.endpoint, "MasterChannel::close() - releasing channel");
        }
        self.inner = Inner::Closed;
    }
}

impl fmt::Debug for MasterChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterChannel")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.config.transport.scheme())
            .field("state", &self.state())
            .finish()
    }
}

/// The channel's own `grpc-timeout` enforcement fired.
///
/// tonic reports that as `Cancelled` with a `TimeoutExpired` somewhere in
/// the source chain.
fn is_local_timeout(status: &tonic::Status) -> bool {
    if status.code() != tonic::Code::Cancelled {
        return false;
    }
    let mut source = std::error::Error::source(status);
    while let Some(err) = source {
        if err.is::<TimeoutExpired>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn master_error(error: &MasterErrorPb) -> ClientError {
    let code = master_error_pb::Code::try_from(error.code)
        .map(|code| code.as_str_name().to_string())
        .unwrap_or_else(|_| format!("code {}", error.code));
    ClientError::RemoteCallFailure(RemoteFailure::Master {
        code,
        message: error.status.message().to_string(),
    })
}

/// Open a channel, list the masters and close the channel again.
///
/// The channel is closed whether or not the call succeeds.
pub async fn discover_masters(
    endpoint: MasterEndpoint,
    config: ChannelConfig,
    timeout: Duration,
) -> Result<MasterList> {
    let mut channel = MasterChannel::new(endpoint, config);
    channel.open().await?;
    let result = channel.list_masters(timeout).await;
    channel.close();
    result
}

/// Masters reported by a `ListMasters` call, in the order received.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MasterList {
    masters: Vec<ServerEntryPb>,
}

impl MasterList {
    fn new(masters: Vec<ServerEntryPb>) -> Self {
        Self { masters }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masters.len()
    }

    /// Returns `true` if the master reported no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masters.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ServerEntryPb> {
        self.masters.iter()
    }

    /// Returns the entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ServerEntryPb] {
        &self.masters
    }

    /// First entry whose Raft role is `LEADER`.
    #[must_use]
    pub fn leader(&self) -> Option<&ServerEntryPb> {
        self.masters.iter().find(|entry| entry.role() == Role::Leader)
    }

    /// Consumes the list, returning the raw entries.
    #[must_use]
    pub fn into_inner(self) -> Vec<ServerEntryPb> {
        self.masters
    }
}

impl IntoIterator for MasterList {
    type Item = ServerEntryPb;
    type IntoIter = std::vec::IntoIter<ServerEntryPb>;

    fn into_iter(self) -> Self::IntoIter {
        self.masters.into_iter()
    }
}

impl<'a> IntoIterator for &'a MasterList {
    type Item = &'a ServerEntryPb;
    type IntoIter = std::slice::Iter<'a, ServerEntryPb>;

    fn into_iter(self) -> Self::IntoIter {
        self.masters.iter()
    }
}

/// One-line summary of an entry: uuid, first RPC address, role.
#[must_use]
pub fn describe_entry(entry: &ServerEntryPb) -> String {
    let uuid = entry
        .instance_id
        .as_ref()
        .map(|id| String::from_utf8_lossy(&id.permanent_uuid).into_owned())
        .unwrap_or_else(|| "<unknown uuid>".to_string());
    let address = entry
        .registration
        .as_ref()
        .and_then(|reg| reg.rpc_addresses.first())
        .map(|hp| format_host_port(&hp.host, hp.port))
        .unwrap_or_else(|| "<no rpc address>".to_string());
    let mut line = format!("{uuid} {address} {}", entry.role().as_str_name());
    if let Some(error) = &entry.error {
        line.push_str(&format!(" (error: {})", error.message()));
    }
    line
}
