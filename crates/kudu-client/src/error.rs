//! Client error types.

use std::time::Duration;

use thiserror::Error;

use crate::endpoint::AddressError;

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Why a `ListMasters` call failed remotely.
#[derive(Error, Debug)]
pub enum RemoteFailure {
    /// gRPC status from the peer, or a dropped connection.
    #[error("{0}")]
    Status(#[from] tonic::Status),

    /// The peer answered but reported an application-level error.
    #[error("master reported {code}: {message}")]
    Master {
        /// Name of the `MasterErrorPB` code.
        code: String,
        /// Message from the embedded `AppStatusPB`.
        message: String,
    },
}

impl RemoteFailure {
    /// gRPC status of a wire-level failure.
    #[must_use]
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            Self::Status(status) => Some(status),
            Self::Master { .. } => None,
        }
    }
}

/// Errors that can occur when using the master discovery client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The master address could not be parsed.
    #[error("Malformed master address: {0}")]
    MalformedAddress(#[from] AddressError),

    /// The transport connection could not be established.
    #[error("Failed to connect to {target}: {source}")]
    DialFailure {
        /// The URI that was dialed.
        target: String,
        /// Underlying transport error (refused, unreachable, TLS, bad URI).
        #[source]
        source: tonic::transport::Error,
    },

    /// The remote call failed, on the wire or in the master's answer.
    #[error("ListMasters failed: {0}")]
    RemoteCallFailure(#[from] RemoteFailure),

    /// No response arrived before the deadline.
    #[error("ListMasters timed out after {0:?}")]
    DeadlineExceeded(Duration),

    /// An operation was invoked in a channel state that does not allow it.
    #[error("Cannot {operation} a channel that is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// Label of the state the channel was in.
        state: &'static str,
    },
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        Self::RemoteCallFailure(RemoteFailure::Status(status))
    }
}

impl ClientError {
    /// Returns `true` if the error came from the remote call itself.
    #[must_use]
    pub fn is_remote_call_failure(&self) -> bool {
        matches!(self, Self::RemoteCallFailure(_))
    }

    /// Returns `true` if a caller-side retry could reasonably succeed.
    ///
    /// The client itself never retries; this only classifies.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::DialFailure { .. } | Self::DeadlineExceeded(_) => true,
            Self::RemoteCallFailure(RemoteFailure::Status(status)) => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::ResourceExhausted | tonic::Code::Aborted
            ),
            Self::RemoteCallFailure(RemoteFailure::Master { .. })
            | Self::MalformedAddress(_)
            | Self::InvalidState { .. } => false,
        }
    }
}
