/// Opaque failure reported by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

/// Opaque failure reported by a [`TxtResolver`](crate::TxtResolver) backend.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("lookup error: {0}")]
pub struct LookupError(pub String);

/// Outcome of a single failed HTTP attempt.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response was obtained: connect failure, timeout, or a body that
    /// could not be read.
    #[error("no response: {0}")]
    NoResponse(String),
    /// The server answered with a non-success status code.
    #[error("http error {status}: {body}")]
    Status { status: u16, body: String },
    /// The request could not be built or sent for a local reason, such as an
    /// invalid header value. Nothing reached the server.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl TransportError {
    /// Status code of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NoResponse(_) | Self::Invalid(_) => None,
            Self::Status { status, .. } => Some(*status),
        }
    }
}

/// The persisted endpoint state could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not get current core endpoint: {0}")]
    Read(StoreError),
    /// The current endpoint key is absent. Once initialization has run this
    /// is a persistence fault.
    #[error("current core endpoint is not set")]
    Missing,
    #[error("could not set current core endpoint: {0}")]
    Write(StoreError),
    #[error("persisted endpoint state is corrupt: {0}")]
    Corrupt(String),
}

/// Endpoint discovery failed; fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("dns query failed: {0}")]
    DnsQuery(LookupError),
    #[error("no endpoints published")]
    NoEndpoints,
    #[error("static core base uri '{0}' has no host")]
    InvalidStaticUri(String),
    #[error("could not persist candidate set: {0}")]
    PersistCandidates(StoreError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// A dispatched request failed.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The base URI could not be resolved from local state. Never retried.
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid request uri: {0}")]
    InvalidUri(String),
    /// The transport refused to build the request. Never retried.
    #[error("invalid core request: {0}")]
    InvalidRequest(String),
    /// Terminal status (anything below 500). Never retried.
    #[error("core request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// Every attempt failed with a retryable error.
    #[error("core request failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: TransportError,
    },
}

impl RequestError {
    /// Last observed HTTP status; `None` for "no response" and local faults.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Exhausted { last, .. } => last.status(),
            Self::State(_) | Self::InvalidUri(_) | Self::InvalidRequest(_) => None,
        }
    }
}

/// Process configuration could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {0} environment variable")]
    Missing(&'static str),
    #[error("{0} is set but empty")]
    Empty(&'static str),
    #[error("invalid core base uri '{uri}': {reason}")]
    InvalidBaseUri { uri: String, reason: String },
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Request(#[from] RequestError),
}
