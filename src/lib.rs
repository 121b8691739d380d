//! `core-endpoint` binds a node to one of several interchangeable Core services.
//!
//! The crate covers three concerns:
//! - endpoint selection, either static or via DNS TXT discovery ([`CoreClient::initialize`])
//! - the persisted current endpoint ([`EndpointState`])
//! - retried, classified HTTP requests against it ([`CoreClient::request`])

mod client;
mod config;
mod discovery;
mod dns;
mod error;
mod options;
mod retry;
mod state;
mod store;
mod transport;

pub use client::CoreClient;
pub use config::{CoreConfig, EndpointMode};
pub use discovery::{EndpointResolver, DISCOVERY_NAME};
pub use dns::{HickoryTxtResolver, TxtResolver};
pub use error::{
    ConfigError, CoreError, DiscoveryError, LookupError, RequestError, StateError, StoreError,
    TransportError,
};
pub use options::{ClientOptions, RetryPolicy};
pub use retry::{classify, Verdict};
pub use state::{Endpoint, EndpointState, CANDIDATES_KEY, CURRENT_KEY};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use transport::{
    CoreReply, HttpResponse, HttpTransport, PreparedRequest, RequestOptions, ReqwestTransport,
    ResponseBody, ResponseEnvelope,
};

pub type Result<T> = std::result::Result<T, CoreError>;
