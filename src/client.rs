use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use url::Url;

use crate::{
    classify, ClientOptions, ConfigError, CoreConfig, CoreReply, DiscoveryError, Endpoint,
    EndpointResolver, EndpointState, HickoryTxtResolver, HttpResponse, HttpTransport,
    KeyValueStore, PreparedRequest, RequestError, RequestOptions, ReqwestTransport, ResponseBody,
    ResponseEnvelope, StateError, TxtResolver, Verdict,
};

const NODE_VERSION_HEADER: &str = "x-node-version";
const NODE_ADDRESS_HEADER: &str = "x-node-address";

/// Client for the Core service fleet.
///
/// Owns the endpoint state handle and every external collaborator; clones
/// share them.
#[derive(Clone)]
pub struct CoreClient {
    config: CoreConfig,
    state: EndpointState,
    dns: Arc<dyn TxtResolver>,
    transport: Arc<dyn HttpTransport>,
    options: ClientOptions,
}

impl fmt::Debug for CoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreClient")
            .field("config", &self.config)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CoreClient {
    /// Creates a client using `reqwest` and the host's DNS resolver
    /// configuration; see [`HickoryTxtResolver::system_or_defaults`].
    pub fn new(config: CoreConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let state = EndpointState::new(store, config.endpoint.clone());
        Self {
            config,
            state,
            dns: Arc::new(HickoryTxtResolver::system_or_defaults()),
            transport: Arc::new(ReqwestTransport::new()),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from environment variables; see [`CoreConfig::from_env`].
    pub fn from_env(store: Arc<dyn KeyValueStore>) -> Result<Self, ConfigError> {
        Ok(Self::new(CoreConfig::from_env()?, store))
    }

    pub fn with_resolver(mut self, dns: Arc<dyn TxtResolver>) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn state(&self) -> &EndpointState {
        &self.state
    }

    /// Selects and persists the endpoint in effect. Run once at startup,
    /// before any request without an endpoint override.
    pub async fn initialize(&self) -> Result<Endpoint, DiscoveryError> {
        EndpointResolver::new(self.state.clone(), self.dns.clone())
            .initialize()
            .await
    }

    pub async fn current_endpoint(&self) -> Result<Endpoint, StateError> {
        self.state.current().await
    }

    pub async fn current_endpoint_uri(&self) -> Result<String, StateError> {
        self.state.current_uri().await
    }

    /// Sends a request to the current endpoint, or to `endpoint_override`
    /// when given, retrying transient failures under the configured policy.
    ///
    /// Statuses below 500 fail immediately with [`RequestError::Rejected`],
    /// and a request the transport cannot build with
    /// [`RequestError::InvalidRequest`].
    /// Connection failures, timeouts and 5xx responses are retried; when the
    /// attempts run out the last one is returned as [`RequestError::Exhausted`].
    pub async fn request(
        &self,
        options: RequestOptions,
        endpoint_override: Option<&str>,
        suppress_retry_log: bool,
    ) -> Result<CoreReply, RequestError> {
        let response = self
            .dispatch(&options, endpoint_override, suppress_retry_log)
            .await?;
        if options.full_response {
            Ok(CoreReply::Envelope(into_envelope(response, options.json)))
        } else {
            Ok(CoreReply::Body(decode_body(response.body, options.json)))
        }
    }

    /// Fetches `GET /config` from the current endpoint.
    pub async fn core_config(&self) -> Result<ResponseEnvelope, RequestError> {
        let options = RequestOptions::get("/config")
            .header("Content-Type", "application/json")
            .json(true)
            .gzip(true)
            .full_response(true);
        let response = self.dispatch(&options, None, false).await?;
        Ok(into_envelope(response, options.json))
    }

    async fn dispatch(
        &self,
        options: &RequestOptions,
        endpoint_override: Option<&str>,
        suppress_retry_log: bool,
    ) -> Result<HttpResponse, RequestError> {
        let base = match endpoint_override {
            Some(host) => Endpoint::new(host).https_uri(),
            None => self.state.current_uri().await?,
        };
        let prepared = self.prepare(&base, options)?;
        self.send_with_retry(&prepared, suppress_retry_log).await
    }

    fn prepare(
        &self,
        base: &str,
        options: &RequestOptions,
    ) -> Result<PreparedRequest, RequestError> {
        let uri = format!("{}{}", base.trim_end_matches('/'), options.path);
        Url::parse(&uri).map_err(|err| RequestError::InvalidUri(format!("{uri}: {err}")))?;

        let mut headers: BTreeMap<String, String> = options
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        if options.json {
            headers
                .entry("content-type".to_owned())
                .or_insert_with(|| "application/json".to_owned());
            headers
                .entry("accept".to_owned())
                .or_insert_with(|| "application/json".to_owned());
        }
        if !options.gzip {
            headers.insert("accept-encoding".to_owned(), "identity".to_owned());
        }
        headers.insert(
            NODE_VERSION_HEADER.to_owned(),
            self.config.node_version.clone(),
        );
        headers.insert(
            NODE_ADDRESS_HEADER.to_owned(),
            self.config.node_address.clone(),
        );

        Ok(PreparedRequest {
            method: options.method.clone(),
            uri,
            headers,
            query: options.query.clone(),
            body: options.body.clone(),
            json: options.json,
            timeout: Duration::from_millis(self.options.timeout_ms),
        })
    }

    async fn send_with_retry(
        &self,
        request: &PreparedRequest,
        suppress_retry_log: bool,
    ) -> Result<HttpResponse, RequestError> {
        let max_attempts = self.options.retry.max_attempts();
        let mut attempt = 0usize;
        loop {
            let failure = match self.transport.send(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            attempt += 1;

            match classify(failure) {
                Verdict::Abort(err) => return Err(err),
                Verdict::Retry(last) if attempt >= max_attempts => {
                    return Err(RequestError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Verdict::Retry(err) => {
                    #[cfg(feature = "tracing")]
                    {
                        if !suppress_retry_log {
                            tracing::info!(
                                "core request: {}: retrying",
                                crate::retry::retry_label(&err)
                            );
                        }
                    }
                    #[cfg(not(feature = "tracing"))]
                    let _ = (suppress_retry_log, &err);

                    self.wait_before_retry(attempt - 1).await;
                }
            }
        }
    }

    /// Waits before retry number `retry` (zero-based).
    async fn wait_before_retry(&self, retry: usize) {
        let delay = self.options.retry.delay_for(retry);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying core request after {} ms", delay.as_millis());

        tokio::time::sleep(delay).await;
    }
}

fn decode_body(raw: String, json: bool) -> ResponseBody {
    if !json {
        return ResponseBody::Text(raw);
    }
    match serde_json::from_str(&raw) {
        Ok(value) => ResponseBody::Json(value),
        Err(_) => ResponseBody::Text(raw),
    }
}

fn into_envelope(response: HttpResponse, json: bool) -> ResponseEnvelope {
    ResponseEnvelope {
        status: response.status,
        headers: response.headers,
        body: decode_body(response.body, json),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{decode_body, CoreClient};
    use crate::{
        CoreConfig, EndpointMode, MemoryStore, RequestError, RequestOptions, ResponseBody,
    };

    fn static_client(uri: &str) -> CoreClient {
        let config = CoreConfig::new(
            EndpointMode::Static {
                uri: uri.to_owned(),
            },
            "0xnode",
        )
        .with_version("9.9.9");
        CoreClient::new(config, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn prepare_attaches_identity_headers_and_joins_path() {
        let client = static_client("https://core.example.com/");
        let prepared = client
            .prepare(
                "https://core.example.com/",
                &RequestOptions::get("/config").header("X-Trace", "abc").json(true),
            )
            .unwrap();

        assert_eq!(prepared.uri, "https://core.example.com/config");
        assert_eq!(prepared.headers["x-node-version"], "9.9.9");
        assert_eq!(prepared.headers["x-node-address"], "0xnode");
        assert_eq!(prepared.headers["x-trace"], "abc");
        assert_eq!(prepared.headers["content-type"], "application/json");
        assert_eq!(prepared.headers["accept-encoding"], "identity");
    }

    #[tokio::test]
    async fn prepare_rejects_unparseable_uri() {
        let client = static_client("https://core.example.com");
        let err = client
            .prepare("https://core example.com", &RequestOptions::get("/config"))
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidUri(_)));
    }

    #[test]
    fn json_body_falls_back_to_text() {
        assert_eq!(
            decode_body(r#"{"a":1}"#.to_owned(), true),
            ResponseBody::Json(json!({"a": 1}))
        );
        assert_eq!(
            decode_body("plain".to_owned(), true),
            ResponseBody::Text("plain".to_owned())
        );
        assert_eq!(
            decode_body(r#"{"a":1}"#.to_owned(), false),
            ResponseBody::Text(r#"{"a":1}"#.to_owned())
        );
    }
}
