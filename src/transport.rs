use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::TransportError;

/// Per-call request description, created fresh for every call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// Path appended to the endpoint base URI, e.g. `/config`.
    pub path: String,
    /// Header names are stored lowercased, so each name appears once.
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    /// Send and accept JSON; decode the response body as JSON.
    pub json: bool,
    /// Negotiate compressed transfer.
    pub gzip: bool,
    /// Return status and headers along with the body.
    pub full_response: bool,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            query: Vec::new(),
            body: None,
            json: false,
            gzip: false,
            full_response: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and turns on JSON content negotiation.
    pub fn json_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self.json = true;
        self
    }

    pub fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    pub fn full_response(mut self, enabled: bool) -> Self {
        self.full_response = enabled;
        self
    }
}

/// Fully resolved request handed to an [`HttpTransport`]. Reused across attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub json: bool,
    pub timeout: Duration,
}

/// Successful (2xx) response as seen by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Json(JsonValue),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Status, headers and decoded body of a response.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

/// Result of [`CoreClient::request`](crate::CoreClient::request).
#[derive(Clone, Debug, PartialEq)]
pub enum CoreReply {
    Body(ResponseBody),
    /// Returned when [`RequestOptions::full_response`] is set.
    Envelope(ResponseEnvelope),
}

impl CoreReply {
    pub fn body(&self) -> &ResponseBody {
        match self {
            Self::Body(body) => body,
            Self::Envelope(envelope) => &envelope.body,
        }
    }

    pub fn into_body(self) -> ResponseBody {
        match self {
            Self::Body(body) => body,
            Self::Envelope(envelope) => envelope.body,
        }
    }
}

/// HTTP boundary.
///
/// Non-2xx responses must be reported as [`TransportError::Status`], a
/// request that obtained no response at all as [`TransportError::NoResponse`],
/// and a request that could not be built as [`TransportError::Invalid`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.uri.as_str())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = if request.json {
                builder.json(body)
            } else {
                builder.body(body.to_string())
            };
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::NoResponse(err.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

/// Separates "no response was obtained" from requests that never left the
/// process, such as a header value reqwest refuses to encode.
fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        TransportError::NoResponse(err.to_string())
    } else {
        TransportError::Invalid(err.to_string())
    }
}
