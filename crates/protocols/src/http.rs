//! HTTP adapter
//!
//! The request body goes to the route's endpoint URL, metadata entries
//! become headers, and the reply status/headers/body are carried back as an
//! [`HttpResponse`].

use std::any::Any;
use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use contracts::{CallError, Caller, Metadata, Protocol, Request, Response};
use reqwest::{Client, Method};
use tracing::{debug, instrument};

/// Outgoing HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    headers: Metadata,
    body: Bytes,
}

impl HttpRequest {
    /// Create a request with an explicit method
    pub fn new(method: Method, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            headers: Metadata::new(),
            body: body.into(),
        }
    }

    /// Create a `POST` request
    pub fn post(body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, body)
    }

    /// Add a header (repeated keys keep every value)
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl Request for HttpRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    fn payload(&self) -> &Bytes {
        &self.body
    }

    fn metadata(&self) -> &Metadata {
        &self.headers
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// HTTP reply
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: Metadata,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Metadata::new(),
            body: body.into(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// Raw HTTP status
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl Response for HttpResponse {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    fn payload(&self) -> &Bytes {
        &self.body
    }

    fn status_code(&self) -> i32 {
        i32::from(self.status)
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn metadata(&self) -> &Metadata {
        &self.headers
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.headers
    }
}

/// Caller that sends requests to one HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpCaller {
    client: Client,
    endpoint: String,
    /// Method used for requests that are not [`HttpRequest`]s
    default_method: Method,
}

impl HttpCaller {
    /// Create a caller for `endpoint`
    ///
    /// Idle connections are not kept, so every call opens its own direct
    /// connection to the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CallError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| CallError::transport(&endpoint, e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            default_method: Method::POST,
        })
    }

    /// Create from route params
    ///
    /// Recognised params:
    /// - `method`: method for requests that don't carry one (default `POST`)
    pub fn from_params(
        endpoint: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, CallError> {
        let mut caller = Self::new(endpoint)?;
        if let Some(method) = params.get("method") {
            caller.default_method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| CallError::encoding(format!("invalid HTTP method '{method}'")))?;
        }
        Ok(caller)
    }

    fn method_for(&self, request: &dyn Request) -> Method {
        request
            .as_any()
            .downcast_ref::<HttpRequest>()
            .map(|r| r.method().clone())
            .unwrap_or_else(|| self.default_method.clone())
    }
}

#[async_trait]
impl Caller for HttpCaller {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(
        name = "http_caller_call",
        skip(self, request),
        fields(endpoint = %self.endpoint)
    )]
    async fn call(&self, request: &dyn Request) -> Result<Box<dyn Response>, CallError> {
        let mut builder = self
            .client
            .request(self.method_for(request), &self.endpoint)
            .body(request.payload().clone());

        for (key, values) in request.metadata().iter() {
            for value in values {
                builder = builder.header(key, value.as_str());
            }
        }

        let reply = builder
            .send()
            .await
            .map_err(|e| CallError::transport(&self.endpoint, e.to_string()))?;

        let status = reply.status().as_u16();
        let mut headers = Metadata::new();
        for (name, value) in reply.headers() {
            if let Ok(value) = value.to_str() {
                headers.append(name.as_str(), value);
            }
        }

        let body = reply
            .bytes()
            .await
            .map_err(|e| CallError::transport(&self.endpoint, e.to_string()))?;

        debug!(status, bytes = body.len(), "HTTP reply received");

        Ok(Box::new(HttpResponse {
            status,
            headers,
            body,
        }))
    }
}
