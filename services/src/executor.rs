use anyhow::Result;
use restbench_shared::{ExecuteRequest, ResponseBody};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Identifying user agent; overrides any caller-supplied value
pub const CLIENT_USER_AGENT: &str = "REST-Client/1.0";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Width of the `method` history column
pub const MAX_METHOD_LEN: usize = 16;

/// Problems with the request description itself. Nothing is dispatched or recorded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("URL is required")]
    MissingUrl,
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("HTTP method is longer than {} characters", MAX_METHOD_LEN)]
    MethodTooLong,
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),
    #[error("Invalid value for header {0}")]
    InvalidHeaderValue(String),
}

/// Transport-level failure: the remote never produced a response
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
    pub response_time_ms: u64,
    pub timed_out: bool,
}

impl ExecutionFailure {
    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }

    /// Text shown to the caller and stored as the record's response
    pub fn client_message(&self) -> String {
        format!("Request failed: {}", self.message)
    }
}

/// Validated request, ready to dispatch
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    /// Caller headers as submitted, without the fixed user agent
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    header_map: HeaderMap,
}

impl PreparedRequest {
    pub fn from_request(request: &ExecuteRequest) -> Result<Self, InvalidRequest> {
        let url = match request.url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.to_string(),
            _ => return Err(InvalidRequest::MissingUrl),
        };

        if request.method.len() > MAX_METHOD_LEN {
            return Err(InvalidRequest::MethodTooLong);
        }
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| InvalidRequest::InvalidMethod(request.method.clone()))?;

        let headers = request.headers.clone().unwrap_or_default();
        let mut header_map = HeaderMap::with_capacity(headers.len() + 1);
        for (name, value) in &headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| InvalidRequest::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| InvalidRequest::InvalidHeaderValue(name.clone()))?;
            header_map.insert(header_name, header_value);
        }
        header_map.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        Ok(Self {
            method,
            url,
            headers,
            body: request.body.clone(),
            header_map,
        })
    }

    /// Headers actually sent on the wire
    pub fn outbound_headers(&self) -> &HeaderMap {
        &self.header_map
    }

    /// Only POST, PUT and PATCH carry a body; it is dropped for other methods
    pub fn outbound_body(&self) -> Option<&str> {
        match self.method {
            Method::POST | Method::PUT | Method::PATCH => self.body.as_deref(),
            _ => None,
        }
    }
}

/// Successful round trip, whatever the remote status
#[derive(Debug, Clone)]
pub struct Execution {
    pub body: ResponseBody,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub response_time_ms: u64,
}

pub struct RequestExecutor {
    client: Client,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one outbound call and wait for the full body.
    pub async fn execute(&self, request: &PreparedRequest) -> Result<Execution, ExecutionFailure> {
        log::debug!("Dispatching {} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.outbound_headers().clone());

        if let Some(body) = request.outbound_body() {
            builder = builder.body(body.to_string());
        }

        let started = Instant::now();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.failure(e, started)),
        };

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.failure(e, started)),
        };
        let response_time_ms = elapsed_ms(started);

        let body = classify_body(&bytes, is_json, &request.url);

        log::debug!(
            "{} {} -> {} in {}ms",
            request.method,
            request.url,
            status,
            response_time_ms
        );

        Ok(Execution {
            body,
            status,
            headers,
            response_time_ms,
        })
    }

    fn failure(&self, error: reqwest::Error, started: Instant) -> ExecutionFailure {
        let response_time_ms = elapsed_ms(started);
        let timed_out = error.is_timeout();
        let message = if timed_out {
            format!("Request timed out after {}s", self.timeout.as_secs_f64())
        } else {
            error_chain(&error)
        };

        log::error!("Outbound request failed after {}ms: {}", response_time_ms, message);

        ExecutionFailure {
            message,
            response_time_ms,
            timed_out,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// JSON-declared bodies that fail to decode are kept as raw text
fn classify_body(bytes: &[u8], is_json: bool, url: &str) -> ResponseBody {
    if is_json {
        match serde_json::from_slice(bytes) {
            Ok(value) => return ResponseBody::Structured(value),
            Err(e) => {
                log::warn!("Response from {} declared JSON but failed to decode: {}", url, e);
            }
        }
    }
    ResponseBody::Raw(String::from_utf8_lossy(bytes).into_owned())
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
