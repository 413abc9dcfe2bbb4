//! Contract with the fetch collaborator
//!
//! The collaborator performs the real upstream call (including any retry or
//! pagination). The orchestrator is its only caller and sanitizes every header
//! it injects into the [`Connection`] before handing it over.

use crate::cache::headers::HeaderValue;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Callback a collaborator may apply to the raw response before returning it
pub type ResponseHook = Arc<dyn Fn(&mut FetchResponse) + Send + Sync>;

/// Description of the upstream request
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    pub method: String,
    pub host: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(skip)]
    pub response_hook: Option<ResponseHook>,
}

impl Connection {
    pub fn new(method: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn get(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new("GET", host, path)
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_response_hook(mut self, hook: ResponseHook) -> Self {
        self.response_hook = Some(hook);
        self
    }

    /// Attach a header only when a usable value is present.
    ///
    /// Returns whether the header was attached.
    pub fn attach_header(&mut self, name: &str, value: Option<&HeaderValue>) -> bool {
        match value {
            Some(value) => {
                self.headers
                    .insert(name.to_ascii_lowercase(), value.to_string());
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("method", &self.method)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .field("body", &self.body.as_ref().map(|b| b.len()))
            .field("response_hook", &self.response_hook.is_some())
            .finish()
    }
}

/// What the collaborator returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl FetchResponse {
    /// A 200 response carrying a body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: 200,
            headers: BTreeMap::new(),
            body: Some(body.into()),
        }
    }

    /// A 304 response
    pub fn not_modified() -> Self {
        Self {
            success: true,
            status_code: 304,
            ..Default::default()
        }
    }

    /// An unsuccessful response with the given status
    pub fn failed(status_code: u16) -> Self {
        Self {
            success: false,
            status_code,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_not_modified(&self) -> bool {
        self.success && self.status_code == 304
    }
}

/// The data-access function performing the real remote call
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, connection: Connection) -> Result<FetchResponse>;
}

#[async_trait]
impl<F, Fut> DataFetcher for F
where
    F: Fn(Connection) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse>> + Send + 'static,
{
    async fn fetch(&self, connection: Connection) -> Result<FetchResponse> {
        (self)(connection).await
    }
}
