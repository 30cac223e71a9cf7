//! HTTP client for the hosted recovery API.
//!
//! Each [`Mutation`] maps to exactly one endpoint through a static `match`;
//! there is no runtime path lookup.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::StepsyncError;
use crate::sync::operation::Mutation;

/// Boxed future returned by [`RemoteApi`] calls.
pub type RemoteFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, StepsyncError>> + Send + 'a>>;

/// Remote operation dispatch.
///
/// Implementations submit one mutation and resolve to the server's response
/// body, or fail. Success means the server has durably accepted the write.
pub trait RemoteApi: Send + Sync {
    /// Submit a mutation.
    ///
    /// `idempotency_key` is set when replaying a queued item so the server can
    /// collapse duplicate deliveries.
    fn execute<'a>(&'a self, mutation: &'a Mutation, idempotency_key: Option<&'a str>) -> RemoteFuture<'a>;
}

/// Method, path, and body for one mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// HTTP method
    pub method: Method,
    /// Unencoded path segments below the base URL.
    pub segments: Vec<String>,
    /// JSON body, absent for deletes
    pub body: Option<Value>,
}

impl Endpoint {
    fn new(method: Method, segments: &[&str], body: Option<Value>) -> Self {
        Self {
            method,
            segments: segments.iter().map(ToString::to_string).collect(),
            body,
        }
    }

    /// Join this endpoint onto `base`.
    ///
    /// Each segment is percent-encoded on its own, so an id containing `/`,
    /// `?` or `#` stays inside its segment.
    ///
    /// # Errors
    ///
    /// Returns `StepsyncError::Config` if `base` cannot carry a path.
    pub fn url(&self, base: &Url) -> Result<Url, StepsyncError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| StepsyncError::Config(format!("remote.base_url cannot take a path: {base}")))?
            .pop_if_empty()
            .extend(&self.segments);
        Ok(url)
    }
}

/// Resolve a mutation to its HTTP endpoint.
///
/// A daily check-in without a date is sent to the collection and the server
/// files it under its current day.
///
/// # Errors
///
/// Returns `InvalidPayload` if the mutation fails validation and
/// `StepsyncError::Parse` if the payload cannot be encoded.
pub fn endpoint_for(mutation: &Mutation) -> Result<Endpoint, StepsyncError> {
    mutation.validate()?;
    let body = Some(mutation.payload_value()?);
    let endpoint = match mutation {
        Mutation::JournalCreate(_) => Endpoint::new(Method::POST, &["journal-entries"], body),
        Mutation::JournalUpdate(p) => Endpoint::new(Method::PATCH, &["journal-entries", p.id.as_str()], body),
        Mutation::JournalDelete(p) => Endpoint::new(Method::DELETE, &["journal-entries", p.id.as_str()], None),
        Mutation::DailyEntryUpsert(p) => match p.date {
            Some(date) => Endpoint::new(Method::PUT, &["daily-entries", date.to_string().as_str()], body),
            None => Endpoint::new(Method::PUT, &["daily-entries"], body),
        },
        Mutation::StepEntryUpsert(p) => Endpoint::new(
            Method::PUT,
            &["step-entries", p.step_number.to_string().as_str(), p.question_index.to_string().as_str()],
            body,
        ),
        Mutation::RoutineCreate(_) => Endpoint::new(Method::POST, &["routines"], body),
        Mutation::RoutineUpdate(p) => Endpoint::new(Method::PATCH, &["routines", p.id.as_str()], body),
        Mutation::RoutineDelete(p) => Endpoint::new(Method::DELETE, &["routines", p.id.as_str()], None),
        Mutation::ProfileUpdate(_) => Endpoint::new(Method::PATCH, &["profile"], body),
    };
    Ok(endpoint)
}

/// [`RemoteApi`] over HTTPS with a bearer token.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpRemote {
    /// Build a client from remote settings.
    ///
    /// # Errors
    ///
    /// Returns `StepsyncError::Config` if the base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, StepsyncError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| StepsyncError::Config(format!("Invalid remote.base_url '{}': {e}", config.base_url)))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StepsyncError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    async fn send(&self, mutation: &Mutation, idempotency_key: Option<&str>) -> Result<Value, StepsyncError> {
        let endpoint = endpoint_for(mutation)?;
        let url = endpoint.url(&self.base_url)?;

        let mut request = self.client.request(endpoint.method.clone(), url.clone());
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        if let Some(body) = &endpoint.body {
            request = request.json(body);
        }

        tracing::debug!(method = %endpoint.method, %url, "sending mutation");
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StepsyncError::Remote {
                status: status.as_u16(),
                message: if text.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    text
                },
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Check whether the API host answers at all.
    ///
    /// Any HTTP response, including an error status, counts as reachable.
    pub async fn ping(&self, timeout: Duration) -> bool {
        match self.client.head(self.base_url.clone()).timeout(timeout).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "reachability probe failed");
                false
            },
        }
    }
}

impl RemoteApi for HttpRemote {
    fn execute<'a>(&'a self, mutation: &'a Mutation, idempotency_key: Option<&'a str>) -> RemoteFuture<'a> {
        Box::pin(self.send(mutation, idempotency_key))
    }
}
