//! The transport seam between the service and whatever answers schema queries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::{IntrospectionRequest, IntrospectionResponse, SchemaOption};
use crate::config::IntrospectionSettings;
use crate::error::IntrospectionError;

/// Something that can answer schema introspection requests.
///
/// Each call is independent; implementations must not assume calls arrive or
/// complete in order.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    async fn introspect(
        &self,
        request: IntrospectionRequest,
    ) -> Result<Vec<SchemaOption>, IntrospectionError>;
}

/// Backend reached over HTTP: requests are POSTed as JSON to a single endpoint.
pub struct HttpSchemaBackend {
    endpoint: String,
    http: Client,
    timeout: Duration,
}

impl HttpSchemaBackend {
    pub fn from_settings(settings: &IntrospectionSettings) -> Result<Self, IntrospectionError> {
        debug!(
            endpoint = %settings.endpoint,
            timeout_ms = settings.timeout_ms,
            "from_settings: called"
        );
        let timeout = settings.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntrospectionError::BackendUnreachable(e.to_string()))?;
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            http,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn map_transport_error(&self, error: reqwest::Error) -> IntrospectionError {
        if error.is_timeout() {
            IntrospectionError::Timeout(self.timeout_ms())
        } else if error.is_decode() {
            IntrospectionError::Protocol(error.to_string())
        } else {
            IntrospectionError::BackendUnreachable(error.to_string())
        }
    }
}

#[async_trait]
impl SchemaBackend for HttpSchemaBackend {
    async fn introspect(
        &self,
        request: IntrospectionRequest,
    ) -> Result<Vec<SchemaOption>, IntrospectionError> {
        debug!(endpoint = %self.endpoint, "introspect: sending request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        debug!(%status, "introspect: response received");
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(IntrospectionError::InvalidQuery(body));
        }
        if status.is_server_error() {
            return Err(IntrospectionError::BackendUnreachable(format!(
                "backend returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(IntrospectionError::Protocol(format!(
                "unexpected status {}",
                status
            )));
        }

        let body: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        body.into_result(self.timeout_ms())
    }
}
