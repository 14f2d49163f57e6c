use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::payload::{BuildRequest, DEFAULT_PAYLOAD_TEMPLATE, PayloadError, render_payload};

/// Environment variable holding the registry API access token.
pub const ACCESS_TOKEN_VAR: &str = "QUAYIO_ACCESSTOKEN";

pub const DEFAULT_REGISTRY: &str = "quay.io";

/// Registry endpoint and credentials, built once at start-up.
///
/// The access token is wrapped in [`SecretString`] and redacted from debug output.
#[derive(Clone)]
pub struct RegistrySettings {
    pub host: String,
    pub access_token: Option<SecretString>,
}

impl fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("host", &self.host)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RegistrySettings {
    /// Read the access token from [`ACCESS_TOKEN_VAR`]; blank values count as unset.
    pub fn from_env(host: impl Into<String>) -> Self {
        let access_token = match std::env::var(ACCESS_TOKEN_VAR) {
            Ok(token) if !token.trim().is_empty() => Some(SecretString::from(token)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(var = ACCESS_TOKEN_VAR, error = %e, "access token not available");
                None
            }
        };
        Self {
            host: host.into(),
            access_token,
        }
    }
}

/// Raw HTTP response from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over the registry HTTP API for testability.
///
/// Production code uses [`HttpRegistry`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait RegistryApi: Send + Sync {
    /// POST a JSON `body` to `url` with bearer authorization.
    async fn post_json(
        &self,
        url: &str,
        token: &SecretString,
        body: String,
    ) -> Result<ApiResponse, ApiError>;
}

/// [`RegistryApi`] over HTTPS via reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpRegistry {
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryApi for HttpRegistry {
    async fn post_json(
        &self,
        url: &str,
        token: &SecretString,
        body: String,
    ) -> Result<ApiResponse, ApiError> {
        let transport = |e| ApiError::Transport {
            url: url.to_owned(),
            source: e,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        Ok(ApiResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    id: String,
    repository: RepositoryRef,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    namespace: String,
    name: String,
}

/// A build accepted by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub id: String,
    pub namespace: String,
    pub name: String,
    /// Full response document.
    pub body: serde_json::Value,
}

impl BuildResult {
    /// Web page showing the build's progress.
    pub fn status_url(&self, host: &str) -> String {
        format!(
            "https://{host}/repository/{}/{}/build/{}",
            self.namespace, self.name, self.id
        )
    }

    pub fn pretty_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.body)
    }
}

/// Triggers registry builds, parameterized over the API for testability.
pub struct BuildTrigger<A: RegistryApi = HttpRegistry> {
    api: A,
    settings: RegistrySettings,
    payload_template: String,
}

impl BuildTrigger<HttpRegistry> {
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_api(HttpRegistry::new(), settings)
    }
}

impl<A: RegistryApi> BuildTrigger<A> {
    pub fn with_api(api: A, settings: RegistrySettings) -> Self {
        Self {
            api,
            settings,
            payload_template: DEFAULT_PAYLOAD_TEMPLATE.to_owned(),
        }
    }

    pub fn with_payload_template(mut self, template: impl Into<String>) -> Self {
        self.payload_template = template.into();
        self
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// `https://<host>/api/v1/repository/<org>/<repo>/build/`
    pub fn build_url(&self, repository: &str) -> String {
        format!(
            "https://{}/api/v1/repository/{}/build/",
            self.settings.host.trim_end_matches('/'),
            repository.trim_matches('/')
        )
    }

    /// Render the payload for `request` and submit it.
    ///
    /// Fails with [`TriggerError::MissingAccessToken`] before any request is
    /// made when no token is configured.
    pub async fn trigger(&self, request: &BuildRequest) -> Result<BuildResult, TriggerError> {
        let token = self
            .settings
            .access_token
            .as_ref()
            .ok_or(TriggerError::MissingAccessToken {
                var: ACCESS_TOKEN_VAR,
            })?;

        let payload = render_payload(&self.payload_template, request)
            .map_err(|e| TriggerError::Payload { source: e })?;
        let url = self.build_url(&request.repository);
        tracing::debug!(%url, %payload, "triggering build");

        let response = self
            .api
            .post_json(&url, token, payload)
            .await
            .map_err(|e| TriggerError::Api { source: e })?;

        if !response.is_success() {
            return Err(TriggerError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let body: serde_json::Value =
            serde_json::from_str(&response.body).map_err(|e| TriggerError::InvalidResponse {
                body: response.body.clone(),
                source: e,
            })?;
        let parsed: BuildResponse = serde_json::from_value(body.clone()).map_err(|e| {
            TriggerError::InvalidResponse {
                body: response.body.clone(),
                source: e,
            }
        })?;

        Ok(BuildResult {
            id: parsed.id,
            namespace: parsed.repository.namespace,
            name: parsed.repository.name,
            body,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed")]
    Transport { url: String, source: reqwest::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("{var} environment variable is required to trigger a build")]
    MissingAccessToken { var: &'static str },

    #[error("failed to build the request payload")]
    Payload { source: PayloadError },

    #[error("registry request failed")]
    Api { source: ApiError },

    #[error("registry rejected the build (HTTP {status})")]
    Rejected { status: u16, body: String },

    #[error("unexpected registry response")]
    InvalidResponse {
        body: String,
        source: serde_json::Error,
    },
}
