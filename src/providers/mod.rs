//! LLM provider implementations

pub mod openai;
pub mod anthropic;

use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::request::{LlmRequest, LlmResponse};

// Re-export for convenience
pub use openai::OpenAiAdapter;
pub use anthropic::AnthropicAdapter;

/// One vendor's wire contract behind the canonical request/response.
///
/// Implementations perform exactly one outbound call per `generate`,
/// never retry, and translate every vendor failure into the crate
/// error taxonomy.
#[async_trait]
pub trait Adapter: Send + Sync
{   /// Vendor this adapter talks to
    fn provider(&self) -> crate::Provider;

    /// Model sent with every request
    fn model(&self) -> &str;

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Construct the adapter for `provider`, reading its credential from
/// the environment. Fails before any network activity when the key
/// is missing.
pub fn build_adapter(
  provider: crate::Provider
, model: &str
, config: &crate::config::ProviderConfig
) -> Result<Box<dyn Adapter>>
{   debug!("Building {} adapter for model {}", provider, model);
    match provider
    {   crate::Provider::OpenAI => {
          Ok(Box::new(OpenAiAdapter::new(model, config)?))
        }
      , crate::Provider::Anthropic => {
          Ok(Box::new(AnthropicAdapter::new(model, config)?))
        }
    }
}

/// Read the credential for `provider`; missing or blank is fatal
pub fn credential(provider: crate::Provider) -> Result<String>
{   let var = provider.credential_env();
    crate::config::env_value(var).ok_or_else(|| {
      error!("{} not set in environment", var);
      Error::Configuration(format!("{} not set in environment", var))
    })
}

/// HTTP client honouring the configured wall-clock timeout
pub(crate) fn http_client(
  config: &crate::config::ProviderConfig
) -> Result<reqwest::Client>
{   reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| {
        error!("Failed to build HTTP client: {}", e);
        Error::Configuration(format!("HTTP client: {}", e))
      })
}

/// Endpoint URL under the configured (or vendor default) base
pub(crate) fn endpoint(
  provider: crate::Provider
, config: &crate::config::ProviderConfig
, path: &str
) -> String
{   let base = config.api_base
      .as_deref()
      .unwrap_or_else(|| provider.default_api_base());
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Map a transport failure from reqwest
pub(crate) fn transport_error(
  provider: crate::Provider
, e: reqwest::Error
) -> Error
{   error!("{} transport error: {}", provider, e);
    if e.is_timeout()
    {   Error::ConnectionFailed(format!("{} request timed out", provider))
    } else if e.is_connect() || e.is_request() || e.is_body()
    {   Error::ConnectionFailed(format!("{}: {}", provider, e))
    } else
    {   Error::VendorError(format!("{}: {}", provider, e))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope
{   error: ErrorDetail
}

#[derive(Debug, Deserialize)]
struct ErrorDetail
{   message: String
}

/// Map a non-success HTTP status and its body.
/// Both vendors nest the human readable text under `error.message`.
pub(crate) fn status_error(
  provider: crate::Provider
, status: reqwest::StatusCode
, body: &str
) -> Error
{   let message = serde_json::from_str::<ErrorEnvelope>(body)
      .map(|env| env.error.message)
      .unwrap_or_else(|_| {
        if body.trim().is_empty()
        {   status.to_string()
        } else
        {   body.trim().to_string()
        }
      });
    error!("{} API error ({}): {}", provider, status, message);
    match status.as_u16()
    {   429 => Error::RateLimited(message)
      , 401 | 403 => Error::AuthenticationFailed(message)
      , _ => Error::VendorError(
          format!("{} error ({}): {}", provider, status, message)
        )
    }
}

/// Send a prepared request and decode the JSON body, translating
/// transport, status and decoding failures.
pub(crate) async fn send_json<T>(
  provider: crate::Provider
, request: reqwest::RequestBuilder
) -> Result<T>
where
  T: serde::de::DeserializeOwned
{   let response = request
      .send()
      .await
      .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    log::trace!("{} response status: {}", provider, status);

    if !status.is_success()
    {   let body = response.text().await.unwrap_or_default();
        return Err(status_error(provider, status, &body));
    }

    let body = response
      .text()
      .await
      .map_err(|e| transport_error(provider, e))?;
    log::trace!("{} response body: {}", provider, body);

    serde_json::from_str(&body).map_err(|e| {
      error!("{} parse error: {}", provider, e);
      Error::VendorError(
        format!("{} returned an unreadable reply: {}", provider, e)
      )
    })
}
