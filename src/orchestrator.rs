//! Single entry point: normalizes caller input, picks an adapter,
//! forwards the call

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use log::{debug, error, info};

use crate::config::{OrchestratorConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::providers::Adapter;
use crate::request::{LlmRequest, LlmResponse, Message};

/// Accepted input shapes for `Orchestrator::generate`
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt
{   /// Fully built request; only explicit overrides touch it
    Request(LlmRequest)
  , /// Conversation using default sampling settings
    Messages(Vec<Message>)
  , /// Bare prompt, sent as one user message
    Text(String)
}

impl From<LlmRequest> for Prompt
{   fn from(req: LlmRequest) -> Self
    {   Prompt::Request(req)
    }
}

impl From<Vec<Message>> for Prompt
{   fn from(messages: Vec<Message>) -> Self
    {   Prompt::Messages(messages)
    }
}

impl From<String> for Prompt
{   fn from(text: String) -> Self
    {   Prompt::Text(text)
    }
}

impl From<&str> for Prompt
{   fn from(text: &str) -> Self
    {   Prompt::Text(text.to_string())
    }
}

/// Per-call overrides; unset fields fall back to configured defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions
{   pub provider: Option<String>
  , pub model: Option<String>
  , pub temperature: Option<f32>
  , pub max_tokens: Option<u32>
}

impl GenerateOptions
{   pub fn new() -> Self
    {   GenerateOptions::default()
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self
    {   self.provider = Some(provider.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self
    {   self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self
    {   self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self
    {   self.max_tokens = Some(max_tokens);
        self
    }
}

/// Builds the adapter used for one call
pub trait AdapterFactory: Send + Sync
{   fn build(
      &self
    , provider: crate::Provider
    , model: &str
    ) -> Result<Box<dyn Adapter>>;
}

impl<F> AdapterFactory for F
where
  F: Fn(crate::Provider, &str) -> Result<Box<dyn Adapter>> + Send + Sync
{   fn build(
      &self
    , provider: crate::Provider
    , model: &str
    ) -> Result<Box<dyn Adapter>>
    {   self(provider, model)
    }
}

/// Real vendor adapters, credentials and transport from the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAdapterFactory;

impl AdapterFactory for EnvAdapterFactory
{   fn build(
      &self
    , provider: crate::Provider
    , model: &str
    ) -> Result<Box<dyn Adapter>>
    {   crate::providers::build_adapter(
          provider,
          model,
          &ProviderConfig::from_env(provider)
        )
    }
}

/// Read-only view of the configured defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorInfo
{   pub default_provider: String
  , pub default_model: String
}

/// Provider-agnostic front door for LLM calls.
/// Holds no per-call state and is safe to share between tasks.
#[derive(Clone)]
pub struct Orchestrator
{   config: OrchestratorConfig
  , factory: Arc<dyn AdapterFactory>
}

impl std::fmt::Debug for Orchestrator
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("Orchestrator")
          .field("config", &self.config)
          .finish_non_exhaustive()
    }
}

impl Orchestrator
{   /// Defaults from the arguments, else environment, else fallback
    pub fn new(
      default_provider: Option<String>
    , default_model: Option<String>
    ) -> Self
    {   Orchestrator::with_factory(
          OrchestratorConfig::resolve(default_provider, default_model),
          EnvAdapterFactory
        )
    }

    pub fn from_env() -> Self
    {   Orchestrator::new(None, None)
    }

    /// Orchestrator using a caller-supplied adapter factory
    pub fn with_factory(
      config: OrchestratorConfig
    , factory: impl AdapterFactory + 'static
    ) -> Self
    {   Orchestrator
        {   config
          , factory: Arc::new(factory)
        }
    }

    pub fn config(&self) -> &OrchestratorConfig
    {   &self.config
    }

    pub fn info(&self) -> OrchestratorInfo
    {   OrchestratorInfo
        {   default_provider: self.config.default_provider.clone()
          , default_model: self.config.default_model.clone()
        }
    }

    /// Pick provider and model for a call without touching defaults.
    /// A model override wins; otherwise the default model applies to
    /// the default provider and other providers use their own default.
    pub fn resolve_target(
      &self
    , options: &GenerateOptions
    ) -> Result<(crate::Provider, String)>
    {   let name = options.provider
          .as_deref()
          .unwrap_or(&self.config.default_provider);
        let provider = crate::Provider::from_name(name)?;

        let model = match options.model.as_deref()
        {   Some(model) if !model.trim().is_empty() => model.to_string()
          , _ => {
              let default_is_same = crate::Provider::from_name(
                  &self.config.default_provider
                )
                .map(|p| p == provider)
                .unwrap_or(false);
              if default_is_same
              {   self.config.default_model.clone()
              } else
              {   provider.default_model().to_string()
              }
            }
        };
        Ok((provider, model))
    }

    /// Collapse any accepted input shape into one validated request
    pub fn normalize(
      input: Prompt
    , options: &GenerateOptions
    ) -> Result<LlmRequest>
    {   let request = match input
        {   Prompt::Request(mut req) => {
              if let Some(t) = options.temperature
              {   req.temperature = t;
              }
              if let Some(n) = options.max_tokens
              {   req.max_tokens = Some(n);
              }
              req
            }
          , Prompt::Text(text) => {
              if text.trim().is_empty()
              {   return Err(Error::InvalidRequest(
                    "no prompt text provided".to_string()
                  ));
              }
              apply_sampling(LlmRequest::from_prompt(text), options)
            }
          , Prompt::Messages(messages) => {
              if messages.is_empty()
              {   return Err(Error::InvalidRequest(
                    "no messages provided".to_string()
                  ));
              }
              apply_sampling(LlmRequest::new(messages), options)
            }
        };
        request.validate()?;
        Ok(request)
    }

    /// Normalize `input`, build the selected adapter and forward the call.
    /// Adapter errors propagate unchanged.
    pub async fn generate(
      &self
    , input: impl Into<Prompt>
    , options: GenerateOptions
    ) -> Result<LlmResponse>
    {   let (provider, model) = self.resolve_target(&options)
          .map_err(|e| {
            error!("{}", e);
            e
          })?;
        let request = Orchestrator::normalize(input.into(), &options)?;
        debug!(
          "Dispatching {} message(s) to {}:{}",
          request.messages.len(), provider, model
        );

        let adapter = self.factory.build(provider, &model)?;
        let response = adapter.generate(&request).await?;

        info!(
          "{}:{} finished ({:?}), {} tokens",
          provider,
          response.model_name.as_deref().unwrap_or(&model),
          response.finish_reason,
          response.usage.total_tokens
        );
        Ok(response)
    }
}

fn apply_sampling(mut req: LlmRequest, options: &GenerateOptions) -> LlmRequest
{   if let Some(t) = options.temperature
    {   req.temperature = t;
    }
    req.max_tokens = options.max_tokens;
    req
}
