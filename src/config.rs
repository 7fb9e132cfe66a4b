//! Configuration for providers and orchestrator defaults

use serde::{Deserialize, Serialize};
use log::{debug, warn};

/// Provider used when neither caller nor environment pick one
pub const FALLBACK_PROVIDER: &str = "openai";

/// Model used when neither caller nor environment pick one
pub const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Wall-clock limit for a single vendor call
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PROVIDER_ENV: &str = "DEFAULT_PROVIDER";
pub const DEFAULT_MODEL_ENV: &str = "DEFAULT_MODEL";
pub const TIMEOUT_ENV: &str = "LLM_TIMEOUT_SECS";

/// Read an environment variable, treating blank values as unset
pub fn env_value(name: &str) -> Option<String>
{   std::env::var(name)
      .ok()
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
}

/// Transport settings for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: u64
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: None
          , timeout_secs: DEFAULT_TIMEOUT_SECS
        }
    }
}

impl ProviderConfig
{   /// Settings for `provider` taken from the process environment
    pub fn from_env(provider: crate::Provider) -> Self
    {   let api_base = env_value(provider.api_base_env());
        let timeout_secs = match env_value(TIMEOUT_ENV)
        {   Some(raw) => match raw.parse::<u64>()
            {   Ok(secs) if secs > 0 => secs
              , _ => {
                  warn!(
                    "Ignoring invalid {}={:?}, using {}s",
                    TIMEOUT_ENV, raw, DEFAULT_TIMEOUT_SECS
                  );
                  DEFAULT_TIMEOUT_SECS
                }
            }
          , None => DEFAULT_TIMEOUT_SECS
        };
        debug!(
          "{} transport: base={:?} timeout={}s",
          provider.name(), api_base, timeout_secs
        );
        ProviderConfig
        {   api_base
          , timeout_secs
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = Some(api_base.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self
    {   self.timeout_secs = timeout_secs;
        self
    }
}

/// Process-wide orchestrator defaults, read-only once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig
{   /// Provider name, lowercased; validated at call time
    pub default_provider: String
  , /// Model used with the default provider
    pub default_model: String
}

impl Default for OrchestratorConfig
{   fn default() -> Self
    {   OrchestratorConfig
        {   default_provider: FALLBACK_PROVIDER.to_string()
          , default_model: FALLBACK_MODEL.to_string()
        }
    }
}

impl OrchestratorConfig
{   /// Resolve from explicit values, else environment, else fallback.
    /// Without a model the provider's own default model applies.
    /// Never fails: an unknown provider name only matters at call time.
    pub fn resolve(
      default_provider: Option<String>
    , default_model: Option<String>
    ) -> Self
    {   let default_provider = default_provider
          .map(|p| p.trim().to_string())
          .filter(|p| !p.is_empty())
          .or_else(|| env_value(DEFAULT_PROVIDER_ENV))
          .unwrap_or_else(|| FALLBACK_PROVIDER.to_string())
          .to_lowercase();
        let default_model = default_model
          .map(|m| m.trim().to_string())
          .filter(|m| !m.is_empty())
          .or_else(|| env_value(DEFAULT_MODEL_ENV))
          .unwrap_or_else(|| {
            crate::Provider::from_name(&default_provider)
              .map(|p| p.default_model())
              .unwrap_or(FALLBACK_MODEL)
              .to_string()
          });
        debug!(
          "Orchestrator defaults: provider={} model={}",
          default_provider, default_model
        );
        OrchestratorConfig
        {   default_provider
          , default_model
        }
    }

    pub fn from_env() -> Self
    {   OrchestratorConfig::resolve(None, None)
    }
}
