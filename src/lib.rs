pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod retry;
pub mod orchestrator;
pub mod recovery;
pub mod compose;
use serde::{Deserialize, Serialize};

/*

orbitllm is the async backend of a rocket sketching prototype: a user
draws a rocket, a heuristic turns the drawing into a parametric spec,
and an LLM composes mission content (launch sites, lunar sites, bill
of materials, advice) around that spec. Every call goes through one
request syntax no matter which vendor sits behind it, and every reply
is recovered into structured data even when the model formats it
badly.

orbitllm/
├── Cargo.toml
├── src/
│   ├── lib.rs           # Re-exports and the closed provider set
│   ├── main.rs          # Command line front end (chat, info, advise, concept)
│   ├── error.rs         # Error taxonomy
│   ├── config.rs        # Orchestrator defaults and provider transport
│   ├── request.rs       # Canonical message/request/response types
│   ├── orchestrator.rs  # Input normalization and provider dispatch
│   ├── recovery.rs      # JSON recovery from free-text model output
│   ├── retry.rs         # Caller-side backoff for retryable errors
│   ├── providers/       # One adapter per vendor wire contract
│   │   ├── mod.rs
│   │   ├── openai.rs
│   │   └── anthropic.rs
│   └── compose/         # Mission planning, prompts, concept, advisor
└── tests/

*/

pub use error::{Error, Result};
pub use config::{OrchestratorConfig, ProviderConfig};
pub use request::{LlmRequest, LlmResponse, Message, Role, Usage};
pub use orchestrator::{
  AdapterFactory, EnvAdapterFactory, GenerateOptions, Orchestrator
, OrchestratorInfo, Prompt
};
pub use providers::Adapter;
pub use retry::RetryPolicy;

/// Closed set of supported LLM vendors.
/// Adding a vendor means adding a variant and an adapter module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// OpenAI chat completions (GPT models)
    OpenAI
  , /// Anthropic messages API (Claude models)
    #[serde(rename = "claude", alias = "anthropic")]
    Anthropic
}

impl Provider
{   pub const ALL: [Provider; 2] = [Provider::OpenAI, Provider::Anthropic];

    /// Look up a provider by its public name, case-insensitive
    pub fn from_name(name: &str) -> Result<Provider>
    {   match name.trim().to_lowercase().as_str()
        {   "openai" => Ok(Provider::OpenAI)
          , "claude" | "anthropic" => Ok(Provider::Anthropic)
          , _ => Err(Error::UnknownProvider(name.to_string()))
        }
    }

    /// Canonical public name
    pub fn name(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
          , Provider::Anthropic => "claude"
        }
    }

    /// Environment variable holding the API credential
    pub fn credential_env(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "OPENAI_API_KEY"
          , Provider::Anthropic => "ANTHROPIC_API_KEY"
        }
    }

    /// Environment variable overriding the API base URL
    pub fn api_base_env(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "OPENAI_API_BASE"
          , Provider::Anthropic => "ANTHROPIC_API_BASE"
        }
    }

    pub fn default_api_base(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "https://api.openai.com/v1"
          , Provider::Anthropic => "https://api.anthropic.com/v1"
        }
    }

    /// Model used when this provider is picked without a model
    pub fn default_model(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "gpt-4o-mini"
          , Provider::Anthropic => "claude-3-opus-20240229"
        }
    }
}

impl std::fmt::Display for Provider
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.name())
    }
}
