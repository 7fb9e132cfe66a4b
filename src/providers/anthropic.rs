use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::request::{LlmRequest, LlmResponse, Role, Usage};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API requires `max_tokens`; used when the request has none
pub const DEFAULT_MAX_TOKENS: u32 = 256;

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest
{   pub model: String
  , pub max_tokens: u32
  , pub temperature: f32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>
  , pub messages: Vec<WireMessage>
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage
{   pub role: &'static str
  , pub content: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse
{   #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub content: Vec<ContentBlock>
  , #[serde(default)]
    pub stop_reason: Option<String>
  , #[serde(default)]
    pub usage: Option<MessagesUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock
{   #[serde(rename = "type")]
    pub kind: String
  , #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesUsage
{   #[serde(default)]
    pub input_tokens: Option<u32>
  , #[serde(default)]
    pub output_tokens: Option<u32>
}

impl From<&LlmRequest> for MessagesRequest
{   /// System turns travel in the top-level `system` field; the
    /// `messages` array only accepts user and assistant turns.
    fn from(req: &LlmRequest) -> Self
    {   let system: Vec<&str> = req.messages
          .iter()
          .filter(|m| m.role == Role::System)
          .map(|m| m.content.as_str())
          .collect();
        let messages = req.messages
          .iter()
          .filter(|m| m.role != Role::System)
          .map(|m| WireMessage
            {   role: m.role.as_str()
              , content: m.content.clone()
            })
          .collect();

        MessagesRequest
        {   model: String::new()
          , max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
          , temperature: req.temperature
          , system: if system.is_empty()
            {   None
            } else
            {   Some(system.join("\n\n"))
            }
          , messages
        }
    }
}

impl MessagesResponse
{   pub fn into_response(self, requested_model: &str) -> LlmResponse
    {   let text = self.content
          .iter()
          .filter(|block| block.kind == "text")
          .filter_map(|block| block.text.as_deref())
          .collect::<Vec<_>>()
          .join("");

        let usage = self.usage
          .map(|u| {
            let prompt_tokens = u.input_tokens.unwrap_or(0);
            let completion_tokens = u.output_tokens.unwrap_or(0);
            Usage
            {   prompt_tokens
              , completion_tokens
              , total_tokens: prompt_tokens.saturating_add(completion_tokens)
            }
          })
          .unwrap_or_default();

        LlmResponse
        {   text
          , usage
          , model_name: Some(
              self.model.unwrap_or_else(|| requested_model.to_string())
            )
          , finish_reason: self.stop_reason
        }
    }
}

// ===== Adapter =====

/// Anthropic messages-API adapter
pub struct AnthropicAdapter
{   model: String
  , api_key: String
  , url: String
  , http_client: reqwest::Client
}

impl AnthropicAdapter
{   /// Adapter with the key from `ANTHROPIC_API_KEY`
    pub fn new(
      model: &str
    , config: &crate::config::ProviderConfig
    ) -> Result<Self>
    {   let api_key = super::credential(crate::Provider::Anthropic)?;
        AnthropicAdapter::with_key(api_key, model, config)
    }

    pub fn with_key(
      api_key: String
    , model: &str
    , config: &crate::config::ProviderConfig
    ) -> Result<Self>
    {   debug!("Creating AnthropicAdapter for {}", model);
        Ok(AnthropicAdapter
        {   model: model.to_string()
          , api_key
          , url: super::endpoint(
              crate::Provider::Anthropic, config, "messages"
            )
          , http_client: super::http_client(config)?
        })
    }
}

#[async_trait]
impl super::Adapter for AnthropicAdapter
{   fn provider(&self) -> crate::Provider
    {   crate::Provider::Anthropic
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse>
    {   debug!("Anthropic generate with {}", self.model);

        let mut body = MessagesRequest::from(request);
        if body.messages.is_empty()
        {   return Err(Error::InvalidRequest(
              "Anthropic needs at least one user or assistant message".to_string()
            ));
        }
        body.model = self.model.clone();
        trace!("Anthropic request: {:?}", body);

        let reply: MessagesResponse = super::send_json(
          crate::Provider::Anthropic,
          self.http_client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
        ).await?;

        Ok(reply.into_response(&self.model))
    }
}
