use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace, warn};

use crate::error::Result;
use crate::request::{LlmRequest, LlmResponse, Usage};

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<CompletionUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionUsage
{   #[serde(default)]
    pub prompt_tokens: Option<u32>
  , #[serde(default)]
    pub completion_tokens: Option<u32>
  , #[serde(default)]
    pub total_tokens: Option<u32>
}

impl From<&LlmRequest> for ChatCompletionRequest
{   fn from(req: &LlmRequest) -> Self
    {   ChatCompletionRequest
        {   model: String::new()
          , messages: req.messages
              .iter()
              .map(|m| ChatMessage
                {   role: m.role.as_str().to_string()
                  , content: Some(m.content.clone())
                })
              .collect()
          , temperature: req.temperature
          , max_tokens: req.max_tokens
        }
    }
}

impl ChatCompletionResponse
{   /// Collapse the vendor reply into the canonical response
    pub fn into_response(self, requested_model: &str) -> LlmResponse
    {   let usage = self.usage
          .map(|u| Usage
            {   prompt_tokens: u.prompt_tokens.unwrap_or(0)
              , completion_tokens: u.completion_tokens.unwrap_or(0)
              , total_tokens: u.total_tokens.unwrap_or(0)
            })
          .unwrap_or_default();

        let (text, finish_reason) = match self.choices.into_iter().next()
        {   Some(choice) => (
              choice.message.content.unwrap_or_default()
            , choice.finish_reason
            )
          , None => {
              warn!("OpenAI reply contained no choices");
              (String::new(), None)
            }
        };

        LlmResponse
        {   text
          , usage
          , model_name: Some(
              self.model.unwrap_or_else(|| requested_model.to_string())
            )
          , finish_reason
        }
    }
}

// ===== Adapter =====

/// OpenAI chat-completions adapter
pub struct OpenAiAdapter
{   model: String
  , api_key: String
  , url: String
  , http_client: reqwest::Client
}

impl OpenAiAdapter
{   /// Adapter with the key from `OPENAI_API_KEY`
    pub fn new(
      model: &str
    , config: &crate::config::ProviderConfig
    ) -> Result<Self>
    {   let api_key = super::credential(crate::Provider::OpenAI)?;
        OpenAiAdapter::with_key(api_key, model, config)
    }

    /// Adapter with an explicit key
    pub fn with_key(
      api_key: String
    , model: &str
    , config: &crate::config::ProviderConfig
    ) -> Result<Self>
    {   debug!("Creating OpenAiAdapter for {}", model);
        Ok(OpenAiAdapter
        {   model: model.to_string()
          , api_key
          , url: super::endpoint(
              crate::Provider::OpenAI, config, "chat/completions"
            )
          , http_client: super::http_client(config)?
        })
    }
}

#[async_trait]
impl super::Adapter for OpenAiAdapter
{   fn provider(&self) -> crate::Provider
    {   crate::Provider::OpenAI
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse>
    {   debug!("OpenAI generate with {}", self.model);

        let mut body = ChatCompletionRequest::from(request);
        body.model = self.model.clone();
        trace!("OpenAI request: {:?}", body);

        let reply: ChatCompletionResponse = super::send_json(
          crate::Provider::OpenAI,
          self.http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
        ).await?;

        Ok(reply.into_response(&self.model))
    }
}
