//! Canonical request and response types shared by every provider

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Sampling temperature used when the caller does not pick one
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Upper bound accepted for `temperature`
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Speaker of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::System => "system"
          , Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

/// One role-tagged turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   Message
        {   role
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Message::new(Role::Assistant, content)
    }
}

/// Provider-agnostic request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest
{   /// Conversation in turn order, never empty once validated
    pub messages: Vec<Message>
  , /// Sampling temperature in [0, 2]
    #[serde(default = "default_temperature")]
    pub temperature: f32
  , /// Generation cap, vendor default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , /// Free-form caller data, never sent to a vendor
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>
}

fn default_temperature() -> f32
{   DEFAULT_TEMPERATURE
}

impl LlmRequest
{   /// Request with default sampling settings
    pub fn new(messages: Vec<Message>) -> Self
    {   LlmRequest
        {   messages
          , temperature: DEFAULT_TEMPERATURE
          , max_tokens: None
          , metadata: HashMap::new()
        }
    }

    /// Single user-role message request
    pub fn from_prompt(prompt: impl Into<String>) -> Self
    {   LlmRequest::new(vec![Message::user(prompt)])
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self
    {   self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self
    {   self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_metadata(
      mut self
    , key: impl Into<String>
    , value: serde_json::Value
    ) -> Self
    {   self.metadata.insert(key.into(), value);
        self
    }

    /// Check the envelope invariants before it reaches a vendor
    pub fn validate(&self) -> crate::error::Result<()>
    {   if self.messages.is_empty()
        {   return Err(crate::error::Error::InvalidRequest(
              "request has no messages".to_string()
            ));
        }
        if !self.temperature.is_finite()
          || self.temperature < 0.0
          || self.temperature > MAX_TEMPERATURE
        {   return Err(crate::error::Error::InvalidRequest(
              format!(
                "temperature {} outside [0, {}]",
                self.temperature, MAX_TEMPERATURE
              )
            ));
        }
        if self.max_tokens == Some(0)
        {   return Err(crate::error::Error::InvalidRequest(
              "max_tokens must be positive".to_string()
            ));
        }
        Ok(())
    }
}

/// Token accounting; vendors that omit a field report 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub prompt_tokens: u32
  , #[serde(default)]
    pub completion_tokens: u32
  , #[serde(default)]
    pub total_tokens: u32
}

/// Provider-agnostic response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse
{   /// Generated text, empty when the vendor produced none
    pub text: String
  , #[serde(default)]
    pub usage: Usage
  , /// Vendor model that served the request
    #[serde(default)]
    pub model_name: Option<String>
  , /// Vendor stop code, passed through unchanged
    #[serde(default)]
    pub finish_reason: Option<String>
}
