//! Mission advisor: answers a user question about a spec and concept

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::orchestrator::{GenerateOptions, Orchestrator, Prompt};
use crate::recovery::{self, Composed};
use crate::request::Message;
use crate::retry::RetryPolicy;
use super::mission::MissionTarget;
use super::prompts;

pub const ADVISOR_TEMPERATURE: f32 = 0.3;

pub const EMPTY_ANSWER: &str = "_No advisor output._";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorStyle
{   #[default]
    Teacher
  , Concise
  , Exec
}

impl fmt::Display for AdvisorStyle
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(match self
        {   AdvisorStyle::Teacher => "teacher"
          , AdvisorStyle::Concise => "concise"
          , AdvisorStyle::Exec => "exec"
        })
    }
}

impl FromStr for AdvisorStyle
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self>
    {   match s.trim().to_lowercase().as_str()
        {   "teacher" => Ok(AdvisorStyle::Teacher)
          , "concise" => Ok(AdvisorStyle::Concise)
          , "exec" => Ok(AdvisorStyle::Exec)
          , other => Err(Error::InvalidRequest(
              format!("unknown advisor style: {}", other)
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorRequest
{   pub question: String
  , /// Rocket spec as the UI holds it
    pub spec: Value
  , #[serde(default)]
    pub target: MissionTarget
  , #[serde(default)]
    pub concept: Option<Value>
  , #[serde(default)]
    pub style: AdvisorStyle
  , /// Per-question model override
    #[serde(default)]
    pub model: Option<String>
}

impl AdvisorRequest
{   pub fn new(question: impl Into<String>, spec: Value) -> Self
    {   AdvisorRequest
        {   question: question.into()
          , spec
          , target: MissionTarget::default()
          , concept: None
          , style: AdvisorStyle::default()
          , model: None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorAction
{   #[serde(default, rename = "type", alias = "action")]
    pub kind: String
  , #[serde(default)]
    pub why: String
}

impl AdvisorAction
{   /// Lenient read of one model-supplied action; non-objects are skipped
    fn from_value(value: &Value) -> Option<Self>
    {   let object = value.as_object()?;
        let text = |name: &str| object
          .get(name)
          .and_then(Value::as_str)
          .unwrap_or_default()
          .to_string();
        let mut kind = text("type");
        if kind.is_empty()
        {   kind = text("action");
        }
        Some(AdvisorAction
        {   kind
          , why: text("why")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorAnswer
{   pub answer_md: String
  , #[serde(default)]
    pub actions: Vec<AdvisorAction>
  , #[serde(default)]
    pub clarifying_questions: Vec<String>
}

impl AdvisorAnswer
{   /// Raw model text wrapped as the answer body
    pub fn fallback(raw: &str) -> Self
    {   let raw = raw.trim();
        AdvisorAnswer
        {   answer_md: if raw.is_empty()
            {   EMPTY_ANSWER.to_string()
            } else
            {   raw.to_string()
            }
          , actions: vec![]
          , clarifying_questions: vec![]
        }
    }

    pub fn from_model_text(text: &str) -> Composed<AdvisorAnswer>
    {   let mut object = match recovery::recover_object(text)
        {   Some(object) if object.get("answer_md").map_or(false, Value::is_string) => object
          , _ => {
              warn!("Advisor reply had no usable answer_md");
              return Composed::Fallback(AdvisorAnswer::fallback(text));
            }
        };
        recovery::backfill(&mut object, &[
          ("actions", json!([]))
        , ("clarifying_questions", json!([]))
        ]);

        let items = |name: &str| match object.get(name)
        {   Some(Value::Array(items)) => items.clone()
          , _ => vec![]
        };
        let raw_actions = items("actions");
        let raw_questions = items("clarifying_questions");

        let actions: Vec<AdvisorAction> = raw_actions
          .iter()
          .filter_map(AdvisorAction::from_value)
          .collect();
        let clarifying_questions: Vec<String> = raw_questions
          .iter()
          .filter_map(|q| q.as_str().map(str::to_string))
          .collect();
        let dropped = raw_actions.len() - actions.len()
          + raw_questions.len() - clarifying_questions.len();
        if dropped > 0
        {   warn!("Dropped {} malformed advisor item(s)", dropped);
        }

        Composed::Structured(AdvisorAnswer
        {   answer_md: object
              .get("answer_md")
              .and_then(Value::as_str)
              .unwrap_or_default()
              .to_string()
          , actions
          , clarifying_questions
        })
    }
}

/// Answers mission questions through an orchestrator
#[derive(Debug, Clone)]
pub struct Advisor
{   orchestrator: Orchestrator
  , retry: RetryPolicy
  , options: GenerateOptions
}

impl Advisor
{   pub fn new(orchestrator: Orchestrator) -> Self
    {   Advisor
        {   orchestrator
          , retry: RetryPolicy::disabled()
          , options: GenerateOptions::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self
    {   self.retry = retry;
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self
    {   self.options = options;
        self
    }

    pub async fn ask(&self, req: &AdvisorRequest) -> Result<Composed<AdvisorAnswer>>
    {   if req.question.trim().is_empty()
        {   return Err(Error::InvalidRequest("empty advisor question".to_string()));
        }
        let messages = vec![
          prompts::system_for_rocketry()
        , Message::user(prompts::advisor_prompt(req)?)
        ];

        let mut options = self.options.clone();
        if let Some(model) = &req.model
        {   options.model = Some(model.clone());
        }
        if options.temperature.is_none()
        {   options.temperature = Some(ADVISOR_TEMPERATURE);
        }
        debug!("Advisor question ({} style): {}", req.style, req.question);

        let response = self.retry
          .run(|| self.orchestrator.generate(
            Prompt::Messages(messages.clone()),
            options.clone()
          ))
          .await?;
        Ok(AdvisorAnswer::from_model_text(&response.text))
    }
}
