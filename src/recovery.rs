//! Structured-output recovery for free-text LLM replies.
//!
//! Model output is untrusted: it may be wrapped in Markdown fences,
//! carry trailing chatter after the JSON, or not be JSON at all. The
//! functions here never fail; a miss is reported as `None` and the
//! composition layer substitutes a documented fallback skeleton.

use serde_json::{Map, Value};
use log::{debug, trace, warn};

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Remove one ```` ```json ```` / ```` ``` ```` opening fence and the
/// closing fence when both are present. Text without a complete fence
/// pair is returned untouched. Nested fences are peeled until none
/// remain, so applying this twice equals applying it once.
pub fn strip_formatting(text: &str) -> String
{   let mut current = text;
    while let Some(inner) = strip_fence_once(current)
    {   current = inner;
    }
    current.to_string()
}

fn strip_fence_once(text: &str) -> Option<&str>
{   let trimmed = text.trim();
    if trimmed.len() < FENCE.len() * 2
    {   return None;
    }
    let body = trimmed
      .strip_prefix(FENCE)?
      .strip_suffix(FENCE)?;
    let body = match body.get(..JSON_TAG.len())
    {   Some(tag) if tag.eq_ignore_ascii_case(JSON_TAG) => {
          &body[JSON_TAG.len()..]
        }
      , _ => body
    };
    Some(body.trim())
}

/// Parse `text` as JSON. On failure, retry with everything after the
/// last `}` cut off. `None` when both attempts fail.
pub fn parse(text: &str) -> Option<Value>
{   match serde_json::from_str::<Value>(text)
    {   Ok(value) => return Some(value)
      , Err(e) => trace!("Direct JSON parse failed: {}", e)
    }

    let end = text.rfind('}')?;
    let head = &text[..=end];
    if head.len() == text.len()
    {   return None;
    }
    match serde_json::from_str::<Value>(head)
    {   Ok(value) => {
          debug!(
            "Recovered JSON by dropping {} trailing byte(s)",
            text.len() - head.len()
          );
          Some(value)
        }
      , Err(e) => {
          trace!("Truncated JSON parse failed: {}", e);
          None
        }
    }
}

/// Strip fences, parse, and keep the result only if it is an object
pub fn recover_object(text: &str) -> Option<Map<String, Value>>
{   match parse(&strip_formatting(text))
    {   Some(Value::Object(map)) => Some(map)
      , Some(other) => {
          warn!("Model returned JSON but not an object: {}", kind_name(&other));
          None
        }
      , None => {
          warn!("Model reply is not valid JSON");
          None
        }
    }
}

/// Set every expected field that is absent, or whose JSON kind does not
/// match its non-null default, to that default. Returns the names that
/// were filled.
pub fn backfill(
  object: &mut Map<String, Value>
, defaults: &[(&str, Value)]
) -> Vec<String>
{   let mut filled = Vec::new();
    for (name, default) in defaults
    {   let keep = match object.get(*name)
        {   None => false
          , Some(_) if default.is_null() => true
          , Some(current) => same_kind(current, default)
        };
        if !keep
        {   object.insert(name.to_string(), default.clone());
            filled.push(name.to_string());
        }
    }
    if !filled.is_empty()
    {   debug!("Back-filled fields: {:?}", filled);
    }
    filled
}

fn same_kind(a: &Value, b: &Value) -> bool
{   std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn kind_name(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "bool"
      , Value::Number(_) => "number"
      , Value::String(_) => "string"
      , Value::Array(_) => "array"
      , Value::Object(_) => "object"
    }
}

/// Result of turning model output into a domain value
#[derive(Debug, Clone, PartialEq)]
pub enum Composed<T>
{   /// Parsed from the model reply
    Structured(T)
  , /// Fallback skeleton; the model reply was unusable
    Fallback(T)
}

impl<T> Composed<T>
{   pub fn is_fallback(&self) -> bool
    {   matches!(self, Composed::Fallback(_))
    }

    pub fn value(&self) -> &T
    {   match self
        {   Composed::Structured(v) | Composed::Fallback(v) => v
        }
    }

    pub fn into_inner(self) -> T
    {   match self
        {   Composed::Structured(v) | Composed::Fallback(v) => v
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Composed<U>
    {   match self
        {   Composed::Structured(v) => Composed::Structured(f(v))
          , Composed::Fallback(v) => Composed::Fallback(f(v))
        }
    }
}
