//! AI-composed mission concept: launch sites, lunar sites, bill of
//! materials and a narrative report around a rocket spec

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use log::{debug, warn};

use crate::error::Result;
use crate::orchestrator::{GenerateOptions, Orchestrator};
use crate::recovery::{self, Composed};
use crate::request::Usage;
use crate::retry::RetryPolicy;
use super::mission::{KbHit, MissionPlan, MissionPlanner, MissionTarget, RocketSpecDraft};
use super::prompts;

/// Slightly warmer than the default for a more natural narrative
pub const CONCEPT_TEMPERATURE: f32 = 0.3;

pub const FALLBACK_NOTE: &str = "AI-Compose failed to return valid JSON";

/// Which backend produced a composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMeta
{   pub provider: String
  , #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub usage: Usage
}

/// Concept content as recovered from the model.
/// Every documented field is always present with its expected type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDraft
{   #[serde(default)]
    pub note: Option<String>
  , pub launch_sites: Vec<Value>
  , pub lunar_sites: Vec<Value>
  , pub bom: Map<String, Value>
  , pub citations: Vec<Value>
  , #[serde(default)]
    pub report_md: Option<String>
  , pub assumptions: Vec<Value>
  , pub risks: Vec<Value>
  , pub alternatives: Vec<Value>
  , pub next_steps: Vec<Value>
  , pub key_numbers: Vec<Value>
  , pub regulatory_flags: Vec<Value>
  , pub ops_checklist: Vec<Value>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmMeta>
}

fn empty_bom() -> Value
{   json!({"currency": "USD", "items": [], "total_est_cost": 0})
}

/// Expected top-level fields and their empty defaults
pub fn concept_defaults() -> Vec<(&'static str, Value)>
{   vec![
      ("launch_sites", json!([]))
    , ("lunar_sites", json!([]))
    , ("bom", empty_bom())
    , ("citations", json!([]))
    , ("report_md", Value::Null)
    , ("assumptions", json!([]))
    , ("risks", json!([]))
    , ("alternatives", json!([]))
    , ("next_steps", json!([]))
    , ("key_numbers", json!([]))
    , ("regulatory_flags", json!([]))
    , ("ops_checklist", json!([]))
    ]
}

impl ConceptDraft
{   /// Skeleton returned when the model reply could not be recovered
    pub fn fallback() -> Self
    {   ConceptDraft
        {   note: Some(FALLBACK_NOTE.to_string())
          , launch_sites: vec![]
          , lunar_sites: vec![]
          , bom: match empty_bom()
            {   Value::Object(map) => map
              , _ => Map::new()
            }
          , citations: vec![]
          , report_md: None
          , assumptions: vec![]
          , risks: vec![]
          , alternatives: vec![]
          , next_steps: vec![]
          , key_numbers: vec![]
          , regulatory_flags: vec![]
          , ops_checklist: vec![]
          , llm: None
        }
    }

    /// Recover a draft from raw model text
    pub fn from_model_text(text: &str) -> Composed<ConceptDraft>
    {   let mut object = match recovery::recover_object(text)
        {   Some(object) => object
          , None => return Composed::Fallback(ConceptDraft::fallback())
        };
        recovery::backfill(&mut object, &concept_defaults());
        for name in ["note", "report_md"]
        {   if matches!(object.get(name), Some(v) if !v.is_string() && !v.is_null())
            {   warn!("Dropping non-string '{}' from concept reply", name);
                object.insert(name.to_string(), Value::Null);
            }
        }
        // `llm` is ours to fill, never the model's
        object.remove("llm");

        match serde_json::from_value::<ConceptDraft>(Value::Object(object))
        {   Ok(draft) => Composed::Structured(draft)
          , Err(e) => {
              warn!("Concept reply does not fit the draft shape: {}", e);
              Composed::Fallback(ConceptDraft::fallback())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginInferred
{   pub hint: Option<String>
}

/// Spec, plan and composed concept in one payload for the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptReport
{   pub spec_draft: RocketSpecDraft
  , pub mission_plan: MissionPlan
  , pub origin_inferred: OriginInferred
  , pub launch_sites: Vec<Value>
  , pub lunar_sites: Vec<Value>
  , pub bom: Map<String, Value>
  , pub note: Option<String>
  , pub citations: Vec<Value>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_md: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmMeta>
}

/// Composes mission concepts through an orchestrator
#[derive(Clone)]
pub struct ConceptComposer
{   orchestrator: Orchestrator
  , planner: Arc<dyn MissionPlanner>
  , retry: RetryPolicy
  , options: GenerateOptions
}

impl ConceptComposer
{   pub fn new(
      orchestrator: Orchestrator
    , planner: impl MissionPlanner + 'static
    ) -> Self
    {   ConceptComposer
        {   orchestrator
          , planner: Arc::new(planner)
          , retry: RetryPolicy::disabled()
          , options: GenerateOptions::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self
    {   self.retry = retry;
        self
    }

    /// Provider/model/sampling overrides for every composition call
    pub fn with_options(mut self, options: GenerateOptions) -> Self
    {   self.options = options;
        self
    }

    /// Ask the model for launch sites, lunar sites and a BoM around
    /// `spec` and `plan`. Vendor errors propagate; an unusable reply
    /// yields `Composed::Fallback`.
    pub async fn compose(
      &self
    , spec: &RocketSpecDraft
    , plan: &MissionPlan
    , origin_hint: Option<&str>
    , kb_hits: &[KbHit]
    ) -> Result<Composed<ConceptDraft>>
    {   let prompt = prompts::concept_prompt(spec, plan, origin_hint, kb_hits)?;
        let mut options = self.options.clone();
        if options.temperature.is_none()
        {   options.temperature = Some(CONCEPT_TEMPERATURE);
        }
        let (provider, _) = self.orchestrator.resolve_target(&options)?;

        let response = self.retry
          .run(|| self.orchestrator.generate(prompt.as_str(), options.clone()))
          .await?;
        debug!("Concept reply: {} chars", response.text.len());

        let llm = LlmMeta
        {   provider: provider.name().to_string()
          , model: response.model_name.clone()
          , usage: response.usage
        };
        Ok(
          ConceptDraft::from_model_text(&response.text).map(|mut draft| {
            draft.llm = Some(llm);
            draft
          })
        )
    }

    /// Plan the mission with the injected planner, then compose
    pub async fn compose_from_spec(
      &self
    , spec: &RocketSpecDraft
    , target: MissionTarget
    , origin_hint: Option<&str>
    , kb_hits: &[KbHit]
    ) -> Result<Composed<ConceptReport>>
    {   let plan = self.planner.plan(spec, target);
        let composed = self.compose(spec, &plan, origin_hint, kb_hits).await?;
        Ok(composed.map(|draft| ConceptReport
          {   spec_draft: spec.clone()
            , mission_plan: plan
            , origin_inferred: OriginInferred
              {   hint: origin_hint.map(str::to_string)
              }
            , launch_sites: draft.launch_sites
            , lunar_sites: draft.lunar_sites
            , bom: draft.bom
            , note: draft.note
            , citations: draft.citations
            , report_md: draft.report_md
            , llm: draft.llm
          }))
    }
}
