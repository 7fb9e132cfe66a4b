//! Prompt text for the composers

use crate::request::Message;
use super::mission::{KbHit, MissionPlan, RocketSpecDraft};
use super::advisor::AdvisorRequest;

pub fn system_for_rocketry() -> Message
{   Message::system(
      "You are an aerospace design assistant. Be precise, cite equations, \
       and return JSON blocks when asked for specs."
    )
}

pub const CONCEPT_GUIDANCE: &str = "\
You are an aerospace planning assistant.
- Return ONLY valid JSON that matches the schema. No prose outside JSON.
- Use the SPEC and MISSION for constraints, and any KB snippets if provided.
- Prefer realistic, defensible numbers. Clearly label uncertainty in costs.
- If you are not confident in a claim, include 'confidence':'low' on that object.
";

pub const CONCEPT_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "note": { "type": "string" },
    "launch_sites": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "name": { "type": "string" },
          "state": { "type": "string" },
          "country": { "type": "string" },
          "type": { "type": "string", "enum": ["vertical","horizontal","unknown"] },
          "faa_licensed": { "type": "boolean" },
          "suitability_score": { "type": "number" },
          "why": { "type": "string" },
          "confidence": { "type": "string" }
        },
        "required": ["name","country","why","suitability_score"]
      }
    },
    "lunar_sites": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "name": { "type": "string" },
          "traits": { "type": "array", "items": { "type": "string" } },
          "why": { "type": "string" },
          "confidence": { "type": "string" }
        },
        "required": ["name"]
      }
    },
    "bom": {
      "type": "object",
      "properties": {
        "currency": { "type": "string" },
        "uncertainty": { "type": "string" },
        "items": {
          "type": "array",
          "items": {
            "type": "object",
            "properties": {
              "item": { "type": "string" },
              "qty": {},
              "uom": { "type": "string" },
              "est_cost": { "type": "number" }
            },
            "required": ["item","est_cost"]
          }
        },
        "total_est_cost": { "type": "number" }
      },
      "required": ["currency","items","total_est_cost"]
    },
    "citations": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "title": { "type": "string" },
          "source": { "type": "string" },
          "why_relevant": { "type": "string" }
        }
      }
    },
    "report_md": { "type": "string" },
    "assumptions": { "type": "array", "items": { "type": "string" } },
    "risks": { "type": "array", "items": {
      "type": "object",
      "properties": { "risk": { "type": "string" }, "mitigation": { "type": "string" }, "confidence": { "type": "string" } }
    } },
    "alternatives": { "type": "array", "items": { "type": "string" } },
    "next_steps": { "type": "array", "items": { "type": "string" } },
    "key_numbers": { "type": "array", "items": {
      "type": "object",
      "properties": { "label": { "type": "string" }, "value": {}, "unit": { "type": "string" }, "confidence": { "type": "string" } }
    } },
    "regulatory_flags": { "type": "array", "items": { "type": "string" } },
    "ops_checklist": { "type": "array", "items": { "type": "string" } }
  },
  "required": ["launch_sites","lunar_sites","bom"]
}"#;

/// Grounding block for the concept prompt; `none` without hits
pub fn kb_block(kb_hits: &[KbHit]) -> String
{   if kb_hits.is_empty()
    {   return "none".to_string();
    }
    kb_hits
      .iter()
      .map(KbHit::compact)
      .collect::<Vec<_>>()
      .join("\n")
}

pub fn concept_prompt(
  spec: &RocketSpecDraft
, plan: &MissionPlan
, origin_hint: Option<&str>
, kb_hits: &[KbHit]
) -> crate::error::Result<String>
{   let spec_json = to_json(spec)?;
    let plan_json = to_json(plan)?;
    Ok(format!(
"SYSTEM:
{guidance}

SCHEMA:
{schema}

CONTEXT:
- Origin hint (may be vague): {origin}
- Mission target: {target}
- SPEC_JSON: {spec_json}
- PLAN_JSON: {plan_json}
- KB_SNIPPETS (optional):
{kb}

INSTRUCTIONS:
- Propose feasible launch sites (rank with 'suitability_score' 0..1) and explain briefly in 'why'. \
If origin lacks orbital vertical pads, say so in 'note' and propose nearest viable sites.
- Propose 2–3 lunar sites with 'traits' and 'why'.
- Propose a concept-level BoM: a few line items and a total with 'uncertainty'.
- Also produce a short 'report_md' (Markdown) that summarizes the concept in friendly, beginner language. \
Use sections: Overview, Launch Site Choice, Lunar Site Rationale, Vehicle & Performance, BoM & Cost, Risks & Mitigations, Next Steps.
- If you draw from common knowledge, you MAY include a 'citations' array (title/source only, no URLs).
- Return ONLY JSON, no extra text.",
      guidance = CONCEPT_GUIDANCE,
      schema = CONCEPT_SCHEMA,
      origin = origin_hint.filter(|h| !h.trim().is_empty()).unwrap_or("none"),
      target = plan.target,
      spec_json = spec_json,
      plan_json = plan_json,
      kb = kb_block(kb_hits),
    ))
}

pub fn advisor_prompt(req: &AdvisorRequest) -> crate::error::Result<String>
{   let spec_json = to_json(&req.spec)?;
    let concept_json = match &req.concept
    {   Some(concept) => to_json(concept)?
      , None => "{}".to_string()
    };
    Ok(format!(
"You are an aerospace mission advisor. Be pragmatic and safety-aware. \
If the user's request is not feasible, clearly say so and propose realistic alternatives and concrete next steps.

Context:
- Target objective: {target}
- Rocket spec (JSON): {spec_json}
- Current concept (JSON, may be empty): {concept_json}
- Answer style: {style}

User question:
{question}

Return ONLY JSON with this schema (no prose outside JSON):
{{
  \"answer_md\": \"<markdown explanation with bullets and short sections>\",
  \"actions\": [{{\"type\":\"<short action name>\", \"why\":\"<1 sentence reason>\"}}],
  \"clarifying_questions\": [\"<short question>\", \"...\"]
}}",
      target = req.target,
      spec_json = spec_json,
      concept_json = concept_json,
      style = req.style,
      question = req.question,
    ))
}

fn to_json<T: serde::Serialize>(value: &T) -> crate::error::Result<String>
{   serde_json::to_string(value).map_err(|e| {
      crate::error::Error::InvalidRequest(format!("unserializable context: {}", e))
    })
}
