//! Composition callers: build domain prompts, call the orchestrator,
//! recover structured output

pub mod mission;
pub mod prompts;
pub mod concept;
pub mod advisor;

pub use mission::{
  FixedDeltaVPlanner, KbHit, Leg, MissionPlan, MissionPlanner, MissionTarget
, RocketSpecDraft, StageEstimate
};
pub use concept::{ConceptComposer, ConceptDraft, ConceptReport, LlmMeta};
pub use advisor::{Advisor, AdvisorAction, AdvisorAnswer, AdvisorRequest, AdvisorStyle};
