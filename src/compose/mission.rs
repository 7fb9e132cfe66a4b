//! Spec draft, mission plan and knowledge-base value types

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Δv to reach a 200-400 km LEO, losses included
pub const LEO_ASCENT_DELTA_V_MS: f64 = 9400.0;

/// Δv for trans-lunar injection from LEO
pub const TLI_DELTA_V_MS: f64 = 3100.0;

/// One stage of a heuristic rocket draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEstimate
{   pub stage: u32
  , pub length_m: f64
  , pub diameter_m: f64
  , pub propellant: String
  , pub isp_s: f64
  , pub structural_mass_kg: f64
  , pub propellant_mass_kg: f64
  , /// Total for the stage
    #[serde(rename = "engine_thrust_kN")]
    pub engine_thrust_kn: f64
}

/// Parametric spec derived from a sketch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocketSpecDraft
{   pub stages: Vec<StageEstimate>
  , pub total_height_m: f64
  , pub max_diameter_m: f64
  , pub liftoff_mass_kg: f64
  , pub payload_leo_kg: f64
  , #[serde(default)]
    pub notes: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionTarget
{   #[serde(rename = "LEO")]
    Leo
  , #[serde(rename = "TLI")]
    Tli
}

impl Default for MissionTarget
{   fn default() -> Self
    {   MissionTarget::Leo
    }
}

impl MissionTarget
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   MissionTarget::Leo => "LEO"
          , MissionTarget::Tli => "TLI"
        }
    }
}

impl fmt::Display for MissionTarget
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for MissionTarget
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_uppercase().as_str()
        {   "LEO" => Ok(MissionTarget::Leo)
          , "TLI" => Ok(MissionTarget::Tli)
          , other => Err(Error::InvalidRequest(
              format!("unknown mission target: {}", other)
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg
{   pub name: String
  , pub delta_v_ms: f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPlan
{   pub target: MissionTarget
  , pub legs: Vec<Leg>
  , pub delta_v_total_ms: f64
  , pub advisory: String
}

/// Produces the mission plan the concept composer builds on
pub trait MissionPlanner: Send + Sync
{   fn plan(&self, spec: &RocketSpecDraft, target: MissionTarget) -> MissionPlan;
}

/// Δv budget from fixed per-leg constants
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDeltaVPlanner;

impl MissionPlanner for FixedDeltaVPlanner
{   fn plan(&self, _spec: &RocketSpecDraft, target: MissionTarget) -> MissionPlan
    {   let ascent = Leg
        {   name: "Ascent to LEO".to_string()
          , delta_v_ms: LEO_ASCENT_DELTA_V_MS
        };
        let (legs, advisory) = match target
        {   MissionTarget::Leo => (
              vec![ascent]
            , "Typical ~9.4 km/s budget to 200–400 km LEO including losses."
            )
          , MissionTarget::Tli => (
              vec![
                ascent
              , Leg
                {   name: "Trans-Lunar Injection (TLI)".to_string()
                  , delta_v_ms: TLI_DELTA_V_MS
                }
              ]
            , "Rough LEO (~9.4 km/s) + TLI (~3.1 km/s). \
               Real values depend on trajectory and margins."
            )
        };
        let delta_v_total_ms = legs.iter().map(|l| l.delta_v_ms).sum();
        MissionPlan
        {   target
          , legs
          , delta_v_total_ms
          , advisory: advisory.to_string()
        }
    }
}

/// Engine group of a reference vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineGroup
{   #[serde(default)]
    pub stage: Option<u32>
  , #[serde(default)]
    pub count: Option<u32>
  , #[serde(default, rename = "type")]
    pub kind: Option<String>
}

/// Reference vehicle returned by the knowledge-base search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbHit
{   pub name: String
  , #[serde(default)]
    pub stages: Option<u32>
  , #[serde(default)]
    pub height_m: Option<f64>
  , #[serde(default)]
    pub diameter_m: Option<f64>
  , #[serde(default)]
    pub payload_leo_kg: Option<f64>
  , #[serde(default)]
    pub engines: Vec<EngineGroup>
}

fn opt<T: fmt::Display>(value: &Option<T>) -> String
{   value
      .as_ref()
      .map(|v| v.to_string())
      .unwrap_or_else(|| "?".to_string())
}

impl KbHit
{   /// One prompt line, e.g. `- Electron (stages=2, H=18m, ...) engines: St1: 9×Rutherford`
    pub fn compact(&self) -> String
    {   let engines = self.engines
          .iter()
          .map(|e| format!(
            "St{}: {}×{}",
            opt(&e.stage), opt(&e.count), opt(&e.kind)
          ))
          .collect::<Vec<_>>()
          .join("; ");
        format!(
          "- {} (stages={}, H={}m, D={}m, LEO={}kg) engines: {}",
          self.name,
          opt(&self.stages),
          opt(&self.height_m),
          opt(&self.diameter_m),
          opt(&self.payload_leo_kg),
          engines
        )
    }
}
