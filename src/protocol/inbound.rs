use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Shown for any prediction field the peer has not reported yet.
pub const PLACEHOLDER: &str = "-";

/// One message from the inference peer.
///
/// Every field is an independent facet. A missing field means "no update for
/// that facet", so a single message may carry a frame, fresh predictions, a
/// capture flag and benchmark progress all at once.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub predictions: Option<PredictionSnapshot>,
    #[serde(default, rename = "capture")]
    pub captured: Option<bool>,
    #[serde(default, rename = "is_smiling")]
    pub smiling: Option<bool>,
    #[serde(default)]
    pub benchmark_progress: Option<f64>,
    #[serde(default)]
    pub benchmark_results: Option<BenchmarkReport>,
}

impl InboundEvent {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Age is a bucket label ("(25-32)") from some models and a number from others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Age {
    Years(f64),
    Label(String),
}

impl Default for Age {
    fn default() -> Self {
        Age::Label(PLACEHOLDER.to_string())
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Age::Years(years) if years.fract() == 0.0 => write!(f, "{years:.0}"),
            Age::Years(years) => write!(f, "{years:.1}"),
            Age::Label(label) => f.write_str(label),
        }
    }
}

/// Latest face analysis. Replaced wholesale, never merged; fields the peer
/// leaves out fall back to the placeholder values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct PredictionSnapshot {
    #[serde(default = "placeholder")]
    pub emotion: String,
    #[serde(default)]
    pub age: Age,
    #[serde(default = "placeholder")]
    pub gender: String,
    #[serde(default)]
    pub smile_score: f64,
    #[serde(default)]
    pub is_blurry: bool,
}

impl Default for PredictionSnapshot {
    fn default() -> Self {
        Self {
            emotion: placeholder(),
            age: Age::default(),
            gender: placeholder(),
            smile_score: 0.0,
            is_blurry: false,
        }
    }
}

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    #[serde(rename(deserialize = "avg_cpu", serialize = "avgCpuPct"))]
    pub avg_cpu_pct: f64,
    #[serde(rename(deserialize = "avg_mem", serialize = "avgMemPct"))]
    pub avg_mem_pct: f64,
    #[serde(rename(deserialize = "avg_frame_time_ms", serialize = "avgFrameTimeMs"))]
    pub avg_frame_time_ms: f64,
    pub fps: f64,
}
