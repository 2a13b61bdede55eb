use serde::Serialize;

/// Commands sent to the peer. Tagged by `action`; the peer ignores actions it
/// does not know, so nothing is validated on this side beyond the shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlMessage {
    ManualCapture,
    UpdateThreshold { value: f64 },
    RunBenchmark,
}

impl ControlMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn action(&self) -> &'static str {
        match self {
            ControlMessage::ManualCapture => "manual_capture",
            ControlMessage::UpdateThreshold { .. } => "update_threshold",
            ControlMessage::RunBenchmark => "run_benchmark",
        }
    }
}
