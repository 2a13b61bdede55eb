use serde::Serialize;
use uuid::Uuid;

use crate::protocol::{BenchmarkReport, PredictionSnapshot};
use crate::settings::Settings;

/// Progress shown the moment a run is requested, before the peer reports.
pub const BENCHMARK_INITIAL_PROGRESS: f64 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BenchmarkStatus {
    Idle,
    Running,
    Done,
}

/// Progress only exists while running and a report only once done, so the
/// two can never both be live.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BenchmarkRun {
    #[default]
    Idle,
    Running {
        progress: f64,
    },
    Done {
        report: BenchmarkReport,
    },
}

impl BenchmarkRun {
    pub fn status(&self) -> BenchmarkStatus {
        match self {
            BenchmarkRun::Idle => BenchmarkStatus::Idle,
            BenchmarkRun::Running { .. } => BenchmarkStatus::Running,
            BenchmarkRun::Done { .. } => BenchmarkStatus::Done,
        }
    }

    pub fn progress(&self) -> f64 {
        match self {
            BenchmarkRun::Running { progress } => *progress,
            _ => 0.0,
        }
    }

    pub fn report(&self) -> Option<&BenchmarkReport> {
        match self {
            BenchmarkRun::Done { report } => Some(report),
            _ => None,
        }
    }

    /// Whole percent for the "Running… N%" label.
    pub fn percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }
}

/// Everything the rendering layer reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub connection: ConnectionStatus,
    pub is_connected: bool,
    pub session_id: Option<Uuid>,
    pub predictions: PredictionSnapshot,
    pub benchmark: BenchmarkRun,
    pub settings: Settings,
}

/// Latest known session facts. Written only from the session event path
/// and from user intents, which the controller serializes with it.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    connection: ConnectionStatus,
    session_id: Option<Uuid>,
    predictions: Option<PredictionSnapshot>,
    benchmark: BenchmarkRun,
    settings: Settings,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn is_current(&self, session_id: Uuid) -> bool {
        self.session_id == Some(session_id)
    }

    pub fn begin_session(&mut self, session_id: Uuid) {
        self.session_id = Some(session_id);
        self.connection = ConnectionStatus::Connecting;
    }

    pub fn mark_connected(&mut self) {
        self.connection = ConnectionStatus::Connected;
    }

    /// Back to the no-session state. Predictions return to placeholders;
    /// benchmark results and settings survive for the next session.
    pub fn end_session(&mut self) {
        self.session_id = None;
        self.connection = ConnectionStatus::Disconnected;
        self.predictions = None;
    }

    pub fn predictions(&self) -> PredictionSnapshot {
        self.predictions.clone().unwrap_or_default()
    }

    pub fn set_predictions(&mut self, predictions: PredictionSnapshot) {
        self.predictions = Some(predictions);
    }

    pub fn benchmark(&self) -> &BenchmarkRun {
        &self.benchmark
    }

    /// A locally requested run: clears any earlier report.
    pub fn begin_benchmark(&mut self) {
        self.benchmark = BenchmarkRun::Running {
            progress: BENCHMARK_INITIAL_PROGRESS,
        };
    }

    pub fn set_benchmark_progress(&mut self, progress: f64) {
        self.benchmark = BenchmarkRun::Running {
            progress: progress.clamp(0.0, 1.0),
        };
    }

    pub fn complete_benchmark(&mut self, report: BenchmarkReport) {
        self.benchmark = BenchmarkRun::Done { report };
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection,
            is_connected: self.connection == ConnectionStatus::Connected,
            session_id: self.session_id,
            predictions: self.predictions(),
            benchmark: self.benchmark.clone(),
            settings: self.settings.clone(),
        }
    }
}
