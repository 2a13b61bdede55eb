use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::ControlMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "640x480")]
    Vga,
    #[serde(rename = "1280x720")]
    Hd,
    #[serde(rename = "1920x1080")]
    FullHd,
}

impl Resolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Vga => (640, 480),
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Vga
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub smile_threshold: f64,
    pub age_confidence_threshold: f64,
    /// `None` selects the default camera.
    pub camera: Option<String>,
    pub resolution: Resolution,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smile_threshold: 0.7,
            age_confidence_threshold: 0.5,
            camera: None,
            resolution: Resolution::default(),
        }
    }
}

/// One edit from the settings form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "camelCase")]
pub enum SettingChange {
    SmileThreshold(f64),
    AgeConfidenceThreshold(f64),
    Camera(Option<String>),
    Resolution(Resolution),
}

impl Settings {
    /// Applies the change locally. Returns the control message the peer has
    /// to see, which only the smile threshold produces.
    pub fn apply(&mut self, change: SettingChange) -> Result<Option<ControlMessage>> {
        match change {
            SettingChange::SmileThreshold(value) => {
                self.smile_threshold = checked_threshold("smileThreshold", value)?;
                Ok(Some(ControlMessage::UpdateThreshold { value }))
            }
            SettingChange::AgeConfidenceThreshold(value) => {
                self.age_confidence_threshold = checked_threshold("ageConfidenceThreshold", value)?;
                Ok(None)
            }
            SettingChange::Camera(camera) => {
                self.camera = camera.filter(|id| !id.is_empty());
                Ok(None)
            }
            SettingChange::Resolution(resolution) => {
                self.resolution = resolution;
                Ok(None)
            }
        }
    }
}

fn checked_threshold(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        bail!("{name} must be within [0, 1], got {value}");
    }
    Ok(value)
}
