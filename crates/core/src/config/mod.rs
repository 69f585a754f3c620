use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    alignment::AlignmentThresholds,
    audio::AudioSequenceMap,
    scene::{EntityId, SocketId},
    AssemblyError, Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub steps: Vec<StepBinding>,
    #[serde(default)]
    pub sequence: SequenceSettings,
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Pairs a movable entity with the socket it must be placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBinding {
    pub movable: EntityId,
    pub socket: SocketId,
}

/// Timing and tolerance settings for the step sequence. Times are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    pub alignment: AlignmentThresholds,
    /// Pause after release before checking whether a socket captured the entity.
    pub snap_grace_delay: f32,
    /// Pause after socket capture before checking alignment.
    pub verify_delay: f32,
    pub reset_duration: f32,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            alignment: AlignmentThresholds::default(),
            snap_grace_delay: 0.2,
            verify_delay: 0.1,
            reset_duration: 0.5,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub clips: Vec<ClipConfig>,
    pub step_sequences: AudioSequenceMap,
    /// Number of leading clips requested at start-up.
    pub bootstrap_clips: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            step_sequences: AudioSequenceMap::default(),
            bootstrap_clips: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    pub duration_seconds: f32,
    /// `None` marks a clip slot with no audio assigned.
    #[serde(default)]
    pub asset: Option<String>,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(AssemblyError::invalid_config("at least one step is required"));
        }

        let settings = &self.sequence;
        for (name, value) in [
            ("alignment.position", settings.alignment.position),
            ("alignment.rotation_degrees", settings.alignment.rotation_degrees),
            ("snap_grace_delay", settings.snap_grace_delay),
            ("verify_delay", settings.verify_delay),
            ("reset_duration", settings.reset_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AssemblyError::invalid_config(format!(
                    "`{name}` must be a non-negative number, got {value}"
                )));
            }
        }

        for (index, clip) in self.audio.clips.iter().enumerate() {
            if !clip.duration_seconds.is_finite() || clip.duration_seconds < 0.0 {
                return Err(AssemblyError::invalid_config(format!(
                    "clip {index} has invalid duration {}",
                    clip.duration_seconds
                )));
            }
        }

        if self.audio.step_sequences.len() > self.steps.len() {
            return Err(AssemblyError::invalid_config(format!(
                "{} audio sequences configured for {} steps",
                self.audio.step_sequences.len(),
                self.steps.len()
            )));
        }

        Ok(())
    }

    /// Three-step layout used by the demo command: four introductory clips
    /// followed by one or two clips per confirmed step.
    pub fn demo() -> Self {
        let steps = (0..3)
            .map(|i| StepBinding {
                movable: EntityId(100 + i),
                socket: SocketId(200 + i),
            })
            .collect();
        let clips = [2.0, 1.5, 1.5, 2.0, 1.0, 1.0, 1.0, 2.5]
            .iter()
            .enumerate()
            .map(|(i, duration)| ClipConfig {
                duration_seconds: *duration,
                asset: Some(format!("voice/step_{i:02}.ogg")),
            })
            .collect();

        Self {
            steps,
            sequence: SequenceSettings::default(),
            audio: AudioConfig {
                clips,
                step_sequences: AudioSequenceMap::new(vec![vec![4, 5], vec![6], vec![7]]),
                bootstrap_clips: 4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_config_is_valid() {
        AppConfig::demo().validate().unwrap();
    }

    #[test]
    fn parses_minimal_json_with_defaults() {
        let config = AppConfig::from_json_str(
            r#"{
                "steps": [{ "movable": 1, "socket": 2 }],
                "audio": { "clips": [{ "duration_seconds": 1.5 }] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.steps[0].movable, EntityId(1));
        assert_eq!(config.sequence, SequenceSettings::default());
        assert_eq!(config.audio.bootstrap_clips, 4);
        assert_eq!(config.audio.clips[0].asset, None);
    }

    #[test]
    fn rejects_empty_step_lists() {
        let err = AppConfig::from_json_str(r#"{ "steps": [] }"#).unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_negative_timings() {
        let mut config = AppConfig::demo();
        config.sequence.verify_delay = -0.1;
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("verify_delay"));
    }

    #[test]
    fn rejects_more_sequences_than_steps() {
        let mut config = AppConfig::demo();
        config.audio.step_sequences = AudioSequenceMap::new(vec![vec![0]; 4]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn reports_malformed_json() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, AssemblyError::Json(_)));
    }
}
