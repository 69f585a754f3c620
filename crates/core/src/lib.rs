//! Core library for the Assembly Guide application.
//!
//! A user places objects into sockets in a fixed order. The crate sequences
//! those steps: it verifies each placement against spatial tolerances, resets
//! misplaced objects, plays each step's guidance audio exactly once, and
//! signals when the whole assembly is done. Rendering, physics, input and
//! audio output stay with the host and are reached through the
//! [`SceneHost`], [`AudioPlayer`] and [`CompletionUi`] traits.

pub mod alignment;
pub mod audio;
pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod reset;
pub mod scene;
pub mod sequence;
pub mod timeline;

pub use alignment::{validate_alignment, AlignmentReport, AlignmentThresholds};
pub use audio::{
    AudioPlayer, AudioQueueController, AudioSequenceMap, ClipEntry, ClipRegistry, NowPlaying,
    PlayRequest, PlaybackRecord, RecordingAudioPlayer,
};
pub use completion::{CompletionTracker, CompletionUi, RecordingCompletionUi};
pub use config::{AppConfig, AudioConfig, ClipConfig, SequenceSettings, StepBinding};
pub use error::{AssemblyError, Result};
pub use events::{EventBus, EventKind, InteractionEvent, ListenerId};
pub use reset::{ResetAnimation, ResetAnimator, ResetFrame};
pub use scene::{EntityId, EntityState, Pose, SceneHost, SimulatedScene, SocketId};
pub use sequence::{SequenceController, SessionSnapshot, Step, StepState};
pub use timeline::{PlaybackClock, Scheduler};
