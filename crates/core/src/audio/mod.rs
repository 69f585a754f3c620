use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::config::AudioConfig;

/// Playback backend the queue hands clips to.
pub trait AudioPlayer {
    fn play_clip(&mut self, clip: usize, asset: &str);
}

/// One entry in the playback log kept by [`RecordingAudioPlayer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackRecord {
    pub clip: usize,
    pub asset: String,
}

/// [`AudioPlayer`] that records every playback. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudioPlayer {
    records: Rc<RefCell<Vec<PlaybackRecord>>>,
}

impl RecordingAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PlaybackRecord> {
        self.records.borrow().clone()
    }

    pub fn played_clips(&self) -> Vec<usize> {
        self.records.borrow().iter().map(|r| r.clip).collect()
    }
}

impl AudioPlayer for RecordingAudioPlayer {
    fn play_clip(&mut self, clip: usize, asset: &str) {
        self.records.borrow_mut().push(PlaybackRecord {
            clip,
            asset: asset.to_string(),
        });
    }
}

/// Registry entry for a single clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipEntry {
    pub duration: f32,
    pub asset: Option<String>,
    /// Set once when the clip is first requested and never cleared.
    pub ever_played: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClipRegistry {
    clips: Vec<ClipEntry>,
}

impl ClipRegistry {
    pub fn from_config(config: &AudioConfig) -> Self {
        let clips = config
            .clips
            .iter()
            .map(|clip| ClipEntry {
                duration: if clip.duration_seconds.is_finite() {
                    clip.duration_seconds.max(0.0)
                } else {
                    0.0
                },
                asset: clip.asset.clone(),
                ever_played: false,
            })
            .collect();
        Self { clips }
    }

    pub fn get(&self, clip: usize) -> Option<&ClipEntry> {
        self.clips.get(clip)
    }

    fn get_mut(&mut self, clip: usize) -> Option<&mut ClipEntry> {
        self.clips.get_mut(clip)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Ordered clip sequence to play when each step is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioSequenceMap(Vec<Vec<usize>>);

impl AudioSequenceMap {
    pub fn new(sequences: Vec<Vec<usize>>) -> Self {
        Self(sequences)
    }

    /// Clips for `step`; steps without an entry play nothing.
    pub fn clips_for(&self, step: usize) -> &[usize] {
        self.0.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of [`AudioQueueController::request_play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayRequest {
    Queued,
    AlreadyPlayed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NowPlaying {
    pub clip: usize,
    pub started_at: f32,
    pub ends_at: f32,
}

/// Serialises clip playback: each clip plays at most once for the lifetime of
/// the controller and never overlaps another clip.
pub struct AudioQueueController {
    registry: ClipRegistry,
    queue: VecDeque<usize>,
    current: Option<NowPlaying>,
    bootstrap_clips: usize,
    now: f32,
    player: Box<dyn AudioPlayer>,
}

impl AudioQueueController {
    pub fn new(config: &AudioConfig, player: Box<dyn AudioPlayer>) -> Self {
        Self {
            registry: ClipRegistry::from_config(config),
            queue: VecDeque::new(),
            current: None,
            bootstrap_clips: config.bootstrap_clips,
            now: 0.0,
            player,
        }
    }

    /// Requests the introductory clips, lowest index first.
    pub fn bootstrap(&mut self) {
        let count = self.bootstrap_clips.min(self.registry.len());
        tracing::debug!(count, "bootstrapping introductory audio");
        for clip in 0..count {
            self.request_play(clip);
        }
    }

    pub fn request_play(&mut self, clip: usize) -> PlayRequest {
        let Some(entry) = self.registry.get_mut(clip) else {
            tracing::warn!(clip, "rejecting request for unknown clip");
            return PlayRequest::Rejected;
        };
        if entry.ever_played {
            tracing::debug!(clip, "clip already played");
            return PlayRequest::AlreadyPlayed;
        }

        entry.ever_played = true;
        self.queue.push_back(clip);
        if self.current.is_none() {
            self.start_next();
        }
        PlayRequest::Queued
    }

    pub fn request_sequence(&mut self, clips: &[usize]) -> Vec<PlayRequest> {
        clips.iter().map(|clip| self.request_play(*clip)).collect()
    }

    /// Advances the consumer to `now`: finishes the current clip once its
    /// duration has elapsed and starts the next queued one.
    pub fn tick(&mut self, now: f32) {
        self.now = now;
        if let Some(current) = self.current {
            if now < current.ends_at {
                return;
            }
            tracing::debug!(clip = current.clip, "clip finished");
            self.current = None;
        }
        self.start_next();
    }

    fn start_next(&mut self) {
        while let Some(clip) = self.queue.pop_front() {
            let Some(entry) = self.registry.get(clip) else {
                continue;
            };
            let Some(asset) = entry.asset.as_deref() else {
                tracing::warn!(clip, "clip has no asset assigned, skipping");
                continue;
            };

            tracing::debug!(clip, asset, "playing clip");
            self.player.play_clip(clip, asset);
            self.current = Some(NowPlaying {
                clip,
                started_at: self.now,
                ends_at: self.now + entry.duration,
            });
            return;
        }
    }

    /// Duration of `clip`, or zero for an unknown index.
    pub fn duration(&self, clip: usize) -> f32 {
        self.registry.get(clip).map(|c| c.duration).unwrap_or(0.0)
    }

    pub fn sequence_duration(&self, clips: &[usize]) -> f32 {
        clips.iter().map(|clip| self.duration(*clip)).sum()
    }

    pub fn has_played(&self, clip: usize) -> bool {
        self.registry
            .get(clip)
            .map(|c| c.ever_played)
            .unwrap_or(false)
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.current
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &usize> {
        self.queue.iter()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    pub fn registry(&self) -> &ClipRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for AudioQueueController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioQueueController")
            .field("clips", &self.registry.len())
            .field("queue", &self.queue)
            .field("current", &self.current)
            .field("now", &self.now)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClipConfig;

    fn config(durations: &[f32]) -> AudioConfig {
        AudioConfig {
            clips: durations
                .iter()
                .enumerate()
                .map(|(i, d)| ClipConfig {
                    duration_seconds: *d,
                    asset: Some(format!("clip_{i}.ogg")),
                })
                .collect(),
            step_sequences: AudioSequenceMap::default(),
            bootstrap_clips: 4,
        }
    }

    fn controller(durations: &[f32]) -> (AudioQueueController, RecordingAudioPlayer) {
        let player = RecordingAudioPlayer::new();
        let audio = AudioQueueController::new(&config(durations), Box::new(player.clone()));
        (audio, player)
    }

    #[test]
    fn duplicate_requests_play_once() {
        let (mut audio, player) = controller(&[1.0, 1.0]);

        assert_eq!(audio.request_play(1), PlayRequest::Queued);
        for _ in 0..5 {
            assert_eq!(audio.request_play(1), PlayRequest::AlreadyPlayed);
        }
        audio.tick(5.0);
        assert_eq!(audio.request_play(1), PlayRequest::AlreadyPlayed);

        assert_eq!(player.played_clips(), vec![1]);
    }

    #[test]
    fn clips_play_back_to_back_without_overlap() {
        let (mut audio, player) = controller(&[0.5, 1.0, 0.25]);
        audio.request_sequence(&[0, 1, 2]);
        assert_eq!(player.played_clips(), vec![0]);

        audio.tick(0.4);
        assert_eq!(player.played_clips(), vec![0]);
        audio.tick(0.5);
        assert_eq!(player.played_clips(), vec![0, 1]);
        assert_eq!(audio.now_playing().map(|p| p.started_at), Some(0.5));

        audio.tick(1.4);
        assert_eq!(player.played_clips(), vec![0, 1]);
        audio.tick(1.5);
        assert_eq!(player.played_clips(), vec![0, 1, 2]);

        audio.tick(2.0);
        assert!(audio.is_idle());
    }

    #[test]
    fn consumer_restarts_lazily_after_draining() {
        let (mut audio, player) = controller(&[0.1, 0.1]);
        audio.request_play(0);
        audio.tick(1.0);
        assert!(audio.is_idle());

        audio.request_play(1);
        assert_eq!(audio.now_playing().map(|p| p.clip), Some(1));
        assert_eq!(player.played_clips(), vec![0, 1]);
    }

    #[test]
    fn bootstrap_requests_first_four_clips_in_order() {
        let (mut audio, player) = controller(&[0.1; 6]);
        audio.bootstrap();
        for step in 1..=10 {
            audio.tick(step as f32 * 0.1);
        }

        assert_eq!(player.played_clips(), vec![0, 1, 2, 3]);
        assert!(!audio.has_played(4));
    }

    #[test]
    fn bootstrap_is_capped_by_clip_count() {
        let (mut audio, player) = controller(&[0.1, 0.1]);
        audio.bootstrap();
        audio.tick(1.0);
        audio.tick(2.0);
        assert_eq!(player.played_clips(), vec![0, 1]);
    }

    #[test]
    fn unknown_clips_are_rejected_without_side_effects() {
        let (mut audio, player) = controller(&[1.0]);
        assert_eq!(audio.request_play(7), PlayRequest::Rejected);
        assert!(audio.is_idle());
        assert!(player.records().is_empty());
        assert_eq!(audio.duration(7), 0.0);
    }

    #[test]
    fn unassigned_clips_are_skipped() {
        let mut config = config(&[1.0, 1.0]);
        config.clips[0].asset = None;
        let player = RecordingAudioPlayer::new();
        let mut audio = AudioQueueController::new(&config, Box::new(player.clone()));

        audio.request_sequence(&[0, 1]);
        assert_eq!(player.played_clips(), vec![1]);
        assert!(audio.has_played(0));
        assert_eq!(audio.request_play(0), PlayRequest::AlreadyPlayed);
    }

    #[test]
    fn reports_sequence_durations() {
        let (audio, _) = controller(&[0.5, 1.25, 2.0]);
        assert_eq!(audio.duration(1), 1.25);
        assert_eq!(audio.sequence_duration(&[0, 2, 9]), 2.5);
    }

    #[test]
    fn sequence_map_defaults_to_empty_for_missing_steps() {
        let map = AudioSequenceMap::new(vec![vec![0, 1], vec![]]);
        assert_eq!(map.clips_for(0), &[0, 1]);
        assert!(map.clips_for(1).is_empty());
        assert!(map.clips_for(5).is_empty());
    }
}
