use std::collections::BTreeMap;

use crate::scene::Pose;

/// Time-bounded interpolation from a start pose back to a target pose.
///
/// Position moves linearly; orientation follows the shortest spherical path.
/// Once the elapsed time reaches the duration the pose snaps exactly to the
/// target so no floating point drift survives the animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetAnimation {
    start: Pose,
    target: Pose,
    duration: f32,
    elapsed: f32,
}

impl ResetAnimation {
    pub fn new(start: Pose, target: Pose, duration: f32) -> Self {
        Self {
            start,
            target,
            duration: if duration.is_finite() {
                duration.max(0.0)
            } else {
                0.0
            },
            elapsed: 0.0,
        }
    }

    pub fn target(&self) -> Pose {
        self.target
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advances the animation by one tick and returns the sampled pose.
    pub fn advance(&mut self, delta_seconds: f32) -> Pose {
        self.elapsed += delta_seconds.max(0.0);
        if self.is_finished() {
            return self.target;
        }

        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        Pose {
            position: self.start.position.lerp(self.target.position, t),
            rotation: self
                .start
                .rotation
                .normalize()
                .slerp(self.target.rotation.normalize(), t),
        }
    }
}

/// Pose emitted for one step during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetFrame {
    pub step: usize,
    pub pose: Pose,
    pub finished: bool,
}

/// Per-step table of running reset animations.
#[derive(Debug, Default)]
pub struct ResetAnimator {
    running: BTreeMap<usize, ResetAnimation>,
}

impl ResetAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a reset for `step`. A reset already running for the same step is
    /// replaced; the sequence controller never starts one while a step is
    /// resetting, so this only matters to direct callers.
    pub fn start(&mut self, step: usize, from: Pose, to: Pose, duration: f32) {
        if self
            .running
            .insert(step, ResetAnimation::new(from, to, duration))
            .is_some()
        {
            tracing::debug!(step, "superseding running reset");
        }
    }

    pub fn cancel(&mut self, step: usize) -> bool {
        self.running.remove(&step).is_some()
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }

    pub fn is_resetting(&self, step: usize) -> bool {
        self.running.contains_key(&step)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Samples every running animation once. Finished animations are removed
    /// and reported with `finished = true`.
    pub fn advance(&mut self, delta_seconds: f32) -> Vec<ResetFrame> {
        let mut frames = Vec::with_capacity(self.running.len());
        for (step, animation) in self.running.iter_mut() {
            let pose = animation.advance(delta_seconds);
            frames.push(ResetFrame {
                step: *step,
                pose,
                finished: animation.is_finished(),
            });
        }
        self.running.retain(|_, animation| !animation.is_finished());
        frames
    }
}
