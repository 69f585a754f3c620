use serde::Serialize;

use crate::{
    alignment::validate_alignment,
    audio::{AudioPlayer, AudioQueueController, AudioSequenceMap, NowPlaying},
    completion::{CompletionTracker, CompletionUi},
    config::{AppConfig, SequenceSettings, StepBinding},
    events::{EventBus, EventKind, InteractionEvent, ListenerId},
    reset::ResetAnimator,
    scene::{EntityId, Pose, SceneHost, SocketId},
    timeline::{PlaybackClock, Scheduler},
    AssemblyError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Disabled,
    Active,
    Placed,
    Resetting,
    Snapped,
}

/// One assembly unit: a movable entity and the socket it belongs in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub index: usize,
    pub movable: EntityId,
    pub socket: SocketId,
    /// Pose recorded at initialisation; resets return here.
    pub origin: Pose,
    pub state: StepState,
    pub confirmed: bool,
    pub active: bool,
}

impl Step {
    pub fn new(index: usize, movable: EntityId, socket: SocketId, origin: Pose) -> Self {
        Self {
            index,
            movable,
            socket,
            origin,
            state: StepState::Disabled,
            confirmed: false,
            active: false,
        }
    }

    fn accepts_interaction(&self) -> bool {
        !self.confirmed && matches!(self.state, StepState::Active | StepState::Placed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    ReleaseGraceElapsed { step: usize },
    VerifyPlacement { step: usize },
}

/// Diagnostic view of a running session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub time_seconds: f32,
    pub completed: bool,
    pub confirmed_steps: usize,
    pub steps: Vec<Step>,
    pub now_playing: Option<NowPlaying>,
    pub queued_clips: Vec<usize>,
}

/// Drives the step state machine from host events and the tick loop.
///
/// Each [`Step`] moves through
/// `Disabled -> Active -> Placed -> {Snapped | Resetting -> Active}`, and a
/// step only becomes active once the step before it is confirmed. The release
/// grace period and the verify delay are queued on a [`Scheduler`] and resumed
/// on a later tick. Every continuation re-reads the step before acting, so a
/// confirmed step always wins over a pending reset.
pub struct SequenceController {
    settings: SequenceSettings,
    bindings: Vec<StepBinding>,
    steps: Vec<Step>,
    sequences: AudioSequenceMap,
    scene: Box<dyn SceneHost>,
    audio: AudioQueueController,
    completion: CompletionTracker,
    resets: ResetAnimator,
    pending: Scheduler<PendingAction>,
    clock: PlaybackClock,
    listener: Option<ListenerId>,
}

impl SequenceController {
    pub fn new(
        bindings: Vec<StepBinding>,
        settings: SequenceSettings,
        sequences: AudioSequenceMap,
        scene: Box<dyn SceneHost>,
        audio: AudioQueueController,
        completion: CompletionTracker,
    ) -> Result<Self> {
        if bindings.is_empty() {
            return Err(AssemblyError::invalid_config(
                "at least one step is required",
            ));
        }

        Ok(Self {
            settings,
            bindings,
            steps: Vec::new(),
            sequences,
            scene,
            audio,
            completion,
            resets: ResetAnimator::new(),
            pending: Scheduler::new(),
            clock: PlaybackClock::default(),
            listener: None,
        })
    }

    /// Builds a controller and its collaborators from a validated config.
    pub fn from_config(
        config: &AppConfig,
        scene: Box<dyn SceneHost>,
        player: Box<dyn AudioPlayer>,
        ui: Box<dyn CompletionUi>,
    ) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.steps.clone(),
            config.sequence,
            config.audio.step_sequences.clone(),
            scene,
            AudioQueueController::new(&config.audio, player),
            CompletionTracker::new(ui),
        )
    }

    /// Records origin poses, activates the first step, subscribes to host
    /// events and requests the introductory audio.
    pub fn initialize(&mut self, bus: &mut EventBus) -> Result<()> {
        if !self.steps.is_empty() {
            return Err(AssemblyError::msg("sequence has already been initialized"));
        }

        let mut steps = Vec::with_capacity(self.bindings.len());
        for (index, binding) in self.bindings.iter().enumerate() {
            let origin = self
                .scene
                .pose(binding.movable)
                .ok_or(AssemblyError::UnknownEntity(binding.movable))?;
            steps.push(Step::new(index, binding.movable, binding.socket, origin));
        }
        self.steps = steps;

        self.activate(0);
        for index in 1..self.steps.len() {
            self.disable(index);
        }

        self.listener = Some(bus.subscribe(&[EventKind::GrabReleased, EventKind::EnteredSocket]));
        self.audio.bootstrap();
        tracing::info!(steps = self.steps.len(), "sequence initialized");
        Ok(())
    }

    /// Detaches from the bus. Pending continuations and running resets are
    /// dropped; queued audio keeps playing on later ticks.
    pub fn teardown(&mut self, bus: &mut EventBus) {
        if let Some(listener) = self.listener.take() {
            bus.unsubscribe(listener);
            self.pending.clear();
            self.resets.clear();
            tracing::info!("sequence torn down");
        }
    }

    pub fn tick(&mut self, delta_seconds: f32, bus: &mut EventBus) {
        self.clock.advance(delta_seconds);
        let now = self.clock.time_seconds;
        let watermark = self.pending.watermark();
        // Audio runs first so clips requested later in this tick start at `now`.
        self.audio.tick(now);

        self.advance_resets(delta_seconds.max(0.0));

        if let Some(listener) = self.listener {
            for event in bus.drain(listener) {
                self.dispatch(event);
            }
        }

        while let Some(action) = self.pending.pop_due(now, watermark) {
            match action {
                PendingAction::ReleaseGraceElapsed { step } => self.release_grace_elapsed(step),
                PendingAction::VerifyPlacement { step } => self.verify_and_advance(step),
            }
        }
    }

    fn dispatch(&mut self, event: InteractionEvent) {
        match event {
            InteractionEvent::GrabReleased { step } => self.on_released(step),
            InteractionEvent::EnteredSocket { socket, entity } => self.on_placed(socket, entity),
        }
    }

    /// Handles the movable of `step` being let go. After the grace delay the
    /// step resets unless a socket holds the entity or the step was confirmed.
    pub fn on_released(&mut self, step: usize) {
        if !self.is_attached() {
            return;
        }
        let Some(record) = self.steps.get(step) else {
            tracing::warn!(step, "release for unknown step");
            return;
        };
        if !record.accepts_interaction() {
            tracing::debug!(step, state = ?record.state, "ignoring release");
            return;
        }

        self.pending.schedule_after(
            self.clock.time_seconds,
            self.settings.snap_grace_delay,
            PendingAction::ReleaseGraceElapsed { step },
        );
    }

    /// Handles an entity entering socket `socket`. Only the step's own movable
    /// counts; anything else is logged and ignored.
    pub fn on_placed(&mut self, socket: usize, entity: EntityId) {
        if !self.is_attached() {
            return;
        }
        let Some(record) = self.steps.get_mut(socket) else {
            tracing::warn!(socket, %entity, "placement into unknown socket");
            return;
        };
        if record.movable != entity {
            tracing::warn!(
                socket,
                %entity,
                expected = %record.movable,
                "entity placed in mismatched socket"
            );
            return;
        }
        if !record.accepts_interaction() {
            tracing::debug!(step = socket, state = ?record.state, "ignoring placement");
            return;
        }

        record.state = StepState::Placed;
        self.pending.schedule_after(
            self.clock.time_seconds,
            self.settings.verify_delay,
            PendingAction::VerifyPlacement { step: socket },
        );
    }

    fn release_grace_elapsed(&mut self, step: usize) {
        let Some(record) = self.steps.get(step) else {
            return;
        };
        if record.confirmed {
            tracing::debug!(step, "step confirmed during grace delay, keeping it");
            return;
        }
        if !record.accepts_interaction() {
            return;
        }
        match self.scene.held_socket(record.movable) {
            Some(socket) if socket == record.socket => {
                tracing::debug!(step, "released into its socket");
                return;
            }
            Some(socket) => tracing::debug!(step, %socket, "released into a foreign socket"),
            None => tracing::debug!(step, "released away from socket"),
        }
        self.begin_reset(step);
    }

    fn verify_and_advance(&mut self, step: usize) {
        let Some(record) = self.steps.get(step) else {
            return;
        };
        if record.confirmed || record.state != StepState::Placed {
            tracing::debug!(step, state = ?record.state, "skipping stale verification");
            return;
        }

        let placed = self.scene.pose(record.movable);
        let target = self.scene.socket_pose(record.socket);
        let (Some(placed), Some(target)) = (placed, target) else {
            tracing::warn!(step, "missing pose for verification, resetting");
            self.begin_reset(step);
            return;
        };

        let report = validate_alignment(&placed, &target, &self.settings.alignment);
        if report.aligned {
            self.confirm(step);
        } else {
            tracing::info!(
                step,
                distance = report.distance,
                angle = report.angle_degrees,
                "placement out of tolerance"
            );
            self.begin_reset(step);
        }
    }

    fn confirm(&mut self, step: usize) {
        self.resets.cancel(step);
        let record = &mut self.steps[step];
        record.confirmed = true;
        record.active = false;
        record.state = StepState::Snapped;
        let movable = record.movable;

        self.scene.set_interactable(movable, false);
        self.scene.set_kinematic(movable, true);
        self.scene.set_highlight(movable, false);
        tracing::info!(step, "step confirmed");

        self.audio.request_sequence(self.sequences.clips_for(step));
        self.completion.check_and_signal(&self.steps);

        let next = step + 1;
        if self
            .steps
            .get(next)
            .is_some_and(|s| s.state == StepState::Disabled)
        {
            self.activate(next);
        }
    }

    fn activate(&mut self, step: usize) {
        let record = &mut self.steps[step];
        record.state = StepState::Active;
        record.active = true;
        let movable = record.movable;

        self.scene.set_interactable(movable, true);
        self.scene.set_kinematic(movable, false);
        self.scene.set_highlight(movable, true);
        tracing::debug!(step, "step activated");
    }

    fn disable(&mut self, step: usize) {
        let record = &mut self.steps[step];
        record.state = StepState::Disabled;
        record.active = false;
        let movable = record.movable;

        self.scene.set_interactable(movable, false);
        self.scene.set_kinematic(movable, true);
        self.scene.set_highlight(movable, false);
    }

    fn begin_reset(&mut self, step: usize) {
        let record = &mut self.steps[step];
        record.state = StepState::Resetting;
        record.active = false;
        let (movable, origin) = (record.movable, record.origin);

        let from = self.scene.pose(movable).unwrap_or(origin);
        self.scene.set_interactable(movable, false);
        self.scene.set_kinematic(movable, true);
        self.resets
            .start(step, from, origin, self.settings.reset_duration);
        tracing::debug!(step, "resetting to origin");
    }

    fn advance_resets(&mut self, delta_seconds: f32) {
        for frame in self.resets.advance(delta_seconds) {
            let movable = self.steps[frame.step].movable;
            self.scene.set_pose(movable, frame.pose);
            if frame.finished {
                self.finish_reset(frame.step);
            }
        }
    }

    fn finish_reset(&mut self, step: usize) {
        let record = &mut self.steps[step];
        if record.confirmed {
            return;
        }
        record.state = StepState::Active;
        record.active = true;
        let movable = record.movable;

        self.scene.set_kinematic(movable, false);
        self.scene.set_interactable(movable, true);
        self.scene.set_highlight(movable, true);
        tracing::debug!(step, "reset finished");
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Index of the first step that is not yet confirmed.
    pub fn current_step(&self) -> Option<usize> {
        self.steps.iter().position(|step| !step.confirmed)
    }

    /// `(confirmed, total)` step counts.
    pub fn progress(&self) -> (usize, usize) {
        let confirmed = self.steps.iter().filter(|step| step.confirmed).count();
        (confirmed, self.steps.len())
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_signaled()
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.resets.is_empty()
    }

    pub fn now(&self) -> f32 {
        self.clock.time_seconds
    }

    pub fn audio(&self) -> &AudioQueueController {
        &self.audio
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (confirmed_steps, _) = self.progress();
        SessionSnapshot {
            time_seconds: self.clock.time_seconds,
            completed: self.is_complete(),
            confirmed_steps,
            steps: self.steps.clone(),
            now_playing: self.audio.now_playing(),
            queued_clips: self.audio.pending().copied().collect(),
        }
    }
}

impl std::fmt::Debug for SequenceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceController")
            .field("steps", &self.steps.len())
            .field("progress", &self.progress())
            .field("pending", &self.pending.len())
            .field("resets", &self.resets.len())
            .field("time", &self.clock.time_seconds)
            .field("attached", &self.is_attached())
            .finish()
    }
}
