use std::path::Path;

use assembly_guide_core::{
    AppConfig, EntityId, EventBus, InteractionEvent, Pose, Result, SceneHost, SimulatedScene,
    SocketId,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Scene layout plus a timeline of host actions to replay against the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionScript {
    #[serde(default)]
    pub entities: Vec<PlacedObject>,
    #[serde(default)]
    pub sockets: Vec<PlacedSocket>,
    #[serde(default)]
    pub actions: Vec<TimedAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: EntityId,
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedSocket {
    pub id: SocketId,
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedAction {
    pub at: f32,
    #[serde(flatten)]
    pub action: HostAction,
}

/// What the simulated user or physics does at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    /// Drag an entity to a pose, outside any socket.
    Move {
        entity: EntityId,
        position: [f32; 3],
        #[serde(default)]
        rotation_degrees: [f32; 3],
    },
    /// Let a socket capture an entity at its attach pose plus `offset`.
    Insert {
        entity: EntityId,
        socket: SocketId,
        #[serde(default)]
        offset: [f32; 3],
    },
    Release { step: usize },
    EnterSocket { socket: usize, entity: EntityId },
    /// Insert the step's own movable into its socket, then fire the socket and
    /// release events.
    Place {
        step: usize,
        #[serde(default)]
        offset: [f32; 3],
    },
}

impl SessionScript {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Lays the configured entities out in a row with their sockets above.
    pub fn default_layout(config: &AppConfig) -> Self {
        let mut script = Self::default();
        for (i, binding) in config.steps.iter().enumerate() {
            let x = i as f32 * 0.5;
            script.entities.push(PlacedObject {
                id: binding.movable,
                position: [x, 0.0, 0.0],
                rotation_degrees: [0.0, 0.0, 0.0],
            });
            script.sockets.push(PlacedSocket {
                id: binding.socket,
                position: [x, 1.0, 0.5],
                rotation_degrees: [0.0, 90.0, 0.0],
            });
        }
        script
    }

    /// Default layout with one misplacement followed by correct placements.
    pub fn demo(config: &AppConfig) -> Self {
        let mut script = Self::default_layout(config);
        script.actions.push(TimedAction {
            at: 0.5,
            action: HostAction::Place {
                step: 0,
                offset: [0.05, 0.0, 0.0],
            },
        });
        for step in 0..config.steps.len() {
            script.actions.push(TimedAction {
                at: 2.0 + step as f32 * 1.5,
                action: HostAction::Place {
                    step,
                    offset: [0.0, 0.0, 0.0],
                },
            });
        }
        script
    }

    pub fn build_scene(&self) -> SimulatedScene {
        let scene = SimulatedScene::new();
        for object in &self.entities {
            scene.add_entity(
                object.id,
                Pose::from_degrees(object.position, object.rotation_degrees),
            );
        }
        for socket in &self.sockets {
            scene.add_socket(
                socket.id,
                Pose::from_degrees(socket.position, socket.rotation_degrees),
            );
        }
        scene
    }
}

/// Replays script actions as the clock passes their timestamps.
#[derive(Debug)]
pub struct ScriptPlayer {
    actions: Vec<TimedAction>,
    next: usize,
}

impl ScriptPlayer {
    pub fn new(script: &SessionScript) -> Self {
        let mut actions = script.actions.clone();
        actions.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { actions, next: 0 }
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.actions.len()
    }

    pub fn apply_due(
        &mut self,
        now: f32,
        config: &AppConfig,
        scene: &SimulatedScene,
        bus: &mut EventBus,
    ) {
        while let Some(timed) = self.actions.get(self.next) {
            if timed.at > now {
                break;
            }
            tracing::debug!(at = timed.at, action = ?timed.action, "applying script action");
            apply(&timed.action, config, scene, bus);
            self.next += 1;
        }
    }
}

fn apply(action: &HostAction, config: &AppConfig, scene: &SimulatedScene, bus: &mut EventBus) {
    match action {
        HostAction::Move {
            entity,
            position,
            rotation_degrees,
        } => scene.move_entity(*entity, Pose::from_degrees(*position, *rotation_degrees)),
        HostAction::Insert {
            entity,
            socket,
            offset,
        } => insert(scene, *entity, *socket, *offset),
        HostAction::Release { step } => {
            bus.publish(InteractionEvent::GrabReleased { step: *step });
        }
        HostAction::EnterSocket { socket, entity } => {
            bus.publish(InteractionEvent::EnteredSocket {
                socket: *socket,
                entity: *entity,
            });
        }
        HostAction::Place { step, offset } => {
            let Some(binding) = config.steps.get(*step) else {
                tracing::warn!(step, "script places unknown step");
                return;
            };
            insert(scene, binding.movable, binding.socket, *offset);
            bus.publish(InteractionEvent::EnteredSocket {
                socket: *step,
                entity: binding.movable,
            });
            bus.publish(InteractionEvent::GrabReleased { step: *step });
        }
    }
}

fn insert(scene: &SimulatedScene, entity: EntityId, socket: SocketId, offset: [f32; 3]) {
    let Some(mut pose) = scene.socket_pose(socket) else {
        tracing::warn!(%socket, "script inserts into unknown socket");
        return;
    };
    pose.position += Vec3::from_array(offset);
    scene.insert_into_socket(entity, socket, pose);
}
