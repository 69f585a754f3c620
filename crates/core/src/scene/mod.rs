use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque handle to a grabbable entity owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// Opaque handle to a receptacle owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Position plus orientation in scene space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Builds a pose from a position and `{pitch, yaw, roll}` in degrees,
    /// applied yaw (Y) first.
    pub fn from_degrees(position: [f32; 3], rotation: [f32; 3]) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            rotation[1].to_radians(),
            rotation[0].to_radians(),
            rotation[2].to_radians(),
        );
        Self::new(Vec3::from_array(position), rotation)
    }
}

/// Effects and queries the sequencing core needs from the host scene.
pub trait SceneHost {
    /// Current world pose of an entity, `None` when the host does not know it.
    fn pose(&self, entity: EntityId) -> Option<Pose>;

    /// Attach pose of a socket, `None` when the host does not know it.
    fn socket_pose(&self, socket: SocketId) -> Option<Pose>;

    /// Socket currently holding the entity, if any.
    fn held_socket(&self, entity: EntityId) -> Option<SocketId>;

    fn set_pose(&mut self, entity: EntityId, pose: Pose);

    /// Enables or disables grab interaction for the entity.
    fn set_interactable(&mut self, entity: EntityId, interactable: bool);

    /// Suspends (`true`) or resumes (`false`) simulated dynamics.
    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool);

    fn set_highlight(&mut self, entity: EntityId, highlighted: bool);
}

/// Snapshot of a simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub pose: Pose,
    pub interactable: bool,
    pub kinematic: bool,
    pub highlighted: bool,
    pub held_by: Option<SocketId>,
}

impl EntityState {
    fn at(pose: Pose) -> Self {
        Self {
            pose,
            interactable: false,
            kinematic: true,
            highlighted: false,
            held_by: None,
        }
    }
}

#[derive(Debug, Default)]
struct SceneState {
    entities: BTreeMap<EntityId, EntityState>,
    sockets: BTreeMap<SocketId, Pose>,
}

/// In-memory [`SceneHost`] used by the command line host and by tests.
///
/// Clones share the same underlying state, so a caller can hand one clone to
/// the sequencing core and keep another to drive and inspect the scene.
#[derive(Debug, Clone, Default)]
pub struct SimulatedScene {
    state: Rc<RefCell<SceneState>>,
}

impl SimulatedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&self, entity: EntityId, pose: Pose) {
        self.state
            .borrow_mut()
            .entities
            .insert(entity, EntityState::at(pose));
    }

    pub fn add_socket(&self, socket: SocketId, pose: Pose) {
        self.state.borrow_mut().sockets.insert(socket, pose);
    }

    /// Moves an entity as if the user dragged it, pulling it out of any socket.
    pub fn move_entity(&self, entity: EntityId, pose: Pose) {
        if let Some(state) = self.state.borrow_mut().entities.get_mut(&entity) {
            state.pose = pose;
            state.held_by = None;
        }
    }

    /// Captures an entity in a socket at the given pose.
    pub fn insert_into_socket(&self, entity: EntityId, socket: SocketId, pose: Pose) {
        if let Some(state) = self.state.borrow_mut().entities.get_mut(&entity) {
            state.pose = pose;
            state.held_by = Some(socket);
        }
    }

    pub fn entity(&self, entity: EntityId) -> Option<EntityState> {
        self.state.borrow().entities.get(&entity).cloned()
    }

    pub fn entities(&self) -> Vec<(EntityId, EntityState)> {
        self.state
            .borrow()
            .entities
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect()
    }

    fn update(&self, entity: EntityId, apply: impl FnOnce(&mut EntityState)) {
        match self.state.borrow_mut().entities.get_mut(&entity) {
            Some(state) => apply(state),
            None => tracing::warn!(%entity, "scene update for unknown entity"),
        }
    }
}

impl SceneHost for SimulatedScene {
    fn pose(&self, entity: EntityId) -> Option<Pose> {
        self.state.borrow().entities.get(&entity).map(|state| state.pose)
    }

    fn socket_pose(&self, socket: SocketId) -> Option<Pose> {
        self.state.borrow().sockets.get(&socket).copied()
    }

    fn held_socket(&self, entity: EntityId) -> Option<SocketId> {
        self.state
            .borrow()
            .entities
            .get(&entity)
            .and_then(|state| state.held_by)
    }

    fn set_pose(&mut self, entity: EntityId, pose: Pose) {
        self.update(entity, |state| {
            state.pose = pose;
            state.held_by = None;
        });
    }

    fn set_interactable(&mut self, entity: EntityId, interactable: bool) {
        self.update(entity, |state| state.interactable = interactable);
    }

    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool) {
        self.update(entity, |state| state.kinematic = kinematic);
    }

    fn set_highlight(&mut self, entity: EntityId, highlighted: bool) {
        self.update(entity, |state| state.highlighted = highlighted);
    }
}
