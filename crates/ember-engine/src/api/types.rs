/// Handle to an entity slot in the [`World`](crate::core::world::World) arena.
///
/// The index addresses the slot, the generation detects reuse: deep removal
/// frees the slot and bumps its generation, so every handle taken before that
/// point stops resolving instead of aliasing whatever occupies the slot next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was issued under.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Handle to a component attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) u32);

/// Handle to a running cooperative task.
///
/// Handles are single-use: two starts of the same routine body produce two
/// distinct handles, and a handle is never reissued after its task ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

/// Handle to a node owned by the presentation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Where an entity stands in its removal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Live: visual node held, state changes push through to the backend.
    Active,
    /// Detached from the presentation tree but resurrectable via `awake`.
    SoftRemoved,
    /// Visual node released for good. Stale handles also read as this.
    DeepRemoved,
}
