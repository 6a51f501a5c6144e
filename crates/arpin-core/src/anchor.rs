//! User-placed anchors and the arena that owns them.
//!
//! The arena lives on the render thread. Each slot pairs the runtime's
//! [`AnchorHandle`] with the last [`Anchor`] state reported for it. Clearing
//! a marker bumps its slot's reuse count, so an [`AnchorId`] held for a
//! cleared marker stops resolving before the slot takes the next tap.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::trackable::TrackingState;

// ---------------------------------------------------------------------------
// AnchorHandle / Anchor
// ---------------------------------------------------------------------------

/// Opaque runtime handle for an anchor created by `ArSession::create_anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorHandle(pub u64);

/// The runtime's current view of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// World pose of the anchor.
    pub pose: Pose,
    /// Current tracking state.
    pub tracking_state: TrackingState,
}

// ---------------------------------------------------------------------------
// AnchorId
// ---------------------------------------------------------------------------

/// Names one placement in an [`AnchorArena`].
///
/// `slot` is where the anchor sits; `reuse` counts how many earlier
/// anchors were cleared out of that slot. An id resolves only while both
/// match, so a cleared marker's id never picks up the one placed after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId {
    slot: u32,
    reuse: u32,
}

impl AnchorId {
    /// Position in the arena's slot list.
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Times the slot had been vacated before this placement.
    pub fn reuse(self) -> u32 {
        self.reuse
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker #{}", self.slot)?;
        if self.reuse > 0 {
            write!(f, " (reuse {})", self.reuse)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnchorArena
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Slot {
    reuse: u32,
    entry: Option<(AnchorHandle, Anchor)>,
}

/// Owns the anchors placed by the user, in placement order.
///
/// Cleared slots are refilled oldest-first, so reuse counts grow evenly
/// across slots. Iteration follows slot order, which for
/// an arena that never removes equals placement order.
#[derive(Debug, Default)]
pub struct AnchorArena {
    slots: Vec<Slot>,
    free_indices: VecDeque<u32>,
    len: usize,
}

impl AnchorArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly created anchor and return its id.
    pub fn insert(&mut self, handle: AnchorHandle, anchor: Anchor) -> AnchorId {
        self.len += 1;
        if let Some(index) = self.free_indices.pop_front() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some((handle, anchor));
            AnchorId {
                slot: index,
                reuse: slot.reuse,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                reuse: 0,
                entry: Some((handle, anchor)),
            });
            AnchorId {
                slot: index,
                reuse: 0,
            }
        }
    }

    /// Remove an anchor, returning its runtime handle so the caller can
    /// detach it. Stale or unknown ids return `None`.
    pub fn remove(&mut self, id: AnchorId) -> Option<AnchorHandle> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.reuse != id.reuse {
            return None;
        }
        let (handle, _) = slot.entry.take()?;
        slot.reuse = slot.reuse.wrapping_add(1);
        self.free_indices.push_back(id.slot);
        self.len -= 1;
        Some(handle)
    }

    /// The latest state of a live anchor.
    pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.reuse != id.reuse {
            return None;
        }
        slot.entry.as_ref().map(|(_, anchor)| anchor)
    }

    /// Whether `id` refers to a live anchor.
    pub fn contains(&self, id: AnchorId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live anchors.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if no anchors are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live anchors in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (AnchorId, AnchorHandle, &Anchor)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let id = AnchorId {
                slot: index as u32,
                reuse: slot.reuse,
            };
            slot.entry.as_ref().map(|(handle, anchor)| (id, *handle, anchor))
        })
    }

    /// Copy out the current anchor states in slot order.
    pub fn snapshot(&self) -> Vec<Anchor> {
        self.iter().map(|(_, _, anchor)| *anchor).collect()
    }

    /// Replace each live anchor's state with what `lookup` reports for its
    /// runtime handle. Anchors the runtime no longer knows become
    /// [`TrackingState::Stopped`] and keep their last pose.
    pub fn refresh(&mut self, mut lookup: impl FnMut(AnchorHandle) -> Option<Anchor>) {
        for slot in &mut self.slots {
            if let Some((handle, anchor)) = slot.entry.as_mut() {
                match lookup(*handle) {
                    Some(latest) => *anchor = latest,
                    None => anchor.tracking_state = TrackingState::Stopped,
                }
            }
        }
    }

    /// Remove every anchor, returning the runtime handles in slot order.
    pub fn drain_handles(&mut self) -> Vec<AnchorHandle> {
        let ids: Vec<AnchorId> = self.iter().map(|(id, _, _)| id).collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
