//! Tap-to-place input.
//!
//! The UI thread submits [`TouchEvent`]s through a [`TapSender`]. Only
//! press-down events are queued; the queue is bounded and a full queue drops
//! the tap. The render thread drains the queue once per tick through
//! [`TouchHandler`] and resolves each tap against that tick's frame.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use arpin_core::anchor::{Anchor, AnchorArena, AnchorId};
use arpin_core::frame::Frame;
use arpin_core::pose::Pose;
use arpin_core::runtime::ArSession;
use arpin_core::trackable::{Hit, TrackingState};
use arpin_core::ArError;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Pointer action reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchAction {
    /// Finger or button pressed.
    Down,
    /// Pointer moved while pressed.
    Move,
    /// Released.
    Up,
    /// Gesture aborted by the system.
    Cancel,
}

/// A pointer event in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// What happened.
    pub action: TouchAction,
    /// Horizontal position in pixels from the left edge.
    pub x: f32,
    /// Vertical position in pixels from the top edge.
    pub y: f32,
}

impl TouchEvent {
    /// A press-down at `(x, y)`.
    pub fn down(x: f32, y: f32) -> Self {
        Self {
            action: TouchAction::Down,
            x,
            y,
        }
    }
}

/// A queued press-down position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    /// Horizontal pixel position.
    pub x: f32,
    /// Vertical pixel position.
    pub y: f32,
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// What happened to a submitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Submission {
    /// A press-down was queued for the next tick.
    Queued,
    /// Not a press-down; the host may handle it elsewhere.
    Ignored,
    /// The queue was full (or the render side is gone) and the tap was lost.
    Dropped,
}

impl Submission {
    /// Whether the event was consumed by the demo.
    pub fn consumed(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// UI-thread side of the tap queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TapSender {
    tx: Sender<Tap>,
}

impl TapSender {
    /// Offer an event to the queue.
    pub fn submit(&self, event: TouchEvent) -> Submission {
        if event.action != TouchAction::Down {
            return Submission::Ignored;
        }
        match self.tx.try_send(Tap {
            x: event.x,
            y: event.y,
        }) {
            Ok(()) => Submission::Queued,
            Err(TrySendError::Full(tap)) => {
                tracing::warn!(x = tap.x, y = tap.y, "tap queue full, tap dropped");
                Submission::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Submission::Dropped,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Result of resolving one tap.
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    /// An anchor was created and added to the arena.
    Placed {
        /// Arena slot of the new anchor.
        id: AnchorId,
        /// Pose the anchor was created at.
        pose: Pose,
    },
    /// No frame was acquired this tick.
    NoFrame,
    /// The camera was not tracking.
    NotTracking,
    /// No hit landed inside a plane polygon.
    NoPlaneHit,
    /// The runtime refused to create the anchor.
    AnchorFailed(ArError),
}

/// The first hit that landed on a plane and inside its polygon.
pub fn select_hit(hits: &[Hit]) -> Option<&Hit> {
    hits.iter().find(|hit| hit.is_inside_plane())
}

/// Render-thread side of the tap queue.
#[derive(Debug)]
pub struct TouchHandler {
    rx: Receiver<Tap>,
}

impl TouchHandler {
    /// A bounded queue holding at most `capacity` taps between ticks.
    pub fn channel(capacity: usize) -> (TapSender, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (TapSender { tx }, Self { rx })
    }

    /// Take every queued tap.
    pub fn drain(&self) -> Vec<Tap> {
        self.rx.try_iter().collect()
    }

    /// Taps waiting in the queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Resolve one tap against `frame`: hit-test, pick the first hit inside
    /// a plane polygon, and anchor there.
    pub fn resolve<S: ArSession + ?Sized>(
        session: &mut S,
        frame: Option<&Frame>,
        arena: &mut AnchorArena,
        tap: Tap,
    ) -> TapOutcome {
        let Some(frame) = frame else {
            return TapOutcome::NoFrame;
        };
        if !frame.camera.tracking_state.is_tracking() {
            return TapOutcome::NotTracking;
        }
        let hits = session.hit_test(frame, tap.x, tap.y);
        let Some(hit) = select_hit(&hits) else {
            tracing::debug!(x = tap.x, y = tap.y, hits = hits.len(), "tap missed every plane");
            return TapOutcome::NoPlaneHit;
        };
        match session.create_anchor(hit) {
            Ok(handle) => {
                let anchor = session.anchor(handle).unwrap_or(Anchor {
                    pose: hit.pose,
                    tracking_state: TrackingState::Tracking,
                });
                let id = arena.insert(handle, anchor);
                tracing::info!(%id, x = tap.x, y = tap.y, distance = hit.distance, "anchor placed");
                TapOutcome::Placed { id, pose: hit.pose }
            }
            Err(err) => {
                tracing::warn!(error = %err, "anchor creation failed");
                TapOutcome::AnchorFailed(err)
            }
        }
    }
}
