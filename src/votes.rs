// Vote Toggle State Machine
// Per-viewer like/dislike choice for a tutorial. The shared counter
// pair lives on the tutorial record and is changed through a single
// atomic delta per click; the viewer's own choice lives in local
// durable storage and is only written once the counter update succeeds.

use crate::catalog::Tutorial;
use crate::store::{KeyValueStore, StoreResult, TutorialStore};

/// The viewer's current choice for one tutorial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteState {
    #[default]
    None,
    Liked,
    Disliked,
}

/// A click on one of the two vote buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Like,
    Dislike,
}

/// Counter adjustment applied as one atomic update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteDelta {
    pub likes: i64,
    pub dislikes: i64,
}

impl VoteDelta {
    /// Apply this delta to a counter pair, clamping at zero
    pub fn apply(&self, likes: u64, dislikes: u64) -> (u64, u64) {
        (
            apply_component(likes, self.likes),
            apply_component(dislikes, self.dislikes),
        )
    }
}

fn apply_component(count: u64, delta: i64) -> u64 {
    if delta < 0 {
        count.saturating_sub(delta.unsigned_abs())
    } else {
        count.saturating_add(delta as u64)
    }
}

/// The transition table: next state plus the counter delta for a click
pub fn transition(state: VoteState, click: VoteKind) -> (VoteState, VoteDelta) {
    match (state, click) {
        (VoteState::None, VoteKind::Like) => (
            VoteState::Liked,
            VoteDelta {
                likes: 1,
                dislikes: 0,
            },
        ),
        (VoteState::None, VoteKind::Dislike) => (
            VoteState::Disliked,
            VoteDelta {
                likes: 0,
                dislikes: 1,
            },
        ),
        (VoteState::Liked, VoteKind::Like) => (
            VoteState::None,
            VoteDelta {
                likes: -1,
                dislikes: 0,
            },
        ),
        (VoteState::Liked, VoteKind::Dislike) => (
            VoteState::Disliked,
            VoteDelta {
                likes: -1,
                dislikes: 1,
            },
        ),
        (VoteState::Disliked, VoteKind::Dislike) => (
            VoteState::None,
            VoteDelta {
                likes: 0,
                dislikes: -1,
            },
        ),
        (VoteState::Disliked, VoteKind::Like) => (
            VoteState::Liked,
            VoteDelta {
                likes: 1,
                dislikes: -1,
            },
        ),
    }
}

fn vote_key(tutorial_id: &str) -> String {
    format!("tutorial-vote-{}", tutorial_id)
}

/// Vote controls for one tutorial
///
/// Stores are injected so the machine stays testable against the
/// in-memory backend.
pub struct VoteBox<'a> {
    tutorials: &'a dyn TutorialStore,
    local: &'a dyn KeyValueStore,
    tutorial: Tutorial,
    state: VoteState,
}

impl<'a> VoteBox<'a> {
    /// Open the vote controls for a tutorial
    ///
    /// Fetches the record fresh so the counters reflect the latest
    /// persisted values, then restores the viewer's stored choice.
    pub fn open(
        tutorials: &'a dyn TutorialStore,
        local: &'a dyn KeyValueStore,
        tutorial_id: &str,
    ) -> StoreResult<Self> {
        let tutorial = tutorials.get_tutorial(tutorial_id)?;
        let state = match local.get(&vote_key(tutorial_id)).as_deref() {
            Some("like") => VoteState::Liked,
            Some("dislike") => VoteState::Disliked,
            _ => VoteState::None,
        };
        Ok(VoteBox {
            tutorials,
            local,
            tutorial,
            state,
        })
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn likes(&self) -> u64 {
        self.tutorial.likes
    }

    pub fn dislikes(&self) -> u64 {
        self.tutorial.dislikes
    }

    pub fn tutorial(&self) -> &Tutorial {
        &self.tutorial
    }

    /// Handle a click on the like or dislike button
    ///
    /// The counter delta goes to the store as one update. Local state
    /// and durable storage change only after that update succeeds; on
    /// failure the caller sees the pre-click state unchanged.
    pub fn click(&mut self, kind: VoteKind) -> StoreResult<VoteState> {
        let (next, delta) = transition(self.state, kind);
        let updated = self.tutorials.apply_vote_delta(&self.tutorial.id, delta)?;

        let key = vote_key(&self.tutorial.id);
        match next {
            VoteState::None => self.local.remove(&key),
            VoteState::Liked => self.local.set(&key, "like"),
            VoteState::Disliked => self.local.set(&key, "dislike"),
        }

        self.tutorial = updated;
        self.state = next;
        Ok(next)
    }
}
