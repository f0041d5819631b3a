// Error taxonomy for the draft engine.
//
// Every variant is a declined action: the engine leaves its state unchanged
// when it returns one of these, except `PersistenceFailure`, which reports a
// failed durability write after the in-memory change already happened.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("no active draft")]
    DraftNotActive,

    #[error("the draft is complete")]
    DraftComplete,

    #[error("{item_name} ({group_label}) has already been drafted")]
    DuplicateSelection {
        item_name: String,
        group_label: String,
    },

    #[error("it is not {actor}'s turn")]
    WrongTurn {
        actor: String,
        on_clock: Option<String>,
    },

    #[error("selection {index} is not on the current board ({available} candidates shown)")]
    InvalidSelection { index: usize, available: usize },

    #[error("a draft needs at least 2 participants, got {count}")]
    InsufficientParticipants { count: usize },

    #[error("number of rounds must be between {min} and {max}, got {rounds}")]
    InvalidRoundCount { rounds: u32, min: u32, max: u32 },

    #[error("participant {participant} appears more than once in the draft order")]
    DuplicateParticipant { participant: String },

    #[error("no catalog item named {item_name} ({group_label})")]
    UnknownItem {
        item_name: String,
        group_label: String,
    },

    #[error("{participant} is not in this draft")]
    NotInDraft { participant: String },

    #[error("{participant} is not allowed to undo picks")]
    NotAuthorized { participant: String },

    #[error("stored draft state is invalid: {0}")]
    CorruptState(String),

    #[error("failed to persist draft state: {0}")]
    PersistenceFailure(String),
}

/// Wire-level classification of a [`DraftError`], carried in announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    DraftNotActive,
    DraftComplete,
    DuplicateSelection,
    WrongTurn,
    InvalidSelection,
    InsufficientParticipants,
    InvalidRoundCount,
    DuplicateParticipant,
    UnknownItem,
    NotInDraft,
    NotAuthorized,
    CorruptState,
    PersistenceFailure,
}

impl DraftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DraftError::DraftNotActive => ErrorKind::DraftNotActive,
            DraftError::DraftComplete => ErrorKind::DraftComplete,
            DraftError::DuplicateSelection { .. } => ErrorKind::DuplicateSelection,
            DraftError::WrongTurn { .. } => ErrorKind::WrongTurn,
            DraftError::InvalidSelection { .. } => ErrorKind::InvalidSelection,
            DraftError::InsufficientParticipants { .. } => ErrorKind::InsufficientParticipants,
            DraftError::InvalidRoundCount { .. } => ErrorKind::InvalidRoundCount,
            DraftError::DuplicateParticipant { .. } => ErrorKind::DuplicateParticipant,
            DraftError::UnknownItem { .. } => ErrorKind::UnknownItem,
            DraftError::NotInDraft { .. } => ErrorKind::NotInDraft,
            DraftError::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            DraftError::CorruptState(_) => ErrorKind::CorruptState,
            DraftError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
        }
    }
}
