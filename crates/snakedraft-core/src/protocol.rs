// Wire protocol between the draft service and the messaging collaborator.
//
// Inbound messages carry choice events and commands; outbound messages carry
// boards to render, public announcements and query replies. Everything is
// JSON tagged by a top-level `type` field.

use serde::{Deserialize, Serialize};

use crate::draft::pick::Pick;
use crate::draft::session::{ChoiceEvent, RenderRequest};
use crate::draft::state::{DraftState, ParticipantId};
use crate::draft::turn::DraftStatus;
use crate::error::{DraftError, ErrorKind};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Messages received from the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// A participant pressed an input on a rendered board.
    Choice { payload: ChoiceEvent },
    /// A text command.
    Command { payload: Command },
}

/// Text commands understood by the draft service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    StartDraft {
        base_order: Vec<ParticipantId>,
        num_rounds: u32,
        #[serde(default)]
        channel: Option<String>,
    },
    EndDraft,
    SetRosterName {
        participant: ParticipantId,
        name: String,
    },
    /// Pick an item by name instead of through the board.
    Pick {
        participant: ParticipantId,
        item_name: String,
        group_label: String,
    },
    Undo {
        #[serde(default)]
        requested_by: Option<ParticipantId>,
    },
    Status,
    ShowRosters {
        #[serde(default)]
        participant: Option<ParticipantId>,
    },
    Export,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Messages sent to the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// Replace the shown board with this one.
    Render { payload: RenderRequest },
    /// Public notice for the draft channel.
    Announcement { payload: Announcement },
    /// Private notice to the participant whose input was rejected. The board
    /// stays as it is.
    InputRejected {
        render_id: u64,
        participant: ParticipantId,
        kind: ErrorKind,
        message: String,
    },
    Status { payload: DraftStatus },
    Rosters { payload: Vec<RosterView> },
}

/// Public draft events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Announcement {
    DraftStarted {
        draft_id: String,
        base_order: Vec<ParticipantId>,
        num_rounds: u32,
        total_picks: usize,
    },
    PickMade {
        pick: Pick,
    },
    TurnChanged {
        participant: ParticipantId,
        on_deck: Option<ParticipantId>,
        round: u32,
        slot_in_round: usize,
    },
    PickUndone {
        pick: Pick,
    },
    /// Undo was requested before any pick was made.
    NothingToUndo,
    DraftComplete {
        draft_id: String,
        total_picks: usize,
    },
    DraftEnded {
        draft_id: String,
        picks_made: usize,
    },
    RosterRenamed {
        participant: ParticipantId,
        team_name: String,
    },
    Exported {
        path: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(default)]
        participant: Option<ParticipantId>,
    },
}

impl Announcement {
    pub fn error(err: &DraftError, participant: Option<&str>) -> Self {
        Announcement::Error {
            kind: err.kind(),
            message: err.to_string(),
            participant: participant.map(str::to_string),
        }
    }

    /// Turn announcement for whoever is now on the clock, if anyone.
    pub fn turn_changed(state: &DraftState) -> Option<Self> {
        let participant = state.current_turn()?.clone();
        Some(Announcement::TurnChanged {
            participant,
            on_deck: state.on_deck().cloned(),
            round: state.current_round(),
            slot_in_round: state.current_slot_in_round(),
        })
    }
}

/// One roster as shown to participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterView {
    pub participant: ParticipantId,
    pub team_name: String,
    pub picks: Vec<Pick>,
}

impl RosterView {
    /// Rosters in base order, optionally narrowed to one participant.
    pub fn collect(
        state: &DraftState,
        participant: Option<&str>,
    ) -> Result<Vec<RosterView>, DraftError> {
        let views: Vec<RosterView> = state
            .rosters()
            .into_iter()
            .filter(|(p, _)| participant.map_or(true, |want| p.as_str() == want))
            .map(|(p, roster)| RosterView {
                participant: p.clone(),
                team_name: roster.team_name.clone(),
                picks: roster.picks.clone(),
            })
            .collect();
        match participant {
            Some(p) if views.is_empty() => Err(DraftError::NotInDraft {
                participant: p.to_string(),
            }),
            _ => Ok(views),
        }
    }
}
