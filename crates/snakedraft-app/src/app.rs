// Application state and orchestration logic.
//
// The central event loop consumes WebSocket events from the messaging bridge
// one at a time, drives the draft engine and pushes outbound JSON back to the
// bridge. Every engine call completes before the next event is read.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use snakedraft_core::draft::{ChoiceEvent, Pick, RenderRequest, SessionOutcome};
use snakedraft_core::protocol::{Announcement, Command, InboundMessage, OutboundMessage};
use snakedraft_core::{DraftEngine, DraftError, Durability, ErrorKind};

use crate::db::{Database, EventKind};
use crate::export;
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub engine: DraftEngine<Arc<Database>>,
    pub export_dir: PathBuf,
}

impl AppState {
    pub fn new(engine: DraftEngine<Arc<Database>>, export_dir: PathBuf) -> Self {
        AppState { engine, export_dir }
    }

    fn db(&self) -> &Database {
        self.engine.store()
    }

    /// Append to the audit log. Failures are logged and otherwise ignored.
    fn audit(&self, kind: EventKind, pick: &Pick) {
        let draft_id = self.engine.state().draft_id();
        if let Err(e) = self.db().record_event(draft_id, kind, pick) {
            warn!("Failed to record {:?} for pick #{}: {:#}", kind, pick.pick_number, e);
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the application event loop.
///
/// Reads WebSocket events from `ws_rx` and writes serialized outbound
/// messages to `out_tx`. Returns when `shutdown` fires or the WebSocket
/// channel closes.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    out_tx: mpsc::Sender<String>,
    mut state: AppState,
    mut shutdown: oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }

            ws_event = ws_rx.recv() => {
                match ws_event {
                    Some(WsEvent::Connected { addr }) => {
                        info!("Bridge connected from {}", addr);
                        // Anything rendered while disconnected was dropped;
                        // show the current board again.
                        if let Some(board) = state.engine.board() {
                            let msg = OutboundMessage::Render { payload: board.clone() };
                            send_all(&out_tx, vec![msg]).await;
                        }
                    }
                    Some(WsEvent::Disconnected) => {
                        info!("Bridge disconnected");
                    }
                    Some(WsEvent::Message(json_str)) => {
                        let replies = handle_ws_message(&mut state, &json_str);
                        send_all(&out_tx, replies).await;
                    }
                    None => {
                        info!("WebSocket channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn send_all(out_tx: &mpsc::Sender<String>, messages: Vec<OutboundMessage>) {
    for msg in messages {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if out_tx.send(json).await.is_err() {
                    debug!("Outbound channel closed; dropping message");
                    return;
                }
            }
            Err(e) => warn!("Failed to serialize outbound message: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// Message handling
// ---------------------------------------------------------------------------

/// Handle one inbound JSON message and return the replies to send.
///
/// Unparseable messages are logged and produce no reply.
pub fn handle_ws_message(state: &mut AppState, json_str: &str) -> Vec<OutboundMessage> {
    let msg: InboundMessage = match serde_json::from_str(json_str) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to parse inbound message: {}", e);
            return Vec::new();
        }
    };

    match msg {
        InboundMessage::Choice { payload } => handle_choice(state, &payload),
        InboundMessage::Command { payload } => handle_command(state, payload),
    }
}

fn handle_choice(state: &mut AppState, event: &ChoiceEvent) -> Vec<OutboundMessage> {
    match state.engine.handle_choice(event) {
        Ok((outcome, durability)) => {
            let mut out = outcome_messages(state, outcome);
            out.extend(durability_notice(&durability));
            out
        }
        Err(e) => {
            info!("Rejected choice from {}: {}", event.participant, e);
            vec![OutboundMessage::InputRejected {
                render_id: event.render_id,
                participant: event.participant.clone(),
                kind: e.kind(),
                message: e.to_string(),
            }]
        }
    }
}

fn handle_command(state: &mut AppState, cmd: Command) -> Vec<OutboundMessage> {
    let actor = command_actor(&cmd);
    let result = match cmd {
        Command::StartDraft {
            base_order,
            num_rounds,
            channel,
        } => state
            .engine
            .start_draft(base_order, num_rounds, channel)
            .map(|(board, durability)| {
                let draft = state.engine.state();
                let mut out = vec![
                    announce(Announcement::DraftStarted {
                        draft_id: draft.draft_id().to_string(),
                        base_order: draft.base_order().to_vec(),
                        num_rounds: draft.num_rounds(),
                        total_picks: draft.total_picks(),
                    }),
                    OutboundMessage::Render { payload: board },
                ];
                out.extend(Announcement::turn_changed(draft).map(announce));
                out.extend(durability_notice(&durability));
                out
            }),
        Command::EndDraft => {
            let draft_id = state.engine.state().draft_id().to_string();
            state.engine.end_draft().map(|durability| {
                let mut out = vec![announce(Announcement::DraftEnded {
                    draft_id,
                    picks_made: state.engine.state().all_picks().len(),
                })];
                out.extend(durability_notice(&durability));
                out
            })
        }
        Command::SetRosterName { participant, name } => state
            .engine
            .set_roster_name(&participant, &name)
            .map(|durability| {
                let team_name = state
                    .engine
                    .state()
                    .roster(&participant)
                    .map(|r| r.team_name.clone())
                    .unwrap_or(name);
                let mut out = vec![announce(Announcement::RosterRenamed {
                    participant,
                    team_name,
                })];
                out.extend(durability_notice(&durability));
                out
            }),
        Command::Pick {
            participant,
            item_name,
            group_label,
        } => state
            .engine
            .pick_by_name(&participant, &item_name, &group_label)
            .map(|(outcome, durability)| {
                let mut out = outcome_messages(state, outcome);
                out.extend(durability_notice(&durability));
                out
            }),
        Command::Undo { requested_by } => state
            .engine
            .undo(requested_by.as_deref())
            .map(|(undone, durability)| match undone {
                Some(undone) => {
                    state.audit(EventKind::PickUndone, &undone.pick);
                    let mut out = vec![announce(Announcement::PickUndone { pick: undone.pick })];
                    out.extend(board_messages(state, undone.next));
                    out.extend(durability_notice(&durability));
                    out
                }
                None => vec![announce(Announcement::NothingToUndo)],
            }),
        Command::Status => Ok(vec![OutboundMessage::Status {
            payload: state.engine.status(),
        }]),
        Command::ShowRosters { participant } => state
            .engine
            .rosters(participant.as_deref())
            .map(|rosters| vec![OutboundMessage::Rosters { payload: rosters }]),
        Command::Export => return export_rosters(state),
    };

    result.unwrap_or_else(|e: DraftError| {
        info!("Command rejected: {}", e);
        vec![announce(Announcement::error(&e, actor.as_deref()))]
    })
}

/// The participant a command acts for, used to address error notices.
fn command_actor(cmd: &Command) -> Option<String> {
    match cmd {
        Command::SetRosterName { participant, .. } | Command::Pick { participant, .. } => {
            Some(participant.clone())
        }
        Command::Undo { requested_by } => requested_by.clone(),
        Command::ShowRosters { participant } => participant.clone(),
        _ => None,
    }
}

fn export_rosters(state: &AppState) -> Vec<OutboundMessage> {
    let rosters = state.engine.export_rosters();
    match export::write_export(&state.export_dir, &rosters, Utc::now()) {
        Ok(path) => vec![announce(Announcement::Exported {
            path: path.display().to_string(),
        })],
        Err(e) => {
            warn!("Export failed: {:#}", e);
            vec![announce(Announcement::Error {
                kind: ErrorKind::PersistenceFailure,
                message: format!("export failed: {e:#}"),
                participant: None,
            })]
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome rendering
// ---------------------------------------------------------------------------

fn announce(payload: Announcement) -> OutboundMessage {
    OutboundMessage::Announcement { payload }
}

fn outcome_messages(state: &AppState, outcome: SessionOutcome) -> Vec<OutboundMessage> {
    match outcome {
        SessionOutcome::Ignored => {
            debug!("Stale choice ignored");
            Vec::new()
        }
        SessionOutcome::Rerendered(board) => vec![OutboundMessage::Render { payload: board }],
        SessionOutcome::Picked { pick, next } => {
            state.audit(EventKind::PickCommitted, &pick);
            let mut out = vec![announce(Announcement::PickMade { pick })];
            out.extend(board_messages(state, next));
            out
        }
    }
}

/// Messages following a pick or undo: the next board and turn notice, or the
/// completion notice when no turn remains.
fn board_messages(state: &AppState, next: Option<RenderRequest>) -> Vec<OutboundMessage> {
    let draft = state.engine.state();
    match next {
        Some(board) => {
            let mut out = vec![OutboundMessage::Render { payload: board }];
            out.extend(Announcement::turn_changed(draft).map(announce));
            out
        }
        None if draft.is_complete() => vec![announce(Announcement::DraftComplete {
            draft_id: draft.draft_id().to_string(),
            total_picks: draft.total_picks(),
        })],
        None => Vec::new(),
    }
}

fn durability_notice(durability: &Durability) -> Option<OutboundMessage> {
    match durability {
        Durability::Failed(reason) => Some(announce(Announcement::error(
            &DraftError::PersistenceFailure(reason.clone()),
            None,
        ))),
        Durability::Saved | Durability::Unchanged => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
