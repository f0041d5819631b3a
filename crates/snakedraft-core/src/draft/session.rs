// Interactive selection board.
//
// One board is presented per turn. Choice events name the board they were
// raised against; anything raised against a board that is no longer current
// is dropped without touching the draft.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::pick::Pick;
use super::state::{DraftState, ParticipantId};
use crate::catalog::{CandidateItem, Catalog, Category, CATEGORY_ORDER};
use crate::error::DraftError;

/// A board for the messaging collaborator to materialise: one input per
/// candidate plus one per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Identity of this render. Choice events must echo it back.
    pub render_id: u64,
    pub channel: Option<String>,
    pub category: Category,
    pub categories: Vec<Category>,
    /// Ranked candidates. Empty means the category is exhausted and the
    /// participant has to switch category.
    pub candidates: Vec<CandidateItem>,
    pub on_clock: ParticipantId,
    pub on_deck: Option<ParticipantId>,
    pub round: u32,
    pub num_rounds: u32,
    pub slot_in_round: usize,
    /// 1-based overall number of the pick on the clock.
    pub pick_number: usize,
    pub total_picks: usize,
}

impl RenderRequest {
    pub fn is_exhausted(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A discrete input raised against a rendered board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceEvent {
    pub participant: ParticipantId,
    pub render_id: u64,
    pub choice: Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    /// Pick the candidate at this board index.
    Select { index: usize },
    /// Redraw the board for another category. Does not use the turn.
    SwitchCategory { category: Category },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// No board is shown (no draft, or the draft was ended).
    Idle,
    Presenting(RenderRequest),
    /// Every turn has been used.
    Complete,
}

/// Result of a choice the session accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The event was stale or no board is shown; nothing changed.
    Ignored,
    /// The board was redrawn for another category.
    Rerendered(RenderRequest),
    /// A pick was committed. `next` is the board for the following turn, or
    /// `None` when that pick completed the draft.
    Picked {
        pick: Pick,
        next: Option<RenderRequest>,
    },
}

impl SessionOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, SessionOutcome::Ignored)
    }

    /// The board to show next, if the outcome produced one.
    pub fn into_next_board(self) -> Option<RenderRequest> {
        match self {
            SessionOutcome::Ignored => None,
            SessionOutcome::Rerendered(board) => Some(board),
            SessionOutcome::Picked { next, .. } => next,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionSession {
    phase: SessionPhase,
    board_size: usize,
}

impl SelectionSession {
    pub fn new(board_size: usize) -> Self {
        SelectionSession {
            phase: SessionPhase::Idle,
            board_size,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The board currently shown, if any.
    pub fn board(&self) -> Option<&RenderRequest> {
        match &self.phase {
            SessionPhase::Presenting(board) => Some(board),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// Bring the session in line with the draft, keeping the draft's current
    /// category. Used after a start or a restore.
    pub fn present(&mut self, state: &mut DraftState, catalog: &Catalog) -> Option<RenderRequest> {
        if !state.is_active() {
            self.phase = SessionPhase::Idle;
            return None;
        }
        if state.is_complete() {
            self.phase = SessionPhase::Complete;
            return None;
        }
        let category = state.current_category();
        Some(self.render(state, catalog, category))
    }

    /// Present the board for whoever is now on the clock, back on the
    /// default category.
    pub fn advance(&mut self, state: &mut DraftState, catalog: &Catalog) -> Option<RenderRequest> {
        state.current_category = Category::default_board();
        self.present(state, catalog)
    }

    /// Drop the board, e.g. when the draft is ended.
    pub fn clear(&mut self) {
        self.phase = SessionPhase::Idle;
    }

    fn render(&mut self, state: &mut DraftState, catalog: &Catalog, category: Category) -> RenderRequest {
        state.current_category = category;
        let render_id = state.next_render_id();
        let board = RenderRequest {
            render_id,
            channel: state.active_channel().map(str::to_string),
            category,
            categories: CATEGORY_ORDER.to_vec(),
            candidates: catalog.top_available(category, state.excluded(), self.board_size),
            on_clock: state.current_turn().cloned().unwrap_or_default(),
            on_deck: state.on_deck().cloned(),
            round: state.current_round(),
            num_rounds: state.num_rounds(),
            slot_in_round: state.current_slot_in_round(),
            pick_number: state.current_pick() + 1,
            total_picks: state.total_picks(),
        };
        if board.is_exhausted() {
            debug!("Board {} has no available {} candidates", render_id, category);
        }
        self.phase = SessionPhase::Presenting(board.clone());
        board
    }

    /// Apply one choice event.
    ///
    /// Stale events (wrong render id, or no board shown) are `Ignored`.
    /// Events from anyone but the participant on the clock are `WrongTurn`.
    /// Rejected selections leave the current board in place.
    pub fn handle_choice(
        &mut self,
        state: &mut DraftState,
        catalog: &Catalog,
        event: &ChoiceEvent,
    ) -> Result<SessionOutcome, DraftError> {
        let board = match &self.phase {
            SessionPhase::Presenting(board) if board.render_id == event.render_id => board.clone(),
            _ => {
                debug!(
                    "Ignoring stale choice from {} for render {}",
                    event.participant, event.render_id
                );
                return Ok(SessionOutcome::Ignored);
            }
        };
        if !state.is_active() {
            self.phase = SessionPhase::Idle;
            return Ok(SessionOutcome::Ignored);
        }

        let on_clock = state.current_turn().cloned();
        if on_clock.as_deref() != Some(event.participant.as_str()) {
            warn!(
                "Rejected choice from {}: {:?} is on the clock",
                event.participant, on_clock
            );
            return Err(DraftError::WrongTurn {
                actor: event.participant.clone(),
                on_clock,
            });
        }

        match event.choice {
            Choice::SwitchCategory { category } => {
                Ok(SessionOutcome::Rerendered(self.render(state, catalog, category)))
            }
            Choice::Select { index } => {
                let item = board
                    .candidates
                    .get(index)
                    .ok_or(DraftError::InvalidSelection {
                        index,
                        available: board.candidates.len(),
                    })?;
                let pick = state.commit(&item.display_name, &item.group_label, item.category)?;
                Ok(self.after_pick(state, catalog, pick))
            }
        }
    }

    /// Commit a pick named by text rather than by board index.
    ///
    /// The name resolves through the catalog (display or full name plus
    /// group label), and the same turn checks as a board selection apply.
    pub fn commit_named(
        &mut self,
        state: &mut DraftState,
        catalog: &Catalog,
        participant: &str,
        item_name: &str,
        group_label: &str,
    ) -> Result<SessionOutcome, DraftError> {
        if !state.is_active() {
            return Err(DraftError::DraftNotActive);
        }
        if state.is_complete() {
            return Err(DraftError::DraftComplete);
        }
        let on_clock = state.current_turn().cloned();
        if on_clock.as_deref() != Some(participant) {
            return Err(DraftError::WrongTurn {
                actor: participant.to_string(),
                on_clock,
            });
        }
        let item = catalog
            .find(item_name, group_label)
            .ok_or_else(|| DraftError::UnknownItem {
                item_name: item_name.trim().to_string(),
                group_label: group_label.trim().to_string(),
            })?;
        let pick = state.commit(&item.display_name, &item.group_label, item.category)?;
        Ok(self.after_pick(state, catalog, pick))
    }

    fn after_pick(&mut self, state: &mut DraftState, catalog: &Catalog, pick: Pick) -> SessionOutcome {
        let next = self.advance(state, catalog);
        if next.is_none() && self.is_complete() {
            info!("Draft {} complete after {} picks", state.draft_id(), state.all_picks().len());
        }
        SessionOutcome::Picked { pick, next }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::sample_catalog;
    use crate::draft::state::DraftRules;

    fn setup(ids: &[&str], rounds: u32) -> (DraftState, Catalog, SelectionSession, RenderRequest) {
        let mut state = DraftState::new();
        state
            .start_draft(
                ids.iter().map(|s| s.to_string()).collect(),
                rounds,
                Some("chan".into()),
                &DraftRules::default(),
            )
            .unwrap();
        let catalog = sample_catalog();
        let mut session = SelectionSession::new(2);
        let board = session.present(&mut state, &catalog).unwrap();
        (state, catalog, session, board)
    }

    fn select(participant: &str, board: &RenderRequest, index: usize) -> ChoiceEvent {
        ChoiceEvent {
            participant: participant.into(),
            render_id: board.render_id,
            choice: Choice::Select { index },
        }
    }

    fn switch(participant: &str, board: &RenderRequest, category: Category) -> ChoiceEvent {
        ChoiceEvent {
            participant: participant.into(),
            render_id: board.render_id,
            choice: Choice::SwitchCategory { category },
        }
    }

    #[test]
    fn present_shows_default_category_top_k() {
        let (_, _, session, board) = setup(&["A", "B"], 2);
        assert_eq!(board.category, Category::Quarterback);
        assert_eq!(board.candidates.len(), 2);
        assert_eq!(board.candidates[0].display_name, "Tom Brady");
        assert_eq!(board.on_clock, "A");
        assert_eq!(board.on_deck.as_deref(), Some("B"));
        assert_eq!(board.pick_number, 1);
        assert_eq!(board.total_picks, 4);
        assert_eq!(board.channel.as_deref(), Some("chan"));
        assert_eq!(session.board(), Some(&board));
    }

    #[test]
    fn present_idle_without_active_draft() {
        let mut state = DraftState::new();
        let mut session = SelectionSession::new(5);
        assert!(session.present(&mut state, &sample_catalog()).is_none());
        assert_eq!(session.phase(), &SessionPhase::Idle);
    }

    #[test]
    fn select_commits_and_presents_next_turn() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let outcome = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 1))
            .unwrap();

        let SessionOutcome::Picked { pick, next } = outcome else {
            panic!("expected a pick, got {outcome:?}");
        };
        assert_eq!(pick.item_name, "Jared Goff");
        assert_eq!(pick.participant, "A");
        let next = next.unwrap();
        assert_eq!(next.on_clock, "B");
        assert_ne!(next.render_id, board.render_id);
        assert_eq!(next.category, Category::Quarterback);
        let names: Vec<_> = next.candidates.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Tom Brady", "Jalen Hurts"]);
    }

    #[test]
    fn wrong_turn_leaves_board_unchanged() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let err = session
            .handle_choice(&mut state, &catalog, &select("B", &board, 0))
            .unwrap_err();
        assert_eq!(
            err,
            DraftError::WrongTurn {
                actor: "B".into(),
                on_clock: Some("A".into())
            }
        );
        assert_eq!(session.board(), Some(&board));
        assert_eq!(state.current_pick(), 0);
    }

    #[test]
    fn out_of_range_index_is_invalid_selection() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let err = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 2))
            .unwrap_err();
        assert_eq!(
            err,
            DraftError::InvalidSelection {
                index: 2,
                available: 2
            }
        );
        assert_eq!(session.board(), Some(&board));
    }

    #[test]
    fn switch_category_rerenders_without_using_turn() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let outcome = session
            .handle_choice(&mut state, &catalog, &switch("A", &board, Category::RunningBack))
            .unwrap();

        let SessionOutcome::Rerendered(new_board) = outcome else {
            panic!("expected rerender, got {outcome:?}");
        };
        assert_eq!(new_board.category, Category::RunningBack);
        assert_eq!(new_board.on_clock, "A");
        assert_eq!(new_board.candidates[0].display_name, "Jahmyr Gibbs");
        assert_eq!(state.current_pick(), 0);
        assert_eq!(state.current_category(), Category::RunningBack);

        // Selections against the old board are now stale.
        let stale = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 0))
            .unwrap();
        assert_eq!(stale, SessionOutcome::Ignored);
    }

    #[test]
    fn exhausted_category_renders_empty_board() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let outcome = session
            .handle_choice(&mut state, &catalog, &switch("A", &board, Category::Kicker))
            .unwrap();
        let SessionOutcome::Rerendered(new_board) = outcome else {
            panic!("expected rerender");
        };
        assert!(new_board.is_exhausted());

        let err = session
            .handle_choice(&mut state, &catalog, &select("A", &new_board, 0))
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidSelection { available: 0, .. }));
    }

    #[test]
    fn replayed_event_after_advance_is_ignored() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let event = select("A", &board, 0);
        session.handle_choice(&mut state, &catalog, &event).unwrap();
        let after_first = state.clone();

        let replay = session.handle_choice(&mut state, &catalog, &event).unwrap();
        assert_eq!(replay, SessionOutcome::Ignored);
        assert_eq!(state, after_first);
    }

    #[test]
    fn final_pick_completes_session() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 1);
        let outcome = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 0))
            .unwrap();
        let SessionOutcome::Picked { next: Some(board), .. } = outcome else {
            panic!("expected next board");
        };
        let outcome = session
            .handle_choice(&mut state, &catalog, &select("B", &board, 0))
            .unwrap();
        assert!(matches!(outcome, SessionOutcome::Picked { next: None, .. }));
        assert!(session.is_complete());
        assert!(state.is_complete());
    }

    #[test]
    fn replayed_final_pick_after_completion_is_ignored() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 1);
        let outcome = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 0))
            .unwrap();
        let SessionOutcome::Picked { next: Some(last_board), .. } = outcome else {
            panic!("expected next board");
        };
        let last = select("B", &last_board, 0);
        session.handle_choice(&mut state, &catalog, &last).unwrap();
        assert!(session.is_complete());
        let completed = state.clone();

        for event in [last, select("B", &last_board, 1), select("A", &board, 1)] {
            let replay = session.handle_choice(&mut state, &catalog, &event).unwrap();
            assert_eq!(replay, SessionOutcome::Ignored);
        }
        assert_eq!(state, completed);
        assert!(session.is_complete());
        assert_eq!(state.all_picks().len(), 2);
    }

    #[test]
    fn duplicate_commit_keeps_board() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        // Someone else already took the top candidate through another path.
        state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();
        // The board shown still lists Tom Brady; put the pointer back on A's
        // board owner to isolate the duplicate check.
        let b_board = {
            session.present(&mut state, &catalog);
            session.board().unwrap().clone()
        };
        assert_eq!(b_board.on_clock, "B");
        let mut stale_list = b_board.clone();
        stale_list.candidates.insert(0, board.candidates[0].clone());
        session.phase = SessionPhase::Presenting(stale_list.clone());

        let err = session
            .handle_choice(&mut state, &catalog, &select("B", &stale_list, 0))
            .unwrap_err();
        assert!(matches!(err, DraftError::DuplicateSelection { .. }));
        assert_eq!(session.board(), Some(&stale_list));
        assert_eq!(state.current_pick(), 1);
    }

    #[test]
    fn ended_draft_ignores_choices() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        state.end_draft().unwrap();
        let outcome = session
            .handle_choice(&mut state, &catalog, &select("A", &board, 0))
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Ignored);
        assert_eq!(session.phase(), &SessionPhase::Idle);
    }

    #[test]
    fn commit_named_resolves_through_catalog() {
        let (mut state, catalog, mut session, board) = setup(&["A", "B"], 2);
        let outcome = session
            .commit_named(&mut state, &catalog, "A", "saquon barkley", "phi")
            .unwrap();
        let SessionOutcome::Picked { pick, next } = outcome else {
            panic!("expected pick");
        };
        assert_eq!(pick.item_name, "Saquon Barkley");
        assert_eq!(pick.group_label, "PHI");
        assert_eq!(pick.category, Category::RunningBack);
        assert!(next.unwrap().render_id > board.render_id);
    }

    #[test]
    fn commit_named_checks_turn_and_catalog() {
        let (mut state, catalog, mut session, _) = setup(&["A", "B"], 2);
        assert!(matches!(
            session.commit_named(&mut state, &catalog, "B", "Tom Brady", "BUC"),
            Err(DraftError::WrongTurn { .. })
        ));
        assert_eq!(
            session.commit_named(&mut state, &catalog, "A", "Nobody", "XXX"),
            Err(DraftError::UnknownItem {
                item_name: "Nobody".into(),
                group_label: "XXX".into()
            })
        );
        assert_eq!(state.current_pick(), 0);
    }

    #[test]
    fn choice_json_shape() {
        let event = ChoiceEvent {
            participant: "A".into(),
            render_id: 7,
            choice: Choice::SwitchCategory {
                category: Category::TightEnd,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "participant": "A",
                "render_id": 7,
                "choice": {"kind": "SWITCH_CATEGORY", "category": "TightEnd"}
            })
        );
    }
}
