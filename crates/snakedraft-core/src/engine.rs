// Draft engine: owns the draft state, the catalog and the selection session,
// and saves the state after every mutation.
//
// Saves happen after the in-memory change. A failed save does not roll the
// change back; it is reported to the caller as `Durability::Failed`.

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::draft::pick::Pick;
use crate::draft::session::{ChoiceEvent, RenderRequest, SelectionSession, SessionOutcome};
use crate::draft::state::{DraftRules, DraftState, ParticipantId, RosterExport};
use crate::draft::turn::DraftStatus;
use crate::error::DraftError;
use crate::protocol::RosterView;
use crate::store::DraftStore;

/// Whether the state after a mutation reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    Saved,
    /// Nothing changed, so nothing was written.
    Unchanged,
    Failed(String),
}

impl Durability {
    pub fn is_failed(&self) -> bool {
        matches!(self, Durability::Failed(_))
    }
}

/// A successful undo.
#[derive(Debug, Clone, PartialEq)]
pub struct Undone {
    pub pick: Pick,
    /// The board re-presented for the participant back on the clock.
    pub next: Option<RenderRequest>,
}

pub struct DraftEngine<S> {
    state: DraftState,
    catalog: Catalog,
    session: SelectionSession,
    rules: DraftRules,
    store: S,
}

impl<S: DraftStore> DraftEngine<S> {
    /// An engine with an empty, inactive draft. Nothing is read from `store`.
    pub fn new(catalog: Catalog, rules: DraftRules, store: S) -> Self {
        let session = SelectionSession::new(rules.board_size);
        DraftEngine {
            state: DraftState::new(),
            catalog,
            session,
            rules,
            store,
        }
    }

    /// Restore the last saved draft from `store`.
    ///
    /// An active restored draft gets a fresh board, saved straight away;
    /// boards rendered before the restart are stale. A blob that fails
    /// validation is `CorruptState`.
    pub fn open(catalog: Catalog, rules: DraftRules, store: S) -> Result<Self, DraftError> {
        let mut engine = Self::new(catalog, rules, store);
        let blob = engine
            .store
            .load_blob()
            .map_err(|e| DraftError::PersistenceFailure(format!("{e:#}")))?;
        if let Some(blob) = blob {
            engine.state = DraftState::from_json(blob)?;
            info!(
                "Restored draft {} ({} of {} picks, active: {})",
                engine.state.draft_id(),
                engine.state.all_picks().len(),
                engine.state.total_picks(),
                engine.state.is_active()
            );
            // The restored board draws a new render id, which has to be stored
            // so the next restart does not hand out the same id again.
            if engine.session.present(&mut engine.state, &engine.catalog).is_some() {
                engine.persist();
            }
        }
        Ok(engine)
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    pub fn rules(&self) -> &DraftRules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The board currently shown, if any.
    pub fn board(&self) -> Option<&RenderRequest> {
        self.session.board()
    }

    fn persist(&self) -> Durability {
        let result = self
            .state
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|blob| self.store.save_blob(&blob));
        match result {
            Ok(()) => Durability::Saved,
            Err(e) => {
                warn!("Failed to persist draft {}: {:#}", self.state.draft_id(), e);
                Durability::Failed(format!("{e:#}"))
            }
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start a new draft, replacing any previous one, and present the first
    /// board.
    pub fn start_draft(
        &mut self,
        base_order: Vec<ParticipantId>,
        num_rounds: u32,
        channel: Option<String>,
    ) -> Result<(RenderRequest, Durability), DraftError> {
        self.state
            .start_draft(base_order, num_rounds, channel, &self.rules)?;
        let board = self
            .session
            .advance(&mut self.state, &self.catalog)
            .ok_or(DraftError::DraftComplete)?;
        Ok((board, self.persist()))
    }

    pub fn end_draft(&mut self) -> Result<Durability, DraftError> {
        self.state.end_draft()?;
        self.session.clear();
        Ok(self.persist())
    }

    pub fn set_roster_name(
        &mut self,
        participant: &str,
        name: &str,
    ) -> Result<Durability, DraftError> {
        self.state.set_roster_name(participant, name)?;
        Ok(self.persist())
    }

    // -- picks --------------------------------------------------------------

    /// Apply a choice raised against a board.
    pub fn handle_choice(
        &mut self,
        event: &ChoiceEvent,
    ) -> Result<(SessionOutcome, Durability), DraftError> {
        let outcome = self
            .session
            .handle_choice(&mut self.state, &self.catalog, event)?;
        let durability = match outcome {
            SessionOutcome::Ignored => Durability::Unchanged,
            // The category switch and the new render id are part of the state.
            SessionOutcome::Rerendered(_) | SessionOutcome::Picked { .. } => self.persist(),
        };
        Ok((outcome, durability))
    }

    /// Pick an item by name for `participant`.
    pub fn pick_by_name(
        &mut self,
        participant: &str,
        item_name: &str,
        group_label: &str,
    ) -> Result<(SessionOutcome, Durability), DraftError> {
        let outcome = self.session.commit_named(
            &mut self.state,
            &self.catalog,
            participant,
            item_name,
            group_label,
        )?;
        Ok((outcome, self.persist()))
    }

    /// Reverse the most recent pick and re-present the board.
    ///
    /// When admins are configured only they may undo. Returns `None` when no
    /// pick has been made.
    pub fn undo(
        &mut self,
        requested_by: Option<&str>,
    ) -> Result<(Option<Undone>, Durability), DraftError> {
        if !self.rules.admins.is_empty() {
            let allowed = requested_by
                .is_some_and(|who| self.rules.admins.iter().any(|a| a == who));
            if !allowed {
                return Err(DraftError::NotAuthorized {
                    participant: requested_by.unwrap_or_default().to_string(),
                });
            }
        }
        if !self.state.is_active() {
            return Err(DraftError::DraftNotActive);
        }
        let Some(pick) = self.state.undo() else {
            return Ok((None, Durability::Unchanged));
        };
        let next = self.session.advance(&mut self.state, &self.catalog);
        Ok((Some(Undone { pick, next }), self.persist()))
    }

    // -- queries ------------------------------------------------------------

    pub fn status(&self) -> DraftStatus {
        self.state.status()
    }

    pub fn rosters(&self, participant: Option<&str>) -> Result<Vec<RosterView>, DraftError> {
        RosterView::collect(&self.state, participant)
    }

    pub fn export_rosters(&self) -> Vec<RosterExport> {
        self.state.export_rosters()
    }
}
