// Draft state: configuration, turn pointer, rosters, pick history and the
// exclusion set derived from it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::pick::Pick;
use super::turn::build_turn_order;
use crate::catalog::{Category, ItemKey};
use crate::error::DraftError;

/// Opaque participant identity supplied by the messaging collaborator.
pub type ParticipantId = String;

/// A draft needs at least this many participants.
pub const MIN_PARTICIPANTS: usize = 2;

/// Session-independent draft limits, sourced from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRules {
    /// Smallest permissible round count.
    pub min_rounds: u32,
    /// Largest permissible round count.
    pub max_rounds: u32,
    /// How many candidates a board shows at once.
    pub board_size: usize,
    /// Participants allowed to undo picks. Empty means anyone may.
    pub admins: Vec<ParticipantId>,
}

impl Default for DraftRules {
    fn default() -> Self {
        DraftRules {
            min_rounds: 1,
            max_rounds: 20,
            board_size: 10,
            admins: Vec::new(),
        }
    }
}

/// One participant's team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub team_name: String,
    /// Picks in the order they were made.
    pub picks: Vec<Pick>,
}

/// The complete state of one draft.
///
/// Mutated only through `start_draft`, `end_draft`, `set_roster_name` and the
/// pick engine (`commit` / `undo`), each of which either applies fully or
/// leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftState {
    pub(crate) draft_id: String,
    pub(crate) base_order: Vec<ParticipantId>,
    pub(crate) turn_order: Vec<ParticipantId>,
    pub(crate) current_pick: usize,
    pub(crate) num_rounds: u32,
    pub(crate) rosters: HashMap<ParticipantId, Roster>,
    pub(crate) all_picks: Vec<Pick>,
    /// Rebuilt from `all_picks` on load rather than stored.
    #[serde(skip)]
    pub(crate) excluded: HashSet<ItemKey>,
    pub(crate) is_active: bool,
    pub(crate) active_channel: Option<String>,
    pub(crate) current_category: Category,
    /// Last issued board render id. Stored so that boards rendered before a
    /// restart stay stale afterwards.
    #[serde(default)]
    pub(crate) render_seq: u64,
}

impl Default for DraftState {
    fn default() -> Self {
        DraftState::new()
    }
}

impl DraftState {
    /// An empty, inactive draft.
    pub fn new() -> Self {
        DraftState {
            draft_id: String::new(),
            base_order: Vec::new(),
            turn_order: Vec::new(),
            current_pick: 0,
            num_rounds: 0,
            rosters: HashMap::new(),
            all_picks: Vec::new(),
            excluded: HashSet::new(),
            is_active: false,
            active_channel: None,
            current_category: Category::default_board(),
            render_seq: 0,
        }
    }

    /// Reset everything and start a new snake draft.
    ///
    /// Validation happens before any field is touched, so a rejected start
    /// leaves the previous draft intact.
    pub fn start_draft(
        &mut self,
        base_order: Vec<ParticipantId>,
        num_rounds: u32,
        channel: Option<String>,
        rules: &DraftRules,
    ) -> Result<(), DraftError> {
        if num_rounds < rules.min_rounds || num_rounds > rules.max_rounds {
            return Err(DraftError::InvalidRoundCount {
                rounds: num_rounds,
                min: rules.min_rounds,
                max: rules.max_rounds,
            });
        }
        if base_order.len() < MIN_PARTICIPANTS {
            return Err(DraftError::InsufficientParticipants {
                count: base_order.len(),
            });
        }
        let mut seen = HashSet::new();
        for participant in &base_order {
            if !seen.insert(participant.as_str()) {
                return Err(DraftError::DuplicateParticipant {
                    participant: participant.clone(),
                });
            }
        }

        let rosters = base_order
            .iter()
            .enumerate()
            .map(|(i, p)| {
                (
                    p.clone(),
                    Roster {
                        team_name: format!("Team {}", i + 1),
                        picks: Vec::new(),
                    },
                )
            })
            .collect();

        // Render ids keep counting across drafts so boards from the previous
        // draft can never match a new one.
        let render_seq = self.render_seq;
        *self = DraftState {
            draft_id: generate_draft_id(),
            turn_order: build_turn_order(&base_order, num_rounds),
            base_order,
            current_pick: 0,
            num_rounds,
            rosters,
            all_picks: Vec::new(),
            excluded: HashSet::new(),
            is_active: true,
            active_channel: channel,
            current_category: Category::default_board(),
            render_seq,
        };
        info!(
            "Draft {} started: {} participants, {} rounds, {} picks",
            self.draft_id,
            self.base_order.len(),
            self.num_rounds,
            self.turn_order.len()
        );
        Ok(())
    }

    /// Deactivate the draft, keeping rosters and history for later queries.
    pub fn end_draft(&mut self) -> Result<(), DraftError> {
        if !self.is_active {
            return Err(DraftError::DraftNotActive);
        }
        self.is_active = false;
        self.active_channel = None;
        info!(
            "Draft {} ended after {} picks",
            self.draft_id,
            self.all_picks.len()
        );
        Ok(())
    }

    /// Rename a participant's team.
    pub fn set_roster_name(&mut self, participant: &str, name: &str) -> Result<(), DraftError> {
        let roster = self
            .rosters
            .get_mut(participant)
            .ok_or_else(|| DraftError::NotInDraft {
                participant: participant.to_string(),
            })?;
        roster.team_name = name.trim().to_string();
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn draft_id(&self) -> &str {
        &self.draft_id
    }

    pub fn base_order(&self) -> &[ParticipantId] {
        &self.base_order
    }

    pub fn turn_order(&self) -> &[ParticipantId] {
        &self.turn_order
    }

    /// Zero-based index of the next pick; equals `all_picks().len()`.
    pub fn current_pick(&self) -> usize {
        self.current_pick
    }

    pub fn num_rounds(&self) -> u32 {
        self.num_rounds
    }

    pub fn total_picks(&self) -> usize {
        self.turn_order.len()
    }

    pub fn all_picks(&self) -> &[Pick] {
        &self.all_picks
    }

    pub fn roster(&self, participant: &str) -> Option<&Roster> {
        self.rosters.get(participant)
    }

    /// Rosters in base order.
    pub fn rosters(&self) -> Vec<(&ParticipantId, &Roster)> {
        self.base_order
            .iter()
            .filter_map(|p| self.rosters.get(p).map(|r| (p, r)))
            .collect()
    }

    pub fn excluded(&self) -> &HashSet<ItemKey> {
        &self.excluded
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn active_channel(&self) -> Option<&str> {
        self.active_channel.as_deref()
    }

    pub fn current_category(&self) -> Category {
        self.current_category
    }

    /// Every turn has been used.
    pub fn is_complete(&self) -> bool {
        !self.turn_order.is_empty() && self.current_pick >= self.turn_order.len()
    }

    pub(crate) fn next_render_id(&mut self) -> u64 {
        self.render_seq += 1;
        self.render_seq
    }

    pub(crate) fn last_render_id(&self) -> u64 {
        self.render_seq
    }

    // -- persistence boundary ----------------------------------------------

    /// Serialize into the opaque blob handed to the persistence collaborator.
    pub fn to_json(&self) -> Result<serde_json::Value, DraftError> {
        serde_json::to_value(self).map_err(|e| DraftError::PersistenceFailure(e.to_string()))
    }

    /// Rebuild a state from a stored blob, re-deriving the exclusion set and
    /// checking every structural invariant.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DraftError> {
        let mut state: DraftState =
            serde_json::from_value(value).map_err(|e| DraftError::CorruptState(e.to_string()))?;
        state.excluded = state.all_picks.iter().map(Pick::key).collect();
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), DraftError> {
        let corrupt = |msg: String| Err(DraftError::CorruptState(msg));

        if self.base_order.is_empty() && self.num_rounds != 0 {
            return corrupt(format!("{} rounds with no participants", self.num_rounds));
        }
        // Size check first, so a bogus round count never drives an allocation.
        let expected_len = self.base_order.len().checked_mul(self.num_rounds as usize);
        if expected_len != Some(self.turn_order.len()) {
            return corrupt(format!(
                "{} participants over {} rounds does not match a {}-pick turn order",
                self.base_order.len(),
                self.num_rounds,
                self.turn_order.len()
            ));
        }
        if self.turn_order != build_turn_order(&self.base_order, self.num_rounds) {
            return corrupt("turn order does not match base order and round count".into());
        }
        if self.current_pick != self.all_picks.len() {
            return corrupt(format!(
                "pick pointer {} does not match {} recorded picks",
                self.current_pick,
                self.all_picks.len()
            ));
        }
        if self.current_pick > self.turn_order.len() {
            return corrupt(format!(
                "pick pointer {} is past the end of a {}-pick draft",
                self.current_pick,
                self.turn_order.len()
            ));
        }
        if self.excluded.len() != self.all_picks.len() {
            return corrupt("pick history contains duplicate selections".into());
        }
        for (idx, pick) in self.all_picks.iter().enumerate() {
            if pick.pick_number as usize != idx + 1 {
                return corrupt(format!(
                    "pick at position {} has number {}",
                    idx + 1,
                    pick.pick_number
                ));
            }
            if pick.participant != self.turn_order[idx] {
                return corrupt(format!(
                    "pick {} belongs to {} but the turn was {}",
                    pick.pick_number, pick.participant, self.turn_order[idx]
                ));
            }
        }
        if self.rosters.len() != self.base_order.len()
            || !self.base_order.iter().all(|p| self.rosters.contains_key(p))
        {
            return corrupt("rosters do not match the draft order".into());
        }
        let roster_picks: usize = self.rosters.values().map(|r| r.picks.len()).sum();
        if roster_picks != self.all_picks.len() {
            return corrupt("rosters do not partition the pick history".into());
        }
        for (participant, roster) in &self.rosters {
            for pick in &roster.picks {
                let matches_history = self
                    .all_picks
                    .get((pick.pick_number as usize).wrapping_sub(1))
                    .is_some_and(|p| p == pick && &p.participant == participant);
                if !matches_history {
                    return corrupt(format!(
                        "roster pick {} of {} is not in the pick history",
                        pick.pick_number, participant
                    ));
                }
            }
        }
        Ok(())
    }

    // -- export -------------------------------------------------------------

    /// Roster export for downstream scoring, in base order.
    pub fn export_rosters(&self) -> Vec<RosterExport> {
        self.rosters()
            .into_iter()
            .map(|(participant, roster)| RosterExport {
                team_name: roster.team_name.clone(),
                user_id: participant.clone(),
                players: roster
                    .picks
                    .iter()
                    .map(|p| ExportedItem {
                        name: p.item_name.clone(),
                        team: p.group_label.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// One team in the scoring export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterExport {
    pub team_name: String,
    pub user_id: ParticipantId,
    pub players: Vec<ExportedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedItem {
    pub name: String,
    pub team: String,
}

/// Generate a draft id from the current UTC time.
///
/// Format: `draft_YYYYMMDD_HHMMSS_SSS`.
pub fn generate_draft_id() -> String {
    chrono::Utc::now()
        .format("draft_%Y%m%d_%H%M%S_%3f")
        .to_string()
}
