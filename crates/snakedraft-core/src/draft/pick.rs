// Pick engine: validated commit and tail-only undo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::{DraftState, ParticipantId, Roster};
use crate::catalog::{Category, ItemKey};
use crate::error::DraftError;

/// A single committed selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub participant: ParticipantId,
    pub item_name: String,
    pub group_label: String,
    pub category: Category,
    /// Sequential pick number (1-indexed), equal to the pick's position in
    /// the draft history.
    pub pick_number: u32,
    /// 1-based round the pick was made in.
    pub round: u32,
    pub timestamp: DateTime<Utc>,
}

impl Pick {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.item_name, &self.group_label)
    }
}

impl DraftState {
    /// Record a selection for the participant on the clock.
    ///
    /// Checks run against the live exclusion set, so two racing selections of
    /// the same item cannot both succeed. On success the pick is appended to
    /// the history and the roster, its key is excluded and the pointer
    /// advances, all in one `&mut self` step.
    pub fn commit(
        &mut self,
        item_name: &str,
        group_label: &str,
        category: Category,
    ) -> Result<Pick, DraftError> {
        if !self.is_active {
            return Err(DraftError::DraftNotActive);
        }
        if self.current_pick >= self.turn_order.len() {
            return Err(DraftError::DraftComplete);
        }
        let key = ItemKey::new(item_name, group_label);
        if self.excluded.contains(&key) {
            debug!("Rejected duplicate selection {}", key);
            return Err(DraftError::DuplicateSelection {
                item_name: item_name.trim().to_string(),
                group_label: group_label.trim().to_string(),
            });
        }

        let participant = self.turn_order[self.current_pick].clone();
        let pick = Pick {
            participant: participant.clone(),
            item_name: item_name.trim().to_string(),
            group_label: group_label.trim().to_string(),
            category,
            pick_number: self.all_picks.len() as u32 + 1,
            round: self.round_of(self.current_pick),
            timestamp: Utc::now(),
        };

        let slot = self.rosters.len() + 1;
        self.rosters
            .entry(participant)
            .or_insert_with(|| Roster {
                team_name: format!("Team {slot}"),
                picks: Vec::new(),
            })
            .picks
            .push(pick.clone());
        self.all_picks.push(pick.clone());
        self.excluded.insert(key);
        self.current_pick += 1;

        info!(
            "Pick #{} (round {}): {} -> {} ({})",
            pick.pick_number, pick.round, pick.participant, pick.item_name, pick.group_label
        );
        Ok(pick)
    }

    /// Reverse the most recent pick. Returns the removed pick, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<Pick> {
        let last = self.all_picks.pop()?;

        if let Some(roster) = self.rosters.get_mut(&last.participant) {
            if let Some(pos) = roster
                .picks
                .iter()
                .position(|p| p.pick_number == last.pick_number)
            {
                roster.picks.remove(pos);
            }
        }
        self.excluded.remove(&last.key());
        self.current_pick = self.all_picks.len();

        info!(
            "Undid pick #{}: {} ({}) returned to the pool",
            last.pick_number, last.item_name, last.group_label
        );
        Some(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::state::DraftRules;

    fn started(ids: &[&str], rounds: u32) -> DraftState {
        let mut state = DraftState::new();
        state
            .start_draft(
                ids.iter().map(|s| s.to_string()).collect(),
                rounds,
                None,
                &DraftRules::default(),
            )
            .unwrap();
        state
    }

    #[test]
    fn commit_records_everywhere() {
        let mut state = started(&["A", "B"], 2);
        let pick = state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();

        assert_eq!(pick.participant, "A");
        assert_eq!(pick.pick_number, 1);
        assert_eq!(pick.round, 1);
        assert_eq!(state.current_pick(), 1);
        assert_eq!(state.all_picks(), &[pick.clone()]);
        assert_eq!(state.roster("A").unwrap().picks, vec![pick]);
        assert!(state.excluded().contains(&ItemKey::new("Tom Brady", "BUC")));
    }

    #[test]
    fn commit_assigns_round_across_snake_turn() {
        let mut state = started(&["A", "B"], 2);
        state.commit("a", "X", Category::Kicker).unwrap();
        state.commit("b", "X", Category::Kicker).unwrap();
        let third = state.commit("c", "X", Category::Kicker).unwrap();
        assert_eq!(third.round, 2);
        assert_eq!(third.participant, "B");
        assert_eq!(third.pick_number, 3);
    }

    #[test]
    fn duplicate_is_case_insensitive() {
        let mut state = started(&["A", "B"], 2);
        state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();

        let err = state
            .commit("tom brady", "buc", Category::Quarterback)
            .unwrap_err();
        assert_eq!(
            err,
            DraftError::DuplicateSelection {
                item_name: "tom brady".into(),
                group_label: "buc".into()
            }
        );
        assert_eq!(state.current_pick(), 1);
        assert!(state.roster("B").unwrap().picks.is_empty());
    }

    #[test]
    fn same_name_different_group_is_allowed() {
        let mut state = started(&["A", "B"], 1);
        state.commit("Josh Allen", "BUF", Category::Quarterback).unwrap();
        assert!(state.commit("Josh Allen", "JAX", Category::Defense).is_ok());
    }

    #[test]
    fn commit_past_end_is_draft_complete() {
        let mut state = started(&["A", "B"], 1);
        state.commit("a", "X", Category::Kicker).unwrap();
        state.commit("b", "X", Category::Kicker).unwrap();
        assert_eq!(state.current_pick(), 2);
        assert_eq!(state.current_pick(), state.total_picks());

        assert_eq!(
            state.commit("c", "X", Category::Kicker),
            Err(DraftError::DraftComplete)
        );
        assert_eq!(state.current_pick(), 2);
    }

    #[test]
    fn commit_requires_active_draft() {
        let mut state = DraftState::new();
        assert_eq!(
            state.commit("a", "X", Category::Kicker),
            Err(DraftError::DraftNotActive)
        );

        let mut state = started(&["A", "B"], 1);
        state.end_draft().unwrap();
        assert_eq!(
            state.commit("a", "X", Category::Kicker),
            Err(DraftError::DraftNotActive)
        );
    }

    #[test]
    fn undo_restores_previous_state() {
        let mut state = started(&["A", "B"], 2);
        state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();
        let before = state.clone();

        state.commit("Jared Goff", "DET", Category::Quarterback).unwrap();
        let undone = state.undo().unwrap();

        assert_eq!(undone.item_name, "Jared Goff");
        assert_eq!(state, before);
    }

    #[test]
    fn undo_to_empty_puts_first_participant_back_on_clock() {
        let mut state = started(&["A", "B"], 2);
        state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();
        assert!(state.undo().is_some());

        assert!(state.all_picks().is_empty());
        assert!(state.excluded().is_empty());
        assert_eq!(state.current_pick(), 0);
        assert_eq!(state.current_turn().map(String::as_str), Some("A"));
    }

    #[test]
    fn undo_with_no_picks_is_noop() {
        let mut state = started(&["A", "B"], 2);
        let before = state.clone();
        assert!(state.undo().is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn undo_matches_roster_entry_by_pick_number() {
        let mut state = started(&["A", "B"], 2);
        state.commit("a1", "X", Category::Kicker).unwrap();
        state.commit("b1", "X", Category::Kicker).unwrap();
        state.commit("b2", "X", Category::Kicker).unwrap();

        // Reorder B's roster so the most recent pick is not last.
        state.rosters.get_mut("B").unwrap().picks.reverse();
        let undone = state.undo().unwrap();

        assert_eq!(undone.item_name, "b2");
        let remaining: Vec<_> = state
            .roster("B")
            .unwrap()
            .picks
            .iter()
            .map(|p| p.item_name.as_str())
            .collect();
        assert_eq!(remaining, vec!["b1"]);
    }

    #[test]
    fn undone_item_can_be_picked_again() {
        let mut state = started(&["A", "B"], 1);
        state.commit("Tom Brady", "BUC", Category::Quarterback).unwrap();
        state.undo();
        let again = state.commit("TOM BRADY", "buc", Category::Quarterback).unwrap();
        assert_eq!(again.pick_number, 1);
        assert_eq!(again.participant, "A");
    }

    #[test]
    fn commit_trims_names() {
        let mut state = started(&["A", "B"], 1);
        let pick = state.commit("  Tom Brady ", " BUC", Category::Quarterback).unwrap();
        assert_eq!(pick.item_name, "Tom Brady");
        assert_eq!(pick.group_label, "BUC");
    }
}
