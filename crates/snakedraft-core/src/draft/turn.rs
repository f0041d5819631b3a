// Snake-order turn sequencing and round arithmetic.

use serde::{Deserialize, Serialize};

use super::state::{DraftState, ParticipantId};

/// Expand a base order into the full snake turn order.
///
/// Even rounds (0-indexed) run the base order forward, odd rounds run it
/// reversed, so the last picker of one round picks first in the next.
pub fn build_turn_order(base_order: &[ParticipantId], num_rounds: u32) -> Vec<ParticipantId> {
    if base_order.is_empty() {
        return Vec::new();
    }
    let mut order = Vec::with_capacity(base_order.len() * num_rounds as usize);
    for round in 0..num_rounds {
        if round % 2 == 0 {
            order.extend(base_order.iter().cloned());
        } else {
            order.extend(base_order.iter().rev().cloned());
        }
    }
    order
}

/// 1-based position of `pick_index` within its round. Returns 0 for an empty
/// base order.
pub fn pick_slot_in_round(pick_index: usize, base_len: usize) -> usize {
    if base_len == 0 {
        return 0;
    }
    (pick_index % base_len) + 1
}

/// Aggregate progress of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStatus {
    pub active: bool,
    pub round: u32,
    pub num_rounds: u32,
    pub picks_made: usize,
    pub total_picks: usize,
    pub on_clock: Option<ParticipantId>,
    pub on_deck: Option<ParticipantId>,
}

impl DraftState {
    /// The participant on the clock, if the draft is active and not complete.
    pub fn current_turn(&self) -> Option<&ParticipantId> {
        self.turn_at(self.current_pick)
    }

    /// The participant picking after the one on the clock.
    pub fn on_deck(&self) -> Option<&ParticipantId> {
        self.turn_at(self.current_pick + 1)
    }

    fn turn_at(&self, index: usize) -> Option<&ParticipantId> {
        if !self.is_active {
            return None;
        }
        self.turn_order.get(index)
    }

    /// 1-based round of the pick on the clock; 0 before a draft is started.
    pub fn current_round(&self) -> u32 {
        self.round_of(self.current_pick)
    }

    pub(crate) fn round_of(&self, pick_index: usize) -> u32 {
        if self.base_order.is_empty() {
            return 0;
        }
        (pick_index / self.base_order.len()) as u32 + 1
    }

    /// 1-based slot of the pick on the clock within its round.
    pub fn current_slot_in_round(&self) -> usize {
        pick_slot_in_round(self.current_pick, self.base_order.len())
    }

    pub fn status(&self) -> DraftStatus {
        DraftStatus {
            active: self.is_active,
            round: self.current_round(),
            num_rounds: self.num_rounds,
            picks_made: self.all_picks.len(),
            total_picks: self.turn_order.len(),
            on_clock: self.current_turn().cloned(),
            on_deck: self.on_deck().cloned(),
        }
    }
}
