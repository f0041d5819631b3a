pub mod pick;
pub mod session;
pub mod state;
pub mod turn;

pub use pick::Pick;
pub use session::{
    Choice, ChoiceEvent, RenderRequest, SelectionSession, SessionOutcome, SessionPhase,
};
pub use state::{DraftRules, DraftState, ParticipantId, Roster, RosterExport, MIN_PARTICIPANTS};
pub use turn::{build_turn_order, DraftStatus};
