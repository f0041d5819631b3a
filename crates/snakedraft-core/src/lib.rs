// Snake draft engine: catalog, turn order, pick validation, the interactive
// selection session and the persistence seam. Transport and storage live in
// the application crate.

pub mod catalog;
pub mod draft;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod store;

pub use catalog::{CandidateItem, Catalog, Category, ItemKey};
pub use engine::{DraftEngine, Durability, Undone};
pub use error::{DraftError, ErrorKind};
pub use store::{DraftStore, MemoryStore};
