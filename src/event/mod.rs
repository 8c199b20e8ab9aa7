//! Event data and search
//!
//! Reference events, their owners, title normalization and the fuzzy search
//! that maps OCR text to events.

pub mod dataset;
pub mod normalize;
pub mod owner;
pub mod record;
pub mod search;

pub use dataset::{
    CharaOwnerData, DataError, EventDataset, EventOwners, Rarity, SupportOwnerData, SupportType,
};
pub use normalize::{normalize_for_comparison, reference_title_key};
pub use owner::{EventCategory, EventOwner};
pub use record::{EventChoice, EventRecord};
pub use search::{select_event, similarity, top_candidates, EventSearch, SearchResult};
