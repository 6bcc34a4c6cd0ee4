//! Trip data layer: a persisted record store plus the record types built on
//! top of it (places to visit, participant roster, day-by-day program, and
//! free-form info pages).

pub mod info_pages;
pub mod participants;
pub mod places;
pub mod program;
pub mod store;

pub use store::Trip;
