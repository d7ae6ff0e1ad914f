//! Discovery of the raw grid files and their unification into one dataset.

pub mod combine;
pub mod corpus;
pub mod unifier;

pub use corpus::{index, Corpus, IndexOutcome, IndexReport, SkipReason};
pub use unifier::{concatenate_years_and_levels, merge_variables, Unifier};
