//! Method dispatch
//!
//! Candidate lookup over the supertype chain and overload resolution with
//! speculative argument checking.

pub mod lookup;
pub mod resolution;

pub use lookup::{collect_candidates, describe_method, describe_term, CallForm, Candidate};
pub use resolution::{resolve, CallSite, Resolution};
