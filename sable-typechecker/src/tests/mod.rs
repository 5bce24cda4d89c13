//! Unit and integration tests for the Sable typechecker
//!
//! Programs are built directly as name-resolved trees with the helpers in
//! `support`, since parsing lives in the frontend.

#![allow(clippy::unwrap_used)]

mod support;

// Registry and layout
mod test_layout;
mod test_registry;

// Program verification
mod test_verify;

mod test_literals;


mod test_checker;
