//! Core domain types
//!
//! These types describe what the client tracks (run identifiers) and what it
//! learns about them (poll results). They are shared between the HTTP client
//! and the observable store.

pub mod poll;
pub mod run;
