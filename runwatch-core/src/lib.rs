//! Runwatch Core
//!
//! Core types shared by the runwatch crates.
//!
//! This crate contains:
//! - Domain types: run identifiers, poll results and poller statistics
//! - DTOs: the request and response bodies of the poll endpoint

pub mod domain;
pub mod dto;
